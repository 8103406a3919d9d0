//! Manifest describing the desired profiles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use macprofile_canonical::{
    validate_profile_name, DocumentError, Identity, LetterCase, Normalizer, PatternFormat,
    ProfileDocument, ValidationError, UUID_PATTERN,
};
use macprofile_reconcile::{
    Codec, CodecError, CurrentRecord, DesiredRecord, Ensure, Mode, PlistCodec, ProfileTools,
};
use serde::Deserialize;
use thiserror::Error;

/// Manifest loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode {path}: {source}")]
    Codec { path: PathBuf, source: CodecError },

    #[error("{path}: {source}")]
    Document {
        path: PathBuf,
        source: DocumentError,
    },

    #[error("invalid profile name: {0}")]
    Name(ValidationError),

    #[error("profile '{0}' is declared more than once")]
    Duplicate(String),

    #[error(transparent)]
    Pattern(ValidationError),
}

/// Letter case of rendered identities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSetting {
    #[default]
    Upper,
    Lower,
}

impl From<CaseSetting> for LetterCase {
    fn from(case: CaseSetting) -> Self {
        match case {
            CaseSetting::Upper => LetterCase::Upper,
            CaseSetting::Lower => LetterCase::Lower,
        }
    }
}

/// One desired profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEntry {
    pub name: String,
    /// Document path, relative to the manifest.
    #[serde(default)]
    pub mobileconfig: Option<PathBuf>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub certificate: Option<String>,
    #[serde(default)]
    pub encrypt: bool,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub ensure: Ensure,
}

/// Top-level manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub working_dir: PathBuf,
    pub identity_pattern: String,
    pub identity_case: CaseSetting,
    /// Delete installed profiles that the manifest does not mention.
    pub purge_unmanaged: bool,
    pub tools: ProfileTools,
    pub profiles: Vec<ProfileEntry>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("/var/lib/macprofile/mobileconfigs"),
            identity_pattern: UUID_PATTERN.to_string(),
            identity_case: CaseSetting::Upper,
            purge_unmanaged: false,
            tools: ProfileTools::default(),
            profiles: Vec::new(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Manifest {
    /// Reads a manifest; relative paths in it resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest: Manifest = serde_json::from_str(&text)?;
        manifest.base_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(manifest)
    }

    /// Working directory resolved against the manifest location.
    pub fn working_dir(&self) -> PathBuf {
        self.base_dir.join(&self.working_dir)
    }

    /// Normalizer configured with the manifest's identity format.
    pub fn normalizer(&self) -> Result<Normalizer, ConfigError> {
        let format = PatternFormat::new(&self.identity_pattern, self.identity_case.into())
            .map_err(ConfigError::Pattern)?;
        Ok(Normalizer::new(format))
    }

    /// Loads and normalizes every declared profile, keyed by name.
    pub fn desired_records(
        &self,
        normalizer: &Normalizer,
    ) -> Result<BTreeMap<String, DesiredRecord>, ConfigError> {
        let mut records = BTreeMap::new();
        for entry in &self.profiles {
            validate_profile_name(&entry.name).map_err(ConfigError::Name)?;
            let record = self.record_for(entry)?.normalize(normalizer);
            if records.insert(entry.name.clone(), record).is_some() {
                return Err(ConfigError::Duplicate(entry.name.clone()));
            }
        }
        Ok(records)
    }

    /// Drops current records outside the manifest unless purging is on.
    pub fn managed(&self, current: Vec<CurrentRecord>) -> Vec<CurrentRecord> {
        if self.purge_unmanaged {
            return current;
        }
        current
            .into_iter()
            .filter(|record| self.profiles.iter().any(|entry| entry.name == record.name))
            .collect()
    }

    fn record_for(&self, entry: &ProfileEntry) -> Result<DesiredRecord, ConfigError> {
        if entry.ensure == Ensure::Absent {
            return Ok(DesiredRecord::absent(&entry.name));
        }

        let document = entry
            .mobileconfig
            .as_ref()
            .map(|relative| read_document(&self.base_dir.join(relative)))
            .transpose()?;
        let mut record = DesiredRecord::new(&entry.name, document)
            .with_encryption(entry.encrypt)
            .with_mode(entry.mode);
        if let Some(uuid) = &entry.uuid {
            record = record.with_identity(Identity::parse(uuid));
        }
        if let Some(label) = &entry.certificate {
            record = record.with_certificate(label);
        }
        Ok(record)
    }
}

/// Reads and decodes a profile document.
pub fn read_document(path: &Path) -> Result<ProfileDocument, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = PlistCodec
        .decode(&bytes)
        .map_err(|source| ConfigError::Codec {
            path: path.to_path_buf(),
            source,
        })?;
    ProfileDocument::from_value(value).map_err(|source| ConfigError::Document {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WIFI: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>PayloadIdentifier</key>
  <string>com.example.wifi</string>
  <key>PayloadContent</key>
  <array>
    <dict>
      <key>a</key>
      <integer>1</integer>
    </dict>
  </array>
</dict>
</plist>
"#;

    fn write_manifest(dir: &TempDir, json: &str) -> PathBuf {
        std::fs::write(dir.path().join("wifi.mobileconfig"), WIFI).unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn defaults_apply_to_missing_fields() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::load(&write_manifest(&dir, "{}")).unwrap();
        assert!(!manifest.purge_unmanaged);
        assert_eq!(manifest.identity_case, CaseSetting::Upper);
        assert_eq!(manifest.tools, ProfileTools::default());
        assert!(manifest.profiles.is_empty());
    }

    #[test]
    fn documents_resolve_relative_to_manifest() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            r#"{ "profiles": [ { "name": "com.example.wifi", "mobileconfig": "wifi.mobileconfig" } ] }"#,
        );
        let manifest = Manifest::load(&path).unwrap();
        let records = manifest
            .desired_records(&manifest.normalizer().unwrap())
            .unwrap();

        let record = &records["com.example.wifi"];
        assert!(record.validate().is_ok());
        assert!(matches!(record.identity, Some(Identity::Uuid(_))));
        assert_eq!(record.identity, record.document.as_ref().unwrap().identity());
    }

    #[test]
    fn invalid_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, r#"{ "profiles": [ { "name": "-bad" } ] }"#);
        let manifest = Manifest::load(&path).unwrap();
        let err = manifest
            .desired_records(&Normalizer::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Name(_)));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            r#"{ "profiles": [
                { "name": "a.b.c", "ensure": "absent" },
                { "name": "a.b.c", "ensure": "absent" }
            ] }"#,
        );
        let err = Manifest::load(&path)
            .unwrap()
            .desired_records(&Normalizer::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Duplicate(name) if name == "a.b.c"));
    }

    #[test]
    fn absent_entries_need_no_document() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, r#"{ "profiles": [ { "name": "a.b.c", "ensure": "absent" } ] }"#);
        let records = Manifest::load(&path)
            .unwrap()
            .desired_records(&Normalizer::default())
            .unwrap();
        assert_eq!(records["a.b.c"].ensure, Ensure::Absent);
        assert!(records["a.b.c"].document.is_none());
    }

    #[test]
    fn unmanaged_profiles_are_filtered_unless_purging() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, r#"{ "profiles": [ { "name": "a.b.c", "ensure": "absent" } ] }"#);
        let mut manifest = Manifest::load(&path).unwrap();
        let current = || {
            ["a.b.c", "x.y.z"]
                .into_iter()
                .map(|name| CurrentRecord {
                    name: name.to_string(),
                    identity: Identity::parse(name),
                    raw: ProfileDocument::default(),
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(manifest.managed(current()).len(), 1);
        manifest.purge_unmanaged = true;
        assert_eq!(manifest.managed(current()).len(), 2);
    }

    #[test]
    fn bad_identity_pattern_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, r#"{ "identity_pattern": "([" }"#);
        assert!(matches!(
            Manifest::load(&path).unwrap().normalizer(),
            Err(ConfigError::Pattern(_))
        ));
    }

    #[test]
    fn unknown_mode_is_a_json_error() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, r#"{ "profiles": [ { "name": "a.b.c", "mode": "push" } ] }"#);
        assert!(matches!(Manifest::load(&path), Err(ConfigError::Json(_))));
    }
}
