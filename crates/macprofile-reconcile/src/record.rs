//! Desired and current profile records.

use macprofile_canonical::{Identity, Normalizer, ProfileDocument};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationFailure;

/// What to do with the final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Hand the artifact to the installer.
    #[default]
    Install,
    /// Leave the artifact on disk for manual import.
    File,
}

/// Whether the profile should exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// Installed with the desired identity.
    #[default]
    Present,
    /// Removed if installed.
    Absent,
}

/// Desired state for one profile, supplied per pass by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredRecord {
    /// Stable profile name.
    pub name: String,
    /// Profile document; required for create/update.
    pub document: Option<ProfileDocument>,
    /// Identity; defaults to the document's once normalized.
    pub identity: Option<Identity>,
    /// Trust store label of the signing/encryption certificate.
    pub certificate: Option<String>,
    /// Seal the payload content for the certificate's owner.
    pub encrypt: bool,
    /// What to do with the final artifact.
    pub mode: Mode,
    /// Whether the profile should exist.
    pub ensure: Ensure,
}

impl DesiredRecord {
    /// A present, unsigned record in install mode.
    pub fn new(name: impl Into<String>, document: Option<ProfileDocument>) -> Self {
        Self {
            name: name.into(),
            document,
            identity: None,
            certificate: None,
            encrypt: false,
            mode: Mode::Install,
            ensure: Ensure::Present,
        }
    }

    /// A record asking for `name` to be removed.
    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            ensure: Ensure::Absent,
            ..Self::new(name, None)
        }
    }

    /// Sets the identity.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Sets the certificate label.
    pub fn with_certificate(mut self, label: impl Into<String>) -> Self {
        self.certificate = Some(label.into());
        self
    }

    /// Requests payload encryption.
    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    /// Sets the mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the record with a normalized document.
    ///
    /// The record's identity seeds the document when the document has none;
    /// otherwise the record inherits the document's identity. A record identity
    /// that is already set is never overwritten.
    pub fn normalize(&self, normalizer: &Normalizer) -> Self {
        let mut record = self.clone();
        if let Some(document) = &self.document {
            let normalized = normalizer.normalize(document, self.identity.as_ref());
            if record.identity.is_none() {
                record.identity = normalized.identity();
            }
            record.document = Some(normalized);
        }
        record
    }

    /// Checks the record against its document before anything is applied.
    pub fn validate(&self) -> Result<&ProfileDocument, ValidationFailure> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| ValidationFailure::MissingDocument {
                name: self.name.clone(),
            })?;

        if document.identifier() != Some(self.name.as_str()) {
            return Err(ValidationFailure::NameMismatch {
                name: self.name.clone(),
                identifier: document.identifier().map(str::to_string),
            });
        }

        let document_identity = document.identity();
        if self.identity.is_none() || self.identity != document_identity {
            return Err(ValidationFailure::IdentityMismatch {
                name: self.name.clone(),
                record: self.identity.as_ref().map(ToString::to_string),
                document: document_identity.as_ref().map(ToString::to_string),
            });
        }

        Ok(document)
    }
}

/// Profile as reported by the live system.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentRecord {
    /// Stable profile name (`ProfileIdentifier`).
    pub name: String,
    /// Installed identity (`ProfileUUID`).
    pub identity: Identity,
    /// Raw entry from the system listing.
    pub raw: ProfileDocument,
}
