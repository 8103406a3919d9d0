//! Owner-only working directory holding materialized artifacts.

use std::fmt;
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

/// On-disk form of a materialized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArtifactVariant {
    /// Encoded document as desired.
    Plain,
    /// Payload content sealed for the recipient, not yet signed.
    Encrypted,
    /// Signed envelope of the plain document.
    Signed,
    /// Signed envelope of the encrypted document.
    EncryptedSigned,
}

impl ArtifactVariant {
    /// Every variant, in production order.
    pub const ALL: [ArtifactVariant; 4] = [
        ArtifactVariant::Plain,
        ArtifactVariant::Encrypted,
        ArtifactVariant::Signed,
        ArtifactVariant::EncryptedSigned,
    ];

    /// File-name suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactVariant::Plain => "plain",
            ArtifactVariant::Encrypted => "encrypted",
            ArtifactVariant::Signed => "signed",
            ArtifactVariant::EncryptedSigned => "encrypted-signed",
        }
    }

    /// Variant produced by signing this one.
    pub fn signed(self) -> Self {
        match self {
            ArtifactVariant::Encrypted | ArtifactVariant::EncryptedSigned => {
                ArtifactVariant::EncryptedSigned
            }
            ArtifactVariant::Plain | ArtifactVariant::Signed => ArtifactVariant::Signed,
        }
    }
}

impl fmt::Display for ArtifactVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A materialized artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Which form it is.
    pub variant: ArtifactVariant,
    /// Where it lives.
    pub path: PathBuf,
}

/// Per-installation directory for artifacts.
///
/// Created with mode `0700` when missing; reused as-is otherwise. Artifacts
/// are written with mode `0600`.
#[derive(Debug, Clone)]
pub struct WorkingDir {
    root: PathBuf,
}

impl WorkingDir {
    /// Opens `root`, creating it (and missing parents) owner-only.
    pub fn acquire(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            DirBuilder::new()
                .recursive(true)
                .mode(DIR_MODE)
                .create(&root)?;
            fs::set_permissions(&root, fs::Permissions::from_mode(DIR_MODE))?;
            tracing::debug!(path = %root.display(), "created working directory");
        }
        Ok(Self { root })
    }

    /// Directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `name`'s artifact in `variant` form.
    pub fn path_for(&self, name: &str, variant: ArtifactVariant) -> PathBuf {
        self.root.join(format!("{}.{}", name, variant.suffix()))
    }

    /// Writes an artifact owner-only, replacing any previous content.
    pub fn write(&self, name: &str, variant: ArtifactVariant, bytes: &[u8]) -> io::Result<Artifact> {
        check_name(name)?;
        let path = self.path_for(name, variant);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(FILE_MODE)
            .open(&path)?;
        file.write_all(bytes)?;
        file.flush()?;
        restrict(&path)?;
        Ok(Artifact { variant, path })
    }

    /// Whether the artifact exists.
    pub fn exists(&self, name: &str, variant: ArtifactVariant) -> bool {
        check_name(name).is_ok() && self.path_for(name, variant).is_file()
    }

    /// Removes an artifact. Returns whether a file was removed; absence is fine.
    pub fn remove(&self, name: &str, variant: ArtifactVariant) -> io::Result<bool> {
        check_name(name)?;
        match fs::remove_file(self.path_for(name, variant)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Removes every variant of `name`'s artifacts.
    pub fn remove_all(&self, name: &str) -> io::Result<Vec<ArtifactVariant>> {
        check_name(name)?;
        let mut removed = Vec::new();
        for variant in ArtifactVariant::ALL {
            if self.remove(name, variant)? {
                removed.push(variant);
            }
        }
        Ok(removed)
    }

    /// Variants of `name` currently on disk.
    pub fn present(&self, name: &str) -> Vec<ArtifactVariant> {
        ArtifactVariant::ALL
            .into_iter()
            .filter(|variant| self.exists(name, *variant))
            .collect()
    }
}

/// Artifact names must stay a single component inside the root.
fn check_name(name: &str) -> io::Result<()> {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("artifact name {:?} is not a plain file name", name),
        ));
    }
    Ok(())
}

/// Forces owner-only permissions on a file produced by a collaborator.
pub fn restrict(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(FILE_MODE))
}
