use std::fmt;
use thiserror::Error;

/// Reasons a desired record is refused before anything is applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// Create/update requested without a document.
    #[error("invalid resource '{name}' because 'mobileconfig' is missing")]
    MissingDocument {
        /// Record name.
        name: String,
    },
    /// Record name and `PayloadIdentifier` differ.
    #[error("invalid resource '{name}' because name in property and identifier in mobileconfig differ (found {identifier:?})")]
    NameMismatch {
        /// Record name.
        name: String,
        /// Identifier found in the document.
        identifier: Option<String>,
    },
    /// Record identity and `PayloadUUID` differ.
    #[error("invalid resource '{name}' because UUID in property ({record:?}) and mobileconfig ({document:?}) differ")]
    IdentityMismatch {
        /// Record name.
        name: String,
        /// Identity on the record.
        record: Option<String>,
        /// Identity on the document.
        document: Option<String>,
    },
}

/// Steps of the apply pipeline, named in failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Record invariants.
    Validate,
    /// Certificate resolution in the trust store.
    LookupCertificate,
    /// Writing the plain artifact.
    Materialize,
    /// Sealing the payload content for the recipient.
    Encrypt,
    /// Producing the signed envelope.
    Sign,
    /// Handing the final artifact to the installer.
    Install,
    /// Removing artifacts of a deleted profile.
    RemoveArtifacts,
    /// Removing the profile from the system.
    Uninstall,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::LookupCertificate => "lookup-certificate",
            Stage::Materialize => "materialize",
            Stage::Encrypt => "encrypt",
            Stage::Sign => "sign",
            Stage::Install => "install",
            Stage::RemoveArtifacts => "remove-artifacts",
            Stage::Uninstall => "uninstall",
        };
        f.write_str(name)
    }
}

/// Failure applying one action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The record was rejected; nothing was touched.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    /// The certificate label did not resolve.
    #[error("could not get certificate for '{label}'")]
    CertificateNotFound {
        /// Label that was looked up.
        label: String,
    },
    /// A collaborator failed at `stage`.
    #[error("{stage} failed: {detail}")]
    Stage {
        /// Failing stage.
        stage: Stage,
        /// Collaborator output or error text.
        detail: String,
    },
}

impl ApplyError {
    /// Stage the failure belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            ApplyError::Validation(_) => Stage::Validate,
            ApplyError::CertificateNotFound { .. } => Stage::LookupCertificate,
            ApplyError::Stage { stage, .. } => *stage,
        }
    }

    pub(crate) fn at(stage: Stage, detail: impl fmt::Display) -> Self {
        ApplyError::Stage {
            stage,
            detail: detail.to_string(),
        }
    }
}

/// Failure reading the live system state.
#[derive(Error, Debug)]
pub enum StateError {
    /// Spawning the state command failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The state command exited non-zero.
    #[error("listing profiles failed with status {status}: {output}")]
    Command {
        /// Exit status.
        status: i32,
        /// Collaborator output.
        output: String,
    },
    /// The listing could not be decoded.
    #[error("codec error: {0}")]
    Codec(#[from] crate::codec::CodecError),
    /// The listing had an unexpected shape.
    #[error("unexpected profile listing: {0}")]
    Malformed(String),
}
