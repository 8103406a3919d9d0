//! Multi-stage apply of planned actions.
//!
//! Create/update: validate, resolve the certificate, materialize the plain
//! artifact, optionally encrypt, optionally sign, then install. Delete: remove
//! every artifact variant, then uninstall. Each stage is a checkpoint; a
//! failure stops the action and names the stage, and later stages never run.

use std::path::PathBuf;

use macprofile_canonical::{
    ProfileDocument, Value, ENCRYPTED_PAYLOAD_CONTENT, PAYLOAD_CONTENT,
};
use tracing::{debug, error, info, warn};

use crate::codec::Codec;
use crate::encrypt::Encryptor;
use crate::errors::{ApplyError, Stage};
use crate::plan::{Action, ActionKind};
use crate::record::{DesiredRecord, Mode};
use crate::runner::ProcessRunner;
use crate::tools::ProfileTools;
use crate::trust::TrustStore;
use crate::workdir::{restrict, Artifact, ArtifactVariant, WorkingDir};

/// Terminal state of a successfully applied action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Nothing to do.
    Unchanged,
    /// Profile installed from `artifact`.
    Installed {
        /// Final artifact handed to the installer.
        artifact: Artifact,
    },
    /// Artifact written for manual import.
    Written {
        /// Final artifact left on disk.
        artifact: Artifact,
    },
    /// Profile removed.
    Removed {
        /// Artifact variants deleted from the working directory.
        artifacts: Vec<ArtifactVariant>,
    },
}

/// Result of one action.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Profile name.
    pub name: String,
    /// Action that was attempted.
    pub kind: ActionKind,
    /// Terminal state.
    pub result: Result<Applied, ApplyError>,
}

/// Results of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    /// One outcome per started action, in order.
    pub outcomes: Vec<Outcome>,
    /// Actions not started because the pass was stopped.
    pub skipped: Vec<String>,
}

impl PassReport {
    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ApplyError)> {
        self.outcomes.iter().filter_map(|outcome| {
            outcome
                .result
                .as_ref()
                .err()
                .map(|err| (outcome.name.as_str(), err))
        })
    }

    /// Whether every started action succeeded and none were skipped.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none() && self.skipped.is_empty()
    }
}

/// Executes actions against the collaborators.
pub struct Pipeline<'a> {
    workdir: &'a WorkingDir,
    runner: &'a dyn ProcessRunner,
    trust: &'a dyn TrustStore,
    encryptor: &'a dyn Encryptor,
    codec: &'a dyn Codec,
    tools: &'a ProfileTools,
}

impl<'a> Pipeline<'a> {
    /// Wires a pipeline.
    pub fn new(
        workdir: &'a WorkingDir,
        runner: &'a dyn ProcessRunner,
        trust: &'a dyn TrustStore,
        encryptor: &'a dyn Encryptor,
        codec: &'a dyn Codec,
        tools: &'a ProfileTools,
    ) -> Self {
        Self {
            workdir,
            runner,
            trust,
            encryptor,
            codec,
            tools,
        }
    }

    /// Applies every action in order, collecting per-name results.
    pub fn apply(&self, actions: &[Action]) -> PassReport {
        self.apply_until(actions, || false)
    }

    /// Applies actions in order until `stop` returns true.
    ///
    /// `stop` is consulted before each action; a started action always runs
    /// to completion or failure.
    pub fn apply_until(&self, actions: &[Action], mut stop: impl FnMut() -> bool) -> PassReport {
        let mut report = PassReport::default();
        for (index, action) in actions.iter().enumerate() {
            if stop() {
                report.skipped = actions[index..]
                    .iter()
                    .map(|a| a.name().to_string())
                    .collect();
                warn!(skipped = report.skipped.len(), "pass stopped early");
                break;
            }
            report.outcomes.push(self.apply_action(action));
        }
        report
    }

    /// Applies a single action.
    pub fn apply_action(&self, action: &Action) -> Outcome {
        let name = action.name().to_string();
        let result = match action {
            Action::NoOp { .. } => Ok(Applied::Unchanged),
            Action::Create(desired) => {
                info!(name = %name, "creating profile");
                self.install_profile(desired)
            }
            Action::Update { desired, current } => {
                info!(name = %name, current = %current, "updating profile");
                self.install_profile(desired)
            }
            Action::Delete { .. } => {
                info!(name = %name, "deleting profile");
                self.delete_profile(&name)
            }
            Action::Reject { failure, .. } => Err(ApplyError::Validation(failure.clone())),
        };

        if let Err(err) = &result {
            error!(name = %name, stage = %err.stage(), error = %err, "action failed");
        }
        Outcome {
            name,
            kind: action.kind(),
            result,
        }
    }

    fn install_profile(&self, desired: &DesiredRecord) -> Result<Applied, ApplyError> {
        let document = desired.validate()?;
        let name = desired.name.as_str();
        let certificate = self.resolve_certificate(desired)?;
        let encrypt = self.wants_encryption(desired, document);
        let recipient = certificate.as_deref().filter(|_| encrypt);

        let stale = self
            .workdir
            .remove_all(name)
            .map_err(|err| ApplyError::at(Stage::Materialize, err))?;
        if !stale.is_empty() {
            debug!(name, removed = stale.len(), "cleared previous artifacts");
        }

        let mut artifact = self.materialize(name, document)?;
        if let Some(recipient) = recipient {
            artifact = self.encrypt(name, document, recipient, artifact)?;
        }
        if let Some(label) = desired.certificate.as_deref() {
            artifact = self.sign(name, label, artifact)?;
        }

        match desired.mode {
            Mode::Install => {
                self.run_stage(Stage::Install, &self.tools.install(&artifact.path))?;
                info!(name, path = %artifact.path.display(), "installed profile");
                Ok(Applied::Installed { artifact })
            }
            Mode::File => {
                info!(name, path = %artifact.path.display(), "profile written for manual import");
                Ok(Applied::Written { artifact })
            }
        }
    }

    /// Resolves the record's certificate label, if any, before anything is written.
    fn resolve_certificate(&self, desired: &DesiredRecord) -> Result<Option<Vec<u8>>, ApplyError> {
        let Some(label) = desired.certificate.as_deref() else {
            return Ok(None);
        };
        let found = self
            .trust
            .find_certificate(label)
            .map_err(|err| ApplyError::at(Stage::LookupCertificate, err))?;
        found
            .map(Some)
            .ok_or_else(|| ApplyError::CertificateNotFound {
                label: label.to_string(),
            })
    }

    fn wants_encryption(&self, desired: &DesiredRecord, document: &ProfileDocument) -> bool {
        if !desired.encrypt {
            return false;
        }
        if desired.certificate.is_none() {
            warn!(name = %desired.name, "encryption requested without a certificate; skipping");
            return false;
        }
        if document.get(PAYLOAD_CONTENT).is_none() {
            warn!(name = %desired.name, "encryption requested but document has no content; skipping");
            return false;
        }
        true
    }

    fn materialize(&self, name: &str, document: &ProfileDocument) -> Result<Artifact, ApplyError> {
        let bytes = self
            .codec
            .encode(&document.to_value())
            .map_err(|err| ApplyError::at(Stage::Materialize, err))?;
        let artifact = self
            .workdir
            .write(name, ArtifactVariant::Plain, &bytes)
            .map_err(|err| ApplyError::at(Stage::Materialize, err))?;
        debug!(name, path = %artifact.path.display(), "materialized");
        Ok(artifact)
    }

    fn encrypt(
        &self,
        name: &str,
        document: &ProfileDocument,
        certificate: &[u8],
        predecessor: Artifact,
    ) -> Result<Artifact, ApplyError> {
        let mut sealed = document.clone();
        let content = sealed.remove(PAYLOAD_CONTENT).unwrap_or(Value::Array(Vec::new()));
        let payload = self
            .codec
            .encode(&content)
            .map_err(|err| ApplyError::at(Stage::Encrypt, err))?;
        let ciphertext = self
            .encryptor
            .encrypt(certificate, &payload)
            .map_err(|err| ApplyError::at(Stage::Encrypt, err))?;
        sealed.insert(ENCRYPTED_PAYLOAD_CONTENT, Value::Data(ciphertext));

        let bytes = self
            .codec
            .encode(&sealed.into_value())
            .map_err(|err| ApplyError::at(Stage::Encrypt, err))?;
        let artifact = self
            .workdir
            .write(name, ArtifactVariant::Encrypted, &bytes)
            .map_err(|err| ApplyError::at(Stage::Encrypt, err))?;
        self.retire(name, &predecessor, Stage::Encrypt)?;
        debug!(name, path = %artifact.path.display(), "encrypted");
        Ok(artifact)
    }

    fn sign(&self, name: &str, label: &str, predecessor: Artifact) -> Result<Artifact, ApplyError> {
        let variant = predecessor.variant.signed();
        let target: PathBuf = self.workdir.path_for(name, variant);

        self.run_stage(Stage::Sign, &self.tools.sign(label, &predecessor.path, &target))?;
        if !target.is_file() {
            return Err(ApplyError::at(
                Stage::Sign,
                format!("signed artifact {} was not produced", target.display()),
            ));
        }
        restrict(&target).map_err(|err| ApplyError::at(Stage::Sign, err))?;
        self.retire(name, &predecessor, Stage::Sign)?;
        debug!(name, path = %target.display(), "signed");
        Ok(Artifact {
            variant,
            path: target,
        })
    }

    fn retire(&self, name: &str, predecessor: &Artifact, stage: Stage) -> Result<(), ApplyError> {
        self.workdir
            .remove(name, predecessor.variant)
            .map(|_| ())
            .map_err(|err| ApplyError::at(stage, err))
    }

    fn delete_profile(&self, name: &str) -> Result<Applied, ApplyError> {
        let artifacts = self
            .workdir
            .remove_all(name)
            .map_err(|err| ApplyError::at(Stage::RemoveArtifacts, err))?;
        debug!(name, removed = artifacts.len(), "removed artifacts");

        self.run_stage(Stage::Uninstall, &self.tools.remove(name))?;
        info!(name, "removed profile");
        Ok(Applied::Removed { artifacts })
    }

    fn run_stage(&self, stage: Stage, argv: &[String]) -> Result<(), ApplyError> {
        let output = self
            .runner
            .run(argv)
            .map_err(|err| ApplyError::at(stage, err))?;
        if !output.success() {
            return Err(ApplyError::at(
                stage,
                format!("exit status {}: {}", output.status, output.text()),
            ));
        }
        Ok(())
    }
}
