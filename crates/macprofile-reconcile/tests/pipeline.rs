use std::collections::BTreeMap;
use std::io;

use macprofile_canonical::{dict, Identity, Normalizer, ProfileDocument, Value};
use macprofile_reconcile::{
    index_current, plan, Action, ApplyError, Applied, ArtifactVariant, Codec, CurrentRecord,
    DesiredRecord, Encryptor, MockRunner, Mode, Pipeline, PlistCodec, ProcessOutput,
    ProfileTools, Stage, StaticTrustStore, ValidationFailure, WorkingDir,
};
use tempfile::TempDir;

/// Encryptor that tags the payload instead of sealing it.
struct TaggingEncryptor;

impl Encryptor for TaggingEncryptor {
    fn encrypt(&self, certificate: &[u8], payload: &[u8]) -> io::Result<Vec<u8>> {
        let mut sealed = certificate.to_vec();
        sealed.extend_from_slice(payload);
        Ok(sealed)
    }
}

struct FailingEncryptor;

impl Encryptor for FailingEncryptor {
    fn encrypt(&self, _certificate: &[u8], _payload: &[u8]) -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::Other, "recipient rejected"))
    }
}

struct Harness {
    _temp: TempDir,
    workdir: WorkingDir,
    runner: MockRunner,
    trust: StaticTrustStore,
    tools: ProfileTools,
}

impl Harness {
    fn new(runner: MockRunner) -> Self {
        let temp = TempDir::new().unwrap();
        let workdir = WorkingDir::acquire(temp.path().join("mobileconfigs")).unwrap();
        Self {
            _temp: temp,
            workdir,
            runner,
            trust: StaticTrustStore::new().with_certificate("Device", "-----BEGIN CERTIFICATE-----"),
            tools: ProfileTools::default(),
        }
    }

    fn pipeline<'a>(&'a self, encryptor: &'a dyn Encryptor) -> Pipeline<'a> {
        Pipeline::new(
            &self.workdir,
            &self.runner,
            &self.trust,
            encryptor,
            &PlistCodec,
            &self.tools,
        )
    }

    fn installs(&self) -> Vec<Vec<String>> {
        self.runner.calls_to("/usr/bin/profiles", "install")
    }
}

fn record(name: &str, identifier: &str) -> DesiredRecord {
    let doc = ProfileDocument::from_value(dict! {
        "PayloadIdentifier" => identifier,
        "PayloadType" => "Configuration",
        "PayloadContent" => vec![dict! { "a" => 1i64 }, dict! { "b" => 2i64 }],
    })
    .unwrap();
    DesiredRecord::new(name, Some(doc)).normalize(&Normalizer::default())
}

fn desired(records: Vec<DesiredRecord>) -> BTreeMap<String, DesiredRecord> {
    records.into_iter().map(|r| (r.name.clone(), r)).collect()
}

#[test]
fn create_without_certificate_installs_plain_artifact() {
    let harness = Harness::new(MockRunner::new());
    let actions = plan(&desired(vec![record("y", "y")]), &BTreeMap::new());
    assert!(matches!(actions[0], Action::Create(_)));

    let report = harness.pipeline(&TaggingEncryptor).apply(&actions);
    assert!(report.is_success());

    assert_eq!(harness.workdir.present("y"), vec![ArtifactVariant::Plain]);
    let plain = harness.workdir.path_for("y", ArtifactVariant::Plain);
    assert_eq!(plain.file_name().unwrap(), "y.plain");
    let installs = harness.installs();
    assert_eq!(installs.len(), 1);
    assert_eq!(installs[0].last().unwrap(), plain.to_str().unwrap());
}

#[test]
fn plain_artifact_decodes_to_the_normalized_document() {
    let harness = Harness::new(MockRunner::new());
    let wanted = record("y", "y");
    let expected = wanted.document.clone().unwrap().into_value();
    harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![wanted]), &BTreeMap::new()));

    let bytes = std::fs::read(harness.workdir.path_for("y", ArtifactVariant::Plain)).unwrap();
    assert_eq!(PlistCodec.decode(&bytes).unwrap(), expected);
}

#[test]
fn name_mismatch_touches_nothing() {
    let harness = Harness::new(MockRunner::new());
    let actions = plan(&desired(vec![record("p", "q")]), &BTreeMap::new());

    let report = harness.pipeline(&TaggingEncryptor).apply(&actions);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "p");
    assert!(matches!(
        failures[0].1,
        ApplyError::Validation(ValidationFailure::NameMismatch { .. })
    ));
    assert_eq!(std::fs::read_dir(harness.workdir.root()).unwrap().count(), 0);
    assert!(harness.runner.executed_commands().is_empty());
}

#[test]
fn encrypted_create_leaves_only_the_encrypted_signed_artifact() {
    let harness = Harness::new(MockRunner::new().writing_outputs());
    let wanted = record("e", "e").with_certificate("Device").with_encryption(true);
    let actions = plan(&desired(vec![wanted]), &BTreeMap::new());

    let report = harness.pipeline(&TaggingEncryptor).apply(&actions);
    assert!(report.is_success(), "{:?}", report);

    assert_eq!(harness.workdir.present("e"), vec![ArtifactVariant::EncryptedSigned]);
    let final_path = harness.workdir.path_for("e", ArtifactVariant::EncryptedSigned);
    let installs = harness.installs();
    assert_eq!(installs.len(), 1);
    assert_eq!(installs[0].last().unwrap(), final_path.to_str().unwrap());

    let signed_input = PlistCodec
        .decode(&std::fs::read(&final_path).unwrap())
        .unwrap();
    assert!(signed_input.get("PayloadContent").is_none());
    assert!(matches!(
        signed_input.get("EncryptedPayloadContent"),
        Some(Value::Data(bytes)) if bytes.starts_with(b"-----BEGIN CERTIFICATE-----")
    ));
}

#[test]
fn signed_create_replaces_the_plain_artifact() {
    let harness = Harness::new(MockRunner::new().writing_outputs());
    let wanted = record("s", "s").with_certificate("Device");
    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![wanted]), &BTreeMap::new()));

    assert!(report.is_success());
    assert_eq!(harness.workdir.present("s"), vec![ArtifactVariant::Signed]);
    assert_eq!(harness.runner.calls_to("/usr/bin/security", "cms").len(), 1);
}

#[test]
fn unknown_certificate_fails_before_writing() {
    let harness = Harness::new(MockRunner::new());
    let wanted = record("e", "e").with_certificate("Nobody").with_encryption(true);
    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![wanted]), &BTreeMap::new()));

    let (_, err) = report.failures().next().unwrap();
    assert_eq!(
        err,
        &ApplyError::CertificateNotFound {
            label: "Nobody".into()
        }
    );
    assert_eq!(err.stage(), Stage::LookupCertificate);
    assert!(harness.workdir.present("e").is_empty());
    assert!(harness.installs().is_empty());
}

#[test]
fn unknown_signing_certificate_fails_before_writing() {
    let harness = Harness::new(MockRunner::new().writing_outputs());
    let wanted = record("s", "s").with_certificate("Nobody");
    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![wanted]), &BTreeMap::new()));

    let (_, err) = report.failures().next().unwrap();
    assert_eq!(
        err,
        &ApplyError::CertificateNotFound {
            label: "Nobody".into()
        }
    );
    assert_eq!(err.stage(), Stage::LookupCertificate);
    assert!(harness.workdir.present("s").is_empty());
    assert!(harness.runner.executed_commands().is_empty());
}

#[test]
fn encryption_failure_keeps_plain_artifact_and_skips_install() {
    let harness = Harness::new(MockRunner::new());
    let wanted = record("e", "e").with_certificate("Device").with_encryption(true);
    let report = harness
        .pipeline(&FailingEncryptor)
        .apply(&plan(&desired(vec![wanted]), &BTreeMap::new()));

    let (_, err) = report.failures().next().unwrap();
    assert_eq!(err.stage(), Stage::Encrypt);
    assert!(err.to_string().contains("recipient rejected"));
    assert_eq!(harness.workdir.present("e"), vec![ArtifactVariant::Plain]);
    assert!(harness.runner.executed_commands().is_empty());
}

#[test]
fn signing_failure_stops_before_install() {
    let harness = Harness::new(MockRunner::with_responses(vec![ProcessOutput::failed(
        1,
        "no identity found",
    )]));
    let wanted = record("s", "s").with_certificate("Device");
    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![wanted]), &BTreeMap::new()));

    let (name, err) = report.failures().next().unwrap();
    assert_eq!(name, "s");
    assert_eq!(err.stage(), Stage::Sign);
    assert!(err.to_string().contains("no identity found"));
    assert_eq!(harness.workdir.present("s"), vec![ArtifactVariant::Plain]);
    assert!(harness.installs().is_empty());
}

#[test]
fn signing_without_output_is_a_failure() {
    let harness = Harness::new(MockRunner::new());
    let wanted = record("s", "s").with_certificate("Device");
    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![wanted]), &BTreeMap::new()));

    let (_, err) = report.failures().next().unwrap();
    assert_eq!(err.stage(), Stage::Sign);
    assert!(harness.installs().is_empty());
}

#[test]
fn file_mode_never_invokes_the_installer() {
    let harness = Harness::new(MockRunner::new());
    let wanted = record("f", "f").with_mode(Mode::File);
    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![wanted]), &BTreeMap::new()));

    assert!(matches!(
        report.outcomes[0].result,
        Ok(Applied::Written { ref artifact }) if artifact.variant == ArtifactVariant::Plain
    ));
    assert!(harness.runner.executed_commands().is_empty());
}

#[test]
fn installer_failure_is_reported_with_output() {
    let harness = Harness::new(MockRunner::with_responses(vec![ProcessOutput::failed(
        5,
        "profile is malformed",
    )]));
    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![record("y", "y")]), &BTreeMap::new()));

    let (_, err) = report.failures().next().unwrap();
    assert_eq!(err.stage(), Stage::Install);
    assert_eq!(
        err.to_string(),
        "install failed: exit status 5: profile is malformed"
    );
}

#[test]
fn delete_removes_every_variant_and_uninstalls() {
    let harness = Harness::new(MockRunner::new());
    harness
        .workdir
        .write("d", ArtifactVariant::Signed, b"old")
        .unwrap();
    let current = index_current(vec![CurrentRecord {
        name: "d".into(),
        identity: Identity::parse("com.example.d"),
        raw: ProfileDocument::default(),
    }]);

    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&BTreeMap::new(), &current));

    assert_eq!(
        report.outcomes[0].result,
        Ok(Applied::Removed {
            artifacts: vec![ArtifactVariant::Signed]
        })
    );
    assert!(harness.workdir.present("d").is_empty());
    let removes = harness.runner.calls_to("/usr/bin/profiles", "remove");
    assert_eq!(removes.len(), 1);
    assert_eq!(removes[0].last().unwrap(), "d");
}

#[test]
fn delete_without_artifacts_still_uninstalls() {
    let harness = Harness::new(MockRunner::new());
    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&[Action::Delete { name: "d".into() }]);
    assert!(report.is_success());
    assert_eq!(harness.runner.calls_to("/usr/bin/profiles", "remove").len(), 1);
}

#[test]
fn one_failure_does_not_stop_the_pass() {
    let harness = Harness::new(MockRunner::new());
    let actions = plan(
        &desired(vec![record("a.bad", "wrong"), record("b.good", "b.good")]),
        &BTreeMap::new(),
    );

    let report = harness.pipeline(&TaggingEncryptor).apply(&actions);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.failures().count(), 1);
    assert!(report.outcomes[1].result.is_ok());
    assert_eq!(harness.installs().len(), 1);
}

#[test]
fn stopping_skips_unstarted_actions() {
    let harness = Harness::new(MockRunner::new());
    let actions = plan(
        &desired(vec![record("a.a.a", "a.a.a"), record("b.b.b", "b.b.b")]),
        &BTreeMap::new(),
    );

    let mut started = 0;
    let report = harness.pipeline(&TaggingEncryptor).apply_until(&actions, || {
        started += 1;
        started > 1
    });
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.skipped, vec!["b.b.b".to_string()]);
    assert!(!report.is_success());
}

#[test]
fn matching_identity_is_a_no_op() {
    let harness = Harness::new(MockRunner::new());
    let wanted = record("n", "n");
    let current = index_current(vec![CurrentRecord {
        name: "n".into(),
        identity: Identity::parse(&wanted.identity.as_ref().unwrap().to_string().to_lowercase()),
        raw: ProfileDocument::default(),
    }]);

    let actions = plan(&desired(vec![wanted]), &current);
    assert_eq!(actions, vec![Action::NoOp { name: "n".into() }]);
    let report = harness.pipeline(&TaggingEncryptor).apply(&actions);
    assert_eq!(report.outcomes[0].result, Ok(Applied::Unchanged));
    assert!(harness.runner.executed_commands().is_empty());
}

#[test]
fn reapplying_overwrites_the_same_artifact() {
    let harness = Harness::new(MockRunner::new());
    let actions = plan(&desired(vec![record("y", "y")]), &BTreeMap::new());
    harness.pipeline(&TaggingEncryptor).apply(&actions);
    harness.pipeline(&TaggingEncryptor).apply(&actions);
    assert_eq!(harness.workdir.present("y"), vec![ArtifactVariant::Plain]);
    assert_eq!(harness.installs().len(), 2);
}

#[test]
fn reapplying_with_different_settings_keeps_one_artifact() {
    let harness = Harness::new(MockRunner::new().writing_outputs());
    let sealed = record("z", "z").with_certificate("Device").with_encryption(true);
    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![sealed]), &BTreeMap::new()));
    assert!(report.is_success(), "{:?}", report);
    assert_eq!(harness.workdir.present("z"), vec![ArtifactVariant::EncryptedSigned]);

    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![record("z", "z")]), &BTreeMap::new()));
    assert!(report.is_success(), "{:?}", report);
    assert_eq!(harness.workdir.present("z"), vec![ArtifactVariant::Plain]);

    let installs = harness.installs();
    assert_eq!(installs.len(), 2);
    let plain = harness.workdir.path_for("z", ArtifactVariant::Plain);
    assert_eq!(installs[1].last().unwrap(), plain.to_str().unwrap());
}

#[test]
fn leftover_signed_artifact_does_not_pass_for_new_output() {
    let harness = Harness::new(MockRunner::new());
    harness
        .workdir
        .write("s", ArtifactVariant::Signed, b"from an earlier run")
        .unwrap();

    let wanted = record("s", "s").with_certificate("Device");
    let report = harness
        .pipeline(&TaggingEncryptor)
        .apply(&plan(&desired(vec![wanted]), &BTreeMap::new()));

    let (_, err) = report.failures().next().unwrap();
    assert_eq!(err.stage(), Stage::Sign);
    assert!(!harness.workdir.exists("s", ArtifactVariant::Signed));
    assert!(harness.installs().is_empty());
}

#[test]
fn names_that_leave_the_working_directory_are_refused() {
    let harness = Harness::new(MockRunner::new());
    let outcome = harness.pipeline(&TaggingEncryptor).apply_action(&Action::Delete {
        name: "../escape".into(),
    });

    let err = outcome.result.unwrap_err();
    assert_eq!(err.stage(), Stage::RemoveArtifacts);
    assert!(harness.runner.executed_commands().is_empty());
}
