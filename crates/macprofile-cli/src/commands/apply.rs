//! Apply command implementation.

use std::path::PathBuf;

use macprofile_reconcile::{
    CmsEncryptor, KeychainTrustStore, Pipeline, PlistCodec, SystemRunner, WorkingDir,
};
use serde_json::Value;
use tracing::info;

use crate::commands::{load_manifest, plan};
use crate::output;

pub fn run(config: Option<PathBuf>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = load_manifest(config)?;
    let normalizer = manifest.normalizer()?;
    let runner = SystemRunner;
    let actions = plan::compute(&manifest, &normalizer, &runner)?;

    let workdir = WorkingDir::acquire(manifest.working_dir()).map_err(|e| {
        format!(
            "Failed to prepare working directory {}: {}",
            manifest.working_dir().display(),
            e
        )
    })?;
    let trust = KeychainTrustStore::new(&runner, &manifest.tools);
    let encryptor = CmsEncryptor::new(&runner, &manifest.tools, workdir.root());
    let pipeline = Pipeline::new(
        &workdir,
        &runner,
        &trust,
        &encryptor,
        &PlistCodec,
        &manifest.tools,
    );

    let changes = actions.iter().filter(|action| action.is_change()).count();
    info!(actions = actions.len(), changes, "applying");
    let report = pipeline.apply(&actions);

    if json {
        let rows: Vec<Value> = report.outcomes.iter().map(output::outcome_json).collect();
        println!("{}", output::format_json(&Value::Array(rows)));
    } else {
        output::print_outcome_header();
        for outcome in &report.outcomes {
            println!("{}", output::format_outcome_row(outcome));
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        return Err(format!("{} of {} profile(s) failed", failed, report.outcomes.len()).into());
    }
    Ok(())
}
