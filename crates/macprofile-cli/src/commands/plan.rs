//! Plan command implementation.

use std::path::PathBuf;

use macprofile_canonical::Normalizer;
use macprofile_reconcile::{
    index_current, plan, Action, PlistCodec, ProcessRunner, ProfilesCommandSource, StateSource,
    SystemRunner,
};
use serde_json::Value;
use tracing::debug;

use crate::commands::load_manifest;
use crate::config::Manifest;
use crate::output;

/// Desired records from `manifest` against the live system, decided.
pub fn compute(
    manifest: &Manifest,
    normalizer: &Normalizer,
    runner: &dyn ProcessRunner,
) -> Result<Vec<Action>, Box<dyn std::error::Error>> {
    let desired = manifest.desired_records(normalizer)?;
    let current = ProfilesCommandSource::new(runner, &manifest.tools, &PlistCodec)
        .list_current_profiles()
        .map_err(|e| format!("Failed to read installed profiles: {}", e))?;
    debug!(desired = desired.len(), installed = current.len(), "planning");

    let current = index_current(manifest.managed(current));
    Ok(plan(&desired, &current))
}

pub fn run(config: Option<PathBuf>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = load_manifest(config)?;
    let normalizer = manifest.normalizer()?;
    let actions = compute(&manifest, &normalizer, &SystemRunner)?;

    if json {
        let rows: Vec<Value> = actions
            .iter()
            .map(|action| output::action_json(action, normalizer.format()))
            .collect();
        println!("{}", output::format_json(&Value::Array(rows)));
    } else {
        output::print_action_header();
        for action in &actions {
            println!("{}", output::format_action_row(action, normalizer.format()));
        }
    }
    Ok(())
}
