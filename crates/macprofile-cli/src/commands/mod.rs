//! Subcommand implementations.

pub mod apply;
pub mod digest;
pub mod normalize;
pub mod plan;

use std::path::PathBuf;

use crate::config::Manifest;

/// Loads the manifest named by `--config` / `MACPROFILE_CONFIG`.
pub fn load_manifest(config: Option<PathBuf>) -> Result<Manifest, Box<dyn std::error::Error>> {
    let path = config.ok_or("no manifest given; pass --config or set MACPROFILE_CONFIG")?;
    Ok(Manifest::load(&path)?)
}
