//! Normalize command implementation.

use std::io::Write;
use std::path::PathBuf;

use macprofile_canonical::{Identity, Normalizer};
use macprofile_reconcile::{Codec, PlistCodec};

use crate::config::read_document;

pub fn run(file: PathBuf, uuid: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let document = read_document(&file)?;
    let desired = uuid.as_deref().map(Identity::parse);

    let normalized = Normalizer::default().normalize(&document, desired.as_ref());
    let bytes = PlistCodec
        .encode(&normalized.into_value())
        .map_err(|e| format!("Failed to encode document: {}", e))?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&bytes)?;
    stdout.write_all(b"\n")?;
    Ok(())
}
