//! Digest command implementation.

use std::path::PathBuf;

use macprofile_canonical::{Normalizer, PatternFormat};

use crate::config::read_document;

pub fn run(file: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let document = read_document(&file)?;
    let normalizer = Normalizer::default();

    let identity = normalizer
        .normalize(&document, None)
        .identity()
        .ok_or("document has no identity after normalization")?;
    println!("{}", identity.render(&PatternFormat::uuid_upper()));
    Ok(())
}
