//! Subcommand implementations.

pub mod open;
pub mod seal;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};

use coffre_vault::Manifest;

/// Read and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Manifest::from_json(&json).with_context(|| format!("parsing {}", path.display()))
}
