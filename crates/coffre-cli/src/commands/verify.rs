//! `coffre verify` — schema validation plus a passphrase/integrity check.

use std::path::Path;

use anyhow::{Context, Result};

use coffre_vault::SessionStore;

use crate::commands::load_manifest;
use crate::input::with_passphrase;

pub fn run(manifest_path: &Path) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    manifest.validate().context("manifest schema")?;

    if manifest.hmac.is_none() {
        println!("Warning: this manifest carries no integrity digest (reduced trust).");
    }

    let mut store = SessionStore::new(manifest);
    with_passphrase(|passphrase| store.unlock(passphrase))?;

    if store.verified_integrity() {
        println!(
            "Integrity verified: {} document(s) decrypt cleanly.",
            store.documents().len()
        );
    } else {
        println!(
            "Passphrase accepted: {} document(s) decrypt cleanly (no digest to verify).",
            store.documents().len()
        );
    }

    store.wipe();
    Ok(())
}
