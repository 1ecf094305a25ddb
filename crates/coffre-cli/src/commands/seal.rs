//! `coffre seal` — author an encrypted manifest from a directory.

use std::path::Path;

use anyhow::{Context, Result};
use zeroize::Zeroize;

use coffre_vault::seal_directory;

use crate::input::prompt_new_passphrase;

pub fn run(input: &Path, output: &Path) -> Result<()> {
    let mut passphrase = prompt_new_passphrase()?;

    let result = seal_directory(passphrase.as_bytes(), input);
    passphrase.zeroize();
    let manifest = result.with_context(|| format!("sealing {}", input.display()))?;

    let json = manifest.to_json().context("serializing manifest")?;
    std::fs::write(output, &json).with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Sealed {} document(s) into {}",
        manifest.files.len(),
        output.display()
    );
    Ok(())
}
