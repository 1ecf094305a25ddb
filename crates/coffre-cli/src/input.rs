//! Passphrase prompts — hidden input, zeroized after use.

use anyhow::{Context, Result};
use dialoguer::Password;
use zeroize::Zeroize;

use coffre_vault::VaultError;

/// Prompt for the vault passphrase and run `attempt` with it.
///
/// The passphrase buffer is zeroized as soon as the attempt returns.
/// Unlock failures surface as the generic user-facing message, never the
/// internal error detail.
pub fn with_passphrase<F>(attempt: F) -> Result<()>
where
    F: FnOnce(&str) -> std::result::Result<(), VaultError>,
{
    let mut passphrase = Password::new()
        .with_prompt("Vault passphrase")
        .interact()
        .context("failed to read passphrase")?;

    let outcome = attempt(&passphrase);
    passphrase.zeroize();

    outcome.map_err(|err| anyhow::anyhow!(err.user_message()))
}

/// Prompt for a new passphrase with confirmation (authoring).
///
/// The caller owns the returned `String` and must zeroize it when done.
pub fn prompt_new_passphrase() -> Result<String> {
    Password::new()
        .with_prompt("Vault passphrase")
        .with_confirmation("Confirm passphrase", "Passphrases do not match")
        .interact()
        .context("failed to read passphrase")
}
