//! Non-sensitive preferences — stored as plain JSON outside the vault.
//!
//! Readable before unlock so the auto-lock timeout and panic hotkey can
//! be applied from the first frame. Nothing here is secret; nothing
//! secret may ever be added here.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Lower/upper bounds for the auto-lock timeout (minutes).
const TIMEOUT_MIN_MINUTES: u32 = 1;
const TIMEOUT_MAX_MINUTES: u32 = 60;

/// Application preferences.
///
/// Persisted to `{data_dir}/preferences.json`; all fields have defaults
/// so a missing or corrupt file degrades to stock behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Minutes of inactivity before the session auto-wipes (1–60).
    #[serde(default = "default_auto_lock_timeout")]
    pub auto_lock_timeout_minutes: u32,

    /// Key combination that triggers an immediate wipe. The embedder must
    /// register this ahead of its normal input handling.
    #[serde(default = "default_panic_hotkey")]
    pub panic_hotkey: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_lock_timeout_minutes: default_auto_lock_timeout(),
            panic_hotkey: default_panic_hotkey(),
        }
    }
}

const fn default_auto_lock_timeout() -> u32 {
    15
}
fn default_panic_hotkey() -> String {
    "CmdOrCtrl+Shift+L".into()
}

// ── File I/O ───────────────────────────────────────────────────────

const PREFERENCES_FILE: &str = "preferences.json";

impl Preferences {
    /// The timeout clamped into its valid range, for timer construction.
    #[must_use]
    pub fn clamped_timeout_minutes(&self) -> u32 {
        self.auto_lock_timeout_minutes
            .clamp(TIMEOUT_MIN_MINUTES, TIMEOUT_MAX_MINUTES)
    }

    /// Load preferences from `{data_dir}/preferences.json`.
    ///
    /// Returns [`Default::default()`] when the file is missing or contains
    /// invalid JSON (corrupt-file recovery).
    #[must_use]
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(PREFERENCES_FILE);
        fs::read_to_string(&path).map_or_else(
            |_| Self::default(),
            |contents| serde_json::from_str(&contents).unwrap_or_default(),
        )
    }

    /// Persist preferences to `{data_dir}/preferences.json`.
    ///
    /// Writes to a temp file then renames, so a crash mid-write cannot
    /// leave a truncated file behind.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the directory does not exist or the
    /// filesystem rejects the write/rename.
    pub fn save(&self, data_dir: &Path) -> std::io::Result<()> {
        let path = data_dir.join(PREFERENCES_FILE);
        let tmp = data_dir.join(".preferences.json.tmp");

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(&tmp, &json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, &path)?;

        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
