//! Offline authoring — seal a directory of documents into a manifest.
//!
//! This is the one-time tool that produces the encrypted manifest the
//! runtime consumes. It uses the exact same primitives as unlock (same
//! derivation, same cipher, same digest) — the algorithm is specified
//! once, not twice.
//!
//! Input documents are UTF-8 text, each optionally beginning with a
//! delimited metadata block:
//!
//! ```text
//! ---
//! title: Incident Response
//! priority: critical
//! tags: [runbook, oncall]
//! ---
//! body text to encrypt…
//! ```
//!
//! Missing `title` defaults to the file stem; `priority` is validated
//! leniently (unknown values become `normal`); body text after the block
//! is the content that gets encrypted.

use crate::error::VaultError;
use crate::manifest::{DocumentRecord, Manifest, Priority};
use coffre_crypto_core::integrity;
use coffre_crypto_core::kdf::{self, SALT_LEN};
use coffre_crypto_core::memory::fill_random;
use coffre_crypto_core::symmetric::{self, NONCE_LEN};
use data_encoding::{BASE64, HEXLOWER};
use std::collections::HashSet;
use std::path::Path;
use zeroize::Zeroize;

/// Input file extensions the authoring tool picks up.
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Front-matter delimiter line.
const FRONT_MATTER_DELIMITER: &str = "---";

// ---------------------------------------------------------------------------
// Parsed input
// ---------------------------------------------------------------------------

/// One authoring input document after front-matter extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoredDocument {
    /// Title from front matter, or the file stem.
    pub title: String,
    /// Priority from front matter, `Normal` when absent or unrecognized.
    pub priority: Priority,
    /// Tags from front matter.
    pub tags: Vec<String>,
    /// The body to encrypt.
    pub body: String,
}

/// Parse one input document, splitting off the optional metadata block.
///
/// `fallback_title` (normally the file stem) is used when the block has
/// no `title` key or there is no block at all. A malformed block (no
/// closing delimiter) is treated as body text, not an error — the
/// authoring tool forgives what it can.
#[must_use]
pub fn parse_document(fallback_title: &str, content: &str) -> AuthoredDocument {
    let mut doc = AuthoredDocument {
        title: fallback_title.to_string(),
        priority: Priority::Normal,
        tags: Vec::new(),
        body: content.trim().to_string(),
    };

    let trimmed = content.trim_start();
    let Some(after_open) = trimmed.strip_prefix(FRONT_MATTER_DELIMITER) else {
        return doc;
    };
    let Some(close) = after_open.find("\n---") else {
        return doc;
    };

    let block = &after_open[..close];
    // Body starts after the closing delimiter's line.
    let rest = &after_open[close.saturating_add(4)..];
    doc.body = rest.trim().to_string();

    for line in block.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "title" if !value.is_empty() => doc.title = value.to_string(),
            "priority" => doc.priority = Priority::parse_lenient(value),
            "tags" => doc.tags = parse_tag_list(value),
            _ => {}
        }
    }

    doc
}

/// Parse a bracketed comma list: `[runbook, oncall]` → `["runbook", "oncall"]`.
fn parse_tag_list(value: &str) -> Vec<String> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Sealing
// ---------------------------------------------------------------------------

/// Seal parsed documents into a manifest under `passphrase`.
///
/// Ceremony:
/// 1. Generate a random 16-byte salt
/// 2. Derive the encryption + integrity keys
/// 3. Encrypt each body under a fresh random nonce, refusing duplicates
/// 4. Sign the canonical serialization of the ordered document list
///
/// # Errors
///
/// - [`VaultError::DuplicateNonce`] if the CSPRNG ever hands out the same
///   nonce twice — emitting that manifest would break confidentiality
/// - [`VaultError::Crypto`] if derivation or encryption fails
pub fn seal_documents(
    passphrase: &[u8],
    documents: &[AuthoredDocument],
) -> Result<Manifest, VaultError> {
    let mut salt = [0u8; SALT_LEN];
    fill_random(&mut salt);

    let keys = kdf::derive_keys(passphrase, &salt)?;

    let mut seen_nonces: HashSet<[u8; NONCE_LEN]> = HashSet::with_capacity(documents.len());
    let mut files = Vec::with_capacity(documents.len());
    for doc in documents {
        let sealed = symmetric::encrypt(doc.body.as_bytes(), &keys.encryption)?;
        if !seen_nonces.insert(sealed.nonce) {
            return Err(VaultError::DuplicateNonce);
        }
        files.push(DocumentRecord {
            id: generate_document_id(),
            title: doc.title.clone(),
            priority: doc.priority,
            tags: doc.tags.clone(),
            iv: HEXLOWER.encode(&sealed.nonce),
            data: BASE64.encode(&sealed.data),
        });
    }

    let mut manifest = Manifest {
        salt: HEXLOWER.encode(&salt),
        hmac: None,
        generated_at: now_iso8601(),
        files,
    };

    let canonical = manifest.canonical_files_bytes()?;
    let digest = integrity::sign(&keys.integrity, &canonical);
    manifest.hmac = Some(HEXLOWER.encode(&digest));

    Ok(manifest)
}

/// Seal every document file in `dir` (sorted by file name) into a manifest.
///
/// Files are matched by extension (`.md`, `.markdown`, `.txt`);
/// subdirectories are not descended into.
///
/// # Errors
///
/// - [`VaultError::Authoring`] if the directory yields no documents or a
///   file is not valid UTF-8
/// - [`VaultError::Io`] on filesystem failures
/// - Plus everything [`seal_documents`] returns
pub fn seal_directory(passphrase: &[u8], dir: &Path) -> Result<Manifest, VaultError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext));
        if path.is_file() && matches {
            paths.push(path);
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(VaultError::Authoring(format!(
            "no documents found in {}",
            dir.display()
        )));
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in &paths {
        let mut content = std::fs::read_to_string(path).map_err(|e| {
            VaultError::Authoring(format!("cannot read {}: {e}", path.display()))
        })?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled");
        documents.push(parse_document(stem, &content));
        content.zeroize();
    }

    // Zeroize plaintext bodies on ALL paths (success and failure).
    let result = seal_documents(passphrase, &documents);
    for doc in &mut documents {
        doc.body.zeroize();
    }
    result
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate a UUIDv4-style document id from the OS CSPRNG.
fn generate_document_id() -> String {
    let mut bytes = [0u8; 16];
    fill_random(&mut bytes);

    // Set version (4) and variant (RFC 4122).
    bytes[6] = (bytes[6] & 0x0F) | 0x40;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        bytes[6], bytes[7],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    )
}

/// Return the current UTC time as an ISO 8601 string.
///
/// Uses `std::time::SystemTime` to avoid pulling in `chrono`.
fn now_iso8601() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let (year, month, day, hour, minute, second) = epoch_to_utc(duration.as_secs());
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

/// Convert epoch seconds to (year, month, day, hour, minute, second) in UTC.
///
/// Civil calendar computation (valid for years 1970–9999), adapted from
/// Howard Hinnant's `civil_from_days`.
#[allow(clippy::arithmetic_side_effects)]
const fn epoch_to_utc(epoch_secs: u64) -> (u64, u64, u64, u64, u64, u64) {
    let secs_per_day: u64 = 86_400;
    let total_days = epoch_secs / secs_per_day;
    let remaining_secs = epoch_secs % secs_per_day;

    let hour = remaining_secs / 3600;
    let minute = (remaining_secs % 3600) / 60;
    let second = remaining_secs % 60;

    let z = total_days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };

    (year, m, d, hour, minute, second)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_document_with_full_front_matter() {
        let content = "---\ntitle: Incident Response\npriority: critical\ntags: [runbook, oncall]\n---\n# Steps\n\nCall the on-call first.";
        let doc = parse_document("incident", content);
        assert_eq!(doc.title, "Incident Response");
        assert_eq!(doc.priority, Priority::Critical);
        assert_eq!(doc.tags, vec!["runbook", "oncall"]);
        assert_eq!(doc.body, "# Steps\n\nCall the on-call first.");
    }

    #[test]
    fn parse_document_without_front_matter() {
        let doc = parse_document("notes", "just a body\nwith two lines");
        assert_eq!(doc.title, "notes");
        assert_eq!(doc.priority, Priority::Normal);
        assert!(doc.tags.is_empty());
        assert_eq!(doc.body, "just a body\nwith two lines");
    }

    #[test]
    fn missing_title_falls_back_to_file_stem() {
        let content = "---\npriority: high\n---\nbody";
        let doc = parse_document("passwords", content);
        assert_eq!(doc.title, "passwords");
        assert_eq!(doc.priority, Priority::High);
    }

    #[test]
    fn invalid_priority_defaults_to_normal() {
        let content = "---\npriority: asap\n---\nbody";
        let doc = parse_document("x", content);
        assert_eq!(doc.priority, Priority::Normal);
    }

    #[test]
    fn unclosed_front_matter_is_treated_as_body() {
        let content = "---\ntitle: broken\nno closing delimiter";
        let doc = parse_document("fallback", content);
        assert_eq!(doc.title, "fallback");
        assert_eq!(doc.body, content);
    }

    #[test]
    fn tag_list_parsing_handles_spacing_and_empties() {
        assert_eq!(parse_tag_list("[a, b,c ]"), vec!["a", "b", "c"]);
        assert_eq!(parse_tag_list("[]"), Vec::<String>::new());
        assert_eq!(parse_tag_list("[ ]"), Vec::<String>::new());
    }

    #[test]
    fn generated_ids_are_uuid_shaped_and_unique() {
        let a = generate_document_id();
        let b = generate_document_id();
        assert_eq!(a.len(), 36);
        assert_eq!(a.chars().filter(|&c| c == '-').count(), 4);
        assert_ne!(a, b);
    }

    #[test]
    fn now_iso8601_is_well_formed() {
        let ts = now_iso8601();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], "T");
    }

    #[test]
    fn epoch_to_utc_known_values() {
        // 2026-08-04T00:00:00Z
        assert_eq!(epoch_to_utc(1_785_801_600), (2026, 8, 4, 0, 0, 0));
        // Epoch itself.
        assert_eq!(epoch_to_utc(0), (1970, 1, 1, 0, 0, 0));
    }
}
