//! Vault manifest — the persisted, read-only description of the encrypted
//! document collection.
//!
//! The manifest is authored once by the offline `seal` tool and consumed
//! read-only at runtime:
//!
//! ```json
//! {
//!   "salt": "<hex, 16 bytes>",
//!   "hmac": "<hex, 32 bytes — optional for pre-digest manifests>",
//!   "generatedAt": "2026-08-04T12:00:00Z",
//!   "files": [ { "id", "title", "priority", "tags", "iv", "data" } ]
//! }
//! ```
//!
//! `files` order is significant: the integrity digest covers the canonical
//! serialization of the ordered list, so re-serializing a parsed manifest
//! must be byte-identical to what the authoring tool signed. Field order is
//! pinned by the struct definitions below — do not reorder fields.
//!
//! Every encoded field is validated here, before any key derivation or
//! decryption is attempted; bad encodings surface as
//! [`VaultError::MalformedManifest`].

use crate::error::VaultError;
use coffre_crypto_core::integrity::DIGEST_LEN;
use coffre_crypto_core::kdf::SALT_LEN;
use coffre_crypto_core::symmetric::{NONCE_LEN, TAG_LEN};
use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Document priority — cleartext metadata, sortable without unlocking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Read-first documents (incident runbooks, emergency contacts).
    Critical,
    /// Important but not read-first.
    High,
    /// Everything else.
    #[default]
    Normal,
    /// Reference material.
    Low,
}

impl Priority {
    /// The manifest string for this priority.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    /// Parse an authoring-time priority value, defaulting to `Normal` on
    /// anything unrecognized (per the authoring contract — invalid values
    /// are forgiven at authoring time, not at runtime).
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Normal,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One encrypted document as it appears in the manifest.
///
/// `id`, `title`, `priority`, and `tags` are cleartext metadata —
/// searchable and sortable without unlocking. Only `data` is ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Opaque unique identifier, generated at authoring time.
    pub id: String,
    /// Cleartext document title.
    pub title: String,
    /// Priority bucket (defaults to `normal` when absent).
    #[serde(default)]
    pub priority: Priority,
    /// Cleartext tag set.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Hex-encoded 12-byte nonce, unique per document.
    pub iv: String,
    /// Base64-encoded `ciphertext || tag`.
    pub data: String,
}

impl DocumentRecord {
    /// Decode the `iv` field.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MalformedManifest`] on bad hex or wrong length.
    pub fn decode_iv(&self) -> Result<[u8; NONCE_LEN], VaultError> {
        let bytes = HEXLOWER_PERMISSIVE.decode(self.iv.as_bytes()).map_err(|e| {
            VaultError::MalformedManifest(format!("document {}: invalid iv hex: {e}", self.id))
        })?;
        <[u8; NONCE_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
            VaultError::MalformedManifest(format!(
                "document {}: iv is {} bytes (expected {NONCE_LEN})",
                self.id,
                bytes.len()
            ))
        })
    }

    /// Decode the `data` field.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MalformedManifest`] on bad Base64 or if the
    /// payload is too short to even contain the authentication tag.
    pub fn decode_data(&self) -> Result<Vec<u8>, VaultError> {
        let bytes = BASE64.decode(self.data.as_bytes()).map_err(|e| {
            VaultError::MalformedManifest(format!("document {}: invalid data Base64: {e}", self.id))
        })?;
        if bytes.len() < TAG_LEN {
            return Err(VaultError::MalformedManifest(format!(
                "document {}: data is {} bytes (minimum {TAG_LEN})",
                self.id,
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// The vault manifest — salt, integrity digest, and ordered document list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Hex-encoded 16-byte salt, shared by both key derivations.
    pub salt: String,
    /// Hex-encoded HMAC-SHA256 over the canonical `files` serialization.
    /// Absent on manifests authored before the digest was introduced —
    /// a reduced-trust path, not equivalent to a verified manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmac: Option<String>,
    /// Authoring timestamp (ISO 8601), informational only.
    pub generated_at: String,
    /// Ordered encrypted documents. Order is covered by the digest.
    pub files: Vec<DocumentRecord>,
}

impl Manifest {
    /// Parse a manifest from its JSON source.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MalformedManifest`] if the JSON does not match
    /// the schema. Field *encodings* are validated separately by
    /// [`Manifest::validate`].
    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        serde_json::from_str(json)
            .map_err(|e| VaultError::MalformedManifest(format!("invalid manifest JSON: {e}")))
    }

    /// Serialize the manifest to pretty JSON (authoring output).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MalformedManifest`] if serialization fails.
    pub fn to_json(&self) -> Result<String, VaultError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| VaultError::MalformedManifest(format!("manifest serialization: {e}")))
    }

    /// Decode the `salt` field.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MalformedManifest`] on bad hex or wrong length.
    pub fn decode_salt(&self) -> Result<[u8; SALT_LEN], VaultError> {
        let bytes = HEXLOWER_PERMISSIVE
            .decode(self.salt.as_bytes())
            .map_err(|e| VaultError::MalformedManifest(format!("invalid salt hex: {e}")))?;
        <[u8; SALT_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
            VaultError::MalformedManifest(format!(
                "salt is {} bytes (expected {SALT_LEN})",
                bytes.len()
            ))
        })
    }

    /// Decode the `hmac` field, if present.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MalformedManifest`] on bad hex or wrong length.
    pub fn decode_hmac(&self) -> Result<Option<[u8; DIGEST_LEN]>, VaultError> {
        let Some(hex) = self.hmac.as_deref() else {
            return Ok(None);
        };
        let bytes = HEXLOWER_PERMISSIVE
            .decode(hex.as_bytes())
            .map_err(|e| VaultError::MalformedManifest(format!("invalid hmac hex: {e}")))?;
        let digest = <[u8; DIGEST_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
            VaultError::MalformedManifest(format!(
                "hmac is {} bytes (expected {DIGEST_LEN})",
                bytes.len()
            ))
        })?;
        Ok(Some(digest))
    }

    /// The canonical bytes the integrity digest covers: the serialized
    /// ordered `files` array, excluding salt/hmac/generatedAt.
    ///
    /// Both the authoring tool and the verifier call this — there is no
    /// second serialization path to drift from.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MalformedManifest`] if serialization fails.
    pub fn canonical_files_bytes(&self) -> Result<Vec<u8>, VaultError> {
        serde_json::to_vec(&self.files)
            .map_err(|e| VaultError::MalformedManifest(format!("canonical serialization: {e}")))
    }

    /// Validate every encoded field before any cryptographic work.
    ///
    /// Also rejects a duplicated `iv`: two documents sealed under the same
    /// key and nonce would silently break confidentiality, so a manifest
    /// carrying one is treated as damaged, never unlocked.
    ///
    /// # Errors
    ///
    /// Returns the first [`VaultError::MalformedManifest`] encountered.
    pub fn validate(&self) -> Result<(), VaultError> {
        self.decode_salt()?;
        self.decode_hmac()?;
        let mut seen_ivs = std::collections::HashSet::with_capacity(self.files.len());
        for file in &self.files {
            let iv = file.decode_iv()?;
            if !seen_ivs.insert(iv) {
                return Err(VaultError::MalformedManifest(format!(
                    "document {}: iv duplicates an earlier document's",
                    file.id
                )));
            }
            file.decode_data()?;
        }
        Ok(())
    }

    /// `true` when the manifest cannot possibly unlock: no salt or no
    /// documents. A build defect, reported as [`VaultError::VaultEmpty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.salt.is_empty() || self.files.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest_json() -> String {
        format!(
            r#"{{
                "salt": "{}",
                "hmac": "{}",
                "generatedAt": "2026-08-04T00:00:00Z",
                "files": [
                    {{
                        "id": "doc-1",
                        "title": "Incident Response",
                        "priority": "critical",
                        "tags": ["runbook", "oncall"],
                        "iv": "{}",
                        "data": "{}"
                    }}
                ]
            }}"#,
            "aa".repeat(16),
            "bb".repeat(32),
            "cc".repeat(12),
            BASE64.encode(&[0u8; 40]),
        )
    }

    #[test]
    fn parses_and_validates_well_formed_manifest() {
        let manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        manifest.validate().expect("validate");
        assert_eq!(manifest.files.len(), 1);
        assert_eq!(manifest.files[0].priority, Priority::Critical);
        assert_eq!(manifest.decode_salt().expect("salt"), [0xAA; 16]);
    }

    #[test]
    fn priority_defaults_to_normal_when_absent() {
        let json = r#"{"id":"x","title":"t","iv":"","data":""}"#;
        let record: DocumentRecord = serde_json::from_str(json).expect("parse");
        assert_eq!(record.priority, Priority::Normal);
        assert!(record.tags.is_empty());
    }

    #[test]
    fn priority_parse_lenient_accepts_known_values() {
        assert_eq!(Priority::parse_lenient("critical"), Priority::Critical);
        assert_eq!(Priority::parse_lenient("HIGH"), Priority::High);
        assert_eq!(Priority::parse_lenient(" low "), Priority::Low);
        assert_eq!(Priority::parse_lenient("normal"), Priority::Normal);
    }

    #[test]
    fn priority_parse_lenient_defaults_unknown_to_normal() {
        assert_eq!(Priority::parse_lenient("urgent"), Priority::Normal);
        assert_eq!(Priority::parse_lenient(""), Priority::Normal);
    }

    #[test]
    fn rejects_wrong_length_salt() {
        let mut manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        manifest.salt = "aabb".into();
        let err = manifest.validate().expect_err("short salt must fail");
        assert!(matches!(err, VaultError::MalformedManifest(_)));
    }

    #[test]
    fn rejects_non_hex_salt() {
        let mut manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        manifest.salt = "zz".repeat(16);
        assert!(matches!(
            manifest.validate(),
            Err(VaultError::MalformedManifest(_))
        ));
    }

    #[test]
    fn rejects_duplicate_ivs() {
        let mut manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        let mut copy = manifest.files[0].clone();
        copy.id = "doc-2".into();
        manifest.files.push(copy);
        let err = manifest.validate().expect_err("duplicate iv must fail");
        assert!(matches!(err, VaultError::MalformedManifest(_)));
    }

    #[test]
    fn rejects_wrong_length_iv() {
        let mut manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        manifest.files[0].iv = "cc".repeat(11);
        assert!(matches!(
            manifest.validate(),
            Err(VaultError::MalformedManifest(_))
        ));
    }

    #[test]
    fn rejects_data_shorter_than_tag() {
        let mut manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        manifest.files[0].data = BASE64.encode(&[0u8; 15]);
        assert!(matches!(
            manifest.validate(),
            Err(VaultError::MalformedManifest(_))
        ));
    }

    #[test]
    fn rejects_bad_base64_data() {
        let mut manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        manifest.files[0].data = "not base64!!!".into();
        assert!(matches!(
            manifest.validate(),
            Err(VaultError::MalformedManifest(_))
        ));
    }

    #[test]
    fn missing_hmac_is_allowed() {
        let mut manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        manifest.hmac = None;
        manifest.validate().expect("validate without hmac");
        assert_eq!(manifest.decode_hmac().expect("decode"), None);
    }

    #[test]
    fn empty_manifest_is_detected() {
        let mut manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        assert!(!manifest.is_empty());
        manifest.files.clear();
        assert!(manifest.is_empty());
    }

    #[test]
    fn canonical_bytes_are_stable_across_reserialization() {
        let manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        let first = manifest.canonical_files_bytes().expect("canonical");
        let rejson = manifest.to_json().expect("to_json");
        let reparsed = Manifest::from_json(&rejson).expect("reparse");
        let second = reparsed.canonical_files_bytes().expect("canonical");
        assert_eq!(first, second);
    }

    #[test]
    fn manifest_json_uses_camel_case_keys() {
        let manifest = Manifest::from_json(&sample_manifest_json()).expect("parse");
        let json = manifest.to_json().expect("to_json");
        assert!(json.contains("\"generatedAt\""));
        assert!(!json.contains("generated_at"));
    }
}
