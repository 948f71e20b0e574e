//! On-disk vault document, content versioning and atomic writes.
//!
//! A vault file is indented JSON:
//!
//! ```text
//! {
//!   "version": 1234567890123456789,
//!   "secrets": { "DB_PASS": "<ciphertext token>" },
//!   "project": "acme",
//!   "location": "global",
//!   "keyring": "app",
//!   "key": "secrets"
//! }
//! ```
//!
//! Secrets are written in key order so identical vaults produce
//! identical files.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{Result, VaultError};
use crate::provider::ResourceIdentity;

/// Serialized form of a vault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultDocument {
    /// Content hash of `secrets` at the time of the last save.
    #[serde(default, deserialize_with = "number_or_string")]
    pub version: u64,

    /// Secret name -> ciphertext token.
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,

    /// The key the ciphertexts were produced with.
    #[serde(flatten)]
    pub identity: ResourceIdentity,
}

/// Compute the content version of a secret mapping.
///
/// SHA-256 over the entries in key order, each key and value prefixed
/// by its length so `{"a": "bc"}` and `{"ab": "c"}` differ.  The first
/// eight bytes of the digest are read as a big-endian `u64`.
pub fn compute_version(secrets: &HashMap<String, String>) -> u64 {
    let sorted: BTreeMap<&String, &String> = secrets.iter().collect();

    let mut hasher = Sha256::new();
    for (key, value) in sorted {
        hasher.update((key.len() as u64).to_le_bytes());
        hasher.update(key.as_bytes());
        hasher.update((value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Parse the raw bytes of a vault file.
pub fn parse_document(bytes: &[u8]) -> Result<VaultDocument> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(VaultError::InvalidVaultFormat(
            "vault file is empty".into(),
        ));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| VaultError::InvalidVaultFormat(format!("vault JSON: {e}")))
}

/// Render a document as indented JSON with a trailing newline.
pub fn render_document(doc: &VaultDocument) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(doc)
        .map_err(|e| VaultError::SerializationError(format!("vault: {e}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write `bytes` to `path` **atomically**.
///
/// The data goes to a hidden temp file in the same directory, which is
/// then renamed over the target, so readers never see a half-written
/// file and a failed write leaves the previous file intact.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    if let Err(e) = fs::write(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Accept `"version": 123` as well as `"version": "123"`.
fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) if s.is_empty() => Ok(0),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
