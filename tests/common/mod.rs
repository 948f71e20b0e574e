//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kmsvault::provider::{KeyProvider, ProviderError, ResourceIdentity};
use kmsvault::vault::{BulkOptions, VaultConfig};

/// Deterministic in-process key service.
///
/// Encrypt looks the plaintext up in `ciphertexts`, falling back to
/// `enc:<plaintext>`.  Decrypt does the reverse.  Any value listed in
/// `failing` makes the call fail, and a key named `missing` rejects
/// every request.
#[derive(Default)]
pub struct FakeKms {
    ciphertexts: HashMap<String, String>,
    failing: Vec<String>,
    pub encrypt_calls: AtomicUsize,
    pub decrypt_calls: AtomicUsize,
}

impl FakeKms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `plaintext` to `ciphertext` in both directions.
    pub fn with_mapping(mut self, plaintext: &str, ciphertext: &str) -> Self {
        self.ciphertexts
            .insert(plaintext.to_string(), ciphertext.to_string());
        self
    }

    /// Fail any request whose input is `value`.
    pub fn failing_on(mut self, value: &str) -> Self {
        self.failing.push(value.to_string());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn encrypts(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypts(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    fn check(&self, identity: &ResourceIdentity, input: &str) -> Result<(), ProviderError> {
        if identity.key == "missing" {
            return Err(ProviderError::Key(format!(
                "{} not found",
                identity.resource_name()
            )));
        }
        if self.failing.iter().any(|f| f == input) {
            return Err(ProviderError::Status(500));
        }
        Ok(())
    }
}

impl KeyProvider for FakeKms {
    fn encrypt(
        &self,
        identity: &ResourceIdentity,
        plaintext: &[u8],
    ) -> Result<String, ProviderError> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        let plaintext = String::from_utf8_lossy(plaintext).into_owned();
        self.check(identity, &plaintext)?;

        Ok(self
            .ciphertexts
            .get(&plaintext)
            .cloned()
            .unwrap_or_else(|| format!("enc:{plaintext}")))
    }

    fn decrypt(
        &self,
        identity: &ResourceIdentity,
        ciphertext: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.check(identity, ciphertext)?;

        if let Some((plain, _)) = self.ciphertexts.iter().find(|(_, ct)| *ct == ciphertext) {
            return Ok(plain.clone().into_bytes());
        }
        ciphertext
            .strip_prefix("enc:")
            .map(|p| p.as_bytes().to_vec())
            .ok_or_else(|| ProviderError::InvalidCiphertext(ciphertext.to_string()))
    }
}

/// Identity used by every test vault.
pub fn identity(key: &str) -> ResourceIdentity {
    ResourceIdentity::new("acme", "global", "app", key)
}

/// Config for vault `main` under `root/kmsvault/`.
pub fn vault_config(root: &Path) -> VaultConfig {
    VaultConfig {
        name: "main".into(),
        root: root.to_path_buf(),
        vault_dir: "kmsvault".into(),
        identity: identity("secrets"),
        bulk: BulkOptions::default(),
    }
}

/// Write a vault file by hand, as if an earlier run had saved it.
pub fn write_vault_file(root: &Path, secrets: &[(&str, &str)], key: &str) {
    let dir = root.join("kmsvault");
    std::fs::create_dir_all(&dir).unwrap();
    let secrets: serde_json::Map<String, serde_json::Value> = secrets
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    let doc = serde_json::json!({
        "version": 1,
        "secrets": secrets,
        "project": "acme",
        "location": "global",
        "keyring": "app",
        "key": key,
    });
    std::fs::write(
        dir.join("main.json"),
        serde_json::to_vec_pretty(&doc).unwrap(),
    )
    .unwrap();
}
