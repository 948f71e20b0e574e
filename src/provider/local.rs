//! Offline provider backed by a master key file.
//!
//! Useful for development, CI fixtures and tests: it behaves like a
//! remote key service (opaque base64 tokens, one key per resource name)
//! without any network access.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroize;

use super::{KeyProvider, ProviderError, ResourceIdentity};
use crate::crypto::{self, MasterKey};

/// Encrypts with AES-256-GCM under a per-resource key derived from a
/// local master key.
#[derive(Debug)]
pub struct LocalKeyProvider {
    master_key: MasterKey,
}

impl LocalKeyProvider {
    pub fn new(master_key: MasterKey) -> Self {
        Self { master_key }
    }

    /// Load the master key from an existing key file.
    pub fn from_key_file(path: &Path) -> Result<Self, ProviderError> {
        Ok(Self::new(crypto::load_key_file(path)?))
    }

    /// Create a new key file at `path` and use it.
    pub fn generate(path: &Path) -> Result<Self, ProviderError> {
        Ok(Self::new(crypto::generate_key_file(path)?))
    }
}

impl KeyProvider for LocalKeyProvider {
    fn encrypt(
        &self,
        identity: &ResourceIdentity,
        plaintext: &[u8],
    ) -> Result<String, ProviderError> {
        let mut key = self
            .master_key
            .derive_resource_key(&identity.resource_name())?;
        let sealed = crypto::seal(&key, plaintext);
        key.zeroize();

        Ok(BASE64.encode(sealed?))
    }

    fn decrypt(
        &self,
        identity: &ResourceIdentity,
        ciphertext: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let sealed = BASE64
            .decode(ciphertext.trim())
            .map_err(|e| ProviderError::InvalidCiphertext(format!("not base64: {e}")))?;

        let mut key = self
            .master_key
            .derive_resource_key(&identity.resource_name())?;
        let plaintext = crypto::open(&key, &sealed);
        key.zeroize();

        plaintext
    }
}
