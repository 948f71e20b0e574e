//! Key derivation helpers using HKDF-SHA256.
//!
//! One master key file backs any number of "crypto keys".  Each
//! resource name (`projects/../cryptoKeys/..`) gets its own sub-key, so
//! a token sealed for one resource cannot be opened with another.

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::provider::ProviderError;

/// Length of the master key and of derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

/// Derive the sealing key for one resource from the master key.
///
/// `info` is `"kmsvault-key:<resource_name>"`.
pub fn derive_resource_key(
    master_key: &[u8],
    resource_name: &str,
) -> Result<[u8; KEY_LEN], ProviderError> {
    let info = format!("kmsvault-key:{resource_name}");
    let hk = Hkdf::<Sha256>::new(None, master_key);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info.as_bytes(), &mut okm)
        .map_err(|e| ProviderError::Key(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte master key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Fresh random key, filled where it lives.
    pub fn random() -> Self {
        let mut key = Self {
            bytes: [0u8; KEY_LEN],
        };
        rand::rng().fill_bytes(&mut key.bytes);
        key
    }

    /// Copy a key out of `data`, which must be exactly `KEY_LEN` bytes.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        if data.len() != KEY_LEN {
            return None;
        }
        let mut key = Self {
            bytes: [0u8; KEY_LEN],
        };
        key.bytes.copy_from_slice(data);
        Some(key)
    }

    /// Raw key bytes, for writing the key file.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive the sealing key for `resource_name`.
    pub fn derive_resource_key(&self, resource_name: &str) -> Result<[u8; KEY_LEN], ProviderError> {
        derive_resource_key(&self.bytes, resource_name)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let master = [0x42u8; KEY_LEN];
        let a = derive_resource_key(&master, "projects/p/locations/l/keyRings/r/cryptoKeys/k");
        let b = derive_resource_key(&master, "projects/p/locations/l/keyRings/r/cryptoKeys/k");
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[test]
    fn different_resources_get_different_keys() {
        let master = MasterKey::new([0x42u8; KEY_LEN]);
        let a = master.derive_resource_key("projects/p/locations/l/keyRings/r/cryptoKeys/a");
        let b = master.derive_resource_key("projects/p/locations/l/keyRings/r/cryptoKeys/b");
        assert_ne!(a.unwrap(), b.unwrap());
    }

    #[test]
    fn from_slice_requires_exact_length() {
        assert!(MasterKey::from_slice(&[7u8; KEY_LEN]).is_some());
        assert!(MasterKey::from_slice(&[7u8; 16]).is_none());
        assert!(MasterKey::from_slice(&[7u8; KEY_LEN + 1]).is_none());
    }

    #[test]
    fn random_keys_differ() {
        assert_ne!(MasterKey::random().as_bytes(), MasterKey::random().as_bytes());
    }

    #[test]
    fn debug_does_not_print_key_bytes() {
        let master = MasterKey::new([0xABu8; KEY_LEN]);
        assert_eq!(format!("{master:?}"), "MasterKey(..)");
    }
}
