//! AES-256-GCM authenticated encryption.
//!
//! Each call to `seal` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext.  `open` splits the nonce back out
//! before decrypting.
//!
//! Layout of the returned byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::provider::ProviderError;

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// Encrypt `plaintext` with a 32-byte `key`, returning `nonce || ciphertext`.
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| ProviderError::Key(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| ProviderError::Key(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data that was produced by `seal`.
pub fn open(key: &[u8], sealed: &[u8]) -> Result<Vec<u8>, ProviderError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(ProviderError::InvalidCiphertext(format!(
            "{} bytes is shorter than nonce and tag",
            sealed.len()
        )));
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| ProviderError::Key(format!("invalid key length: {e}")))?;

    // A tag mismatch means the token was made with another key or was altered.
    cipher.decrypt(nonce, ciphertext).map_err(|_| {
        ProviderError::InvalidCiphertext("authentication failed for this key".into())
    })
}
