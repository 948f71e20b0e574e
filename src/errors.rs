use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::provider::{Operation, ProviderError};

/// All errors that can occur in kmsvault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Secret errors ---
    #[error("Secret '{0}' not found")]
    SecretNotFound(String),

    #[error("Invalid secret name: {0}")]
    InvalidSecretName(String),

    // --- Vault file errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    #[error("Vault '{0}' holds decrypted values; refusing to write plaintext to disk")]
    PlaintextSave(String),

    #[error("Vault '{0}' holds decrypted values; re-load it before modifying secrets")]
    VaultDecrypted(String),

    // --- Provider errors ---
    #[error("{operation} failed{}: {source}", key_suffix(.key))]
    Provider {
        operation: Operation,
        key: Option<String>,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Batch(#[from] BatchError),

    // --- Validation errors ---
    #[error("Missing key settings: {} (pass them as flags or set them in .kmsvault.toml)", .0.join(", "))]
    MissingIdentity(Vec<&'static str>),

    #[error("Failed to verify crypto key settings for {resource}: {source}")]
    KeyCheckFailed {
        resource: String,
        #[source]
        source: ProviderError,
    },

    // --- Export errors ---
    #[error("'{0}' is not a supported export format (use json, yaml, env or shell)")]
    UnsupportedFormat(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_ref()
        .map(|k| format!(" for '{k}'"))
        .unwrap_or_default()
}

/// A single entry that failed inside a bulk operation.
#[derive(Debug)]
pub struct ItemFailure {
    pub key: String,
    pub cause: ProviderError,
}

/// Aggregate failure of a bulk encrypt or decrypt.
///
/// Failures are sorted by key so the message is stable.
#[derive(Debug, Error)]
pub struct BatchError {
    pub operation: Operation,
    pub total: usize,
    pub failures: Vec<ItemFailure>,
}

impl BatchError {
    /// Names of the entries that failed, in sorted order.
    pub fn failed_keys(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.key.as_str()).collect()
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bulk {} failed for {} of {} secret(s): ",
            self.operation,
            self.failures.len(),
            self.total
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{} ({})", failure.key, failure.cause)?;
        }
        Ok(())
    }
}

/// Convenience type alias for kmsvault results.
pub type Result<T> = std::result::Result<T, VaultError>;
