//! Encryption providers: the external services that turn plaintext
//! into ciphertext tokens and back.
//!
//! The vault never encrypts anything itself. It hands each value to a
//! `KeyProvider` together with the `ResourceIdentity` of the key to use.
//!
//! - `CloudKmsProvider` talks to the Cloud KMS REST API (`cloud_kms`)
//! - `LocalKeyProvider` uses a master key file on disk (`local`)

#[cfg(feature = "cloud-kms")]
pub mod cloud_kms;
pub mod local;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "cloud-kms")]
pub use cloud_kms::CloudKmsProvider;
pub use local::LocalKeyProvider;

/// Location used when none is configured.
pub const DEFAULT_LOCATION: &str = "global";

/// Public Cloud KMS endpoint.
pub const DEFAULT_KMS_ENDPOINT: &str = "https://cloudkms.googleapis.com";

/// Which key a ciphertext was (or will be) produced with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentity {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub keyring: String,
    #[serde(default)]
    pub key: String,
}

impl ResourceIdentity {
    pub fn new(project: &str, location: &str, keyring: &str, key: &str) -> Self {
        Self {
            project: project.to_string(),
            location: location.to_string(),
            keyring: keyring.to_string(),
            key: key.to_string(),
        }
    }

    /// The hierarchical resource name passed to the provider, e.g.
    /// `projects/p/locations/global/keyRings/r/cryptoKeys/k`.
    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}",
            self.project, self.location, self.keyring, self.key
        )
    }

    /// Names of the fields that are still empty, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.project.is_empty() {
            missing.push("project");
        }
        if self.location.is_empty() {
            missing.push("location");
        }
        if self.keyring.is_empty() {
            missing.push("keyring");
        }
        if self.key.is_empty() {
            missing.push("key");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Fill every empty field from `other`, leaving populated ones alone.
    pub fn fill_from(&mut self, other: &ResourceIdentity) {
        for (mine, theirs) in [
            (&mut self.project, &other.project),
            (&mut self.location, &other.location),
            (&mut self.keyring, &other.keyring),
            (&mut self.key, &other.key),
        ] {
            if mine.is_empty() && !theirs.is_empty() {
                mine.clone_from(theirs);
            }
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resource_name())
    }
}

/// The two things a provider can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Encrypt => f.write_str("encrypt"),
            Operation::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// Failures reported by an encryption provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to key service failed: {0}")]
    Request(String),

    #[error("key service returned HTTP {0}")]
    Status(u16),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("malformed ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("unexpected response from key service: {0}")]
    InvalidResponse(String),

    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,

    #[error("timed out waiting for the key service")]
    Timeout,

    #[error("worker exited without reporting a result")]
    WorkerLost,
}

/// A single-value encrypt/decrypt service.
///
/// Implementations must be shareable across threads: bulk operations
/// call them from many workers at once.
pub trait KeyProvider: Send + Sync {
    /// Encrypt `plaintext` with the key named by `identity`, returning an
    /// opaque ciphertext token.
    fn encrypt(
        &self,
        identity: &ResourceIdentity,
        plaintext: &[u8],
    ) -> Result<String, ProviderError>;

    /// Reverse a token produced by `encrypt`.
    fn decrypt(
        &self,
        identity: &ResourceIdentity,
        ciphertext: &str,
    ) -> Result<Vec<u8>, ProviderError>;
}
