//! Cloud Build secrets stanza.
//!
//! Cloud Build decrypts `secretEnv` values itself with the named KMS
//! key, so the vault's ciphertexts are emitted as they are:
//!
//! ```yaml
//! secrets:
//! - kmsKeyName: projects/p/locations/global/keyRings/r/cryptoKeys/k
//!   secretEnv:
//!     DB_PASS: CiQA...
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::{Result, VaultError};
use crate::vault::Vault;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSecret {
    pub kms_key_name: String,
    pub secret_env: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize)]
pub struct Build {
    pub secrets: Vec<BuildSecret>,
}

impl Build {
    /// A build with one secrets entry holding every secret of `vault`.
    ///
    /// The vault must still hold ciphertext.
    pub fn from_vault(vault: &Vault) -> Result<Self> {
        if vault.is_decrypted() {
            return Err(VaultError::CommandFailed(
                "Cloud Build needs ciphertext, but the vault is decrypted".into(),
            ));
        }

        Ok(Self {
            secrets: vec![BuildSecret {
                kms_key_name: vault.kms_key_name(),
                secret_env: vault
                    .secrets()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            }],
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| VaultError::SerializationError(format!("cloudbuild YAML: {e}")))
    }
}
