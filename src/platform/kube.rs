//! Kubernetes Opaque secret manifest.
//!
//! The secret is named `kmsvault-<vault>-<version>`, so every change to
//! the vault produces a new, immutable secret rather than mutating the
//! one running pods already reference.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::{Result, VaultError};
use crate::vault::Vault;

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretManifest {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub metadata: Metadata,
    #[serde(rename = "type")]
    pub secret_type: &'static str,
    pub data: BTreeMap<String, String>,
}

/// Name of the Kubernetes secret for a vault at a given version.
pub fn secret_name(vault_name: &str, version: u64) -> String {
    format!("kmsvault-{vault_name}-{version}")
}

impl SecretManifest {
    /// Build a manifest from a decrypted vault; `data` holds the
    /// base64-encoded plaintext values.
    pub fn from_vault(vault: &Vault, namespace: Option<&str>) -> Result<Self> {
        if !vault.is_decrypted() {
            return Err(VaultError::CommandFailed(
                "decrypt the vault before building a Kubernetes secret".into(),
            ));
        }

        Ok(Self {
            api_version: "v1",
            kind: "Secret",
            metadata: Metadata {
                name: secret_name(vault.name(), vault.version()),
                namespace: namespace.map(str::to_string),
            },
            secret_type: "Opaque",
            data: vault.base64_encode(),
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| VaultError::SerializationError(format!("kubernetes YAML: {e}")))
    }
}
