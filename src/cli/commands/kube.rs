//! `kmsvault kube manifest`: render the decrypted vault as a Kubernetes
//! Opaque Secret.
//!
//! The secret name carries the vault version, so each change to the
//! vault produces a new, immutable secret:
//!
//! ```text
//! kmsvault kube manifest --namespace prod | kubectl create -f -
//! ```

use tracing::info;

use crate::cli::{open_vault, Cli};
use crate::errors::Result;
use crate::platform::kube::SecretManifest;

/// Execute the `kube manifest` command.
pub fn execute_manifest(cli: &Cli, namespace: Option<&str>) -> Result<()> {
    let mut vault = open_vault(cli)?;
    vault.decrypt_all()?;

    let manifest = SecretManifest::from_vault(&vault, namespace)?;
    info!(secret = %manifest.metadata.name, "rendered kubernetes secret");

    print!("{}", manifest.to_yaml()?);
    Ok(())
}
