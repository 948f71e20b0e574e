//! `kmsvault secrets export`: print the vault in json, yaml, env or shell form.
//!
//! Without `--decrypt` the ciphertext tokens are exported as-is.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::ExportFormat;

/// Execute the `secrets export` command.
pub fn execute(cli: &Cli, format: &str, decrypt: bool, output_path: Option<&Path>) -> Result<()> {
    // Reject a bad format before any provider round-trips.
    format.parse::<ExportFormat>()?;

    let mut vault = open_vault(cli)?;

    if decrypt {
        vault.decrypt_all()?;
        info!(vault = vault.name(), count = vault.secret_count(), "decrypted vault");
    }

    let content = vault.marshal_as(format)?;

    match output_path {
        Some(dest) => {
            if is_inside_vault_dir(dest, vault.path()) {
                return Err(VaultError::CommandFailed(format!(
                    "refusing to export into the vault directory ({})",
                    dest.display()
                )));
            }

            fs::write(dest, &content).map_err(|e| {
                VaultError::CommandFailed(format!("failed to write export file: {e}"))
            })?;

            output::success(&format!(
                "Exported {} secrets to {} (format: {format})",
                vault.secret_count(),
                dest.display()
            ));
            if decrypt {
                output::warning("The export contains plaintext secrets.");
            }
        }
        None => {
            // Raw output only, so it can be redirected or eval'd.
            print!("{content}");
        }
    }

    Ok(())
}

/// Whether `dest` would land in the directory holding the vault files.
/// Both sides are canonicalized, so relative paths, `..` and symlinks
/// resolve to the same answer.
fn is_inside_vault_dir(dest: &Path, vault_path: &Path) -> bool {
    let Some(vault_dir) = vault_path.parent().and_then(|d| fs::canonicalize(d).ok()) else {
        return false;
    };
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::canonicalize(parent).is_ok_and(|p| p == vault_dir)
}
