//! `kmsvault secrets remove`: delete a secret from the vault.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `secrets remove` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let mut vault = open_vault(cli)?;

    if !vault.remove_secret(name) {
        output::warning(&format!("Secret '{name}' is not in vault '{}'", vault.name()));
        return Ok(());
    }

    vault.save()?;
    output::success(&format!(
        "Removed secret '{name}' ({} left)",
        vault.secret_count()
    ));

    Ok(())
}
