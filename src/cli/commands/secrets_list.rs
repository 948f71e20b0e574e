//! `kmsvault secrets list`: show the secret names in a table.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `secrets list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault = open_vault(cli)?;

    output::info(&format!(
        "Vault '{}' (version {}): {} secret(s), key {}",
        vault.name(),
        vault.version(),
        vault.secret_count(),
        vault.kms_key_name()
    ));

    output::print_secrets_table(&vault);

    Ok(())
}
