//! `kmsvault secrets get`: decrypt and print a single secret.

use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `secrets get` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let vault = open_vault(cli)?;

    let value = vault.get_secret(name)?;
    println!("{value}");

    Ok(())
}
