//! `kmsvault cloudbuild`: print the vault as a cloudbuild.yaml `secrets` block.
//!
//! ```text
//! kmsvault cloudbuild >> cloudbuild.yaml
//! ```

use crate::cli::{open_vault, Cli};
use crate::errors::Result;
use crate::platform::cloudbuild::Build;

/// Execute the `cloudbuild` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault = open_vault(cli)?;
    let yaml = Build::from_vault(&vault)?.to_yaml()?;
    print!("{yaml}");
    Ok(())
}
