//! `kmsvault secrets add`: encrypt and store one or more secrets.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::cli::output;
use crate::cli::{open_or_create_vault, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `secrets add` command.
pub fn execute(cli: &Cli, pairs: &[String], file: Option<&Path>, name: Option<&str>) -> Result<()> {
    let entries = collect_entries(pairs, file, name)?;
    if entries.is_empty() {
        return Err(VaultError::CommandFailed(
            "must supply at least one KEY=VALUE pair".into(),
        ));
    }

    if !pairs.is_empty() {
        output::warning("Values on the command line may appear in shell history.");
    }

    let mut vault = open_or_create_vault(cli)?;

    for (key, value) in &entries {
        let existed = vault.contains_key(key);
        vault.set_secret(key, value)?;
        output::info(&format!("  {} {key}", if existed { "~" } else { "+" }));
    }

    vault.save()?;
    info!(vault = vault.name(), added = entries.len(), "saved vault");

    output::success(&format!(
        "Saved {} secret(s) to '{}' ({} total)",
        entries.len(),
        vault.name(),
        vault.secret_count()
    ));

    Ok(())
}

/// Gather `(name, value)` pairs from `--file`/`--name` and positional args,
/// in that order.
fn collect_entries(
    pairs: &[String],
    file: Option<&Path>,
    name: Option<&str>,
) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::with_capacity(pairs.len() + 1);

    match (file, name) {
        (Some(file), Some(name)) => {
            let contents = fs::read_to_string(file).map_err(|e| {
                VaultError::CommandFailed(format!("failed to read {}: {e}", file.display()))
            })?;
            entries.push((name.to_string(), contents));
        }
        (Some(_), None) => {
            return Err(VaultError::CommandFailed(
                "--name is required when using --file".into(),
            ));
        }
        _ => {}
    }

    for arg in pairs {
        entries.push(parse_pair(arg)?);
    }

    Ok(entries)
}

/// Split `KEY=VALUE` on the first `=`.
fn parse_pair(arg: &str) -> Result<(String, String)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(VaultError::CommandFailed(format!(
            "{arg} is not a valid KEY=VALUE pair"
        ))),
    }
}
