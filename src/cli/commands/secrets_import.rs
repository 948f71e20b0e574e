//! `kmsvault secrets import`: encrypt and add every entry of a file.
//!
//! Supported formats:
//! - `.env` files
//! - JSON files (object with string values)
//!
//! `--format` wins; otherwise a `.json` extension means JSON and
//! anything else is read as `.env`.
//!
//! Entries are encrypted concurrently.  If any of them fails, nothing
//! is added and the vault file is left untouched.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::cli::env_parser;
use crate::cli::output;
use crate::cli::{open_or_create_vault, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `secrets import` command.
pub fn execute(cli: &Cli, source: &Path, format: Option<&str>) -> Result<()> {
    if !source.exists() {
        return Err(VaultError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }

    // Detect format from flag or file extension.
    let detected_format = match format {
        Some(f) => f.to_string(),
        None => detect_format(source),
    };

    let entries = match detected_format.as_str() {
        "env" => env_parser::parse_env_file(source)?,
        "json" => parse_json_file(source)?,
        other => {
            return Err(VaultError::CommandFailed(format!(
                "unknown import format '{other}'; use 'env' or 'json'"
            )));
        }
    };

    if entries.is_empty() {
        output::warning("No secrets found in the import file.");
        return Ok(());
    }

    let mut vault = open_or_create_vault(cli)?;

    let encrypted = vault.encrypt_env_map(&entries)?;
    let count = encrypted.len();
    vault.merge_encrypted_env_map(encrypted)?;
    vault.save()?;

    info!(vault = vault.name(), count, "imported secrets");

    let mut names: Vec<&String> = entries.keys().collect();
    names.sort_unstable();
    for name in names {
        output::info(&format!("  + {name}"));
    }

    output::success(&format!(
        "Imported {count} secrets from {} into '{}' vault",
        source.display(),
        vault.name()
    ));

    Ok(())
}

/// Detect the file format from its extension.
fn detect_format(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => "json".to_string(),
        _ => "env".to_string(), // Default to .env format.
    }
}

/// Parse a JSON file (object with string values) into a key-value map.
fn parse_json_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| VaultError::CommandFailed(format!("failed to read file: {e}")))?;

    let map: HashMap<String, serde_json::Value> = serde_json::from_str(&content)
        .map_err(|e| VaultError::CommandFailed(format!("invalid JSON: {e}")))?;

    let mut secrets = HashMap::new();
    for (key, value) in map {
        let string_value = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(), // Convert non-strings to their JSON repr.
        };
        secrets.insert(key, string_value);
    }

    Ok(secrets)
}
