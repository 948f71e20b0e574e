//! Shared `.env` file parsing logic.
//!
//! Used by `secrets import`.  Reads back what `secrets export --format env`
//! and `--format shell` write: double-quoted values have their backslash
//! escapes undone, single-quoted values are taken literally.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::errors::{Result, VaultError};

/// Parse a single `.env` line into a (key, value) pair.
///
/// Returns `None` for blank lines, comments, and lines without `=`.
/// Handles: `export` prefix, double/single quotes, values with `=`.
pub fn parse_env_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();

    // Skip empty lines and comments.
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    // Strip optional `export ` prefix.
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);

    // Split on the first '=' to get KEY and VALUE.
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() {
        return None;
    }

    let value = if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        unescape(inner)
    } else if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        inner.to_string()
    } else {
        value.to_string()
    };

    Some((key.to_string(), value))
}

/// Undo the escaping used inside double-quoted values.
fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Parse `.env` content into a key-value map.  Later lines win.
pub fn parse_env_str(content: &str) -> HashMap<String, String> {
    content.lines().filter_map(parse_env_line).collect()
}

/// Parse a `.env` file into a key-value map.
pub fn parse_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| VaultError::CommandFailed(format!("failed to read file: {e}")))?;

    Ok(parse_env_str(&content))
}
