//! Text encodings of a secret mapping.
//!
//! Supported formats:
//! - `json`: indented JSON object `{ "KEY": "value", ... }`
//! - `yaml` / `yml`: the same mapping as YAML
//! - `env`: dotenv lines, `KEY="escaped value"` (integers unquoted)
//! - `shell`: env lines prefixed with `export `, every line newline-terminated
//!
//! Output is always in key order.  The functions here never touch the
//! provider: they render whatever the mapping holds, ciphertext or
//! (after a bulk decrypt) plaintext.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::str::FromStr;

use crate::errors::{Result, VaultError};

/// Characters escaped with a backslash inside double-quoted env values.
const ESCAPED_CHARS: [char; 5] = ['\\', '"', '!', '$', '`'];

/// An export format identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Yaml,
    Env,
    Shell,
}

impl FromStr for ExportFormat {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            "env" => Ok(ExportFormat::Env),
            "shell" => Ok(ExportFormat::Shell),
            other => Err(VaultError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl ExportFormat {
    /// Render `secrets` in this format.
    pub fn render(self, secrets: &HashMap<String, String>) -> Result<String> {
        let sorted: BTreeMap<&str, &str> = secrets
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        match self {
            ExportFormat::Json => to_json(&sorted),
            ExportFormat::Yaml => to_yaml(&sorted),
            ExportFormat::Env => Ok(to_env(&sorted)),
            ExportFormat::Shell => Ok(to_shell(&sorted)),
        }
    }
}

fn to_json(secrets: &BTreeMap<&str, &str>) -> Result<String> {
    serde_json::to_string_pretty(secrets)
        .map_err(|e| VaultError::SerializationError(format!("JSON export: {e}")))
}

fn to_yaml(secrets: &BTreeMap<&str, &str>) -> Result<String> {
    serde_yaml::to_string(secrets)
        .map_err(|e| VaultError::SerializationError(format!("YAML export: {e}")))
}

/// Lines joined by `\n`, without a newline after the last one.
fn to_env(secrets: &BTreeMap<&str, &str>) -> String {
    secrets
        .iter()
        .map(|(key, value)| env_line(key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Every line, including the last, ends with `\n`.
fn to_shell(secrets: &BTreeMap<&str, &str>) -> String {
    let mut out = String::new();
    for (key, value) in secrets {
        let _ = writeln!(out, "export {}", env_line(key, value));
    }
    out
}

/// One `KEY=VALUE` line.
///
/// Plain integers are written bare; everything else is double-quoted
/// with `\`, `"`, `!`, `$` and `` ` `` backslash-escaped and line
/// breaks written as `\n` / `\r`, so each line parses on its own.
pub fn env_line(key: &str, value: &str) -> String {
    if is_canonical_integer(value) {
        return format!("{key}={value}");
    }

    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c if ESCAPED_CHARS.contains(&c) => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    format!("{key}=\"{escaped}\"")
}

/// True when `value` prints back identically as an `i64`, so `007` or
/// `+1` stay quoted and keep their exact text.
fn is_canonical_integer(value: &str) -> bool {
    value
        .parse::<i64>()
        .is_ok_and(|n| n.to_string() == value)
}
