//! `kmsvault decrypt`: decrypt one ciphertext token.
//!
//! ```text
//! kmsvault decrypt CiQAuu4L...
//! echo CiQAuu4L... | kmsvault decrypt -
//! ```

use std::io::{self, Read, Write};

use crate::cli::{build_provider, resolve_settings, Cli};
use crate::errors::{Result, VaultError};
use crate::provider::Operation;

/// Execute the `decrypt` command.
pub fn execute(cli: &Cli, token: &str) -> Result<()> {
    let token = if token == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        token.to_string()
    };
    let token = token.trim();
    if token.is_empty() {
        return Err(VaultError::CommandFailed("no ciphertext given".into()));
    }

    let settings = resolve_settings(cli)?;
    let identity = settings.identity();
    let missing = identity.missing_fields();
    if !missing.is_empty() {
        return Err(VaultError::MissingIdentity(missing));
    }

    let provider = build_provider(&settings)?;
    let plaintext = provider
        .decrypt(&identity, token)
        .map_err(|source| VaultError::Provider {
            operation: Operation::Decrypt,
            key: None,
            source,
        })?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&plaintext)?;
    stdout.flush()?;
    Ok(())
}
