//! `kmsvault encrypt`: encrypt one value and print the ciphertext token.

use std::io::{self, Read};

use crate::cli::{build_provider, resolve_settings, Cli};
use crate::errors::{Result, VaultError};
use crate::provider::Operation;

/// Execute the `encrypt` command.
pub fn execute(cli: &Cli, value: Option<&str>, stdin: bool) -> Result<()> {
    let plaintext = match value {
        Some(v) if !stdin => v.as_bytes().to_vec(),
        _ => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let settings = resolve_settings(cli)?;
    let identity = settings.identity();
    let missing = identity.missing_fields();
    if !missing.is_empty() {
        return Err(VaultError::MissingIdentity(missing));
    }

    let provider = build_provider(&settings)?;
    let token = provider
        .encrypt(&identity, &plaintext)
        .map_err(|source| VaultError::Provider {
            operation: Operation::Encrypt,
            key: None,
            source,
        })?;

    print!("{token}");
    Ok(())
}
