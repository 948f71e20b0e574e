//! `kmsvault init`: write `.kmsvault.toml` and create the default vault.

use std::io::{self, IsTerminal};

use dialoguer::Input;
use tracing::info;

use crate::cli::output;
use crate::cli::{apply_overrides, build_provider, project_dir, vault_config, Cli};
use crate::config::{ProviderKind, Settings};
use crate::errors::{Result, VaultError};
use crate::provider::LocalKeyProvider;
use crate::vault::Vault;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = project_dir()?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cwd.join(Settings::FILE_NAME));

    // 1. Refuse to re-initialize a project.
    if config_path.exists() {
        output::tip("Use `kmsvault secrets add` to add secrets to the existing vault.");
        return Err(VaultError::ConfigError(format!(
            "this project is already initialized: {} exists",
            config_path.display()
        )));
    }

    // 2. Start from defaults plus whatever was passed on the command line.
    let mut settings = Settings::default();
    apply_overrides(cli, &mut settings)?;

    // 3. Ask for anything still missing.
    prompt_missing(&mut settings)?;
    let missing = settings.identity().missing_fields();
    if !missing.is_empty() {
        return Err(VaultError::MissingIdentity(missing));
    }

    // 4. The local provider needs a master key before anything can be encrypted.
    if settings.provider == ProviderKind::Local {
        let key_path = settings.local_key_path();
        if key_path.exists() {
            output::info(&format!("Using existing local key {}", key_path.display()));
        } else {
            LocalKeyProvider::generate(&key_path).map_err(|e| {
                VaultError::ConfigError(format!(
                    "failed to create local key {}: {e}",
                    key_path.display()
                ))
            })?;
            output::success(&format!("Generated local key {}", key_path.display()));
            output::warning("Back up this key: without it the vault cannot be decrypted.");
        }
    }

    // 5. Create the default vault; a new vault checks that the key works.
    let provider = build_provider(&settings)?;
    let vault = Vault::load_or_create(vault_config(&settings)?, provider)?;
    info!(vault = vault.name(), key = %vault.identity(), "vault ready");

    // 6. Only now record the settings, so a failed key check leaves nothing behind.
    settings.write(&config_path)?;

    output::success(&format!("Created {}", config_path.display()));
    if vault.is_new() {
        output::success(&format!(
            "Vault '{}' created at {}",
            vault.name(),
            vault.path().display()
        ));
    } else {
        output::info(&format!(
            "Vault '{}' already exists ({} secrets)",
            vault.name(),
            vault.secret_count()
        ));
    }

    output::tip("Run `kmsvault secrets add KEY=VALUE` to add a secret.");
    output::tip("Run `kmsvault secrets export --format env --decrypt` to read them back.");

    Ok(())
}

/// Prompt for empty identity fields when attached to a terminal.
fn prompt_missing(settings: &mut Settings) -> Result<()> {
    if !io::stdin().is_terminal() {
        return Ok(());
    }

    let questions = [
        ("Cloud project ID", &mut settings.project),
        ("KMS key ring", &mut settings.keyring),
        ("KMS key", &mut settings.key),
    ];

    for (prompt, field) in questions {
        if !field.is_empty() {
            continue;
        }
        let answer = Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))?;
        *field = answer.trim().to_string();
    }

    Ok(())
}
