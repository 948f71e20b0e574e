//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod env_parser;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap_complete::Shell;
use tracing::debug;

use crate::config::{ProviderKind, Settings};
use crate::errors::{Result, VaultError};
use crate::provider::{KeyProvider, LocalKeyProvider};
use crate::vault::{Vault, VaultConfig};

/// kmsvault CLI: secrets encrypted by a key management service.
#[derive(Parser)]
#[command(
    name = "kmsvault",
    about = "Manage secrets encrypted with a cloud key management service",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ./.kmsvault.toml)
    #[arg(long, global = true, env = "KMSVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cloud project that owns the key ring
    #[arg(short, long, global = true, env = "KMSVAULT_PROJECT")]
    pub project: Option<String>,

    /// Key ring location (default: global)
    #[arg(short, long, global = true, env = "KMSVAULT_LOCATION")]
    pub location: Option<String>,

    /// Key ring name
    #[arg(short, long, global = true, env = "KMSVAULT_KEYRING")]
    pub keyring: Option<String>,

    /// Crypto key name
    #[arg(long, global = true, env = "KMSVAULT_KEY")]
    pub key: Option<String>,

    /// Vault to operate on (default: main)
    #[arg(short, long, global = true, env = "KMSVAULT_VAULT")]
    pub vault: Option<String>,

    /// Encryption provider: cloud-kms or local
    #[arg(long, global = true, env = "KMSVAULT_PROVIDER")]
    pub provider: Option<String>,

    /// Master key file for the local provider
    #[arg(long, global = true, env = "KMSVAULT_LOCAL_KEY")]
    pub local_key: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Write .kmsvault.toml and create the default vault
    Init,

    /// Encrypt a single value and print the ciphertext token
    Encrypt {
        /// Value to encrypt
        #[arg(required_unless_present = "stdin", conflicts_with = "stdin")]
        value: Option<String>,

        /// Read the value from stdin instead
        #[arg(long)]
        stdin: bool,
    },

    /// Decrypt a ciphertext token (`-` reads it from stdin)
    Decrypt {
        /// Ciphertext token, or `-` for stdin
        token: String,
    },

    /// Manage secrets stored in a vault
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,
    },

    /// Print the vault as a cloudbuild.yaml `secrets` section
    Cloudbuild,

    /// Kubernetes helpers
    Kube {
        #[command(subcommand)]
        action: KubeAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Secrets subcommands.
#[derive(clap::Subcommand)]
pub enum SecretsAction {
    /// Add or replace secrets
    Add {
        /// KEY=VALUE pairs (the value may itself contain `=`)
        #[arg(value_name = "KEY=VALUE", required_unless_present = "file")]
        pairs: Vec<String>,

        /// Store the contents of this file as a secret
        #[arg(short, long, requires = "name")]
        file: Option<PathBuf>,

        /// Secret name for --file
        #[arg(short, long, requires = "file")]
        name: Option<String>,
    },

    /// Remove a secret
    Remove {
        /// Secret name
        name: String,
    },

    /// Decrypt and print one secret
    Get {
        /// Secret name
        name: String,
    },

    /// List secret names
    List,

    /// Export the vault as json, yaml, env or shell
    Export {
        /// Output format: json, yaml, env or shell
        #[arg(short, long)]
        format: String,

        /// Decrypt every value before exporting
        #[arg(long)]
        decrypt: bool,

        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encrypt and add every entry of a .env or JSON file
    Import {
        /// Path to the file to import
        file: PathBuf,

        /// Import format: env or json (auto-detected from extension)
        #[arg(short, long)]
        format: Option<String>,
    },
}

/// Kubernetes subcommands.
#[derive(clap::Subcommand)]
pub enum KubeAction {
    /// Print an Opaque Secret manifest of the decrypted vault
    Manifest {
        /// Namespace to put in the manifest metadata
        #[arg(short, long)]
        namespace: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Directory the vault directory and config file are resolved against.
pub fn project_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir()?)
}

/// Load the config file, then apply command-line and environment
/// overrides on top of it.
pub fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_file(path)?,
        None => Settings::load(&project_dir()?)?,
    };
    apply_overrides(cli, &mut settings)?;
    Ok(settings)
}

/// Copy every flag (or `KMSVAULT_*` variable) that was given into `settings`.
pub fn apply_overrides(cli: &Cli, settings: &mut Settings) -> Result<()> {
    let overrides = [
        (&cli.project, &mut settings.project),
        (&cli.location, &mut settings.location),
        (&cli.keyring, &mut settings.keyring),
        (&cli.key, &mut settings.key),
        (&cli.vault, &mut settings.default_vault),
    ];
    for (flag, field) in overrides {
        if let Some(value) = flag {
            field.clone_from(value);
        }
    }

    if let Some(provider) = &cli.provider {
        settings.provider = provider.parse::<ProviderKind>()?;
    }
    if let Some(path) = &cli.local_key {
        settings.local_key_file = Some(path.display().to_string());
    }
    Ok(())
}

/// Build the encryption provider the settings ask for.
pub fn build_provider(settings: &Settings) -> Result<Arc<dyn KeyProvider>> {
    match settings.provider {
        ProviderKind::Local => {
            let path = settings.local_key_path();
            debug!(path = %path.display(), "using local key provider");
            let provider = LocalKeyProvider::from_key_file(&path).map_err(|e| {
                VaultError::ConfigError(format!(
                    "cannot use local key {}: {e} (run `kmsvault init --provider local` to create one)",
                    path.display()
                ))
            })?;
            Ok(Arc::new(provider))
        }
        ProviderKind::CloudKms => cloud_kms_provider(settings),
    }
}

#[cfg(feature = "cloud-kms")]
fn cloud_kms_provider(settings: &Settings) -> Result<Arc<dyn KeyProvider>> {
    debug!(endpoint = %settings.kms_endpoint, "using Cloud KMS provider");
    Ok(Arc::new(crate::provider::CloudKmsProvider::new(
        &settings.kms_endpoint,
        settings.request_timeout(),
    )))
}

#[cfg(not(feature = "cloud-kms"))]
fn cloud_kms_provider(_settings: &Settings) -> Result<Arc<dyn KeyProvider>> {
    Err(VaultError::ConfigError(
        "this build has no Cloud KMS support; use --provider local".into(),
    ))
}

/// Everything `Vault` needs, taken from resolved settings.
pub fn vault_config(settings: &Settings) -> Result<VaultConfig> {
    Ok(VaultConfig {
        name: settings.default_vault.clone(),
        root: project_dir()?,
        vault_dir: settings.vault_dir.clone(),
        identity: settings.identity(),
        bulk: settings.bulk_options(),
    })
}

/// Open the selected vault, which must already exist.
pub fn open_vault(cli: &Cli) -> Result<Vault> {
    let settings = resolve_settings(cli)?;
    let provider = build_provider(&settings)?;
    Vault::open(vault_config(&settings)?, provider)
}

/// Open the selected vault, creating it on first use.
pub fn open_or_create_vault(cli: &Cli) -> Result<Vault> {
    let settings = resolve_settings(cli)?;
    let provider = build_provider(&settings)?;
    Vault::load_or_create(vault_config(&settings)?, provider)
}
