use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};
use crate::provider::{ResourceIdentity, DEFAULT_KMS_ENDPOINT, DEFAULT_LOCATION};
use crate::vault::BulkOptions;

/// Which encryption provider to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Google Cloud KMS REST API.
    #[default]
    CloudKms,
    /// Master key file on this machine.
    Local,
}

impl FromStr for ProviderKind {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cloud-kms" | "kms" => Ok(ProviderKind::CloudKms),
            "local" => Ok(ProviderKind::Local),
            other => Err(VaultError::ConfigError(format!(
                "unknown provider '{other}'; use 'cloud-kms' or 'local'"
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::CloudKms => f.write_str("cloud-kms"),
            ProviderKind::Local => f.write_str("local"),
        }
    }
}

/// Project-level configuration, loaded from `.kmsvault.toml`.
///
/// Every field has a default so commands like `encrypt --project ..`
/// work without any config file at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Cloud project that owns the key ring.
    #[serde(default)]
    pub project: String,

    /// Key ring location (default: global).
    #[serde(default = "default_location")]
    pub location: String,

    /// Key ring name.
    #[serde(default)]
    pub keyring: String,

    /// Crypto key name.
    #[serde(default)]
    pub key: String,

    /// Directory (relative to project root) where vault files are stored.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// Vault used when `--vault` is not given.
    #[serde(default = "default_vault")]
    pub default_vault: String,

    /// Encryption provider.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Master key file for the local provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_key_file: Option<String>,

    /// Base URL of the Cloud KMS API.
    #[serde(default = "default_kms_endpoint")]
    pub kms_endpoint: String,

    /// Timeout for a single provider request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for a whole bulk operation, in seconds (0 disables it).
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,

    /// Maximum concurrent provider calls during bulk operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallelism: Option<usize>,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

fn default_vault_dir() -> String {
    "kmsvault".to_string()
}

fn default_vault() -> String {
    "main".to_string()
}

fn default_kms_endpoint() -> String {
    DEFAULT_KMS_ENDPOINT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_batch_timeout_secs() -> u64 {
    120
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            project: String::new(),
            location: default_location(),
            keyring: String::new(),
            key: String::new(),
            vault_dir: default_vault_dir(),
            default_vault: default_vault(),
            provider: ProviderKind::default(),
            local_key_file: None,
            kms_endpoint: default_kms_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
            batch_timeout_secs: default_batch_timeout_secs(),
            max_parallelism: None,
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".kmsvault.toml";

    /// Load settings from `<project_dir>/.kmsvault.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_file(&config_path)
    }

    /// Load settings from an explicit file, which must exist.
    pub fn load_file(config_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(config_path).map_err(|e| {
            VaultError::ConfigError(format!("Failed to read {}: {e}", config_path.display()))
        })?;

        toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }

    /// Write these settings as TOML to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| VaultError::SerializationError(format!("config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The configured key as a provider resource identity.
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(&self.project, &self.location, &self.keyring, &self.key)
    }

    /// Bulk operation tuning.
    pub fn bulk_options(&self) -> BulkOptions {
        BulkOptions {
            max_parallelism: self.max_parallelism.filter(|n| *n > 0),
            batch_timeout: (self.batch_timeout_secs > 0)
                .then(|| Duration::from_secs(self.batch_timeout_secs)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Where the local provider's master key lives.
    ///
    /// Defaults to `$HOME/.config/kmsvault/local.key`, outside the
    /// project so it is never committed next to the vault files.
    pub fn local_key_path(&self) -> PathBuf {
        if let Some(path) = &self.local_key_file {
            return PathBuf::from(path);
        }
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("kmsvault")
            .join("local.key")
    }

    /// Build the full path to a vault file.
    ///
    /// Example: `project_dir/kmsvault/main.json`
    pub fn vault_path(&self, project_dir: &Path, vault_name: &str) -> PathBuf {
        project_dir
            .join(&self.vault_dir)
            .join(format!("{vault_name}.json"))
    }
}

// ── Tests ────────────────────────────────────────────────────────────
