//! High-level vault operations used by CLI commands.
//!
//! A `Vault` owns the name → ciphertext mapping of one vault file and a
//! handle to the encryption provider.  Values only ever reach the
//! mapping as ciphertext, except after `decrypt_all`, which flips the
//! vault into a read-only "decrypted" state that can be exported but
//! never saved.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::errors::{Result, VaultError};
use crate::provider::{KeyProvider, Operation, ResourceIdentity};

use super::bulk::{self, BulkOptions};
use super::export::ExportFormat;
use super::format::{self, VaultDocument};

/// Plaintext used to check that a new vault's key is usable.
const KEY_CHECK_PLAINTEXT: &[u8] = b"kmsvault-key-check";

/// Everything needed to build a `Vault`.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault name; the file is `<root>/<vault_dir>/<name>.json`.
    pub name: String,

    /// Directory the vault directory lives in (usually the cwd).
    pub root: PathBuf,

    /// Name of the vault directory under `root`.
    pub vault_dir: String,

    /// Key to encrypt new values with.
    pub identity: ResourceIdentity,

    /// Fan-out settings for bulk operations.
    pub bulk: BulkOptions,
}

/// The main vault handle.
pub struct Vault {
    name: String,
    path: PathBuf,
    version: u64,
    secrets: HashMap<String, String>,
    identity: ResourceIdentity,
    provider: Arc<dyn KeyProvider>,
    bulk: BulkOptions,

    /// The file did not exist before this process touched it.
    is_new: bool,
    /// A previous on-disk state was read successfully.
    loaded: bool,
    /// Values in `secrets` are plaintext.
    decrypted: bool,
    /// Identity and key were verified by a trial encrypt.
    key_checked: bool,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("secrets", &self.secrets.len())
            .field("identity", &self.identity)
            .field("is_new", &self.is_new)
            .field("loaded", &self.loaded)
            .field("decrypted", &self.decrypted)
            .finish_non_exhaustive()
    }
}

impl Vault {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Build an in-memory vault.  Nothing is read or written until
    /// `load`, `save` or `load_or_create` is called.
    pub fn new(config: VaultConfig, provider: Arc<dyn KeyProvider>) -> Self {
        let path = config
            .root
            .join(&config.vault_dir)
            .join(format!("{}.json", config.name));

        Self {
            name: config.name,
            path,
            version: 0,
            secrets: HashMap::new(),
            identity: config.identity,
            provider,
            bulk: config.bulk,
            is_new: false,
            loaded: false,
            decrypted: false,
            key_checked: false,
        }
    }

    /// Build a vault and load its existing file.
    ///
    /// Fails with `VaultNotFound` if the file does not exist.
    pub fn open(config: VaultConfig, provider: Arc<dyn KeyProvider>) -> Result<Self> {
        let mut vault = Self::new(config, provider);
        if !vault.exists()? {
            return Err(VaultError::VaultNotFound(vault.path));
        }
        vault.load()?;
        Ok(vault)
    }

    /// Build a vault, loading its file if present and creating it
    /// otherwise.
    pub fn load_or_create(config: VaultConfig, provider: Arc<dyn KeyProvider>) -> Result<Self> {
        let mut vault = Self::new(config, provider);
        vault.ensure_exists()?;
        Ok(vault)
    }

    // ------------------------------------------------------------------
    // Secret operations
    // ------------------------------------------------------------------

    /// Encrypt `plaintext` and store it under `name`, replacing any
    /// previous value.  Does not persist.
    pub fn set_secret(&mut self, name: &str, plaintext: &str) -> Result<()> {
        validate_secret_name(name)?;
        self.ensure_encrypted()?;

        let ciphertext = self
            .provider
            .encrypt(&self.identity, plaintext.as_bytes())
            .map_err(|source| VaultError::Provider {
                operation: Operation::Encrypt,
                key: Some(name.to_string()),
                source,
            })?;

        self.secrets.insert(name.to_string(), ciphertext);
        Ok(())
    }

    /// Remove `name`.  Returns whether it was present; removing a
    /// missing secret is not an error.
    pub fn remove_secret(&mut self, name: &str) -> bool {
        self.secrets.remove(name).is_some()
    }

    /// Decrypt and return the value stored under `name`.
    ///
    /// After `decrypt_all` the value is already plaintext and is
    /// returned without another provider call.
    pub fn get_secret(&self, name: &str) -> Result<String> {
        let value = self
            .secrets
            .get(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| VaultError::SecretNotFound(name.to_string()))?;

        if self.decrypted {
            return Ok(value.clone());
        }

        let bytes = self
            .provider
            .decrypt(&self.identity, value)
            .map_err(|source| VaultError::Provider {
                operation: Operation::Decrypt,
                key: Some(name.to_string()),
                source,
            })?;

        String::from_utf8(bytes).map_err(|_| VaultError::Provider {
            operation: Operation::Decrypt,
            key: Some(name.to_string()),
            source: crate::provider::ProviderError::InvalidUtf8,
        })
    }

    // ------------------------------------------------------------------
    // Bulk operations
    // ------------------------------------------------------------------

    /// Decrypt every secret concurrently and replace the ciphertexts in
    /// memory.  All-or-nothing: on failure the vault is unchanged.
    ///
    /// A decrypted vault refuses `save` and further mutation.
    pub fn decrypt_all(&mut self) -> Result<()> {
        if self.decrypted {
            return Ok(());
        }

        let plaintext = bulk::run(
            &self.provider,
            &self.identity,
            Operation::Decrypt,
            &self.secrets,
            &self.bulk,
        )?;

        self.secrets = plaintext;
        self.decrypted = true;
        Ok(())
    }

    /// Encrypt every value of `env_map` concurrently, returning a new
    /// name → ciphertext map.  The vault itself is not modified.
    pub fn encrypt_env_map(
        &self,
        env_map: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>> {
        for name in env_map.keys() {
            validate_secret_name(name)?;
        }

        bulk::run(
            &self.provider,
            &self.identity,
            Operation::Encrypt,
            env_map,
            &self.bulk,
        )
    }

    /// Fold an encrypted map (from `encrypt_env_map`) into the vault.
    /// Keys are added or overwritten; nothing is removed.
    pub fn merge_encrypted_env_map(&mut self, encrypted: HashMap<String, String>) -> Result<()> {
        self.ensure_encrypted()?;
        self.secrets.extend(encrypted);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Render the current mapping as `format` (json, yaml/yml, env, shell).
    pub fn marshal_as(&self, format: &str) -> Result<String> {
        format.parse::<ExportFormat>()?.render(&self.secrets)
    }

    /// Every value base64-encoded, in key order.
    pub fn base64_encode(&self) -> BTreeMap<String, String> {
        self.secrets
            .iter()
            .map(|(k, v)| (k.clone(), BASE64.encode(v)))
            .collect()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Whether the vault file is present.  Only "not found" counts as
    /// absent; any other filesystem error is returned.
    pub fn exists(&self) -> Result<bool> {
        match fs::metadata(&self.path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Create the vault directory and an empty placeholder file if the
    /// vault does not exist yet.
    pub fn create_if_not_exists(&mut self) -> Result<()> {
        if self.exists()? {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::File::create(&self.path)?;
        self.is_new = true;
        Ok(())
    }

    /// Read and parse the vault file, replacing the in-memory state.
    ///
    /// Identity fields recorded in the file take precedence over the
    /// configured ones, since the stored ciphertexts were made with them.
    pub fn load(&mut self) -> Result<()> {
        let bytes = fs::read(&self.path)?;
        let doc = format::parse_document(&bytes)?;

        let configured = std::mem::replace(&mut self.identity, doc.identity);
        self.identity.fill_from(&configured);
        self.version = doc.version;
        self.secrets = doc.secrets.into_iter().collect();
        self.decrypted = false;
        self.loaded = true;
        Ok(())
    }

    /// Load the file if it exists; otherwise mark the vault new and
    /// write an initial (empty) file.
    pub fn ensure_exists(&mut self) -> Result<()> {
        if self.exists()? {
            return self.load();
        }
        self.is_new = true;
        self.save()
    }

    /// Recompute the version and write the vault to disk atomically.
    ///
    /// A vault that was never loaded and has no file yet counts as new.
    /// New vaults must have a complete identity and a key that accepts
    /// a trial encrypt; otherwise nothing is written.
    pub fn save(&mut self) -> Result<()> {
        if self.decrypted {
            return Err(VaultError::PlaintextSave(self.name.clone()));
        }

        if !self.loaded && !self.is_new && !self.exists()? {
            self.is_new = true;
        }

        if self.is_new && !self.key_checked {
            self.validate_identity()?;
            self.key_checked = true;
        }

        self.version = format::compute_version(&self.secrets);

        let doc = VaultDocument {
            version: self.version,
            secrets: self
                .secrets
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            identity: self.identity.clone(),
        };
        let bytes = format::render_document(&doc)?;

        self.create_if_not_exists()?;
        format::write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    fn validate_identity(&self) -> Result<()> {
        let missing = self.identity.missing_fields();
        if !missing.is_empty() {
            return Err(VaultError::MissingIdentity(missing));
        }

        self.provider
            .encrypt(&self.identity, KEY_CHECK_PLAINTEXT)
            .map_err(|source| VaultError::KeyCheckFailed {
                resource: self.identity.resource_name(),
                source,
            })?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path to the vault file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content version as of the last load or save.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    /// The provider resource name of this vault's key.
    pub fn kms_key_name(&self) -> String {
        self.identity.resource_name()
    }

    /// Current name → value mapping (ciphertext unless decrypted).
    pub fn secrets(&self) -> &HashMap<String, String> {
        &self.secrets
    }

    /// Secret names in sorted order.
    pub fn secret_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.secrets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.secrets.contains_key(name)
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_decrypted(&self) -> bool {
        self.decrypted
    }

    fn ensure_encrypted(&self) -> Result<()> {
        if self.decrypted {
            return Err(VaultError::VaultDecrypted(self.name.clone()));
        }
        Ok(())
    }
}

/// Validate that a secret name is safe to use as an env var name.
///
/// Allowed: ASCII letters, digits, underscores, hyphens, periods.
/// Must be non-empty and at most 256 characters.
pub fn validate_secret_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(VaultError::InvalidSecretName(
            "secret name cannot be empty".into(),
        ));
    }
    if name.len() > 256 {
        return Err(VaultError::InvalidSecretName(
            "secret name cannot exceed 256 characters".into(),
        ));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(VaultError::InvalidSecretName(format!(
            "'{name}' contains invalid characters; only ASCII letters, digits, underscores, hyphens, and periods are allowed"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Wraps values as `CT(<value>)`; refuses keys named "broken".
    #[derive(Default)]
    struct Wrap {
        encrypts: AtomicUsize,
    }

    impl KeyProvider for Wrap {
        fn encrypt(
            &self,
            identity: &ResourceIdentity,
            plaintext: &[u8],
        ) -> std::result::Result<String, ProviderError> {
            if identity.key == "broken" {
                return Err(ProviderError::Status(404));
            }
            self.encrypts.fetch_add(1, Ordering::SeqCst);
            Ok(format!("CT({})", String::from_utf8_lossy(plaintext)))
        }

        fn decrypt(
            &self,
            _: &ResourceIdentity,
            ciphertext: &str,
        ) -> std::result::Result<Vec<u8>, ProviderError> {
            ciphertext
                .strip_prefix("CT(")
                .and_then(|s| s.strip_suffix(')'))
                .map(|s| s.as_bytes().to_vec())
                .ok_or_else(|| ProviderError::InvalidCiphertext(ciphertext.to_string()))
        }
    }

    fn config(dir: &TempDir, key: &str) -> VaultConfig {
        VaultConfig {
            name: "main".into(),
            root: dir.path().to_path_buf(),
            vault_dir: "kmsvault".into(),
            identity: ResourceIdentity::new("acme", "global", "ring", key),
            bulk: BulkOptions::default(),
        }
    }

    #[test]
    fn path_is_derived_from_name() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::new(config(&dir, "k"), Arc::new(Wrap::default()));
        assert_eq!(vault.path(), dir.path().join("kmsvault").join("main.json"));
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut vault = Vault::new(config(&dir, "k"), Arc::new(Wrap::default()));

        vault.set_secret("DB_PASS", "hunter2").unwrap();

        assert_eq!(vault.secrets()["DB_PASS"], "CT(hunter2)");
        assert_eq!(vault.get_secret("DB_PASS").unwrap(), "hunter2");
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut vault = Vault::new(config(&dir, "k"), Arc::new(Wrap::default()));
        vault.set_secret("A", "1").unwrap();

        assert!(vault.remove_secret("A"));
        assert!(!vault.remove_secret("A"));
        assert!(matches!(
            vault.get_secret("A"),
            Err(VaultError::SecretNotFound(_))
        ));
    }

    #[test]
    fn set_secret_wraps_provider_errors_with_key() {
        let dir = TempDir::new().unwrap();
        let mut vault = Vault::new(config(&dir, "broken"), Arc::new(Wrap::default()));

        match vault.set_secret("A", "1") {
            Err(VaultError::Provider {
                operation, key, ..
            }) => {
                assert_eq!(operation, Operation::Encrypt);
                assert_eq!(key.as_deref(), Some("A"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!vault.contains_key("A"));
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert!(validate_secret_name("").is_err());
        assert!(validate_secret_name("HAS SPACE").is_err());
        assert!(validate_secret_name("a=b").is_err());
        assert!(validate_secret_name(&"A".repeat(257)).is_err());
        assert!(validate_secret_name("DB_URL").is_ok());
        assert!(validate_secret_name("app.db-url").is_ok());
    }

    #[test]
    fn save_validates_new_vault_only_once() {
        let dir = TempDir::new().unwrap();
        let provider = Arc::new(Wrap::default());
        let mut vault = Vault::load_or_create(config(&dir, "k"), provider.clone()).unwrap();
        assert!(vault.is_new());
        assert_eq!(provider.encrypts.load(Ordering::SeqCst), 1);

        vault.save().unwrap();
        assert_eq!(provider.encrypts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn decrypted_vault_cannot_be_mutated() {
        let dir = TempDir::new().unwrap();
        let mut vault = Vault::new(config(&dir, "k"), Arc::new(Wrap::default()));
        vault.set_secret("A", "1").unwrap();
        vault.decrypt_all().unwrap();

        assert!(matches!(
            vault.set_secret("B", "2"),
            Err(VaultError::VaultDecrypted(_))
        ));
        assert!(vault
            .merge_encrypted_env_map(HashMap::new())
            .is_err());
        assert_eq!(vault.get_secret("A").unwrap(), "1");
    }

    #[test]
    fn base64_encode_encodes_every_value() {
        let dir = TempDir::new().unwrap();
        let mut vault = Vault::new(config(&dir, "k"), Arc::new(Wrap::default()));
        vault.set_secret("A", "x").unwrap();

        let encoded = vault.base64_encode();
        assert_eq!(encoded["A"], BASE64.encode("CT(x)"));
    }
}
