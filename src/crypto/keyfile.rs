//! Master key files for the local provider.
//!
//! A key file is exactly 32 random bytes.  It is the only secret the
//! local provider needs, so it is written owner-only and never placed
//! inside the vault directory by default.

use std::fs;
use std::path::Path;

use zeroize::Zeroizing;

use super::keys::{MasterKey, KEY_LEN};
use crate::provider::ProviderError;

/// Generate a new random key file at `path`.
///
/// Fails if the file already exists so an existing key is never
/// overwritten (every token sealed with it would become unreadable).
pub fn generate_key_file(path: &Path) -> Result<MasterKey, ProviderError> {
    if path.exists() {
        return Err(ProviderError::Key(format!(
            "key file already exists at {}",
            path.display()
        )));
    }

    let key = MasterKey::random();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::Key(format!("cannot create key file directory: {e}"))
            })?;
        }
    }

    fs::write(path, key.as_bytes())
        .map_err(|e| ProviderError::Key(format!("failed to write key file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            ProviderError::Key(format!("failed to set key file permissions: {e}"))
        })?;
    }

    Ok(key)
}

/// Load a key file from disk and validate its length.
pub fn load_key_file(path: &Path) -> Result<MasterKey, ProviderError> {
    if !path.exists() {
        return Err(ProviderError::Key(format!(
            "key file not found at {} (run `kmsvault init --provider local` to create one)",
            path.display()
        )));
    }

    let data = Zeroizing::new(
        fs::read(path).map_err(|e| ProviderError::Key(format!("failed to read key file: {e}")))?,
    );

    MasterKey::from_slice(&data).ok_or_else(|| {
        ProviderError::Key(format!(
            "key file must be exactly {KEY_LEN} bytes, got {}",
            data.len()
        ))
    })
}
