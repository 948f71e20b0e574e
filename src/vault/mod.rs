//! Vault module: the secret store and everything it persists or emits.
//!
//! This module provides:
//! - High-level `Vault` for loading, mutating and saving vaults (`store`)
//! - Concurrent bulk encrypt/decrypt against the provider (`bulk`)
//! - On-disk JSON document, content versioning and atomic writes (`format`)
//! - json / yaml / env / shell renderings of the mapping (`export`)

pub mod bulk;
pub mod export;
pub mod format;
pub mod store;

pub use bulk::BulkOptions;
pub use export::ExportFormat;
pub use format::{compute_version, VaultDocument};
pub use store::{validate_secret_name, Vault, VaultConfig};
