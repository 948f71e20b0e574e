//! Cryptographic primitives behind the local key provider.
//!
//! This module provides:
//! - AES-256-GCM sealing and opening of single values (`encryption`)
//! - HKDF-based per-resource key derivation (`keys`)
//! - Master key file generation and loading (`keyfile`)

pub mod encryption;
pub mod keyfile;
pub mod keys;

pub use encryption::{open, seal};
pub use keyfile::{generate_key_file, load_key_file};
pub use keys::{derive_resource_key, MasterKey};
