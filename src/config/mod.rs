//! Project configuration (`.kmsvault.toml`).

pub mod settings;

pub use settings::{ProviderKind, Settings};
