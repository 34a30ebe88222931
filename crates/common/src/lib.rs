//! Shared building blocks for the Monzo client binaries
//!
//! Secret redaction, TOML configuration loading and the configuration error
//! type. Library crates keep their own error taxonomy; this one only covers
//! startup concerns.

mod config;
mod error;
mod secret;

pub use config::{CONFIG_PATH_ENV, load_toml, require_http_url, resolve_config_path};
pub use error::{Error, Result};
pub use secret::Secret;
