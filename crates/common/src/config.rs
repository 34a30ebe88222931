//! TOML configuration helpers

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Environment variable naming the config file when no CLI flag is given.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Read and parse a TOML file.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Config file location: CLI flag, then `CONFIG_PATH`, then `default`.
pub fn resolve_config_path(cli_path: Option<&str>, default: &str) -> PathBuf {
    if let Some(p) = cli_path {
        return PathBuf::from(p);
    }
    if let Ok(p) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(p);
    }
    PathBuf::from(default)
}

/// Reject URLs without an http(s) scheme.
pub fn require_http_url(field: &str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{field} must start with http:// or https://, got: {value}"
        )))
    }
}
