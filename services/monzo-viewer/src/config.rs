//! Configuration types and loading
//!
//! Config file location: `--config` flag > `CONFIG_PATH` env var >
//! `monzo-viewer.toml`. Client id and secret are never read from the file;
//! they are entered in the browser or recovered from the credentials file.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use monzo_auth::{MONZO_API_URL, MONZO_AUTH_URL};

pub const DEFAULT_CONFIG_FILE: &str = "monzo-viewer.toml";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub monzo: MonzoConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Per-call timeout for requests to Monzo.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Deserialize)]
pub struct MonzoConfig {
    /// Where the filesystem sink keeps issued credentials.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,
    /// Where the state token lives between the two halves of the redirect.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    64
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("monzo.json")
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".monzo-state")
}

fn default_auth_url() -> String {
    MONZO_AUTH_URL.to_string()
}

fn default_api_url() -> String {
    MONZO_API_URL.to_string()
}

impl Config {
    pub fn load(path: &Path) -> common::Result<Self> {
        let config: Config = common::load_toml(path)?;

        common::require_http_url("auth_url", &config.monzo.auth_url)?;
        common::require_http_url("api_url", &config.monzo.api_url)?;

        if config.server.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        common::resolve_config_path(cli_path, DEFAULT_CONFIG_FILE)
    }

    /// OAuth redirect target: the `/monzo` callback on this server.
    pub fn redirect_url(&self) -> String {
        format!("http://{}/monzo", self.server.listen_addr)
    }
}
