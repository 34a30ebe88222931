//! Configuration errors

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_file() {
        let err = Error::Io {
            path: PathBuf::from("/etc/monzo-viewer.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let message = err.to_string();
        assert!(message.contains("/etc/monzo-viewer.toml"), "got: {message}");
        assert!(message.contains("no such file"), "got: {message}");
    }

    #[test]
    fn config_error_display() {
        let err = Error::Config("timeout_secs must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: timeout_secs must be greater than 0"
        );
    }
}
