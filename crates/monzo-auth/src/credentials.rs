//! Credential sinks
//!
//! A `CredentialSink` is notified every time `Authentication` is issued new
//! tokens, in registration order, inline with the call that obtained them.
//! Sink errors are not caught: a failing sink fails the operation that
//! triggered it, after the in-memory tokens have already been updated.
//!
//! Two sinks ship with the crate: `FileSystemSink` (JSON file, atomic write)
//! and `EchoSink` (prints the fields to stdout).

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Everything a sink needs to rebuild a session later.
///
/// `expiry` is an absolute unix timestamp in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub expiry: i64,
    #[serde(default)]
    pub refresh_token: String,
}

/// Observer for newly issued credentials.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn CredentialSink>`).
pub trait CredentialSink: Send + Sync {
    /// Persist or publish a freshly issued credential set.
    fn store<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Previously stored credentials, for bootstrapping a session.
    ///
    /// Never called by `Authentication`. Sinks that cannot read back return `None`.
    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<Option<Credentials>>> + Send + '_>> {
        Box::pin(async { Ok(None) })
    }
}

/// Stores credentials as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSystemSink {
    path: PathBuf,
}

impl FileSystemSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialSink for FileSystemSink {
    fn store<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(write_atomic(&self.path, credentials))
    }

    fn fetch(&self) -> Pin<Box<dyn Future<Output = Result<Option<Credentials>>> + Send + '_>> {
        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(&self.path).await {
                Ok(c) => c,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %self.path.display(), "credential file not found");
                    return Ok(None);
                }
                Err(e) => {
                    return Err(Error::General(format!("reading credential file: {e}")));
                }
            };
            let credentials = serde_json::from_str(&contents)
                .map_err(|e| Error::General(format!("parsing credential file: {e}")))?;
            Ok(Some(credentials))
        })
    }
}

/// Prints credentials to stdout, one `key = value` line per field.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoSink;

impl EchoSink {
    fn render(credentials: &Credentials) -> String {
        format!(
            "client_id = '{}'\nclient_secret = '{}'\naccess_token = '{}'\nexpiry = {}\nrefresh_token = '{}'\n",
            credentials.client_id,
            credentials.client_secret,
            credentials.access_token,
            credentials.expiry,
            credentials.refresh_token,
        )
    }
}

impl CredentialSink for EchoSink {
    fn store<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        print!("{}", Self::render(credentials));
        Box::pin(async { Ok(()) })
    }
}

/// Distinguishes temp files of concurrent writes within one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write credentials to a file atomically.
///
/// Writes a temp file beside the target and renames it over the target, so
/// a crash mid-write never leaves a truncated file. Permissions are 0600 on
/// unix since the file holds tokens and the client secret.
async fn write_atomic(path: &Path, credentials: &Credentials) -> Result<()> {
    let json = serde_json::to_string_pretty(credentials)
        .map_err(|e| Error::General(format!("serializing credentials: {e}")))?;

    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let tmp_path = dir.join(format!(
        ".monzo-credentials.tmp.{}.{}",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::General(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::General(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::General(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
