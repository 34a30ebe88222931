//! CSRF state token for the authorization redirect
//!
//! The state token is generated once, kept in a `StateStore`, and compared
//! byte-for-byte against the value Monzo echoes back on the redirect. Where
//! the token lives is up to the caller: the default store is in-memory and
//! scoped to one session; `FileStateStore` survives process restarts (needed
//! when the redirect lands in a different process than the one that built
//! the URL) and is keyed by a caller-supplied path.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use tracing::debug;

use crate::error::{Error, Result};

/// Random bytes behind each state token (encodes to 64 URL-safe characters).
const STATE_TOKEN_BYTES: usize = 48;

/// Generate a fresh, URL-safe state token.
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Persistence for the state token of the authorization attempt in flight.
///
/// Methods are synchronous and are called from async code, including
/// `Authentication::complete_authentication`. Implementations must only do
/// short blocking work; `FileStateStore` reads and writes one small file.
pub trait StateStore: Send + Sync {
    /// Previously saved token, if any.
    fn load(&self) -> Result<Option<String>>;

    fn save(&self, token: &str) -> Result<()>;

    /// Forget the token once the attempt it belongs to is over.
    fn clear(&self) -> Result<()>;
}

/// Session-scoped store. This is the default.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    token: Mutex<Option<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.token
            .lock()
            .map_err(|_| Error::General("state token store lock poisoned".into()))
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.lock()? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

/// File-backed store. The file holds the bare token.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::General(format!(
                "reading state token file {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        std::fs::write(&self.path, token).map_err(|e| {
            Error::General(format!(
                "writing state token file {}: {e}",
                self.path.display()
            ))
        })?;
        debug!(path = %self.path.display(), "persisted state token");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::General(format!(
                "removing state token file {}: {e}",
                self.path.display()
            ))),
        }
    }
}
