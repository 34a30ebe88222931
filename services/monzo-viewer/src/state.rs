//! Shared viewer state
//!
//! One `Authentication` per process, behind a `tokio::sync::Mutex` so that
//! refreshes triggered by concurrent page loads are serialised.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use monzo_api::Account;
use monzo_auth::{Authentication, CredentialSink, FileStateStore, FileSystemSink};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;

/// Settings fixed at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials_file: PathBuf,
    pub state_file: PathBuf,
    pub auth_url: String,
    pub api_url: String,
    pub redirect_url: String,
    pub timeout: Duration,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            credentials_file: config.monzo.credentials_file.clone(),
            state_file: config.monzo.state_file.clone(),
            auth_url: config.monzo.auth_url.clone(),
            api_url: config.monzo.api_url.clone(),
            redirect_url: config.redirect_url(),
            timeout: Duration::from_secs(config.server.timeout_secs),
        }
    }
}

/// Client credentials entered on step one.
#[derive(Debug, Clone)]
pub struct ClientApp {
    pub client_id: String,
    pub client_secret: Secret<String>,
}

#[derive(Debug, Default)]
pub struct ViewerState {
    pub client: Option<ClientApp>,
    pub session: Option<Authentication>,
    pub accounts: Option<Vec<Account>>,
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub http: reqwest::Client,
    pub viewer: Arc<Mutex<ViewerState>>,
}

impl AppState {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            settings: Arc::new(settings),
            http,
            viewer: Arc::new(Mutex::new(ViewerState::default())),
        })
    }

    /// A fresh, unauthenticated session for the given client app.
    pub fn new_session(&self, client: &ClientApp) -> Authentication {
        Authentication::new(
            client.client_id.clone(),
            client.client_secret.expose().clone(),
            self.settings.redirect_url.clone(),
        )
        .with_auth_url(self.settings.auth_url.clone())
        .with_api_url(self.settings.api_url.clone())
        .with_http_client(self.http.clone())
        .with_timeout(self.settings.timeout)
        .with_state_store(FileStateStore::new(&self.settings.state_file))
    }

    pub fn credential_sink(&self) -> Arc<dyn CredentialSink> {
        Arc::new(FileSystemSink::new(&self.settings.credentials_file))
    }

    /// Resume the session stored by a previous run, if any.
    pub async fn restore_session(&self) -> anyhow::Result<()> {
        let sink = FileSystemSink::new(&self.settings.credentials_file);
        let Some(credentials) = sink.fetch().await? else {
            info!(
                path = %self.settings.credentials_file.display(),
                "no stored credentials, starting unconfigured"
            );
            return Ok(());
        };
        if credentials.access_token.is_empty() {
            warn!("stored credentials have no access token, ignoring");
            return Ok(());
        }

        let client = ClientApp {
            client_id: credentials.client_id.clone(),
            client_secret: Secret::new(credentials.client_secret.clone()),
        };
        let mut session = self
            .new_session(&client)
            .with_tokens(
                credentials.access_token,
                credentials.expiry,
                credentials.refresh_token,
            );
        session.register_credential_sink(self.credential_sink());

        info!(client_id = %client.client_id, state = ?session.state(), "restored stored session");
        let mut viewer = self.viewer.lock().await;
        viewer.client = Some(client);
        viewer.session = Some(session);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::app_state;
    use super::*;
    use monzo_auth::test_support::{MockServer, Route};
    use monzo_auth::{ApiRequest, Credentials, ErrorKind, SessionState, unix_now};

    #[tokio::test]
    async fn restore_without_file_leaves_state_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path(), "http://127.0.0.1:1");

        state.restore_session().await.unwrap();
        let viewer = state.viewer.lock().await;
        assert!(viewer.session.is_none());
        assert!(viewer.client.is_none());
    }

    #[tokio::test]
    async fn restore_loads_stored_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path(), "http://127.0.0.1:1");
        FileSystemSink::new(dir.path().join("monzo.json"))
            .store(&Credentials {
                access_token: "at".into(),
                client_id: "cid".into(),
                client_secret: "csec".into(),
                expiry: unix_now() + 600,
                refresh_token: "rt".into(),
            })
            .await
            .unwrap();

        state.restore_session().await.unwrap();
        let viewer = state.viewer.lock().await;
        let session = viewer.session.as_ref().unwrap();
        assert_eq!(session.state(), SessionState::Valid);
        assert_eq!(session.client_id(), "cid");
        assert_eq!(session.refresh_token(), "rt");
        assert_eq!(viewer.client.as_ref().unwrap().client_secret.expose(), "csec");
    }

    #[tokio::test]
    async fn sessions_enforce_configured_timeout() {
        let server = MockServer::start(vec![
            Route::json("GET", "/slow", 200, serde_json::json!({}))
                .delayed(Duration::from_secs(3)),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let mut state = app_state(dir.path(), &server.url);
        Arc::make_mut(&mut state.settings).timeout = Duration::from_millis(300);

        let mut session = state
            .new_session(&ClientApp {
                client_id: "cid".into(),
                client_secret: Secret::new("csec".into()),
            })
            .with_tokens("at", unix_now() + 600, "rt");
        assert_eq!(session.request_timeout(), Duration::from_millis(300));

        let started = std::time::Instant::now();
        let err = session
            .dispatch_request(ApiRequest::get("/slow"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Http);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn new_session_uses_configured_urls() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(dir.path(), "http://127.0.0.1:1");
        let session = state.new_session(&ClientApp {
            client_id: "cid".into(),
            client_secret: Secret::new("csec".into()),
        });
        let url = session.build_authorization_url().unwrap();
        assert!(url.starts_with(
            "https://auth.example.com?client_id=cid&redirect_uri=http://127.0.0.1:8080/monzo"
        ));
        // State token is persisted for the callback half of the flow
        assert!(dir.path().join("state").exists());
    }
}
