//! OAuth session and authenticated request dispatch
//!
//! `Authentication` owns one OAuth identity: the static app credentials, the
//! current token set, the CSRF state token and the registered credential
//! sinks. Every API call goes through `dispatch_request`, which refreshes an
//! expired access token before sending, so endpoint code never deals with
//! expiry.
//!
//! Session states:
//! - `Unauthenticated`: no access token
//! - `Valid`: access token present and `expiry - now >= 0`
//! - `Expired`: access token present and `expiry - now < 0`
//!
//! Token-mutating operations take `&mut self`. A session shared between
//! tasks needs an external lock, otherwise two tasks that both see an expired
//! token would each refresh and one of the rotated refresh tokens would be
//! lost.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_TIMEOUT, LOGOUT_PATH, MONZO_API_URL, MONZO_AUTH_URL};
use crate::credentials::{CredentialSink, Credentials};
use crate::error::{Error, Result};
use crate::request::ApiRequest;
use crate::state::{MemoryStateStore, StateStore, generate_state_token};
use crate::token::{self, ClientCredentials, TokenResponse};
use crate::transport::{ApiResponse, HttpIo};

/// Where a session stands in the token lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Valid,
    Expired,
}

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

pub struct Authentication {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    access_token: String,
    access_token_expiry: i64,
    refresh_token: String,
    auth_url: String,
    api: HttpIo,
    request_timeout: Duration,
    state_store: Box<dyn StateStore>,
    sinks: Vec<Arc<dyn CredentialSink>>,
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_url", &self.redirect_url)
            .field("state", &self.state())
            .field("access_token_expiry", &self.access_token_expiry)
            .field("has_refresh_token", &!self.refresh_token.is_empty())
            .field("auth_url", &self.auth_url)
            .field("api_url", &self.api.base_url())
            .field("request_timeout", &self.request_timeout)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Authentication {
    /// Create an unauthenticated session.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            access_token: String::new(),
            access_token_expiry: 0,
            refresh_token: String::new(),
            auth_url: MONZO_AUTH_URL.to_string(),
            api: HttpIo::new(reqwest::Client::new(), MONZO_API_URL),
            request_timeout: DEFAULT_TIMEOUT,
            state_store: Box::new(MemoryStateStore::new()),
            sinks: Vec::new(),
        }
    }

    /// Seed the session with previously stored tokens.
    ///
    /// `expiry` is an absolute unix timestamp in seconds; pass empty strings
    /// for tokens that are not known.
    #[must_use]
    pub fn with_tokens(
        mut self,
        access_token: impl Into<String>,
        expiry: i64,
        refresh_token: impl Into<String>,
    ) -> Self {
        self.access_token = access_token.into();
        self.access_token_expiry = expiry;
        self.refresh_token = refresh_token.into();
        self
    }

    /// Seed the session from credentials a sink stored earlier.
    pub fn from_credentials(credentials: Credentials, redirect_url: impl Into<String>) -> Self {
        Self::new(
            credentials.client_id,
            credentials.client_secret,
            redirect_url,
        )
        .with_tokens(
            credentials.access_token,
            credentials.expiry,
            credentials.refresh_token,
        )
    }

    /// Override the authorization page URL.
    #[must_use]
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Override the API base URL (token and logout endpoints included).
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api = HttpIo::new(self.api.client().clone(), url);
        self
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.api = HttpIo::new(client, self.api.base_url().to_string());
        self
    }

    /// Timeout for token calls and for requests that do not set their own.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Keep the state token somewhere other than memory.
    #[must_use]
    pub fn with_state_store(mut self, store: impl StateStore + 'static) -> Self {
        self.state_store = Box::new(store);
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Empty when not authenticated.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Absolute unix timestamp in seconds, 0 when unknown.
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Empty when no refresh token is held.
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn state(&self) -> SessionState {
        if self.access_token.is_empty() {
            SessionState::Unauthenticated
        } else if self.access_token_expiry - unix_now() < 0 {
            SessionState::Expired
        } else {
            SessionState::Valid
        }
    }

    /// Snapshot of the current credential set.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_token: self.access_token.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            expiry: self.access_token_expiry,
            refresh_token: self.refresh_token.clone(),
        }
    }

    /// The CSRF state token for the current authorization attempt.
    ///
    /// Generated and saved on first read; later reads return the same value
    /// until authentication completes.
    pub fn state_token(&self) -> Result<String> {
        if let Some(token) = self.state_store.load()? {
            return Ok(token);
        }
        let token = generate_state_token();
        self.state_store.save(&token)?;
        debug!("generated new state token");
        Ok(token)
    }

    /// URL the user visits to grant access. No network call.
    pub fn build_authorization_url(&self) -> Result<String> {
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&state={}",
            self.auth_url,
            self.client_id,
            self.redirect_url,
            self.state_token()?,
        ))
    }

    /// Finish the redirect flow: validate the echoed state and exchange the code.
    ///
    /// The state token is cleared once it has been matched, so a new attempt
    /// gets a fresh nonce. On any failure the token set is left untouched.
    pub async fn complete_authentication(
        &mut self,
        authorization_code: &str,
        state_token: &str,
    ) -> Result<()> {
        debug!("attempting authentication");
        if authorization_code.is_empty() {
            debug!("authentication failed: missing authorization code");
            return Err(Error::authentication("Code missing from response"));
        }
        if state_token != self.state_token()? {
            warn!("authentication failed: state token mismatch");
            return Err(Error::authentication("State tokens do not match"));
        }
        self.state_store.clear()?;

        let response = token::exchange_code(
            &self.api,
            ClientCredentials {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            },
            &self.redirect_url,
            authorization_code,
            self.request_timeout,
        )
        .await?;

        self.populate_tokens(response).await?;
        info!(client_id = %self.client_id, "authentication complete");
        Ok(())
    }

    /// Swap the refresh token for a new access token.
    ///
    /// Fails without any network call when no refresh token is held.
    pub async fn refresh(&mut self) -> Result<()> {
        if self.refresh_token.is_empty() {
            debug!("unable to refresh without a refresh token");
            return Err(Error::authentication(
                "Unable to refresh without a refresh token",
            ));
        }

        let response = token::refresh_access_token(
            &self.api,
            ClientCredentials {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            },
            &self.refresh_token,
            self.request_timeout,
        )
        .await
        .inspect_err(|e| warn!(error = %e, "access token refresh failed"))?;

        self.populate_tokens(response).await?;
        info!(client_id = %self.client_id, "access token refreshed");
        Ok(())
    }

    /// Send one API call.
    ///
    /// Authenticated calls refresh an expired token first (propagating the
    /// refresh failure) and carry `Authorization: Bearer <token>`. Transport
    /// errors pass through unchanged; nothing is retried.
    pub async fn dispatch_request(&mut self, request: ApiRequest) -> Result<ApiResponse> {
        let ApiRequest {
            path,
            method,
            authenticated,
            payload,
            mut headers,
            timeout,
        } = request;

        if authenticated {
            if self.state() == SessionState::Expired {
                debug!(path = %path, "access token expired, refreshing before request");
                self.refresh().await?;
            }
            let bearer = HeaderValue::from_str(&format!("Bearer {}", self.access_token))
                .map_err(|_| Error::authentication("access token is not a valid header value"))?;
            headers.insert(AUTHORIZATION, bearer);
        }

        self.api
            .execute(
                method,
                &path,
                &payload,
                &headers,
                timeout.unwrap_or(self.request_timeout),
            )
            .await
    }

    /// Invalidate the access token server-side.
    ///
    /// Local token fields are left as they are; drop the session or re-seed
    /// it to forget them.
    pub async fn logout(&mut self) -> Result<()> {
        debug!("invalidating access token");
        self.dispatch_request(ApiRequest::post(LOGOUT_PATH)).await?;
        Ok(())
    }

    /// Register a sink to be told about every new token set. No dedup.
    pub fn register_credential_sink(&mut self, sink: Arc<dyn CredentialSink>) {
        debug!(sinks = self.sinks.len() + 1, "registered credential sink");
        self.sinks.push(sink);
    }

    /// Store a token response and notify the sinks in registration order.
    ///
    /// A missing `refresh_token` keeps the one already held.
    async fn populate_tokens(&mut self, response: TokenResponse) -> Result<()> {
        self.access_token = response.access_token;
        self.access_token_expiry = unix_now() + response.expires_in;
        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = refresh_token;
        }

        let credentials = self.credentials();
        for sink in &self.sinks {
            sink.store(&credentials).await?;
        }
        Ok(())
    }
}
