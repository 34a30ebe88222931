//! Monzo API endpoints and request defaults
//!
//! The auth host serves the browser consent page; everything else, including
//! the OAuth token and logout endpoints, lives on the API host.

use std::time::Duration;

/// Browser-facing authorization page.
pub const MONZO_AUTH_URL: &str = "https://auth.monzo.com";

/// Base URL for every API call, including token exchange.
pub const MONZO_API_URL: &str = "https://api.monzo.com";

/// Token endpoint for code exchange and token refresh (relative to the API base).
pub const TOKEN_PATH: &str = "/oauth2/token";

/// Access token invalidation endpoint (relative to the API base).
pub const LOGOUT_PATH: &str = "/oauth2/logout";

/// Timeout applied to a request when the caller does not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
