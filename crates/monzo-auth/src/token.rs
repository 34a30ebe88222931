//! OAuth token exchange and refresh
//!
//! Both calls POST a form to the token endpoint on the API host, without an
//! `Authorization` header, and go straight to the transport. They must not
//! go through `Authentication::dispatch_request`, which refreshes expired
//! tokens itself and would recurse.

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::TOKEN_PATH;
use crate::error::{Error, Result};
use crate::transport::{HttpIo, Method, Payload};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from the response time; the caller
/// turns it into an absolute expiry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    /// Absent on some refresh responses.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Static application credentials sent with every token request.
#[derive(Debug, Clone, Copy)]
pub struct ClientCredentials<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

/// Exchange an authorization code for tokens.
///
/// Any failure, including a 2xx without the expected fields, becomes an
/// authentication error chaining the cause.
pub async fn exchange_code(
    io: &HttpIo,
    client: ClientCredentials<'_>,
    redirect_url: &str,
    code: &str,
    timeout: Duration,
) -> Result<TokenResponse> {
    debug!("exchanging authorization code for an access token");
    let payload = Payload::form([
        ("grant_type", "authorization_code"),
        ("client_id", client.client_id),
        ("client_secret", client.client_secret),
        ("redirect_uri", redirect_url),
        ("code", code),
    ]);

    request_token(io, &payload, timeout)
        .await
        .map_err(|e| Error::authentication_caused_by("Could not fetch a valid access token", e))
}

/// Obtain a new access token from a refresh token.
pub async fn refresh_access_token(
    io: &HttpIo,
    client: ClientCredentials<'_>,
    refresh_token: &str,
    timeout: Duration,
) -> Result<TokenResponse> {
    debug!("refreshing access token");
    let payload = Payload::form([
        ("grant_type", "refresh_token"),
        ("client_id", client.client_id),
        ("client_secret", client.client_secret),
        ("refresh_token", refresh_token),
    ]);

    request_token(io, &payload, timeout)
        .await
        .map_err(|e| Error::authentication_caused_by("Could not refresh the access token", e))
}

async fn request_token(io: &HttpIo, payload: &Payload, timeout: Duration) -> Result<TokenResponse> {
    let response = io
        .execute(Method::Post, TOKEN_PATH, payload, &HeaderMap::new(), timeout)
        .await?;
    response.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::{MockServer, Route};
    use std::error::Error as _;

    const CLIENT: ClientCredentials<'static> = ClientCredentials {
        client_id: "cid",
        client_secret: "csec",
    };

    #[test]
    fn token_response_deserializes() {
        let json = r#"{"access_token":"at_abc","refresh_token":"rt_def","expires_in":3600}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "at_abc");
        assert_eq!(token.refresh_token.as_deref(), Some("rt_def"));
        assert_eq!(token.expires_in, 3600);
    }

    #[test]
    fn token_response_without_refresh_token() {
        let json = r#"{"access_token":"at_abc","expires_in":21600,"token_type":"Bearer"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(token.refresh_token.is_none());
    }

    #[tokio::test]
    async fn exchange_posts_authorization_code_grant() {
        let server = MockServer::start(vec![Route::json(
            "POST",
            TOKEN_PATH,
            200,
            serde_json::json!({"access_token": "T", "expires_in": 3600, "refresh_token": "R"}),
        )])
        .await;
        let io = HttpIo::new(reqwest::Client::new(), server.url.clone());

        let token = exchange_code(&io, CLIENT, "http://x/cb", "code123", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(token.access_token, "T");

        let requests = server.requests_to(TOKEN_PATH);
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, "POST");
        assert!(request.header("authorization").is_none());
        assert_eq!(
            request.form(),
            vec![
                ("grant_type".to_string(), "authorization_code".to_string()),
                ("client_id".to_string(), "cid".to_string()),
                ("client_secret".to_string(), "csec".to_string()),
                ("redirect_uri".to_string(), "http://x/cb".to_string()),
                ("code".to_string(), "code123".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn refresh_posts_refresh_token_grant() {
        let server = MockServer::start(vec![Route::json(
            "POST",
            TOKEN_PATH,
            200,
            serde_json::json!({"access_token": "T2", "expires_in": 600}),
        )])
        .await;
        let io = HttpIo::new(reqwest::Client::new(), server.url.clone());

        let token = refresh_access_token(&io, CLIENT, "r1", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(token.access_token, "T2");
        assert!(token.refresh_token.is_none());

        let request = &server.requests_to(TOKEN_PATH)[0];
        assert_eq!(request.form_value("grant_type").as_deref(), Some("refresh_token"));
        assert_eq!(request.form_value("refresh_token").as_deref(), Some("r1"));
        assert_eq!(request.form_value("client_secret").as_deref(), Some("csec"));
    }

    #[tokio::test]
    async fn exchange_failure_is_authentication_error_with_source() {
        let server = MockServer::start(vec![Route::json(
            "POST",
            TOKEN_PATH,
            400,
            serde_json::json!({"code": "bad_request.invalid_grant"}),
        )])
        .await;
        let io = HttpIo::new(reqwest::Client::new(), server.url.clone());

        let err = exchange_code(&io, CLIENT, "http://x/cb", "bogus", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        let source = err.source().expect("transport error chained");
        assert!(source.to_string().contains("400"), "got: {source}");
    }

    #[tokio::test]
    async fn refresh_with_incomplete_response_is_authentication_error() {
        let server = MockServer::start(vec![Route::json(
            "POST",
            TOKEN_PATH,
            200,
            serde_json::json!({"token_type": "Bearer"}),
        )])
        .await;
        let io = HttpIo::new(reqwest::Client::new(), server.url.clone());

        let err = refresh_access_token(&io, CLIENT, "r1", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
}
