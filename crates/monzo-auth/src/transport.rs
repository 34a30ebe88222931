//! Low-level HTTP transport
//!
//! `HttpIo` executes one request against a base URL and normalizes the
//! outcome: a 2xx yields an `ApiResponse`, anything else yields the
//! classified error. Callers never see a raw `reqwest` error.
//!
//! Form payloads are URL-encoded. GET and DELETE fold them into the query
//! string; POST, PUT and PATCH send them as the request body. Raw payloads
//! (file uploads, pre-serialized JSON) are sent verbatim.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::classify::classify_status;
use crate::error::{Error, Result};

/// HTTP verbs the Monzo API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    /// Whether form data travels in the query string rather than the body.
    fn uses_query_string(self) -> bool {
        matches!(self, Method::Get | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_reqwest().as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Case-insensitive: `"post"`, `"POST"` and `"Post"` all parse.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(Error::Http(format!(
                "Specified HTTP method is not supported: {s}"
            ))),
        }
    }
}

/// Request data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Key/value pairs, URL-encoded. Order is preserved and keys may repeat.
    Form(Vec<(String, String)>),
    /// Bytes sent exactly as given.
    Raw(Vec<u8>),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Form(Vec::new())
    }
}

impl Payload {
    /// Build a form payload from any iterator of string-like pairs.
    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Payload::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn raw(body: impl Into<Vec<u8>>) -> Self {
        Payload::Raw(body.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Form(pairs) => pairs.is_empty(),
            Payload::Raw(bytes) => bytes.is_empty(),
        }
    }
}

/// URL-encode form pairs (`application/x-www-form-urlencoded`).
pub fn encode_form(pairs: &[(String, String)]) -> Result<String> {
    serde_urlencoded::to_string(pairs)
        .map_err(|e| Error::Argument(format!("could not encode form data: {e}")))
}

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    /// The server returned no content.
    Empty,
}

/// Successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl ApiResponse {
    /// Borrow the JSON body, failing if the response was empty.
    pub fn json(&self) -> Result<&serde_json::Value> {
        match &self.body {
            ResponseBody::Json(value) => Ok(value),
            ResponseBody::Empty => Err(Error::General(format!(
                "expected a JSON body, got an empty {} response",
                self.status
            ))),
        }
    }

    /// Deserialize the JSON body into a typed value.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.json()?;
        T::deserialize(value)
            .map_err(|e| Error::General(format!("unexpected response shape: {e}")))
    }
}

/// HTTP executor bound to one base URL.
#[derive(Debug, Clone)]
pub struct HttpIo {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIo {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Execute one request and normalize the outcome.
    ///
    /// No retry is attempted; a timeout surfaces as `Error::Http`.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        payload: &Payload,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<ApiResponse> {
        let mut url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut body: Option<Vec<u8>> = None;
        let mut form_body = false;

        match payload {
            Payload::Form(pairs) if pairs.is_empty() => {}
            Payload::Form(pairs) if method.uses_query_string() => {
                let separator = if url.contains('?') { '&' } else { '?' };
                url = format!("{url}{separator}{}", encode_form(pairs)?);
            }
            Payload::Form(pairs) => {
                body = Some(encode_form(pairs)?.into_bytes());
                form_body = true;
            }
            Payload::Raw(bytes) => body = Some(bytes.clone()),
        }

        debug!(%method, path, "sending request");

        let mut request = self
            .client
            .request(method.as_reqwest(), &url)
            .headers(headers.clone())
            .timeout(timeout);
        if form_body && !headers.contains_key(CONTENT_TYPE) {
            request = request.header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            debug!(%method, path, status = status.as_u16(), "request failed");
            return Err(classify_status(status.as_u16(), &text));
        }

        let body = if text.trim().is_empty() {
            ResponseBody::Empty
        } else {
            let value = serde_json::from_str(&text)
                .map_err(|e| Error::General(format!("malformed JSON response: {e}")))?;
            ResponseBody::Json(value)
        };

        Ok(ApiResponse {
            status: status.as_u16(),
            headers: response_headers,
            body,
        })
    }
}

/// Collapse a `reqwest` failure into the taxonomy.
fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Http(format!("request timed out: {e}"))
    } else if e.is_connect() {
        Error::Http(format!("connection failed: {e}"))
    } else {
        Error::Http(format!("request failed: {e}"))
    }
}
