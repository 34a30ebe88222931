//! Request description for `Authentication::dispatch_request`

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Error, Result};
use crate::transport::{Method, Payload};

/// One API call relative to the API base URL.
///
/// Defaults: authenticated, GET, empty form, no extra headers. Without an
/// explicit timeout the session's request timeout applies.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub path: String,
    pub method: Method,
    pub authenticated: bool,
    pub payload: Payload,
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            authenticated: true,
            payload: Payload::default(),
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Build from a method name such as `"post"` (case-insensitive).
    pub fn with_method_name(path: impl Into<String>, method: &str) -> Result<Self> {
        Ok(Self::new(method.parse()?, path))
    }

    /// Send without an `Authorization` header and skip the expiry check.
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Replace the payload with form pairs.
    pub fn form<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.payload = Payload::form(pairs);
        self
    }

    /// Replace the payload with raw bytes.
    pub fn raw(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.payload = Payload::raw(body);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Argument(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Argument(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
