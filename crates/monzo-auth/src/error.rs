//! Error taxonomy for Monzo API operations
//!
//! `Error` is the root kind: callers match a single variant to catch narrowly
//! or propagate the whole enum to catch broadly. Every transport failure is
//! mapped into one of these variants before it leaves the crate.

/// Errors from authentication, transport and request construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// OAuth failure: missing code, state mismatch, missing refresh token,
    /// HTTP 401, or a failed exchange/refresh (chained via `source`).
    #[error("authentication error: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Request-shape errors (400, 404) and connectivity failures.
    #[error("HTTP error: {0}")]
    Http(String),

    /// HTTP 403: authenticated but missing the required scope.
    #[error("permissions error: {0}")]
    Permissions(String),

    /// HTTP 429.
    #[error("rate limit error: {0}")]
    Rate(String),

    /// HTTP 500/504.
    #[error("server error: {0}")]
    Server(String),

    /// HTTP 405/406, unmapped statuses and local validation failures.
    #[error("general error: {0}")]
    General(String),

    /// Invalid argument passed to a request-construction helper.
    #[error("argument error: {0}")]
    Argument(String),
}

/// Copyable discriminant of [`Error`], for narrow matching in tests and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Http,
    Permissions,
    Rate,
    Server,
    General,
    Argument,
}

impl Error {
    /// Authentication error without an underlying cause.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
            source: None,
        }
    }

    /// Authentication error chaining the failure that caused it.
    pub fn authentication_caused_by(message: impl Into<String>, source: Error) -> Self {
        Error::Authentication {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Http(_) => ErrorKind::Http,
            Error::Permissions(_) => ErrorKind::Permissions,
            Error::Rate(_) => ErrorKind::Rate,
            Error::Server(_) => ErrorKind::Server,
            Error::General(_) => ErrorKind::General,
            Error::Argument(_) => ErrorKind::Argument,
        }
    }
}

/// Result alias for Monzo operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn authentication_error_chains_source() {
        let err = Error::authentication_caused_by(
            "Could not refresh the access token",
            Error::Server("500 Internal Server Error".into()),
        );
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(
            err.to_string(),
            "authentication error: Could not refresh the access token"
        );
        let source = err.source().expect("chained source");
        assert!(source.to_string().contains("500"), "got: {source}");
    }

    #[test]
    fn plain_authentication_error_has_no_source() {
        let err = Error::authentication("State tokens do not match");
        assert!(err.source().is_none());
        assert!(err.to_string().contains("State tokens do not match"));
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Error::Http("x".into()).kind(), ErrorKind::Http);
        assert_eq!(Error::Permissions("x".into()).kind(), ErrorKind::Permissions);
        assert_eq!(Error::Rate("x".into()).kind(), ErrorKind::Rate);
        assert_eq!(Error::Server("x".into()).kind(), ErrorKind::Server);
        assert_eq!(Error::General("x".into()).kind(), ErrorKind::General);
        assert_eq!(Error::Argument("x".into()).kind(), ErrorKind::Argument);
    }
}
