//! Monzo OAuth client core
//!
//! Owns the OAuth 2.0 token lifecycle for one Monzo identity and dispatches
//! authenticated API calls. Endpoint wrappers live in `monzo-api`; this crate
//! knows nothing about accounts or pots.
//!
//! Flow:
//! 1. `Authentication::build_authorization_url()` generates and stores a state token
//! 2. The user grants access and Monzo redirects back with `code` and `state`
//! 3. `Authentication::complete_authentication()` checks the state and exchanges the code
//! 4. Registered `CredentialSink`s receive the new token set
//! 5. `Authentication::dispatch_request()` sends calls, refreshing an expired token first
//!
//! HTTP failures are mapped onto a fixed taxonomy by `classify_status`, so
//! callers branch on `ErrorKind` rather than on status codes.

pub mod auth;
pub mod classify;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod request;
pub mod state;
pub mod token;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use auth::{Authentication, SessionState, unix_now};
pub use classify::classify_status;
pub use constants::*;
pub use credentials::{CredentialSink, Credentials, EchoSink, FileSystemSink};
pub use error::{Error, ErrorKind, Result};
pub use request::ApiRequest;
pub use state::{FileStateStore, MemoryStateStore, StateStore, generate_state_token};
pub use token::TokenResponse;
pub use transport::{ApiResponse, HttpIo, Method, Payload, ResponseBody};
