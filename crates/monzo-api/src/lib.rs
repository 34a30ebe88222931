//! Typed Monzo API resources
//!
//! Every call goes through a `MonzoClient`, a borrow of an authenticated
//! `Authentication` session. Building one fails when the session holds no
//! access token, so resource code can assume a token exists; refreshing an
//! expired one is left to `Authentication::dispatch_request`.
//!
//! Responses are mapped onto `serde` structs. Fields Monzo adds later are
//! ignored rather than rejected.

pub mod account;
pub mod attachment;
pub mod balance;
pub mod dates;
pub mod feed_item;
pub mod pot;
pub mod receipt;
pub mod transaction;
pub mod webhook;
pub mod whoami;

pub use account::Account;
pub use attachment::Attachment;
pub use balance::Balance;
pub use feed_item::FeedItem;
pub use monzo_auth::{Error, ErrorKind, Result};
pub use pot::Pot;
pub use receipt::{Receipt, ReceiptItem, ReceiptMerchant, ReceiptPayment, ReceiptTax};
pub use transaction::{Transaction, TransactionQuery};
pub use webhook::Webhook;
pub use whoami::WhoAmI;

use monzo_auth::{ApiRequest, ApiResponse, Authentication};
use serde::de::DeserializeOwned;

/// Capability to call resource endpoints on behalf of one session.
#[derive(Debug)]
pub struct MonzoClient<'a> {
    auth: &'a mut Authentication,
}

impl<'a> MonzoClient<'a> {
    pub fn new(auth: &'a mut Authentication) -> Result<Self> {
        if auth.access_token().is_empty() {
            return Err(Error::authentication(
                "Endpoint cannot be instantiated without a valid access token",
            ));
        }
        Ok(Self { auth })
    }

    /// The underlying session, e.g. for raw requests.
    pub fn auth(&mut self) -> &mut Authentication {
        self.auth
    }

    async fn send(&mut self, request: ApiRequest) -> Result<ApiResponse> {
        self.auth.dispatch_request(request).await
    }

    async fn fetch<T: DeserializeOwned>(&mut self, request: ApiRequest) -> Result<T> {
        self.send(request).await?.parse()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_requires_access_token() {
        let mut auth = Authentication::new("cid", "csec", "http://x/cb");
        let err = MonzoClient::new(&mut auth).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(
            err.to_string()
                .contains("Endpoint cannot be instantiated without a valid access token")
        );
    }

    #[test]
    fn client_accepts_expired_token() {
        // Refresh happens at dispatch time, not here
        let mut auth = Authentication::new("cid", "csec", "http://x/cb").with_tokens("at", 1, "rt");
        assert!(MonzoClient::new(&mut auth).is_ok());
    }
}
