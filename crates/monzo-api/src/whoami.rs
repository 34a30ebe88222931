//! `/ping/whoami`, mostly used to check connectivity and token validity.

use serde::Deserialize;

use crate::{MonzoClient, Result};
use monzo_auth::ApiRequest;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WhoAmI {
    pub authenticated: bool,
    pub client_id: String,
    pub user_id: String,
}

impl MonzoClient<'_> {
    pub async fn whoami(&mut self) -> Result<WhoAmI> {
        self.fetch(ApiRequest::get("/ping/whoami")).await
    }
}
