//! Account balance

use serde::Deserialize;

use crate::{MonzoClient, Result};
use monzo_auth::ApiRequest;

/// Amounts are in minor units (pence/cents).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Balance {
    pub balance: i64,
    /// Balance plus pots.
    pub total_balance: i64,
    pub currency: String,
    pub spend_today: i64,
}

impl MonzoClient<'_> {
    pub async fn balance(&mut self, account_id: &str) -> Result<Balance> {
        self.fetch(ApiRequest::get("/balance").form([("account_id", account_id)]))
            .await
    }
}
