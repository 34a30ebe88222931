//! Accounts

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::{MonzoClient, Result};
use monzo_auth::ApiRequest;

/// Values accepted by the `account_type` filter.
pub const ACCOUNT_TYPES: &[&str] = &["uk_retail", "uk_retail_joint"];

/// Description prefix to human label, checked in order.
const ACCOUNT_LABELS: &[(&str, &str)] = &[
    ("user_", "Current Account"),
    ("monzoflex_", "Flex"),
    ("monzoflexbackingloan_", "Loan (Flex)"),
    ("loan_", "Loan"),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub id: String,
    pub description: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub closed: bool,
}

impl Account {
    /// Product label derived from the description, `"UNKNOWN"` when unrecognised.
    pub fn account_type(&self) -> &'static str {
        let description = self.description.to_lowercase();
        ACCOUNT_LABELS
            .iter()
            .find(|(prefix, _)| description.starts_with(prefix))
            .map(|(_, label)| *label)
            .unwrap_or("UNKNOWN")
    }
}

#[derive(Deserialize)]
struct AccountList {
    accounts: Vec<Account>,
}

impl MonzoClient<'_> {
    /// List accounts, optionally filtered by type.
    ///
    /// The filter is case-insensitive; a value outside `ACCOUNT_TYPES` is
    /// dropped and all accounts are returned.
    pub async fn accounts(&mut self, account_type: Option<&str>) -> Result<Vec<Account>> {
        let mut form = Vec::new();
        if let Some(kind) = account_type.map(str::to_lowercase) {
            if ACCOUNT_TYPES.contains(&kind.as_str()) {
                form.push(("account_type", kind));
            } else {
                debug!(account_type = %kind, "ignoring unknown account type filter");
            }
        }
        let list: AccountList = self.fetch(ApiRequest::get("/accounts").form(form)).await?;
        Ok(list.accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session;
    use monzo_auth::test_support::{MockServer, Route};

    fn account(description: &str) -> Account {
        Account {
            id: "acc_1".into(),
            description: description.into(),
            created: DateTime::<Utc>::UNIX_EPOCH,
            closed: false,
        }
    }

    #[test]
    fn account_type_labels() {
        assert_eq!(account("user_0000abc").account_type(), "Current Account");
        assert_eq!(account("monzoflex_0001").account_type(), "Flex");
        assert_eq!(account("monzoflexbackingloan_01").account_type(), "Loan (Flex)");
        assert_eq!(account("loan_01").account_type(), "Loan");
        assert_eq!(account("USER_abc").account_type(), "Current Account");
        assert_eq!(account("joint_01").account_type(), "UNKNOWN");
    }

    async fn server() -> MockServer {
        MockServer::start(vec![Route::json(
            "GET",
            "/accounts",
            200,
            serde_json::json!({"accounts": [
                {"id": "acc_1", "description": "user_000097", "created": "2019-01-01T10:00:00.000Z", "closed": false},
                {"id": "acc_2", "description": "monzoflex_0002", "created": "2021-06-01T10:00:00Z", "closed": true, "currency": "GBP"}
            ]}),
        )])
        .await
    }

    #[tokio::test]
    async fn accounts_are_listed() {
        let server = server().await;
        let mut auth = session(&server);

        let accounts = MonzoClient::new(&mut auth)
            .unwrap()
            .accounts(None)
            .await
            .unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id, "acc_1");
        assert_eq!(accounts[0].account_type(), "Current Account");
        assert!(accounts[1].closed);
        assert_eq!(server.requests()[0].query, "");
    }

    #[tokio::test]
    async fn known_account_type_filter_is_lowercased() {
        let server = server().await;
        let mut auth = session(&server);

        MonzoClient::new(&mut auth)
            .unwrap()
            .accounts(Some("UK_Retail_Joint"))
            .await
            .unwrap();
        assert_eq!(server.requests()[0].query, "account_type=uk_retail_joint");
    }

    #[tokio::test]
    async fn unknown_account_type_filter_is_dropped() {
        let server = server().await;
        let mut auth = session(&server);

        MonzoClient::new(&mut auth)
            .unwrap()
            .accounts(Some("uk_business"))
            .await
            .unwrap();
        assert_eq!(server.requests()[0].query, "");
    }
}
