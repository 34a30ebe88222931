//! Pots: listing, deposits and withdrawals
//!
//! Deposits and withdrawals check funds locally before calling the API, so
//! an obviously short transfer fails without a network write. `dedupe_id`
//! must stay the same across retries of one logical transfer.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::dates::optional_timestamp;
use crate::{Error, MonzoClient, Result};
use monzo_auth::ApiRequest;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Pot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub style: String,
    /// Minor units.
    pub balance: i64,
    pub currency: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub goal_amount: Option<i64>,
    #[serde(default)]
    pub round_up_multiplier: Option<i64>,
    #[serde(rename = "round_up", default)]
    pub has_round_up: bool,
    #[serde(rename = "type", default)]
    pub pot_type: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct PotList {
    pots: Vec<Pot>,
}

impl MonzoClient<'_> {
    /// Pots belonging to a current account.
    pub async fn pots(&mut self, account_id: &str) -> Result<Vec<Pot>> {
        let list: PotList = self
            .fetch(ApiRequest::get("/pots").form([("current_account_id", account_id)]))
            .await?;
        Ok(list.pots)
    }

    /// One pot by id, `None` if the account has no such pot.
    pub async fn pot(&mut self, account_id: &str, pot_id: &str) -> Result<Option<Pot>> {
        Ok(self
            .pots(account_id)
            .await?
            .into_iter()
            .find(|pot| pot.id == pot_id))
    }

    /// Move `amount` from an account into a pot. Returns the updated pot.
    pub async fn deposit_into_pot(
        &mut self,
        pot: &Pot,
        account_id: &str,
        amount: i64,
        dedupe_id: &str,
    ) -> Result<Pot> {
        let available = self.balance(account_id).await?.balance;
        if available < amount {
            debug!(pot_id = %pot.id, amount, available, "insufficient funds for pot deposit");
            return Err(Error::General(
                "The account does not contain enough funds".into(),
            ));
        }

        let path = format!("/pots/{}/deposit", pot.id);
        self.fetch(ApiRequest::put(path).form([
            ("source_account_id", account_id.to_string()),
            ("amount", amount.to_string()),
            ("dedupe_id", dedupe_id.to_string()),
        ]))
        .await
    }

    /// Move `amount` from a pot into an account. Returns the updated pot.
    pub async fn withdraw_from_pot(
        &mut self,
        pot: &Pot,
        account_id: &str,
        amount: i64,
        dedupe_id: &str,
    ) -> Result<Pot> {
        if amount > pot.balance {
            debug!(pot_id = %pot.id, amount, balance = pot.balance, "insufficient funds for pot withdrawal");
            return Err(Error::General("The pot does not contain enough funds".into()));
        }

        let path = format!("/pots/{}/withdraw", pot.id);
        self.fetch(ApiRequest::put(path).form([
            ("destination_account_id", account_id.to_string()),
            ("amount", amount.to_string()),
            ("dedupe_id", dedupe_id.to_string()),
        ]))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::testing::session;
    use monzo_auth::test_support::{MockServer, Route};

    fn pot_json(id: &str, balance: i64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "name": "Holiday",
            "style": "beach_ball",
            "balance": balance,
            "currency": "GBP",
            "created": "2020-01-01T00:00:00.000Z",
            "updated": "2020-02-01T00:00:00.000Z",
            "deleted": false,
            "goal_amount": 100000,
            "round_up": true,
            "round_up_multiplier": 2,
            "type": "default",
            "locked": false,
            "locked_until": ""
        })
    }

    fn balance_route(balance: i64) -> Route {
        Route::json(
            "GET",
            "/balance",
            200,
            serde_json::json!({"balance": balance, "total_balance": balance, "currency": "GBP", "spend_today": 0}),
        )
    }

    #[tokio::test]
    async fn pots_are_listed_and_mapped() {
        let server = MockServer::start(vec![Route::json(
            "GET",
            "/pots",
            200,
            serde_json::json!({"pots": [pot_json("pot_1", 500), pot_json("pot_2", 0)]}),
        )])
        .await;
        let mut auth = session(&server);

        let pots = MonzoClient::new(&mut auth)
            .unwrap()
            .pots("acc_1")
            .await
            .unwrap();
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].goal_amount, Some(100000));
        assert!(pots[0].has_round_up);
        assert_eq!(pots[0].pot_type, "default");
        assert!(pots[0].locked_until.is_none());
        assert_eq!(server.requests()[0].query, "current_account_id=acc_1");
    }

    #[tokio::test]
    async fn single_pot_lookup() {
        let server = MockServer::start(vec![Route::json(
            "GET",
            "/pots",
            200,
            serde_json::json!({"pots": [pot_json("pot_1", 500), pot_json("pot_2", 0)]}),
        )])
        .await;
        let mut auth = session(&server);
        let mut client = MonzoClient::new(&mut auth).unwrap();

        assert_eq!(client.pot("acc_1", "pot_2").await.unwrap().unwrap().id, "pot_2");
        assert!(client.pot("acc_1", "pot_9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deposit_sends_transfer_and_returns_updated_pot() {
        let server = MockServer::start(vec![
            balance_route(1000),
            Route::json("PUT", "/pots/pot_1/deposit", 200, pot_json("pot_1", 800)),
        ])
        .await;
        let mut auth = session(&server);
        let pot: Pot = serde_json::from_value(pot_json("pot_1", 500)).unwrap();

        let updated = MonzoClient::new(&mut auth)
            .unwrap()
            .deposit_into_pot(&pot, "acc_1", 300, "dedupe-1")
            .await
            .unwrap();
        assert_eq!(updated.balance, 800);

        let request = &server.requests_to("/pots/pot_1/deposit")[0];
        assert_eq!(request.method, "PUT");
        assert_eq!(request.form_value("source_account_id").as_deref(), Some("acc_1"));
        assert_eq!(request.form_value("amount").as_deref(), Some("300"));
        assert_eq!(request.form_value("dedupe_id").as_deref(), Some("dedupe-1"));
    }

    #[tokio::test]
    async fn deposit_beyond_account_balance_is_rejected_before_transfer() {
        let server = MockServer::start(vec![
            balance_route(100),
            Route::json("PUT", "/pots/pot_1/deposit", 200, pot_json("pot_1", 800)),
        ])
        .await;
        let mut auth = session(&server);
        let pot: Pot = serde_json::from_value(pot_json("pot_1", 500)).unwrap();

        let err = MonzoClient::new(&mut auth)
            .unwrap()
            .deposit_into_pot(&pot, "acc_1", 300, "dedupe-1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::General);
        assert!(server.requests_to("/pots/pot_1/deposit").is_empty());
    }

    #[tokio::test]
    async fn withdraw_sends_transfer() {
        let server = MockServer::start(vec![Route::json(
            "PUT",
            "/pots/pot_1/withdraw",
            200,
            pot_json("pot_1", 200),
        )])
        .await;
        let mut auth = session(&server);
        let pot: Pot = serde_json::from_value(pot_json("pot_1", 500)).unwrap();

        let updated = MonzoClient::new(&mut auth)
            .unwrap()
            .withdraw_from_pot(&pot, "acc_1", 300, "dedupe-2")
            .await
            .unwrap();
        assert_eq!(updated.balance, 200);

        let request = &server.requests()[0];
        assert_eq!(
            request.form_value("destination_account_id").as_deref(),
            Some("acc_1")
        );
    }

    #[tokio::test]
    async fn withdraw_beyond_pot_balance_makes_no_request() {
        let server = MockServer::start(vec![]).await;
        let mut auth = session(&server);
        let pot: Pot = serde_json::from_value(pot_json("pot_1", 500)).unwrap();

        let err = MonzoClient::new(&mut auth)
            .unwrap()
            .withdraw_from_pot(&pot, "acc_1", 501, "dedupe-3")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::General);
        assert!(server.requests().is_empty());
    }
}
