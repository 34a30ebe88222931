//! Transactions: listing, single lookup and annotation

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::dates::{format_query_date, optional_timestamp};
use crate::{Error, MonzoClient, Result};
use monzo_auth::ApiRequest;

/// Fields the API can expand inline.
pub const EXPAND_VALID_VALUES: &[&str] = &["merchant"];

/// Default and maximum page sizes for `/transactions`.
pub const DEFAULT_LIMIT: u32 = 30;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    /// Minor units; negative for debits.
    pub amount: i64,
    pub currency: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub categories: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Merchant id, or the merchant object when expanded.
    #[serde(default)]
    pub merchant: Option<serde_json::Value>,
    #[serde(default)]
    pub counterparty: serde_json::Value,
    #[serde(default)]
    pub local_amount: i64,
    #[serde(default)]
    pub local_currency: String,
    #[serde(default)]
    pub amount_is_pending: bool,
    #[serde(default)]
    pub is_load: bool,
    #[serde(default)]
    pub include_in_spending: bool,
    #[serde(default)]
    pub dedupe_id: String,
    #[serde(default)]
    pub decline_reason: Option<String>,
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub attachments: Option<serde_json::Value>,
    /// `None` until the transaction settles.
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub settled: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub updated: Option<DateTime<Utc>>,
}

/// Filters for listing transactions.
#[derive(Debug, Clone)]
pub struct TransactionQuery {
    pub account_id: String,
    pub since: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub expand: Vec<String>,
    /// Capped at `MAX_LIMIT`; 0 leaves it to the server.
    pub limit: u32,
}

impl TransactionQuery {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            since: None,
            before: None,
            expand: Vec::new(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }

    pub fn expand(mut self, field: impl Into<String>) -> Self {
        self.expand.push(field.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![("account_id".to_string(), self.account_id.clone())];
        for field in &self.expand {
            form.push(("expand[]".into(), field.clone()));
        }
        if let Some(since) = &self.since {
            form.push(("since".into(), format_query_date(since)));
        }
        if let Some(before) = &self.before {
            form.push(("before".into(), format_query_date(before)));
        }
        if self.limit > 0 {
            form.push(("limit".into(), self.limit.min(MAX_LIMIT).to_string()));
        }
        form
    }
}

#[derive(Deserialize)]
struct TransactionList {
    transactions: Vec<Transaction>,
}

impl MonzoClient<'_> {
    pub async fn transactions(&mut self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        let list: TransactionList = self
            .fetch(ApiRequest::get("/transactions").form(query.to_form()))
            .await?;
        Ok(list.transactions)
    }

    /// One transaction by id, `None` when the API returns an empty object.
    ///
    /// `expand` is sent only when it names a field in `EXPAND_VALID_VALUES`.
    pub async fn transaction(
        &mut self,
        transaction_id: &str,
        expand: Option<&str>,
    ) -> Result<Option<Transaction>> {
        let mut form = Vec::new();
        if let Some(field) = expand.map(str::to_lowercase) {
            if EXPAND_VALID_VALUES.contains(&field.as_str()) {
                form.push(("expand[]", field));
            }
        }
        let path = format!("/transactions/{transaction_id}");
        let response = self.send(ApiRequest::get(path).form(form)).await?;
        single_transaction(response.json()?)
    }

    /// Set `metadata[key]` on a transaction; an empty value removes it.
    pub async fn annotate_transaction(
        &mut self,
        transaction_id: &str,
        key: &str,
        value: &str,
    ) -> Result<Transaction> {
        let path = format!("/transactions/{transaction_id}");
        let response = self
            .send(ApiRequest::patch(path).form([(format!("metadata[{key}]"), value)]))
            .await?;
        single_transaction(response.json()?)?
            .ok_or_else(|| Error::General("annotated transaction missing from response".into()))
    }
}

fn single_transaction(body: &serde_json::Value) -> Result<Option<Transaction>> {
    match body.get("transaction") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => Transaction::deserialize(value)
            .map(Some)
            .map_err(|e| Error::General(format!("unexpected transaction shape: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session;
    use chrono::TimeZone;
    use monzo_auth::test_support::{MockServer, Route};

    fn transaction_json(id: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "account_id": "acc_1",
            "amount": -350,
            "currency": "GBP",
            "created": "2024-05-01T12:00:00.000Z",
            "description": "COFFEE SHOP",
            "category": "eating_out",
            "notes": "",
            "metadata": {},
            "merchant": "merch_1",
            "settled": "",
            "updated": "2024-05-01T12:00:01.000Z",
            "is_load": false,
            "local_amount": -350,
            "local_currency": "GBP"
        })
    }

    #[test]
    fn query_defaults_to_thirty() {
        let form = TransactionQuery::new("acc_1").to_form();
        assert_eq!(
            form,
            vec![
                ("account_id".to_string(), "acc_1".to_string()),
                ("limit".to_string(), "30".to_string()),
            ]
        );
    }

    #[test]
    fn query_caps_limit_and_formats_dates() {
        let since = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let form = TransactionQuery::new("acc_1")
            .since(since)
            .before(before)
            .expand("merchant")
            .limit(500)
            .to_form();
        assert!(form.contains(&("since".into(), "2024-01-02T03:04:05Z".into())));
        assert!(form.contains(&("before".into(), "2024-02-01T00:00:00Z".into())));
        assert!(form.contains(&("expand[]".into(), "merchant".into())));
        assert!(form.contains(&("limit".into(), "100".into())));
    }

    #[test]
    fn zero_limit_is_omitted() {
        let form = TransactionQuery::new("acc_1").limit(0).to_form();
        assert!(form.iter().all(|(k, _)| k != "limit"));
    }

    #[tokio::test]
    async fn transactions_are_listed() {
        let server = MockServer::start(vec![Route::json(
            "GET",
            "/transactions",
            200,
            serde_json::json!({"transactions": [transaction_json("tx_1"), transaction_json("tx_2")]}),
        )])
        .await;
        let mut auth = session(&server);

        let list = MonzoClient::new(&mut auth)
            .unwrap()
            .transactions(&TransactionQuery::new("acc_1"))
            .await
            .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].amount, -350);
        assert!(list[0].settled.is_none());
        assert_eq!(server.requests()[0].query, "account_id=acc_1&limit=30");
    }

    #[tokio::test]
    async fn single_transaction_expands_merchant() {
        let server = MockServer::start(vec![Route::json(
            "GET",
            "/transactions/tx_1",
            200,
            serde_json::json!({"transaction": transaction_json("tx_1")}),
        )])
        .await;
        let mut auth = session(&server);

        let tx = MonzoClient::new(&mut auth)
            .unwrap()
            .transaction("tx_1", Some("merchant"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.id, "tx_1");
        assert_eq!(server.requests()[0].query, "expand%5B%5D=merchant");
    }

    #[tokio::test]
    async fn single_transaction_ignores_invalid_expand() {
        let server = MockServer::start(vec![Route::json(
            "GET",
            "/transactions/tx_1",
            200,
            serde_json::json!({"transaction": transaction_json("tx_1")}),
        )])
        .await;
        let mut auth = session(&server);

        MonzoClient::new(&mut auth)
            .unwrap()
            .transaction("tx_1", Some("counterparty"))
            .await
            .unwrap();
        assert_eq!(server.requests()[0].query, "");
    }

    #[tokio::test]
    async fn empty_transaction_is_none() {
        let server = MockServer::start(vec![Route::json(
            "GET",
            "/transactions/tx_9",
            200,
            serde_json::json!({"transaction": {}}),
        )])
        .await;
        let mut auth = session(&server);

        let tx = MonzoClient::new(&mut auth)
            .unwrap()
            .transaction("tx_9", None)
            .await
            .unwrap();
        assert!(tx.is_none());
    }

    #[tokio::test]
    async fn annotate_patches_metadata() {
        let mut annotated = transaction_json("tx_1");
        annotated["notes"] = "lunch".into();
        annotated["metadata"] = serde_json::json!({"notes": "lunch"});
        let server = MockServer::start(vec![Route::json(
            "PATCH",
            "/transactions/tx_1",
            200,
            serde_json::json!({"transaction": annotated}),
        )])
        .await;
        let mut auth = session(&server);

        let tx = MonzoClient::new(&mut auth)
            .unwrap()
            .annotate_transaction("tx_1", "notes", "lunch")
            .await
            .unwrap();
        assert_eq!(tx.notes, "lunch");
        assert_eq!(tx.metadata.get("notes").map(String::as_str), Some("lunch"));

        let request = &server.requests()[0];
        assert_eq!(request.method, "PATCH");
        assert_eq!(request.body, "metadata%5Bnotes%5D=lunch");
    }
}
