//! Webhooks

use serde::Deserialize;
use tracing::info;

use crate::{MonzoClient, Result};
use monzo_auth::ApiRequest;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub account_id: String,
    pub url: String,
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    webhook: Webhook,
}

#[derive(Deserialize)]
struct WebhookList {
    webhooks: Vec<Webhook>,
}

impl MonzoClient<'_> {
    /// Register `url` to receive events for an account.
    pub async fn create_webhook(&mut self, account_id: &str, url: &str) -> Result<Webhook> {
        let created: WebhookEnvelope = self
            .fetch(ApiRequest::post("/webhooks").form([("account_id", account_id), ("url", url)]))
            .await?;
        info!(webhook_id = %created.webhook.id, account_id, "webhook registered");
        Ok(created.webhook)
    }

    pub async fn webhooks(&mut self, account_id: &str) -> Result<Vec<Webhook>> {
        let list: WebhookList = self
            .fetch(ApiRequest::get("/webhooks").form([("account_id", account_id)]))
            .await?;
        Ok(list.webhooks)
    }

    pub async fn delete_webhook(&mut self, webhook_id: &str) -> Result<()> {
        self.send(ApiRequest::delete(format!("/webhooks/{webhook_id}")))
            .await?;
        info!(webhook_id, "webhook deleted");
        Ok(())
    }
}
