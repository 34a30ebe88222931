//! Transaction receipts
//!
//! Receipts are written as a JSON document with PUT, unlike the rest of the
//! API which takes form data. They are keyed by a caller-chosen
//! `external_id`, which is also how they are fetched and deleted.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::{Error, MonzoClient, Result};
use monzo_auth::ApiRequest;

pub const RECEIPTS_PATH: &str = "/transaction-receipts";

/// A line on a receipt. Amounts are in minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub description: String,
    pub amount: i64,
    pub currency: String,
    /// Count or weight, 0 when not given.
    #[serde(default)]
    pub quantity: f64,
    /// Unit of `quantity`, such as `kg`.
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub tax: i64,
    #[serde(default)]
    pub sub_items: Vec<ReceiptItem>,
}

impl ReceiptItem {
    pub fn new(description: impl Into<String>, amount: i64, currency: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            amount,
            currency: currency.into(),
            quantity: 0.0,
            unit: String::new(),
            tax: 0,
            sub_items: Vec::new(),
        }
    }

    pub fn quantity(mut self, quantity: f64, unit: impl Into<String>) -> Self {
        self.quantity = quantity;
        self.unit = unit.into();
        self
    }

    pub fn tax(mut self, tax: i64) -> Self {
        self.tax = tax;
        self
    }

    /// Nest a line under this one. Sub items carry no sub items of their own.
    pub fn sub_item(mut self, item: ReceiptItem) -> Self {
        self.sub_items.push(item);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptMerchant {
    pub name: String,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_postcode: Option<String>,
}

impl ReceiptMerchant {
    pub fn new(name: impl Into<String>, online: bool) -> Self {
        Self {
            name: name.into(),
            online,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptTax {
    /// Such as `VAT`.
    pub description: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptPayment {
    /// `card`, `cash` or `gift_card`.
    #[serde(rename = "type")]
    pub payment_type: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_four: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift_card_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_id: String,
    pub external_id: String,
    pub total: i64,
    pub currency: String,
    #[serde(default)]
    pub taxes: Vec<ReceiptTax>,
    #[serde(default)]
    pub payments: Vec<ReceiptPayment>,
    /// Sent as `{}` when unset; a merchant without a name reads back as `None`.
    #[serde(
        default,
        serialize_with = "merchant_or_empty",
        deserialize_with = "named_merchant"
    )]
    pub merchant: Option<ReceiptMerchant>,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
}

impl Receipt {
    pub fn new(
        transaction_id: impl Into<String>,
        external_id: impl Into<String>,
        total: i64,
        currency: impl Into<String>,
        items: Vec<ReceiptItem>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            external_id: external_id.into(),
            total,
            currency: currency.into(),
            taxes: Vec::new(),
            payments: Vec::new(),
            merchant: None,
            items,
        }
    }

    pub fn merchant(mut self, merchant: ReceiptMerchant) -> Self {
        self.merchant = Some(merchant);
        self
    }

    pub fn tax(mut self, tax: ReceiptTax) -> Self {
        self.taxes.push(tax);
        self
    }

    pub fn payment(mut self, payment: ReceiptPayment) -> Self {
        self.payments.push(payment);
        self
    }
}

fn merchant_or_empty<S: Serializer>(
    merchant: &Option<ReceiptMerchant>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match merchant {
        Some(merchant) => merchant.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

fn named_merchant<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<ReceiptMerchant>, D::Error> {
    let merchant = Option::<ReceiptMerchant>::deserialize(deserializer)?;
    Ok(merchant.filter(|m| !m.name.is_empty()))
}

#[derive(Deserialize)]
struct ReceiptEnvelope {
    receipt: Receipt,
}

impl MonzoClient<'_> {
    /// Create or replace the receipt with `receipt.external_id`.
    pub async fn create_receipt(&mut self, receipt: &Receipt) -> Result<()> {
        let body = serde_json::to_vec(receipt)
            .map_err(|e| Error::General(format!("serializing receipt: {e}")))?;
        let request = ApiRequest::put(RECEIPTS_PATH)
            .raw(body)
            .header("content-type", "application/json")?;
        self.send(request).await?;
        info!(
            external_id = %receipt.external_id,
            transaction_id = %receipt.transaction_id,
            "receipt created"
        );
        Ok(())
    }

    pub async fn receipt(&mut self, external_id: &str) -> Result<Receipt> {
        let envelope: ReceiptEnvelope = self
            .fetch(ApiRequest::get(RECEIPTS_PATH).form([("external_id", external_id)]))
            .await?;
        Ok(envelope.receipt)
    }

    pub async fn delete_receipt(&mut self, external_id: &str) -> Result<()> {
        self.send(ApiRequest::delete(RECEIPTS_PATH).form([("external_id", external_id)]))
            .await?;
        info!(external_id, "receipt deleted");
        Ok(())
    }
}
