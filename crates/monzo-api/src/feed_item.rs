//! Feed items
//!
//! Only the `basic` type exists. Parameters are validated before any network
//! call: required ones must be present, unknown ones are dropped.

use std::collections::BTreeMap;

use crate::{Error, MonzoClient, Result};
use monzo_auth::ApiRequest;

const FEED_ITEM_TYPES: &[&str] = &["basic"];
const BASIC_REQUIRED: &[&str] = &["title", "image_url"];
const BASIC_OPTIONAL: &[&str] = &["body", "background_color", "title_color", "body_color"];

/// A feed item to post to an account's feed.
#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub account_id: String,
    pub feed_type: String,
    pub params: BTreeMap<String, String>,
    /// Opened when the user taps the item.
    pub url: Option<String>,
}

impl FeedItem {
    pub fn basic(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            feed_type: "basic".into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Form body for `POST /feed`, or an argument error.
    fn to_form(&self) -> Result<Vec<(String, String)>> {
        let feed_type = self.feed_type.to_lowercase();
        if !FEED_ITEM_TYPES.contains(&feed_type.as_str()) {
            return Err(Error::Argument("Feed type appears invalid".into()));
        }

        let mut form = vec![
            ("account_id".to_string(), self.account_id.clone()),
            ("type".to_string(), self.feed_type.clone()),
        ];
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            form.push(("url".into(), url.to_string()));
        }
        for key in BASIC_REQUIRED {
            let value = self.params.get(*key).ok_or_else(|| {
                Error::Argument(format!("{key} is a required parameter for {feed_type}"))
            })?;
            form.push((format!("params[{key}]"), value.clone()));
        }
        for key in BASIC_OPTIONAL {
            if let Some(value) = self.params.get(*key) {
                form.push((format!("params[{key}]"), value.clone()));
            }
        }
        Ok(form)
    }
}

impl MonzoClient<'_> {
    pub async fn create_feed_item(&mut self, item: &FeedItem) -> Result<()> {
        let form = item.to_form()?;
        self.send(ApiRequest::post("/feed").form(form)).await?;
        Ok(())
    }
}
