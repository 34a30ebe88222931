//! Transaction attachments (images hosted at a URL)

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{Error, MonzoClient, Result};
use monzo_auth::ApiRequest;

/// Supported file extensions and the MIME type sent for each.
const SUPPORTED_EXTENSIONS: &[(&str, &str)] = &[
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpg"),
    ("png", "image/png"),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    /// The transaction the attachment belongs to.
    #[serde(rename = "external_id")]
    pub transaction_id: String,
    pub file_url: String,
    pub file_type: String,
    pub created: DateTime<Utc>,
}

#[derive(Deserialize)]
struct AttachmentEnvelope {
    attachment: Attachment,
}

/// MIME type for a file URL, judged by its extension.
pub fn file_type_for(url: &str) -> Result<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    SUPPORTED_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| Error::General("Unsupported file type".into()))
}

impl MonzoClient<'_> {
    /// Attach an image already hosted at `file_url` to a transaction.
    pub async fn register_attachment(
        &mut self,
        transaction_id: &str,
        file_url: &str,
    ) -> Result<Attachment> {
        let file_type = file_type_for(file_url)?;
        let envelope: AttachmentEnvelope = self
            .fetch(ApiRequest::post("/attachment/register").form([
                ("external_id", transaction_id),
                ("file_type", file_type),
                ("file_url", file_url),
            ]))
            .await?;
        Ok(envelope.attachment)
    }

    pub async fn deregister_attachment(&mut self, attachment_id: &str) -> Result<()> {
        self.send(ApiRequest::post("/attachment/deregister").form([("id", attachment_id)]))
            .await?;
        Ok(())
    }
}
