//! LINE Messaging API channel adapter

pub mod chunking;
pub mod dedup;
pub mod signature;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

pub use chunking::{DEFAULT_MAX_LEN, Oversize, chunk_text, chunk_text_with};
pub use dedup::EventDedup;
pub use signature::{SIGNATURE_HEADER, verify_signature};
pub use types::{WebhookBody, WebhookEvent};

use self::types::{PushRequest, ReplyRequest, TextMessage};
use super::{Channel, Content, MAX_MESSAGES_PER_REQUEST};
use crate::{Error, Result};

/// Messaging API base URL
pub const DEFAULT_API_BASE: &str = "https://api.line.me";

/// Content API base URL (media downloads)
pub const DEFAULT_DATA_BASE: &str = "https://api-data.line.me";

/// Per-request timeout for Messaging API calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// LINE channel adapter
#[derive(Clone)]
pub struct LineChannel {
    client: reqwest::Client,
    access_token: SecretString,
    api_base: String,
    data_base: String,
}

impl LineChannel {
    /// Create a new LINE channel adapter
    #[must_use]
    pub fn new(access_token: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            access_token,
            api_base: DEFAULT_API_BASE.to_string(),
            data_base: DEFAULT_DATA_BASE.to_string(),
        }
    }

    /// Override the API base URLs
    #[must_use]
    pub fn with_base_urls(mut self, api_base: String, data_base: String) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.data_base = data_base.trim_end_matches('/').to_string();
        self
    }

    async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<()> {
        let url = format!("{}{path}", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("LINE request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!("LINE API error: {status} - {body}")));
        }

        Ok(())
    }
}

fn text_messages(messages: &[String]) -> Result<Vec<TextMessage<'_>>> {
    if messages.is_empty() || messages.len() > MAX_MESSAGES_PER_REQUEST {
        return Err(Error::Channel(format!(
            "a request carries 1 to {MAX_MESSAGES_PER_REQUEST} messages, got {}",
            messages.len()
        )));
    }
    Ok(messages.iter().map(|m| TextMessage::new(m)).collect())
}

#[async_trait]
impl Channel for LineChannel {
    async fn reply(&self, reply_token: &str, messages: &[String]) -> Result<()> {
        let request = ReplyRequest {
            reply_token,
            messages: text_messages(messages)?,
        };
        self.post_json("/v2/bot/message/reply", &request).await?;
        tracing::debug!(count = messages.len(), "LINE reply sent");
        Ok(())
    }

    async fn push(&self, to: &str, messages: &[String]) -> Result<()> {
        let request = PushRequest {
            to,
            messages: text_messages(messages)?,
        };
        self.post_json("/v2/bot/message/push", &request).await?;
        tracing::debug!(count = messages.len(), "LINE push sent");
        Ok(())
    }

    async fn download_content(&self, message_id: &str) -> Result<Content> {
        let url = format!("{}/v2/bot/message/{message_id}/content", self.data_base);
        tracing::info!(%url, "downloading content");

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::ContentDownload(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ContentDownload(format!("{status} - {body}")));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = response
            .bytes()
            .await
            .map_err(|e| Error::ContentDownload(format!("body read failed: {e}")))?;

        tracing::info!(content_type = %mime_type, bytes = data.len(), "content downloaded");
        Ok(Content::new(data.to_vec(), &mime_type))
    }
}
