//! Assistants API (threads, messages, runs)

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::{AssistantBackend, OpenAiClient, Run};
use crate::{Error, Result};

const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");

impl OpenAiClient {
    fn assistants_post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }

    fn assistants_get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(self.api_key.expose_secret())
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }
}

#[async_trait]
impl AssistantBackend for OpenAiClient {
    async fn create_thread(&self) -> Result<String> {
        let response = self
            .assistants_post("/threads")
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| Error::ThreadCreation(format!("request failed: {e}")))?;

        let thread: ThreadObject = Self::check(response, "threads")
            .await
            .map_err(|e| Error::ThreadCreation(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::ThreadCreation(format!("failed to parse thread: {e}")))?;

        Ok(thread.id)
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<()> {
        let response = self
            .assistants_post(&format!("/threads/{thread_id}/messages"))
            .json(&CreateMessage {
                role: "user",
                content,
            })
            .send()
            .await
            .map_err(|e| Error::BackendRequest(format!("message request failed: {e}")))?;

        Self::check(response, "messages").await?;
        tracing::debug!(thread_id, "message added to thread");
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let response = self
            .assistants_post(&format!("/threads/{thread_id}/runs"))
            .json(&CreateRun { assistant_id })
            .send()
            .await
            .map_err(|e| Error::BackendRequest(format!("run request failed: {e}")))?;

        Self::check(response, "runs")
            .await?
            .json()
            .await
            .map_err(|e| Error::BackendRequest(format!("failed to parse run: {e}")))
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let response = self
            .assistants_get(&format!("/threads/{thread_id}/runs/{run_id}"))
            .send()
            .await
            .map_err(|e| Error::BackendRequest(format!("run status request failed: {e}")))?;

        Self::check(response, "runs")
            .await?
            .json()
            .await
            .map_err(|e| Error::BackendRequest(format!("failed to parse run: {e}")))
    }

    async fn latest_message(&self, thread_id: &str) -> Result<Option<String>> {
        let response = self
            .assistants_get(&format!("/threads/{thread_id}/messages"))
            .query(&[("order", "desc"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| Error::BackendRequest(format!("message list request failed: {e}")))?;

        let list: MessageList = Self::check(response, "messages")
            .await?
            .json()
            .await
            .map_err(|e| Error::BackendRequest(format!("failed to parse messages: {e}")))?;

        Ok(list.first_text())
    }
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRun<'a> {
    assistant_id: &'a str,
}

#[derive(Deserialize)]
struct ThreadObject {
    id: String,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

impl MessageList {
    /// Text of the first message if its first content block is text
    fn first_text(self) -> Option<String> {
        let message = self.data.into_iter().next()?;
        match message.content.into_iter().next()? {
            MessageBlock::Text { text } => Some(text.value),
            MessageBlock::Other => None,
        }
    }
}

#[derive(Deserialize)]
struct ThreadMessage {
    #[serde(default)]
    content: Vec<MessageBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageBlock {
    Text {
        text: TextValue,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct TextValue {
    value: String,
}
