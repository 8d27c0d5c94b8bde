//! Language-model backend
//!
//! Three seams, one per kind of backend call:
//! - [`ChatBackend`]: chat completions, including vision content parts
//! - [`Transcriber`]: speech to text
//! - [`AssistantBackend`]: server-side conversation threads and runs
//!
//! [`OpenAiClient`] implements all three against the `OpenAI` HTTP API.

mod assistants;
mod openai;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

pub use openai::{DEFAULT_BASE_URL, OpenAiClient};

use crate::channels::{Content, ContentKind};
use crate::{Error, Result};

/// Chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Image reference inside a content part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUrl {
    /// `https://` URL or `data:` URL
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// One part of a multi-part user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Message content: plain text or a list of parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    /// System message
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Plain-text user message
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message carrying an instruction and one image
    #[must_use]
    pub fn user_with_image(text: impl Into<String>, image_url: String) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url,
                        detail: None,
                    },
                },
            ]),
        }
    }
}

/// Chat completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Assistant run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// Whether the run is still progressing on the backend
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }

    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
        }
    }
}

/// Error attached to a failed run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunError {
    pub code: String,
    pub message: String,
}

/// One execution of an assistant against a thread
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

/// Chat completion backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Submit a chat request and return the first choice's text
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// Speech-to-text backend
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio bytes of the given MIME type
    async fn transcribe(&self, data: &[u8], mime_type: &str) -> Result<String>;
}

/// Thread-based conversation backend
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Create an empty thread and return its ID
    async fn create_thread(&self) -> Result<String>;

    /// Append a user message to a thread
    async fn add_message(&self, thread_id: &str, content: &str) -> Result<()>;

    /// Start a run of `assistant_id` on a thread
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    /// Fetch the current state of a run
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Text of the newest message in a thread, if it has text content
    async fn latest_message(&self, thread_id: &str) -> Result<Option<String>>;
}

/// Encode image content as a `data:` URL for vision requests
///
/// # Errors
///
/// Returns `ContentDecode` if the content is empty or not an image
pub fn image_data_url(content: &Content) -> Result<String> {
    if content.data.is_empty() {
        return Err(Error::ContentDecode("image content is empty".to_string()));
    }

    let mime_type = match content.kind() {
        ContentKind::Image => content.mime_type.as_str(),
        // LINE serves images as JPEG; some proxies drop the header
        ContentKind::Other if content.mime_type == "application/octet-stream" => "image/jpeg",
        _ => {
            return Err(Error::ContentDecode(format!(
                "expected an image, got {}",
                content.mime_type
            )));
        }
    };

    let encoded = base64::engine::general_purpose::STANDARD.encode(&content.data);
    tracing::debug!(chars = encoded.len(), "image encoded");
    Ok(format!("data:{mime_type};base64,{encoded}"))
}
