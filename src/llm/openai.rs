//! `OpenAI` HTTP client for chat completions and transcription

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{ChatBackend, ChatRequest, Transcriber};
use crate::{Error, Result};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Per-request timeout; vision and transcription calls can take a while
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// `OpenAI` API client
#[derive(Clone)]
pub struct OpenAiClient {
    pub(super) client: Client,
    pub(super) api_key: SecretString,
    pub(super) base_url: String,
    transcription_model: String,
    language: Option<String>,
}

impl OpenAiClient {
    /// Create a new client
    #[must_use]
    pub fn new(api_key: SecretString) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            transcription_model: "whisper-1".to_string(),
            language: None,
        }
    }

    /// Use a different API base URL (proxies, compatible servers)
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set the transcription model and optional language hint
    #[must_use]
    pub fn with_transcription(mut self, model: String, language: Option<String>) -> Self {
        self.transcription_model = model;
        self.language = language;
        self
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Map a non-success response to a backend error
    pub(super) async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::BackendRequest(format!("{what} API error: {status} - {body}")))
    }

    /// Get file extension for MIME type
    fn extension_for_mime(mime_type: &str) -> &'static str {
        match mime_type {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => "m4a",
            "audio/wav" | "audio/x-wav" => "wav",
            "audio/webm" => "webm",
            "audio/ogg" => "ogg",
            "audio/flac" => "flac",
            // LINE voice messages are AAC in an M4A container
            _ => "m4a",
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let response = self
            .client
            .post(self.url("/chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::BackendRequest(format!("chat request failed: {e}")))?;

        let result: ChatCompletionResponse = Self::check(response, "chat")
            .await?
            .json()
            .await
            .map_err(|e| Error::BackendRequest(format!("failed to parse chat response: {e}")))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        tracing::debug!(model = %request.model, chars = text.len(), "chat completion received");
        Ok(text)
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, data: &[u8], mime_type: &str) -> Result<String> {
        if data.is_empty() {
            return Err(Error::ContentDecode("audio content is empty".to_string()));
        }

        let filename = format!("audio.{}", Self::extension_for_mime(mime_type));
        let part = Part::bytes(data.to_vec())
            .file_name(filename)
            .mime_str(mime_type)
            .map_err(|e| Error::ContentDecode(format!("invalid MIME type: {e}")))?;

        let mut form = Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        let response = self
            .client
            .post(self.url("/audio/transcriptions"))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::BackendRequest(format!("transcription request failed: {e}")))?;

        let result: TranscriptionResponse = Self::check(response, "transcription")
            .await?
            .json()
            .await
            .map_err(|e| {
                Error::BackendRequest(format!("failed to parse transcription response: {e}"))
            })?;

        Ok(result.text)
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}
