//! Conversational reply pipeline
//!
//! One inbound event becomes one model answer, split into chunks and sent
//! back in order. Failures never escape [`ReplyPipeline::handle`]: the user
//! gets a single generic error reply and the cause is logged.

pub mod delivery;
pub mod prompts;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use delivery::{Undelivered, deliver};

use crate::channels::Channel;
use crate::channels::line::{DEFAULT_MAX_LEN, Oversize, chunk_text_with};
use crate::error::Severity;
use crate::llm::{AssistantBackend, ChatBackend, ChatMessage, ChatRequest, Transcriber, image_data_url};
use crate::threads::{RunPolicy, ThreadRegistry, run_assistant};
use crate::{Error, Result};

/// An inbound message event, stripped of platform details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Single-use token for the reply endpoint
    pub reply_token: String,
    /// Sender, when the platform discloses it
    pub user_id: Option<String>,
    /// Where overflow chunks are pushed (user, group or room)
    pub push_to: Option<String>,
    pub kind: EventKind,
}

/// Message payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Text(String),
    Image { message_id: String },
    Audio { message_id: String },
}

impl EventKind {
    /// Short label for logs
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image { .. } => "image",
            Self::Audio { .. } => "audio",
        }
    }
}

/// Relay variant, chosen at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Repeat text back without calling a model
    Echo,
    /// Fresh chat completion per event
    Stateless,
    /// Per-user thread on the assistant backend
    #[default]
    Assistant,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Echo => "echo",
            Self::Stateless => "stateless",
            Self::Assistant => "assistant",
        })
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "echo" => Ok(Self::Echo),
            "stateless" | "chat" => Ok(Self::Stateless),
            "assistant" => Ok(Self::Assistant),
            other => Err(Error::Config(format!(
                "unknown relay mode '{other}' (expected echo, stateless or assistant)"
            ))),
        }
    }
}

/// What happened to one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Answer delivered in `chunks` messages
    Replied { chunks: usize },
    /// Processing failed; `notified` tells whether the error reply went out
    Failed { severity: Severity, notified: bool },
    /// Event kind not handled by the current mode
    Skipped,
}

/// Model and reply settings
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub chat_model: String,
    pub vision_model: String,
    pub image_instruction: String,
    /// Per-message character ceiling for chunking
    pub max_len: usize,
    /// Append a short technical snippet to image error replies
    pub expose_error_details: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4-0125-preview".to_string(),
            vision_model: "gpt-4o".to_string(),
            image_instruction: prompts::DEFAULT_IMAGE_INSTRUCTION.to_string(),
            max_len: DEFAULT_MAX_LEN,
            expose_error_details: false,
        }
    }
}

/// Assistant-variant state
pub struct AssistantSetup {
    pub backend: Arc<dyn AssistantBackend>,
    pub registry: Arc<ThreadRegistry>,
    pub assistant_id: String,
    pub policy: RunPolicy,
}

/// Backends behind the pipeline, one variant per [`Mode`]
pub enum Responder {
    Echo,
    Stateless {
        chat: Arc<dyn ChatBackend>,
        transcriber: Arc<dyn Transcriber>,
    },
    Assistant {
        chat: Arc<dyn ChatBackend>,
        transcriber: Arc<dyn Transcriber>,
        assistant: AssistantSetup,
    },
}

impl Responder {
    /// Mode this responder implements
    #[must_use]
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Echo => Mode::Echo,
            Self::Stateless { .. } => Mode::Stateless,
            Self::Assistant { .. } => Mode::Assistant,
        }
    }
}

/// Turns inbound events into delivered replies
pub struct ReplyPipeline {
    channel: Arc<dyn Channel>,
    responder: Responder,
    settings: RelaySettings,
}

impl ReplyPipeline {
    /// Create a pipeline
    #[must_use]
    pub fn new(channel: Arc<dyn Channel>, responder: Responder, settings: RelaySettings) -> Self {
        Self {
            channel,
            responder,
            settings,
        }
    }

    /// Active relay mode
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.responder.mode()
    }

    /// Answer one event
    pub async fn handle(&self, event: InboundEvent) -> ReplyOutcome {
        if matches!(self.responder, Responder::Echo) && !matches!(event.kind, EventKind::Text(_)) {
            tracing::debug!(kind = event.kind.label(), "echo mode ignores non-text event");
            return ReplyOutcome::Skipped;
        }

        tracing::info!(
            kind = event.kind.label(),
            user = event.user_id.as_deref().unwrap_or("-"),
            mode = %self.mode(),
            "processing event"
        );

        let answer = match self.respond(&event).await {
            Ok(answer) => answer,
            Err(e) => return self.fail(&event, &e).await,
        };

        let answer = if answer.trim().is_empty() {
            tracing::warn!("model answer is empty, sending fallback");
            prompts::FALLBACK_REPLY.to_string()
        } else {
            answer
        };

        let chunks = chunk_text_with(&answer, self.settings.max_len, Oversize::Split);

        match deliver(
            self.channel.as_ref(),
            &event.reply_token,
            event.push_to.as_deref(),
            &chunks,
        )
        .await
        {
            Ok(()) => {
                tracing::info!(kind = event.kind.label(), chunks = chunks.len(), "reply sent");
                ReplyOutcome::Replied {
                    chunks: chunks.len(),
                }
            }
            Err(Undelivered { sent, error }) => {
                tracing::error!(
                    error = %error,
                    sent,
                    total = chunks.len(),
                    "failed to deliver reply"
                );
                let message = self.error_reply(&event.kind, &error);
                ReplyOutcome::Failed {
                    severity: error.severity(),
                    notified: self.notify(&event, sent > 0, message).await,
                }
            }
        }
    }

    async fn respond(&self, event: &InboundEvent) -> Result<String> {
        match (&self.responder, &event.kind) {
            (Responder::Echo, EventKind::Text(text)) => Ok(format!("You said: {text}")),
            (Responder::Echo, _) => Ok(String::new()),

            (Responder::Stateless { chat, .. }, EventKind::Text(text)) => {
                chat.complete(&self.text_request(text)).await
            }
            (Responder::Stateless { chat, .. }, EventKind::Image { message_id }) => {
                self.describe_image(chat.as_ref(), message_id).await
            }
            (Responder::Stateless { chat, transcriber }, EventKind::Audio { message_id }) => {
                let transcription = self.transcribe(transcriber.as_ref(), message_id).await?;
                let response = chat.complete(&self.audio_request(&transcription)).await?;
                Ok(prompts::audio_reply(&transcription, &response))
            }

            (Responder::Assistant { assistant, .. }, EventKind::Text(text)) => {
                self.ask_assistant(assistant, event, text).await
            }
            (Responder::Assistant { chat, assistant, .. }, EventKind::Image { message_id }) => {
                let description = self.describe_image(chat.as_ref(), message_id).await?;
                self.ask_assistant(assistant, event, &prompts::image_thread_message(&description))
                    .await
            }
            (
                Responder::Assistant {
                    transcriber,
                    assistant,
                    ..
                },
                EventKind::Audio { message_id },
            ) => {
                let transcription = self.transcribe(transcriber.as_ref(), message_id).await?;
                let response = self
                    .ask_assistant(assistant, event, &prompts::audio_thread_message(&transcription))
                    .await?;
                Ok(prompts::audio_reply(&transcription, &response))
            }
        }
    }

    async fn ask_assistant(
        &self,
        assistant: &AssistantSetup,
        event: &InboundEvent,
        content: &str,
    ) -> Result<String> {
        let key = event
            .user_id
            .as_deref()
            .or(event.push_to.as_deref())
            .ok_or_else(|| Error::Channel("event source has no user id".to_string()))?;

        let thread_id = assistant.registry.get_or_create(key).await?;
        run_assistant(
            assistant.backend.as_ref(),
            &thread_id,
            &assistant.assistant_id,
            content,
            &assistant.policy,
        )
        .await
    }

    async fn describe_image(&self, chat: &dyn ChatBackend, message_id: &str) -> Result<String> {
        let content = self.channel.download_content(message_id).await?;
        let image_url = image_data_url(&content)?;

        let request = ChatRequest {
            model: self.settings.vision_model.clone(),
            messages: vec![
                ChatMessage::system(prompts::IMAGE_SYSTEM_PROMPT),
                ChatMessage::user_with_image(self.settings.image_instruction.clone(), image_url),
            ],
            max_tokens: Some(5000),
            temperature: None,
        };

        chat.complete(&request).await
    }

    async fn transcribe(&self, transcriber: &dyn Transcriber, message_id: &str) -> Result<String> {
        let content = self.channel.download_content(message_id).await?;
        let transcription = transcriber.transcribe(&content.data, &content.mime_type).await?;

        if transcription.trim().is_empty() {
            return Err(Error::ContentDecode("transcription is empty".to_string()));
        }

        tracing::info!(chars = transcription.chars().count(), "audio transcribed");
        Ok(transcription)
    }

    fn text_request(&self, text: &str) -> ChatRequest {
        ChatRequest {
            model: self.settings.chat_model.clone(),
            messages: vec![
                ChatMessage::system(prompts::TEXT_SYSTEM_PROMPT),
                ChatMessage::user(text),
            ],
            max_tokens: Some(2000),
            temperature: Some(0.7),
        }
    }

    fn audio_request(&self, transcription: &str) -> ChatRequest {
        ChatRequest {
            model: self.settings.chat_model.clone(),
            messages: vec![
                ChatMessage::system(prompts::AUDIO_SYSTEM_PROMPT),
                ChatMessage::user(prompts::audio_user_prompt(transcription)),
            ],
            max_tokens: Some(2000),
            temperature: Some(0.7),
        }
    }

    async fn fail(&self, event: &InboundEvent, error: &Error) -> ReplyOutcome {
        let severity = error.severity();
        tracing::error!(
            kind = event.kind.label(),
            error = %error,
            ?severity,
            "failed to process event"
        );

        let message = self.error_reply(&event.kind, error);
        let notified = self.notify(event, false, message).await;

        ReplyOutcome::Failed { severity, notified }
    }

    /// Send the generic error reply; once the reply token is spent it is
    /// pushed to the source instead
    async fn notify(&self, event: &InboundEvent, token_spent: bool, message: String) -> bool {
        let messages = [message];
        let result = if token_spent {
            let Some(to) = event.push_to.as_deref() else {
                tracing::warn!("no push target for error reply");
                return false;
            };
            self.channel.push(to, &messages).await
        } else {
            self.channel.reply(&event.reply_token, &messages).await
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "failed to send error reply");
                false
            }
        }
    }

    fn error_reply(&self, kind: &EventKind, error: &Error) -> String {
        match kind {
            EventKind::Text(_) => prompts::TEXT_ERROR_REPLY.to_string(),
            EventKind::Audio { .. } => prompts::AUDIO_ERROR_REPLY.to_string(),
            EventKind::Image { .. } if self.settings.expose_error_details => {
                let detail: String = error
                    .to_string()
                    .chars()
                    .take(prompts::ERROR_DETAIL_CHARS)
                    .collect();
                format!("{} Technical details: {detail}", prompts::IMAGE_ERROR_REPLY)
            }
            EventKind::Image { .. } => prompts::IMAGE_ERROR_REPLY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Echo".parse::<Mode>().unwrap(), Mode::Echo);
        assert_eq!("stateless".parse::<Mode>().unwrap(), Mode::Stateless);
        assert_eq!(" ASSISTANT ".parse::<Mode>().unwrap(), Mode::Assistant);
        assert!("pirate".parse::<Mode>().is_err());
    }

    #[test]
    fn mode_display_round_trips() {
        for mode in [Mode::Echo, Mode::Stateless, Mode::Assistant] {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn event_kind_labels() {
        assert_eq!(EventKind::Text("hi".to_string()).label(), "text");
        assert_eq!(
            EventKind::Audio {
                message_id: "1".to_string()
            }
            .label(),
            "audio"
        );
    }
}
