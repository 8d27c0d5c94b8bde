//! LINE Messaging API webhook and request types

use serde::{Deserialize, Serialize};

use crate::relay::{EventKind, InboundEvent};

/// Webhook request body
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookBody {
    /// Bot user ID that received the events
    #[serde(default)]
    pub destination: Option<String>,
    /// Events in delivery order (empty for the console's verify request)
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// A single webhook event
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Event type (`message`, `follow`, `unfollow`, `postback`, ...)
    #[serde(rename = "type")]
    pub event_type: String,
    /// Single-use reply token
    #[serde(default)]
    pub reply_token: Option<String>,
    /// Event source
    #[serde(default)]
    pub source: Option<EventSource>,
    /// Message payload for `message` events
    #[serde(default)]
    pub message: Option<MessageContent>,
    /// Stable event ID (same across redeliveries)
    #[serde(default)]
    pub webhook_event_id: Option<String>,
    /// Delivery metadata
    #[serde(default)]
    pub delivery_context: Option<DeliveryContext>,
}

impl WebhookEvent {
    /// Whether LINE marked this delivery as a retry
    #[must_use]
    pub fn is_redelivery(&self) -> bool {
        self.delivery_context
            .as_ref()
            .is_some_and(|c| c.is_redelivery)
    }
}

/// Who sent the event
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    /// `user`, `group` or `room`
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

impl EventSource {
    /// Destination for push messages: the group or room, else the user
    #[must_use]
    pub fn push_target(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.room_id.as_deref())
            .or(self.user_id.as_deref())
    }
}

/// Delivery metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    pub is_redelivery: bool,
}

/// Message payload, tagged by `type`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text {
        id: String,
        text: String,
    },
    Image {
        id: String,
    },
    Audio {
        id: String,
        /// Length in milliseconds
        #[serde(default)]
        duration: Option<u64>,
    },
    /// Stickers, video, location, files
    #[serde(other)]
    Unsupported,
}

impl WebhookEvent {
    /// Convert to a relay event.
    ///
    /// Returns `None` for non-message events, unsupported message types,
    /// and events without a reply token.
    #[must_use]
    pub fn into_inbound(self) -> Option<InboundEvent> {
        if self.event_type != "message" {
            return None;
        }

        let reply_token = self.reply_token?;
        let kind = match self.message? {
            MessageContent::Text { text, .. } => EventKind::Text(text),
            MessageContent::Image { id } => EventKind::Image { message_id: id },
            MessageContent::Audio { id, .. } => EventKind::Audio { message_id: id },
            MessageContent::Unsupported => return None,
        };

        let (user_id, push_to) = self.source.as_ref().map_or((None, None), |s| {
            (s.user_id.clone(), s.push_target().map(ToString::to_string))
        });

        Some(InboundEvent {
            reply_token,
            user_id,
            push_to,
            kind,
        })
    }
}

/// Outbound text message object
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TextMessage<'a> {
    #[serde(rename = "type")]
    pub message_type: &'static str,
    pub text: &'a str,
}

impl<'a> TextMessage<'a> {
    pub(crate) const fn new(text: &'a str) -> Self {
        Self {
            message_type: "text",
            text,
        }
    }
}

/// `POST /v2/bot/message/reply` body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReplyRequest<'a> {
    pub reply_token: &'a str,
    pub messages: Vec<TextMessage<'a>>,
}

/// `POST /v2/bot/message/push` body
#[derive(Debug, Serialize)]
pub(crate) struct PushRequest<'a> {
    pub to: &'a str,
    pub messages: Vec<TextMessage<'a>>,
}
