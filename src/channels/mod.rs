//! Messaging channel adapters
//!
//! The relay talks to the messaging platform through the `Channel` trait so
//! the reply pipeline can run against a mock in tests.

pub mod line;

use async_trait::async_trait;

pub use line::LineChannel;

use crate::Result;

/// Maximum number of messages accepted by one reply or push request
pub const MAX_MESSAGES_PER_REQUEST: usize = 5;

/// Type of downloaded content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Image file (JPEG, PNG, GIF, etc.)
    Image,
    /// Audio file (M4A, MP3, WAV, etc.)
    Audio,
    /// Anything else
    Other,
}

impl ContentKind {
    /// Determine content kind from MIME type
    #[must_use]
    pub fn from_mime(mime_type: &str) -> Self {
        let lower = mime_type.to_lowercase();
        if lower.starts_with("image/") {
            Self::Image
        } else if lower.starts_with("audio/") {
            Self::Audio
        } else {
            Self::Other
        }
    }
}

/// Media content fetched from the platform
#[derive(Debug, Clone)]
pub struct Content {
    /// Raw bytes
    pub data: Vec<u8>,
    /// MIME type from the `Content-Type` header
    pub mime_type: String,
}

impl Content {
    /// Create content, normalising the MIME type (parameters stripped)
    #[must_use]
    pub fn new(data: Vec<u8>, mime_type: &str) -> Self {
        let mime_type = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        Self { data, mime_type }
    }

    /// Kind derived from the MIME type
    #[must_use]
    pub fn kind(&self) -> ContentKind {
        ContentKind::from_mime(&self.mime_type)
    }
}

/// Trait for messaging platform adapters
#[async_trait]
pub trait Channel: Send + Sync {
    /// Send up to [`MAX_MESSAGES_PER_REQUEST`] text messages against a
    /// single-use reply token
    async fn reply(&self, reply_token: &str, messages: &[String]) -> Result<()>;

    /// Send up to [`MAX_MESSAGES_PER_REQUEST`] text messages to a user,
    /// group or room without a reply token
    async fn push(&self, to: &str, messages: &[String]) -> Result<()>;

    /// Download the content of an image, audio or video message
    async fn download_content(&self, message_id: &str) -> Result<Content>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_kind_from_mime() {
        assert_eq!(ContentKind::from_mime("image/jpeg"), ContentKind::Image);
        assert_eq!(ContentKind::from_mime("Audio/M4A"), ContentKind::Audio);
        assert_eq!(ContentKind::from_mime("video/mp4"), ContentKind::Other);
    }

    #[test]
    fn content_strips_mime_parameters() {
        let content = Content::new(vec![1, 2], "audio/x-m4a; charset=binary");
        assert_eq!(content.mime_type, "audio/x-m4a");
        assert_eq!(content.kind(), ContentKind::Audio);
    }
}
