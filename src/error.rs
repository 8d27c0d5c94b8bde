//! Error types for the LINE relay

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// How an error affects the user who sent the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Transient failure; resending the message may succeed
    Recoverable,
    /// Failure that a resend will not fix (bad config, undecodable media)
    Fatal,
}

/// Errors that can occur in the relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Model backend request failed (network or API error)
    #[error("backend request failed: {0}")]
    BackendRequest(String),

    /// Conversation thread could not be created
    #[error("thread creation failed: {0}")]
    ThreadCreation(String),

    /// Inbound media could not be fetched from the messaging platform
    #[error("content download failed: {0}")]
    ContentDownload(String),

    /// Inbound media could not be encoded for submission
    #[error("content decode failed: {0}")]
    ContentDecode(String),

    /// Assistant run reached a non-successful terminal state
    #[error("run ended with status {status}: {detail}")]
    RunFailed {
        /// Terminal run status reported by the backend
        status: String,
        /// Backend-supplied error detail, if any
        detail: String,
    },

    /// Assistant run did not reach a terminal state in time
    #[error("run {run_id} did not finish within {waited_secs}s")]
    RunTimeout {
        /// Run identifier
        run_id: String,
        /// Seconds spent waiting
        waited_secs: u64,
    },

    /// Messaging platform error (reply/push)
    #[error("channel error: {0}")]
    Channel(String),

    /// Webhook signature mismatch
    #[error("invalid webhook signature")]
    Signature,

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Classify the error for the user-facing outcome
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::BackendRequest(_)
            | Self::ThreadCreation(_)
            | Self::ContentDownload(_)
            | Self::RunFailed { .. }
            | Self::RunTimeout { .. }
            | Self::Channel(_)
            | Self::Http(_)
            | Self::Io(_) => Severity::Recoverable,
            Self::Config(_)
            | Self::ContentDecode(_)
            | Self::Signature
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Toml(_)
            | Self::Sqlite(_) => Severity::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_are_recoverable() {
        assert_eq!(
            Error::BackendRequest("503".to_string()).severity(),
            Severity::Recoverable
        );
        assert_eq!(
            Error::RunTimeout {
                run_id: "run_1".to_string(),
                waited_secs: 60,
            }
            .severity(),
            Severity::Recoverable
        );
    }

    #[test]
    fn decode_and_config_failures_are_fatal() {
        assert_eq!(
            Error::ContentDecode("empty image".to_string()).severity(),
            Severity::Fatal
        );
        assert_eq!(Error::Config("missing key".to_string()).severity(), Severity::Fatal);
    }

    #[test]
    fn run_failed_message_includes_status() {
        let err = Error::RunFailed {
            status: "failed".to_string(),
            detail: "rate_limit_exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "run ended with status failed: rate_limit_exceeded");
    }
}
