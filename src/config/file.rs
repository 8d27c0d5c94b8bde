//! TOML configuration file loading
//!
//! Supports `~/.config/line-relay/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct RelayConfigFile {
    /// Relay variant ("echo", "stateless", "assistant")
    #[serde(default)]
    pub mode: Option<String>,

    /// LINE credentials and endpoints
    #[serde(default)]
    pub line: LineFileConfig,

    /// Model backend configuration
    #[serde(default)]
    pub openai: OpenAiFileConfig,

    /// Reply behaviour
    #[serde(default)]
    pub reply: ReplyFileConfig,

    /// Assistant run polling
    #[serde(default)]
    pub run: RunFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// LINE Messaging API configuration
#[derive(Debug, Default, Deserialize)]
pub struct LineFileConfig {
    pub channel_secret: Option<String>,
    pub channel_access_token: Option<String>,
    /// Messaging API base URL override
    pub api_base: Option<String>,
    /// Content API base URL override
    pub data_base: Option<String>,
}

/// Model backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct OpenAiFileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub assistant_id: Option<String>,
    /// Chat model for stateless replies (e.g. "gpt-4o-mini")
    pub chat_model: Option<String>,
    /// Vision model for images (e.g. "gpt-4o")
    pub vision_model: Option<String>,
    /// Transcription model (e.g. "whisper-1")
    pub transcription_model: Option<String>,
    /// ISO-639-1 language hint for transcription
    pub transcription_language: Option<String>,
}

/// Reply behaviour configuration
#[derive(Debug, Default, Deserialize)]
pub struct ReplyFileConfig {
    /// Per-message character ceiling
    pub max_len: Option<usize>,
    /// Instruction sent with every image
    pub image_instruction: Option<String>,
    /// Append error snippets to image failure replies
    pub expose_error_details: Option<bool>,
}

/// Assistant run polling configuration
#[derive(Debug, Default, Deserialize)]
pub struct RunFileConfig {
    pub poll_initial_ms: Option<u64>,
    pub poll_max_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Bind address
    pub host: Option<String>,

    /// Webhook server port
    pub port: Option<u16>,

    /// `SQLite` file for the thread mapping (in-memory when unset)
    pub db_path: Option<String>,
}

/// Load the TOML config file from `path`, or the standard path
///
/// Returns `RelayConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> RelayConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return RelayConfigFile::default();
    };

    if !path.exists() {
        return RelayConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                RelayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            RelayConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/line-relay/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("line-relay").join("config.toml"))
}
