//! Configuration management for the LINE relay
//!
//! Values resolve as environment variable, then config file, then default.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::channels::line::{DEFAULT_API_BASE, DEFAULT_DATA_BASE, DEFAULT_MAX_LEN};
use crate::llm::DEFAULT_BASE_URL;
use crate::relay::{Mode, RelaySettings, prompts};
use crate::threads::RunPolicy;
use crate::{Error, Result};

use self::file::RelayConfigFile;

/// Default webhook port
pub const DEFAULT_PORT: u16 = 8080;

/// LINE relay configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Relay variant
    pub mode: Mode,

    /// LINE credentials and endpoints
    pub line: LineConfig,

    /// Model backend configuration
    pub openai: OpenAiConfig,

    /// Reply pipeline settings
    pub relay: RelaySettings,

    /// Assistant run polling
    pub run_policy: RunPolicy,

    /// HTTP server configuration
    pub server: ServerConfig,
}

/// LINE Messaging API configuration
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Channel secret for webhook signatures (`LINE_CHANNEL_SECRET`)
    pub channel_secret: Option<SecretString>,

    /// Channel access token (`LINE_CHANNEL_ACCESS_TOKEN`)
    pub channel_access_token: Option<SecretString>,

    pub api_base: String,
    pub data_base: String,
}

/// Model backend configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (`OPENAI_API_KEY`)
    pub api_key: Option<SecretString>,

    /// API base URL (`OPENAI_BASE_URL`)
    pub base_url: String,

    /// Assistant to run in assistant mode (`ASSISTANT_ID`)
    pub assistant_id: Option<String>,

    /// Transcription model (`RELAY_TRANSCRIPTION_MODEL`)
    pub transcription_model: String,

    /// Transcription language hint
    pub transcription_language: Option<String>,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (`RELAY_HOST`)
    pub host: String,

    /// Port to listen on (`RELAY_PORT`, then `PORT`)
    pub port: u16,

    /// `SQLite` file for thread mappings (`RELAY_DB_PATH`); in-memory when unset
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path);
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be parsed
    pub fn from_sources(fc: RelayConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let mode = match env("RELAY_MODE").or(fc.mode) {
            Some(value) => value.parse()?,
            None => Mode::default(),
        };

        let line = LineConfig {
            channel_secret: env("LINE_CHANNEL_SECRET")
                .or(fc.line.channel_secret)
                .map(SecretString::from),
            channel_access_token: env("LINE_CHANNEL_ACCESS_TOKEN")
                .or(fc.line.channel_access_token)
                .map(SecretString::from),
            api_base: fc
                .line
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            data_base: fc
                .line
                .data_base
                .unwrap_or_else(|| DEFAULT_DATA_BASE.to_string()),
        };

        let openai = OpenAiConfig {
            api_key: env("OPENAI_API_KEY")
                .or(fc.openai.api_key)
                .map(SecretString::from),
            base_url: env("OPENAI_BASE_URL")
                .or(fc.openai.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            assistant_id: env("ASSISTANT_ID").or(fc.openai.assistant_id),
            transcription_model: env("RELAY_TRANSCRIPTION_MODEL")
                .or(fc.openai.transcription_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            transcription_language: fc.openai.transcription_language,
        };

        let defaults = RelaySettings::default();
        let relay = RelaySettings {
            chat_model: env("RELAY_CHAT_MODEL")
                .or(fc.openai.chat_model)
                .unwrap_or(defaults.chat_model),
            vision_model: env("RELAY_VISION_MODEL")
                .or(fc.openai.vision_model)
                .unwrap_or(defaults.vision_model),
            image_instruction: fc
                .reply
                .image_instruction
                .unwrap_or_else(|| prompts::DEFAULT_IMAGE_INSTRUCTION.to_string()),
            max_len: fc.reply.max_len.unwrap_or(DEFAULT_MAX_LEN),
            expose_error_details: match env("RELAY_EXPOSE_ERROR_DETAILS") {
                Some(value) => parse_bool("RELAY_EXPOSE_ERROR_DETAILS", &value)?,
                None => fc.reply.expose_error_details.unwrap_or(false),
            },
        };

        let default_policy = RunPolicy::default();
        let run_policy = RunPolicy {
            initial_interval: fc
                .run
                .poll_initial_ms
                .map_or(default_policy.initial_interval, Duration::from_millis),
            max_interval: fc
                .run
                .poll_max_ms
                .map_or(default_policy.max_interval, Duration::from_millis),
            timeout: fc
                .run
                .timeout_secs
                .map_or(default_policy.timeout, Duration::from_secs),
        };

        let port = match env("RELAY_PORT").or_else(|| env("PORT")) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid port '{value}'")))?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };

        let server = ServerConfig {
            host: env("RELAY_HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            db_path: env("RELAY_DB_PATH").or(fc.server.db_path).map(PathBuf::from),
        };

        Ok(Self {
            mode,
            line,
            openai,
            relay,
            run_policy,
            server,
        })
    }

    /// Names of credentials the active mode needs but lacks
    #[must_use]
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.line.channel_secret.is_none() {
            missing.push("LINE_CHANNEL_SECRET");
        }
        if self.line.channel_access_token.is_none() {
            missing.push("LINE_CHANNEL_ACCESS_TOKEN");
        }
        if self.mode != Mode::Echo && self.openai.api_key.is_none() {
            missing.push("OPENAI_API_KEY");
        }
        if self.mode == Mode::Assistant && self.openai.assistant_id.is_none() {
            missing.push("ASSISTANT_ID");
        }
        missing
    }

    /// Check that the configuration can start the relay
    ///
    /// # Errors
    ///
    /// Returns `Config` error if assistant mode has no assistant ID or the
    /// run polling settings cannot make progress
    pub fn validate(&self) -> Result<()> {
        if self.mode == Mode::Assistant && self.openai.assistant_id.is_none() {
            return Err(Error::Config(
                "assistant mode requires ASSISTANT_ID".to_string(),
            ));
        }
        if self.run_policy.timeout.is_zero() {
            return Err(Error::Config("run timeout must be positive".to_string()));
        }
        if self.run_policy.initial_interval.is_zero() {
            return Err(Error::Config(
                "run poll interval must be positive".to_string(),
            ));
        }
        if self.run_policy.max_interval < self.run_policy.initial_interval {
            return Err(Error::Config(
                "run poll_max_ms must not be below poll_initial_ms".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{key}: expected a boolean, got '{value}'"))),
    }
}
