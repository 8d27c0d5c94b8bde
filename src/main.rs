use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use line_relay::api::{ApiServer, ApiState};
use line_relay::channels::{Channel, LineChannel};
use line_relay::db::{self, SqliteThreadStore};
use line_relay::llm::OpenAiClient;
use line_relay::relay::{AssistantSetup, Mode, ReplyPipeline, Responder};
use line_relay::threads::{MemoryThreadStore, ThreadRegistry, ThreadStore};
use line_relay::Config;

/// LINE webhook relay to OpenAI chat, vision, transcription and assistants
#[derive(Parser)]
#[command(name = "line-relay", version, about)]
struct Cli {
    /// Port to listen on (overrides RELAY_PORT and the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Relay mode: echo, stateless or assistant
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Config file (default: ~/.config/line-relay/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,line_relay=info",
        1 => "info,line_relay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    for name in config.missing_credentials() {
        tracing::warn!(name, "credential not configured");
    }
    config.validate()?;

    tracing::info!(
        mode = %config.mode,
        port = config.server.port,
        "starting LINE relay"
    );

    let pipeline = build_pipeline(&config)?;
    let state = ApiState::new(Arc::new(pipeline), config.line.channel_secret.clone());

    ApiServer::new(state, config.server.host.clone(), config.server.port)
        .run()
        .await?;

    Ok(())
}

fn build_pipeline(config: &Config) -> anyhow::Result<ReplyPipeline> {
    let access_token = config
        .line
        .channel_access_token
        .clone()
        .unwrap_or_else(|| SecretString::from(String::new()));
    let channel: Arc<dyn Channel> = Arc::new(
        LineChannel::new(access_token)
            .with_base_urls(config.line.api_base.clone(), config.line.data_base.clone()),
    );

    let openai = || {
        let api_key = config
            .openai
            .api_key
            .clone()
            .unwrap_or_else(|| SecretString::from(String::new()));
        Arc::new(
            OpenAiClient::new(api_key)
                .with_base_url(&config.openai.base_url)
                .with_transcription(
                    config.openai.transcription_model.clone(),
                    config.openai.transcription_language.clone(),
                ),
        )
    };

    let responder = match config.mode {
        Mode::Echo => Responder::Echo,
        Mode::Stateless => {
            let client = openai();
            Responder::Stateless {
                chat: client.clone(),
                transcriber: client,
            }
        }
        Mode::Assistant => {
            let assistant_id = config
                .openai
                .assistant_id
                .clone()
                .context("assistant mode requires ASSISTANT_ID")?;

            let store: Arc<dyn ThreadStore> = match &config.server.db_path {
                Some(path) => {
                    let pool = db::init(path)
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    tracing::info!(path = %path.display(), "thread mappings persisted");
                    Arc::new(SqliteThreadStore::new(pool))
                }
                None => {
                    tracing::info!("thread mappings kept in memory");
                    Arc::new(MemoryThreadStore::new())
                }
            };

            let client = openai();
            let registry = Arc::new(ThreadRegistry::new(store, client.clone()));
            Responder::Assistant {
                chat: client.clone(),
                transcriber: client.clone(),
                assistant: AssistantSetup {
                    backend: client,
                    registry,
                    assistant_id,
                    policy: config.run_policy.clone(),
                },
            }
        }
    };

    Ok(ReplyPipeline::new(channel, responder, config.relay.clone()))
}
