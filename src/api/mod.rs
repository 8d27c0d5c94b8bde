//! HTTP server for the LINE webhook

pub mod health;
pub mod webhook;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::channels::line::EventDedup;
use crate::relay::ReplyPipeline;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Turns accepted events into replies
    pub pipeline: Arc<ReplyPipeline>,
    /// Channel secret for `X-Line-Signature`; every webhook is rejected without it
    pub channel_secret: Option<SecretString>,
    /// Redelivery filter keyed on `webhookEventId`
    pub dedup: EventDedup,
}

impl ApiState {
    /// Create state with the default dedup window
    #[must_use]
    pub fn new(pipeline: Arc<ReplyPipeline>, channel_secret: Option<SecretString>) -> Self {
        Self {
            pipeline,
            channel_secret,
            dedup: EventDedup::default(),
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    host: String,
    port: u16,
}

impl ApiServer {
    /// Create a new API server
    #[must_use]
    pub fn new(state: ApiState, host: String, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            host,
            port,
        }
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(health::root).post(webhook::handle_webhook))
            .route("/callback", post(webhook::handle_webhook))
            .route("/health", get(health::health))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind webhook server: {e}")))?;

        tracing::info!(
            %addr,
            mode = %self.state.pipeline.mode(),
            "webhook server listening"
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("webhook server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
