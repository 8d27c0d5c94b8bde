//! LINE Relay - webhook bridge from LINE to `OpenAI`
//!
//! This library provides the pieces of the relay:
//! - LINE channel adapter (webhook types, signatures, reply chunking)
//! - `OpenAI` backend (chat, vision, transcription, assistants)
//! - Per-user thread registry with pluggable storage
//! - Reply pipeline and the webhook HTTP server
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   webhook   ┌──────────────┐   chat / runs   ┌──────────┐
//! │     LINE     │ ──────────▶ │ ReplyPipeline│ ──────────────▶ │  OpenAI  │
//! │  Messaging   │ ◀────────── │   + Chunker  │ ◀────────────── │   API    │
//! └──────────────┘ reply/push  └──────┬───────┘                 └──────────┘
//!                                     │
//!                              ┌──────▼───────┐
//!                              │ThreadRegistry│ memory / SQLite
//!                              └──────────────┘
//! ```

pub mod api;
pub mod channels;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod relay;
pub mod threads;

pub use channels::line::{chunk_text, chunk_text_with};
pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result, Severity};
pub use relay::{EventKind, InboundEvent, Mode, ReplyOutcome, ReplyPipeline};
pub use threads::{MemoryThreadStore, ThreadRegistry, ThreadStore};
