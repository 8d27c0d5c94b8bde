//! Shared test utilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use line_relay::channels::{Channel, Content};
use line_relay::llm::{
    AssistantBackend, ChatBackend, ChatRequest, Run, RunError, RunStatus, Transcriber,
};
use line_relay::threads::RunPolicy;
use line_relay::{Error, Result};
use tokio::sync::Mutex;

/// One outbound call made through the mock channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply { token: String, messages: Vec<String> },
    Push { to: String, messages: Vec<String> },
}

/// Mock channel recording replies and pushes
#[derive(Default)]
pub struct MockChannel {
    sent: Arc<Mutex<Vec<Sent>>>,
    content: HashMap<String, Content>,
    pub fail_reply: AtomicBool,
    /// Number of upcoming replies to reject
    pub fail_next_replies: AtomicUsize,
    /// Number of upcoming pushes to reject
    pub fail_next_pushes: AtomicUsize,
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `data` for `message_id`
    pub fn with_content(mut self, message_id: &str, data: &[u8], mime_type: &str) -> Self {
        self.content
            .insert(message_id.to_string(), Content::new(data.to_vec(), mime_type));
        self
    }

    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    /// All delivered texts in send order
    pub async fn texts(&self) -> Vec<String> {
        self.sent()
            .await
            .into_iter()
            .flat_map(|s| match s {
                Sent::Reply { messages, .. } | Sent::Push { messages, .. } => messages,
            })
            .collect()
    }

    /// Poll until at least `n` calls were recorded (background tasks)
    pub async fn wait_for(&self, n: usize) -> Vec<Sent> {
        for _ in 0..200 {
            let sent = self.sent().await;
            if sent.len() >= n {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sent().await
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn reply(&self, reply_token: &str, messages: &[String]) -> Result<()> {
        if self.fail_reply.load(Ordering::SeqCst) || take_one(&self.fail_next_replies) {
            return Err(Error::Channel("400 Invalid reply token".to_string()));
        }
        self.sent.lock().await.push(Sent::Reply {
            token: reply_token.to_string(),
            messages: messages.to_vec(),
        });
        Ok(())
    }

    async fn push(&self, to: &str, messages: &[String]) -> Result<()> {
        if take_one(&self.fail_next_pushes) {
            return Err(Error::Channel("429 Too Many Requests".to_string()));
        }
        self.sent.lock().await.push(Sent::Push {
            to: to.to_string(),
            messages: messages.to_vec(),
        });
        Ok(())
    }

    async fn download_content(&self, message_id: &str) -> Result<Content> {
        self.content
            .get(message_id)
            .cloned()
            .ok_or_else(|| Error::ContentDownload(format!("404 Not Found for message {message_id}")))
    }
}

/// Mock chat backend returning a fixed answer
pub struct MockChat {
    answer: String,
    pub requests: Mutex<Vec<ChatRequest>>,
    pub fail: AtomicBool,
}

impl MockChat {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            requests: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let chat = Self::new("");
        chat.fail.store(true, Ordering::SeqCst);
        chat
    }
}

#[async_trait]
impl ChatBackend for MockChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().await.push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::BackendRequest(
                "chat API error: 500 Internal Server Error".to_string(),
            ));
        }
        Ok(self.answer.clone())
    }
}

/// Mock transcriber returning a fixed transcription
pub struct MockTranscriber {
    text: String,
    pub calls: Mutex<Vec<(usize, String)>>,
}

impl MockTranscriber {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, data: &[u8], mime_type: &str) -> Result<String> {
        self.calls
            .lock()
            .await
            .push((data.len(), mime_type.to_string()));
        Ok(self.text.clone())
    }
}

/// Mock assistant backend: runs finish on the first status check
pub struct MockAssistant {
    answer: String,
    final_status: RunStatus,
    pub threads_created: AtomicUsize,
    pub messages: Mutex<Vec<(String, String)>>,
    pub fail_create: AtomicBool,
}

impl MockAssistant {
    pub fn new(answer: &str) -> Self {
        Self::with_status(answer, RunStatus::Completed)
    }

    pub fn with_status(answer: &str, final_status: RunStatus) -> Self {
        Self {
            answer: answer.to_string(),
            final_status,
            threads_created: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
        }
    }

    pub fn created(&self) -> usize {
        self.threads_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssistantBackend for MockAssistant {
    async fn create_thread(&self) -> Result<String> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::ThreadCreation("503 Service Unavailable".to_string()));
        }
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("thread_{n}"))
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<()> {
        self.messages
            .lock()
            .await
            .push((thread_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<Run> {
        Ok(Run {
            id: "run_1".to_string(),
            status: RunStatus::Queued,
            last_error: None,
        })
    }

    async fn retrieve_run(&self, _thread_id: &str, run_id: &str) -> Result<Run> {
        Ok(Run {
            id: run_id.to_string(),
            status: self.final_status,
            last_error: (self.final_status == RunStatus::Failed).then(|| RunError {
                code: "rate_limit_exceeded".to_string(),
                message: "You exceeded your current quota".to_string(),
            }),
        })
    }

    async fn latest_message(&self, _thread_id: &str) -> Result<Option<String>> {
        Ok(Some(self.answer.clone()))
    }
}

/// Run policy with millisecond polling for tests
pub fn fast_policy() -> RunPolicy {
    RunPolicy {
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
        timeout: Duration::from_secs(2),
    }
}
