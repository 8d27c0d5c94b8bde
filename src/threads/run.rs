//! Assistant runs with bounded polling

use std::time::{Duration, Instant};

use crate::llm::{AssistantBackend, RunStatus};
use crate::{Error, Result};

/// Polling policy for assistant runs
///
/// Status is checked with exponential backoff between `initial_interval`
/// and `max_interval` until the run leaves its pending states or `timeout`
/// elapses.
#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Delay before the first status check
    pub initial_interval: Duration,
    /// Maximum delay between checks
    pub max_interval: Duration,
    /// Total time allowed for the run
    pub timeout: Duration,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
        }
    }
}

impl RunPolicy {
    /// Delay before status check number `attempt` (zero-based)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_interval
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_interval)
    }
}

/// Post `content` to a thread, run the assistant on it and return its answer.
///
/// `policy.timeout` bounds the whole exchange, including each backend call.
///
/// # Errors
///
/// - `RunTimeout` if the run is still pending after `policy.timeout`
/// - `RunFailed` if the run ends in any terminal state other than completed
/// - `BackendRequest` if a backend call fails or the answer has no text
pub async fn run_assistant(
    backend: &dyn AssistantBackend,
    thread_id: &str,
    assistant_id: &str,
    content: &str,
    policy: &RunPolicy,
) -> Result<String> {
    let deadline = Deadline::start(policy.timeout);
    let pending = format!("for {thread_id}");

    deadline
        .bound(&pending, backend.add_message(thread_id, content))
        .await?;

    let mut run = deadline
        .bound(&pending, backend.create_run(thread_id, assistant_id))
        .await?;
    tracing::info!(run_id = %run.id, thread_id, "run created");

    let mut attempt = 0u32;

    while run.status.is_pending() {
        let remaining = deadline.remaining();
        if remaining.is_zero() {
            tracing::warn!(run_id = %run.id, status = run.status.as_str(), "run timed out");
            return Err(deadline.expired(&run.id));
        }

        tokio::time::sleep(policy.delay_for_attempt(attempt).min(remaining)).await;
        attempt = attempt.saturating_add(1);

        run = deadline
            .bound(&run.id, backend.retrieve_run(thread_id, &run.id))
            .await?;
        tracing::debug!(run_id = %run.id, status = run.status.as_str(), attempt, "run status");
    }

    if run.status != RunStatus::Completed {
        let detail = run
            .last_error
            .map_or_else(|| "no error detail".to_string(), |e| format!("{}: {}", e.code, e.message));
        tracing::warn!(run_id = %run.id, status = run.status.as_str(), %detail, "run did not complete");
        return Err(Error::RunFailed {
            status: run.status.as_str().to_string(),
            detail,
        });
    }

    deadline
        .bound(&run.id, backend.latest_message(thread_id))
        .await?
        .ok_or_else(|| Error::BackendRequest("assistant answer has no text content".to_string()))
}

/// Overall time budget for one run
struct Deadline {
    started: Instant,
    timeout: Duration,
}

impl Deadline {
    fn start(timeout: Duration) -> Self {
        Self {
            started: Instant::now(),
            timeout,
        }
    }

    fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.started.elapsed())
    }

    fn expired(&self, run_id: &str) -> Error {
        Error::RunTimeout {
            run_id: run_id.to_string(),
            waited_secs: self.started.elapsed().as_secs(),
        }
    }

    /// Await a backend call, giving up when the budget runs out
    async fn bound<T>(&self, run_id: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        if let Ok(result) = tokio::time::timeout(self.remaining(), call).await {
            result
        } else {
            tracing::warn!(run_id, "backend call exceeded run timeout");
            Err(self.expired(run_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::llm::{Run, RunError};

    /// Backend that replays a fixed sequence of run statuses
    struct ScriptedBackend {
        statuses: Mutex<VecDeque<RunStatus>>,
        last: RunStatus,
        answer: Option<String>,
        polls: AtomicU32,
        messages: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(statuses: &[RunStatus], answer: Option<&str>) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                last: statuses.last().copied().unwrap_or(RunStatus::Completed),
                answer: answer.map(str::to_string),
                polls: AtomicU32::new(0),
                messages: Mutex::new(Vec::new()),
            }
        }

        fn next_run(&self) -> Run {
            let status = self.statuses.lock().unwrap().pop_front().unwrap_or(self.last);
            Run {
                id: "run_1".to_string(),
                status,
                last_error: (status == RunStatus::Failed).then(|| RunError {
                    code: "server_error".to_string(),
                    message: "boom".to_string(),
                }),
            }
        }
    }

    #[async_trait]
    impl AssistantBackend for ScriptedBackend {
        async fn create_thread(&self) -> Result<String> {
            Ok("thread_1".to_string())
        }

        async fn add_message(&self, _thread_id: &str, content: &str) -> Result<()> {
            self.messages.lock().unwrap().push(content.to_string());
            Ok(())
        }

        async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<Run> {
            Ok(self.next_run())
        }

        async fn retrieve_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(self.next_run())
        }

        async fn latest_message(&self, _thread_id: &str) -> Result<Option<String>> {
            Ok(self.answer.clone())
        }
    }

    fn fast_policy(timeout_ms: u64) -> RunPolicy {
        RunPolicy {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[test]
    fn delay_doubles_up_to_cap() {
        let policy = RunPolicy {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn completed_run_returns_latest_message() {
        let backend = ScriptedBackend::new(
            &[RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed],
            Some("Hi there"),
        );

        let answer = run_assistant(&backend, "thread_1", "asst_1", "Hello", &fast_policy(1000))
            .await
            .unwrap();

        assert_eq!(answer, "Hi there");
        assert_eq!(backend.polls.load(Ordering::SeqCst), 2);
        assert_eq!(backend.messages.lock().unwrap().as_slice(), ["Hello"]);
    }

    #[tokio::test]
    async fn failed_run_reports_status_and_detail() {
        let backend = ScriptedBackend::new(&[RunStatus::InProgress, RunStatus::Failed], None);

        let err = run_assistant(&backend, "thread_1", "asst_1", "Hello", &fast_policy(1000))
            .await
            .unwrap_err();

        match err {
            Error::RunFailed { status, detail } => {
                assert_eq!(status, "failed");
                assert_eq!(detail, "server_error: boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn requires_action_is_terminal() {
        let backend = ScriptedBackend::new(&[RunStatus::RequiresAction], None);

        let err = run_assistant(&backend, "thread_1", "asst_1", "Hello", &fast_policy(1000))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RunFailed { ref status, .. } if status == "requires_action"));
        assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stalled_run_times_out() {
        let backend = ScriptedBackend::new(&[RunStatus::InProgress], None);

        let err = run_assistant(&backend, "thread_1", "asst_1", "Hello", &fast_policy(30))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RunTimeout { ref run_id, .. } if run_id == "run_1"));
        assert!(backend.polls.load(Ordering::SeqCst) >= 1);
    }

    /// Backend whose status check never answers
    struct HangingBackend;

    #[async_trait]
    impl AssistantBackend for HangingBackend {
        async fn create_thread(&self) -> Result<String> {
            Ok("thread_1".to_string())
        }

        async fn add_message(&self, _thread_id: &str, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> Result<Run> {
            Ok(Run {
                id: "run_1".to_string(),
                status: RunStatus::Queued,
                last_error: None,
            })
        }

        async fn retrieve_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run> {
            std::future::pending().await
        }

        async fn latest_message(&self, _thread_id: &str) -> Result<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn hung_status_check_times_out() {
        let started = Instant::now();

        let err = run_assistant(&HangingBackend, "thread_1", "asst_1", "Hello", &fast_policy(50))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RunTimeout { ref run_id, .. } if run_id == "run_1"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn completed_run_without_text_is_an_error() {
        let backend = ScriptedBackend::new(&[RunStatus::Completed], None);

        let err = run_assistant(&backend, "thread_1", "asst_1", "Hello", &fast_policy(1000))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::BackendRequest(_)));
    }
}
