//! Per-user conversation threads
//!
//! Each LINE user is mapped to one assistant thread on the model backend,
//! created lazily on first contact. The mapping lives behind [`ThreadStore`]
//! so it can be kept in memory or persisted across restarts.

pub mod run;

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

pub use run::{RunPolicy, run_assistant};

use crate::llm::AssistantBackend;
use crate::{Error, Result};

/// Number of lock stripes guarding first contact
const LOCK_STRIPES: usize = 64;

/// Key-value storage for `user_id -> thread_id`
pub trait ThreadStore: Send + Sync {
    /// Thread stored for a user
    ///
    /// # Errors
    ///
    /// Returns error if the backing store fails
    fn get(&self, user_id: &str) -> Result<Option<String>>;

    /// Store the thread for a user
    ///
    /// # Errors
    ///
    /// Returns error if the backing store fails
    fn insert(&self, user_id: &str, thread_id: &str) -> Result<()>;

    /// Number of stored mappings
    ///
    /// # Errors
    ///
    /// Returns error if the backing store fails
    fn count(&self) -> Result<usize>;
}

/// In-memory thread store (lost on restart)
#[derive(Debug, Default)]
pub struct MemoryThreadStore {
    threads: RwLock<HashMap<String, String>>,
}

impl MemoryThreadStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThreadStore for MemoryThreadStore {
    fn get(&self, user_id: &str) -> Result<Option<String>> {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        Ok(threads.get(user_id).cloned())
    }

    fn insert(&self, user_id: &str, thread_id: &str) -> Result<()> {
        let mut threads = self.threads.write().unwrap_or_else(PoisonError::into_inner);
        threads.insert(user_id.to_string(), thread_id.to_string());
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let threads = self.threads.read().unwrap_or_else(PoisonError::into_inner);
        Ok(threads.len())
    }
}

/// Maps users to assistant threads, creating threads on first contact
///
/// First contact for a user is serialised by a striped lock, so concurrent
/// first messages from the same user create exactly one thread.
pub struct ThreadRegistry {
    store: Arc<dyn ThreadStore>,
    backend: Arc<dyn AssistantBackend>,
    stripes: Vec<Mutex<()>>,
}

impl ThreadRegistry {
    /// Create a registry over a store and a thread-creating backend
    #[must_use]
    pub fn new(store: Arc<dyn ThreadStore>, backend: Arc<dyn AssistantBackend>) -> Self {
        Self {
            store,
            backend,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Thread for `user_id`, created on the backend if none is stored.
    ///
    /// # Errors
    ///
    /// Returns `ThreadCreation` if the backend cannot create a thread (no
    /// mapping is stored), or a store error.
    pub async fn get_or_create(&self, user_id: &str) -> Result<String> {
        if let Some(thread_id) = self.store.get(user_id)? {
            return Ok(thread_id);
        }

        let _guard = self.stripe(user_id).lock().await;

        // Another task may have created it while we waited
        if let Some(thread_id) = self.store.get(user_id)? {
            return Ok(thread_id);
        }

        let thread_id = self.backend.create_thread().await.map_err(|e| match e {
            Error::ThreadCreation(_) => e,
            other => Error::ThreadCreation(other.to_string()),
        })?;

        self.store.insert(user_id, &thread_id)?;
        tracing::info!(%thread_id, user = user_id, "created new thread");

        Ok(thread_id)
    }

    /// The underlying store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ThreadStore> {
        &self.store
    }

    fn stripe(&self, user_id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        #[allow(clippy::cast_possible_truncation)]
        let index = (hasher.finish() % LOCK_STRIPES as u64) as usize;
        &self.stripes[index]
    }
}
