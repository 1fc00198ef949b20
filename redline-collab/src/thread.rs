//! Comment threads attached to suggestions.
//!
//! The editing core never talks to the thread backend itself; it asks for
//! creations and state transitions and the dispatcher carries them out
//! through a [`ThreadService`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redline_core::{SuggestionId, SuggestionSummaryType};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadState {
    Open,
    Resolved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    /// Suggestion id the thread is attached to.
    pub mark_id: SuggestionId,
    pub state: ThreadState,
    /// Serialized suggestion summary.
    pub content: String,
    pub primary_type: Option<SuggestionSummaryType>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ThreadServiceError {
    #[error("thread service unavailable: {0}")]
    Unavailable(String),

    #[error("thread {0} not found")]
    NotFound(String),
}

#[async_trait]
pub trait ThreadService: Send + Sync {
    async fn create_suggestion_thread(
        &self,
        suggestion_id: &SuggestionId,
        content: &str,
        primary_type: Option<SuggestionSummaryType>,
    ) -> Result<Thread, ThreadServiceError>;

    async fn get_all_threads(&self) -> Result<Vec<Thread>, ThreadServiceError>;

    async fn reopen_suggestion(&self, thread_id: &str) -> Result<(), ThreadServiceError>;

    async fn reject_suggestion(&self, thread_id: &str) -> Result<(), ThreadServiceError>;
}

/// Sink for errors nobody upstream can act on.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &ThreadServiceError);
}

/// Reports through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: &ThreadServiceError) {
        log::error!("thread service: {error}");
    }
}

/// Threads kept in memory. Used by tests and the simulator.
#[derive(Default)]
pub struct InMemoryThreadService {
    threads: RwLock<Vec<Thread>>,
    /// Number of upcoming calls that fail with `Unavailable`.
    failures: AtomicUsize,
    latency: Option<Duration>,
}

impl InMemoryThreadService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Every call waits `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn fail_next(&self, calls: usize) {
        self.failures.store(calls, Ordering::SeqCst);
    }

    pub async fn threads(&self) -> Vec<Thread> {
        self.threads.read().await.clone()
    }

    pub async fn thread_for(&self, mark_id: &SuggestionId) -> Option<Thread> {
        self.threads
            .read()
            .await
            .iter()
            .find(|t| &t.mark_id == mark_id)
            .cloned()
    }

    async fn enter(&self) -> Result<(), ThreadServiceError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ThreadServiceError::Unavailable("injected failure".into()));
        }
        Ok(())
    }

    async fn set_state(&self, thread_id: &str, state: ThreadState) -> Result<(), ThreadServiceError> {
        self.enter().await?;
        let mut threads = self.threads.write().await;
        let thread = threads
            .iter_mut()
            .find(|t| t.id == thread_id)
            .ok_or_else(|| ThreadServiceError::NotFound(thread_id.to_string()))?;
        thread.state = state;
        Ok(())
    }
}

#[async_trait]
impl ThreadService for InMemoryThreadService {
    async fn create_suggestion_thread(
        &self,
        suggestion_id: &SuggestionId,
        content: &str,
        primary_type: Option<SuggestionSummaryType>,
    ) -> Result<Thread, ThreadServiceError> {
        self.enter().await?;
        let thread = Thread {
            id: Uuid::new_v4().to_string(),
            mark_id: suggestion_id.clone(),
            state: ThreadState::Open,
            content: content.to_string(),
            primary_type,
        };
        self.threads.write().await.push(thread.clone());
        Ok(thread)
    }

    async fn get_all_threads(&self) -> Result<Vec<Thread>, ThreadServiceError> {
        self.enter().await?;
        Ok(self.threads.read().await.clone())
    }

    async fn reopen_suggestion(&self, thread_id: &str) -> Result<(), ThreadServiceError> {
        self.set_state(thread_id, ThreadState::Open).await
    }

    async fn reject_suggestion(&self, thread_id: &str) -> Result<(), ThreadServiceError> {
        self.set_state(thread_id, ThreadState::Rejected).await
    }
}
