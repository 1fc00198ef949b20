//! Runs thread-service calls off the editing loop.
//!
//! Each request becomes a tokio task holding only `Send` handles. Results
//! come back as [`ThreadEvent`]s on an unbounded channel; once the
//! dispatcher is shut down, finished tasks drop their results instead of
//! sending them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use redline_core::{ReconcileBatch, SuggestionId, ThreadCreation};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::thread::{ErrorReporter, Thread, ThreadService, ThreadState};

#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEvent {
    Created {
        suggestion_id: SuggestionId,
        thread: Thread,
    },
    CreationFailed {
        suggestion_id: SuggestionId,
    },
    /// A reconcile batch finished; lists the threads whose state changed.
    Reconciled {
        reopened: Vec<String>,
        rejected: Vec<String>,
    },
}

pub struct ThreadDispatcher {
    service: Arc<dyn ThreadService>,
    reporter: Arc<dyn ErrorReporter>,
    events: mpsc::UnboundedSender<ThreadEvent>,
    alive: Arc<AtomicBool>,
}

impl ThreadDispatcher {
    pub fn new(
        service: Arc<dyn ThreadService>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> (Self, mpsc::UnboundedReceiver<ThreadEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            service,
            reporter,
            events,
            alive: Arc::new(AtomicBool::new(true)),
        };
        (dispatcher, rx)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Late results are dropped from here on.
    pub fn shutdown(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            log::debug!("thread dispatcher shut down");
        }
    }

    pub fn request_creation(&self, creation: ThreadCreation) -> JoinHandle<()> {
        let service = self.service.clone();
        let reporter = self.reporter.clone();
        let events = self.events.clone();
        let alive = self.alive.clone();
        tokio::spawn(async move {
            let ThreadCreation {
                suggestion_id,
                content,
                primary_type,
            } = creation;
            let event = match service
                .create_suggestion_thread(&suggestion_id, &content, primary_type)
                .await
            {
                Ok(thread) => {
                    log::debug!("thread {} created for suggestion {suggestion_id}", thread.id);
                    ThreadEvent::Created {
                        suggestion_id,
                        thread,
                    }
                }
                Err(e) => {
                    reporter.report(&e);
                    ThreadEvent::CreationFailed { suggestion_id }
                }
            };
            if alive.load(Ordering::SeqCst) {
                let _ = events.send(event);
            }
        })
    }

    /// Rejects threads of suggestions that disappeared and reopens threads of
    /// suggestions that came back. Threads are looked up by `mark_id`.
    pub fn apply_batch(&self, batch: ReconcileBatch) -> JoinHandle<()> {
        let service = self.service.clone();
        let reporter = self.reporter.clone();
        let events = self.events.clone();
        let alive = self.alive.clone();
        tokio::spawn(async move {
            let threads = match service.get_all_threads().await {
                Ok(threads) => threads,
                Err(e) => {
                    reporter.report(&e);
                    return;
                }
            };
            let mut reopened = Vec::new();
            let mut rejected = Vec::new();
            for thread in threads {
                if !alive.load(Ordering::SeqCst) {
                    return;
                }
                let result = if batch.reject.contains(&thread.mark_id)
                    && thread.state != ThreadState::Rejected
                {
                    rejected.push(thread.id.clone());
                    service.reject_suggestion(&thread.id).await
                } else if batch.reopen.contains(&thread.mark_id) && thread.state != ThreadState::Open {
                    reopened.push(thread.id.clone());
                    service.reopen_suggestion(&thread.id).await
                } else {
                    continue;
                };
                if let Err(e) = result {
                    reporter.report(&e);
                }
            }
            if alive.load(Ordering::SeqCst) {
                let _ = events.send(ThreadEvent::Reconciled { reopened, rejected });
            }
        })
    }
}

impl Drop for ThreadDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
