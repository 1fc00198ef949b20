//! Keeps discussion threads in step with the suggestion nodes in the
//! document.
//!
//! The reconciler consumes update reports. It maintains the mark map,
//! requests a thread for every suggestion this session created, and after
//! undo/redo or resolution works out which threads have to be reopened or
//! rejected. Those classifications go through a [`CoalescingQueue`] so a burst
//! of undo steps produces one batch.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::{Duration, Instant};

use crate::document::EditorState;
use crate::editor::{tags, MutationKind, UpdateReport};
use crate::error::EditorError;
use crate::node::NodeKey;
use crate::suggestion::summary::{generate_summary, SuggestionSummaryType};
use crate::suggestion::SuggestionId;

/// Suggestion id to the keys of every live node carrying it.
pub type MarkMap = BTreeMap<SuggestionId, BTreeSet<NodeKey>>;

/// A request to open a discussion thread for a new suggestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadCreation {
    pub suggestion_id: SuggestionId,
    /// JSON array of summary items.
    pub content: String,
    pub primary_type: Option<SuggestionSummaryType>,
}

/// Suggestions whose threads need a state change after undo/redo.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileBatch {
    pub reopen: BTreeSet<SuggestionId>,
    pub reject: BTreeSet<SuggestionId>,
}

impl ReconcileBatch {
    pub fn is_empty(&self) -> bool {
        self.reopen.is_empty() && self.reject.is_empty()
    }
}

/// Holds the most recent value until `window` has passed without a newer
/// one.
#[derive(Debug)]
pub struct CoalescingQueue<T> {
    window: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> CoalescingQueue<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the quiet period.
    pub fn push(&mut self, now: Instant, value: T) {
        self.pending = Some((now + self.window, value));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((at, _)) if *at <= now => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }
}

pub struct SuggestionReconciler {
    mark_map: MarkMap,
    key_to_id: HashMap<NodeKey, SuggestionId>,
    created: BTreeSet<SuggestionId>,
    in_flight: BTreeSet<SuggestionId>,
    queue: CoalescingQueue<ReconcileBatch>,
}

impl SuggestionReconciler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            mark_map: MarkMap::new(),
            key_to_id: HashMap::new(),
            created: BTreeSet::new(),
            in_flight: BTreeSet::new(),
            queue: CoalescingQueue::new(debounce),
        }
    }

    pub fn mark_map(&self) -> &MarkMap {
        &self.mark_map
    }

    /// Rebuilds the mark map from a full document, e.g. after loading.
    pub fn seed(&mut self, state: &EditorState) {
        self.mark_map.clear();
        self.key_to_id.clear();
        for key in state.suggestion_nodes() {
            if let Some(props) = state.get(key).and_then(|n| n.as_suggestion()) {
                self.track(key, props.id.clone());
            }
        }
    }

    /// Records an id created by this session. Only such ids get threads.
    pub fn mark_created(&mut self, id: SuggestionId) {
        self.created.insert(id);
    }

    pub fn is_pending(&self, id: &SuggestionId) -> bool {
        self.created.contains(id)
    }

    pub fn is_in_flight(&self, id: &SuggestionId) -> bool {
        self.in_flight.contains(id)
    }

    pub fn thread_created(&mut self, id: &SuggestionId) {
        self.created.remove(id);
        self.in_flight.remove(id);
    }

    /// The id stays pending and is retried on its next mutation.
    pub fn thread_creation_failed(&mut self, id: &SuggestionId) {
        self.in_flight.remove(id);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.deadline()
    }

    pub fn take_due(&mut self, now: Instant) -> Option<ReconcileBatch> {
        self.queue.take_ready(now)
    }

    fn track(&mut self, key: NodeKey, id: SuggestionId) {
        if let Some(old) = self.key_to_id.insert(key, id.clone()) {
            if old != id {
                self.untrack_from(&old, key);
            }
        }
        self.mark_map.entry(id).or_default().insert(key);
    }

    fn untrack_from(&mut self, id: &SuggestionId, key: NodeKey) {
        if let Some(keys) = self.mark_map.get_mut(id) {
            keys.remove(&key);
            if keys.is_empty() {
                self.mark_map.remove(id);
            }
        }
    }

    /// Folds one committed update in. Returns the thread creations it
    /// triggers.
    pub fn process(
        &mut self,
        report: &UpdateReport,
        now: Instant,
    ) -> Result<Vec<ThreadCreation>, EditorError> {
        let mut touched: Vec<SuggestionId> = Vec::new();
        for (key, kind) in &report.suggestion_mutations {
            match kind {
                MutationKind::Destroyed => {
                    let Some(id) = self.key_to_id.remove(key) else {
                        continue;
                    };
                    self.untrack_from(&id, *key);
                }
                MutationKind::Created | MutationKind::Updated => {
                    let id = report.state.node(*key)?.suggestion_id()?.clone();
                    self.track(*key, id.clone());
                    if !touched.contains(&id) {
                        touched.push(id);
                    }
                }
            }
        }

        let mut creations = Vec::new();
        for id in touched {
            if !self.created.contains(&id) || self.in_flight.contains(&id) {
                continue;
            }
            let Some(keys) = self.mark_map.get(&id) else {
                continue;
            };
            let items = generate_summary(&report.state, keys.iter().copied());
            let content = serde_json::to_string(&items)?;
            log::debug!("requesting thread for suggestion {id}");
            self.in_flight.insert(id.clone());
            creations.push(ThreadCreation {
                suggestion_id: id,
                content,
                primary_type: items.first().map(|i| i.summary_type),
            });
        }

        if report.has_tag(tags::HISTORIC) || report.has_tag(tags::RESOLVE_SUGGESTIONS) {
            let batch = self.classify(report);
            if !batch.is_empty() {
                self.queue.push(now, batch);
            }
        }
        Ok(creations)
    }

    fn classify(&self, report: &UpdateReport) -> ReconcileBatch {
        let suggestion_in = |state: &EditorState, key: NodeKey| {
            state
                .get(key)
                .filter(|_| state.is_attached(key))
                .and_then(|n| n.as_suggestion())
                .map(|s| s.id.clone())
        };

        let mut batch = ReconcileBatch::default();
        for key in &report.dirty_elements {
            let now = suggestion_in(&*report.state, *key);
            let before = suggestion_in(&*report.prev_state, *key);
            match (before, now) {
                (None, Some(id)) => {
                    batch.reopen.insert(id);
                }
                (Some(id), None) if !self.mark_map.contains_key(&id) => {
                    batch.reject.insert(id);
                }
                _ => {}
            }
        }
        batch
    }
}
