//! Binds one editing session to a shared `yrs` document.
//!
//! Node records live as JSON under their key in the shared `nodes` map,
//! with the text of text nodes held back: that goes into a `TextRef` under
//! the same key in the `texts` map, so concurrent typing in one node merges
//! character by character instead of one record replacing the other.
//!
//! Local commits write the records and text splices they touched, under
//! this binding's own transaction origin, and hand back the encoded v1
//! update. A `yrs` undo manager tracks only that origin, so undo reverts
//! this user's edits and leaves everyone else's in place. Remote updates
//! are applied to the shared doc, diffed against what was last seen, and
//! the difference is applied to the editor in a single `collaboration`
//! update.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use redline_core::{
    tags, EditingSession, EditorError, EditorState, HistoryRequest, Node, NodeKey, NodeKind,
    NodeSpec, Selection, SessionConfig, SessionOutput, Tags, UpdateReport,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use yrs::updates::decoder::Decode;
use yrs::{
    Any, Doc, GetString, Map, MapRef, OffsetKind, Options, Out, ReadTxn, Text, TextPrelim,
    Transact, TransactionMut, UndoManager, Update,
};

use crate::presence::{AwarenessMessage, CursorColor, CursorDecoration, PresenceRoom};

const NODES: &str = "nodes";
const TEXTS: &str = "texts";

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("failed to decode update: {0}")]
    Decode(String),

    #[error("failed to apply update: {0}")]
    Apply(String),

    #[error("invalid node record: {0}")]
    Record(#[from] serde_json::Error),

    #[error("invalid node key in shared document: {0}")]
    Key(String),

    #[error("text offset out of range: {0}")]
    Offset(usize),

    #[error("awareness message: {0}")]
    Awareness(String),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("binding was destroyed")]
    Destroyed,
}

/// Outcome of loading the shared document. `Some` carries the update that
/// seeded it.
pub type LoadResult = Result<Option<Vec<u8>>, BindingError>;

/// Where a remote update came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOrigin {
    /// Produced by a binding. Our own id means an echo.
    Binding(Uuid),
    /// A remote peer's edit.
    Peer(Uuid),
    /// A peer's undo manager replaying history.
    UndoManager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Minimum gap between cursor broadcasts, in ms
    pub cursor_broadcast_interval_ms: u64,
    /// Remote peers silent for longer than this are dropped, in ms
    pub idle_timeout_ms: u64,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            cursor_broadcast_interval_ms: 33,
            idle_timeout_ms: 30_000,
        }
    }
}

impl BindingConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalUser {
    pub id: Uuid,
    pub name: String,
    pub color: CursorColor,
}

impl LocalUser {
    /// Name and color from the session config; the color falls back to one
    /// derived from the id.
    pub fn from_config(id: Uuid, config: &SessionConfig) -> Self {
        let color = config
            .user_color
            .as_deref()
            .and_then(CursorColor::from_hex)
            .unwrap_or_else(|| CursorColor::from_uuid(id));
        Self {
            id,
            name: config.user_name.clone(),
            color,
        }
    }
}

/// Shared docs of one client, keyed by document id.
#[derive(Default)]
pub struct DocRegistry {
    docs: HashMap<String, Doc>,
}

impl DocRegistry {
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::default()))
    }

    /// The doc for `doc_id`, created on first use. Text offsets count UTF-8
    /// bytes.
    pub fn doc_for(&mut self, doc_id: &str) -> Doc {
        self.docs
            .entry(doc_id.to_string())
            .or_insert_with(|| {
                Doc::with_options(Options {
                    offset_kind: OffsetKind::Bytes,
                    ..Options::default()
                })
            })
            .clone()
    }

    pub fn remove(&mut self, doc_id: &str) -> Option<Doc> {
        self.docs.remove(doc_id)
    }

    pub fn contains(&self, doc_id: &str) -> bool {
        self.docs.contains_key(doc_id)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Both shared maps as plain strings, keyed by node key.
#[derive(Debug, Default, Clone, PartialEq)]
struct Snapshot {
    records: BTreeMap<String, String>,
    texts: BTreeMap<String, String>,
}

/// Splits a node into its stored record and, for text nodes, the text
/// kept in the node's `TextRef`.
fn split_text(node: &Node) -> (Node, Option<&str>) {
    let mut record = node.clone();
    match (&mut record.kind, &node.kind) {
        (NodeKind::Text(stored), NodeKind::Text(props)) => {
            stored.text.clear();
            (record, Some(props.text.as_str()))
        }
        _ => (record, None),
    }
}

/// The smallest single edit turning `old` into `new`: the byte range of
/// `old` to replace and what goes there. Both ends land on char boundaries.
fn splice<'a>(old: &str, new: &'a str) -> (usize, usize, &'a str) {
    let prefix: usize = old
        .chars()
        .zip(new.chars())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();
    let (old_rest, new_rest) = (&old[prefix..], &new[prefix..]);
    let suffix: usize = old_rest
        .chars()
        .rev()
        .zip(new_rest.chars().rev())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| a.len_utf8())
        .sum();
    (prefix, old.len() - suffix, &new_rest[..new_rest.len() - suffix])
}

fn offset(value: usize) -> Result<u32, BindingError> {
    u32::try_from(value).map_err(|_| BindingError::Offset(value))
}

/// Brings the `TextRef` under `key` in line with `text` as one splice.
/// `None` drops it.
fn write_text(
    texts: &MapRef,
    synced: &mut BTreeMap<String, String>,
    txn: &mut TransactionMut,
    key: &str,
    text: Option<&str>,
) -> Result<bool, BindingError> {
    let Some(text) = text else {
        if synced.remove(key).is_none() {
            return Ok(false);
        }
        texts.remove(txn, key);
        return Ok(true);
    };
    if synced.get(key).map(String::as_str) == Some(text) {
        return Ok(false);
    }
    match texts.get(&*txn, key) {
        Some(Out::YText(shared)) => {
            let current = shared.get_string(&*txn);
            let (start, end, inserted) = splice(&current, text);
            if end > start {
                shared.remove_range(txn, offset(start)?, offset(end - start)?);
            }
            if !inserted.is_empty() {
                shared.insert(txn, offset(start)?, inserted);
            }
        }
        _ => {
            texts.insert(txn, key.to_string(), TextPrelim::new(text));
        }
    }
    synced.insert(key.to_string(), text.to_string());
    Ok(true)
}

pub struct Binding {
    id: Uuid,
    doc_id: String,
    doc: Doc,
    nodes: MapRef,
    texts: MapRef,
    undo: UndoManager,
    /// Transaction origin of local writes, the only one `undo` tracks.
    origin_tag: String,
    registry: Rc<RefCell<DocRegistry>>,
    presence: PresenceRoom,
    /// Shared state as last written or read.
    synced: Snapshot,
    decorations: Vec<CursorDecoration>,
    initialized: bool,
    destroyed: bool,
}

impl Binding {
    pub fn start(
        doc_id: &str,
        registry: &Rc<RefCell<DocRegistry>>,
        user: LocalUser,
        config: &BindingConfig,
    ) -> Self {
        let doc = registry.borrow_mut().doc_for(doc_id);
        let nodes = doc.get_or_insert_map(NODES);
        let texts = doc.get_or_insert_map(TEXTS);
        let id = Uuid::new_v4();
        let origin_tag = format!("binding-{id}");
        let mut undo = UndoManager::new(&doc, &nodes);
        undo.expand_scope(&texts);
        undo.include_origin(origin_tag.as_str());
        let presence = PresenceRoom::new(
            user.id,
            user.name,
            user.color,
            Duration::from_millis(config.cursor_broadcast_interval_ms),
            Duration::from_millis(config.idle_timeout_ms),
        );
        log::info!("binding {doc_id} started for user {}", user.id);
        Self {
            id,
            doc_id: doc_id.to_string(),
            doc,
            nodes,
            texts,
            undo,
            origin_tag,
            registry: registry.clone(),
            presence,
            synced: Snapshot::default(),
            decorations: Vec::new(),
            initialized: false,
            destroyed: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn origin(&self) -> UpdateOrigin {
        UpdateOrigin::Binding(self.id)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    fn ensure_alive(&self) -> Result<(), BindingError> {
        if self.destroyed {
            Err(BindingError::Destroyed)
        } else {
            Ok(())
        }
    }

    /// Loads the shared document into the editor. When the shared document
    /// is empty and `initial` is given, seeds it with that content instead.
    /// Only the first call does anything. Seeding is not undoable.
    pub fn initialize(&mut self, session: &mut EditingSession, initial: Option<&[NodeSpec]>) -> LoadResult {
        self.ensure_alive()?;
        if self.initialized {
            return Ok(None);
        }
        let shared = self.read_shared();
        let seeded = if !shared.records.is_empty() {
            self.load(session, shared, Tags::new().with(tags::COLLABORATION))?;
            None
        } else if let Some(specs) = initial {
            session.apply_update(Tags::new().with(tags::COLLABORATION), |tx| {
                for spec in specs {
                    let key = tx.build(spec);
                    tx.append_child(NodeKey::ROOT, key)?;
                }
                Ok(())
            })?;
            let state = session.editor().snapshot();
            let update = self.write(false, state.nodes().map(|n| (n.key, Some(n))))?;
            log::info!("seeded shared document {}", self.doc_id);
            update
        } else {
            None
        };
        self.initialized = true;
        session.reseed_marks();
        Ok(seeded)
    }

    /// Pushes a committed local update into the shared doc. Returns the
    /// encoded update, or `None` when there is nothing to send.
    pub fn sync_local(&mut self, report: &UpdateReport) -> Result<Option<Vec<u8>>, BindingError> {
        self.ensure_alive()?;
        if report.has_tag(tags::SKIP_COLLAB) || report.has_tag(tags::COLLABORATION) {
            return Ok(None);
        }
        let update = self.write(true, report.changes.iter().map(|c| (c.key, c.after.as_ref())))?;
        // One undo step per commit.
        self.undo.reset();
        Ok(update)
    }

    /// Runs an undo or redo on the shared history, which only holds this
    /// binding's own writes, and mirrors the result into the editor. The
    /// encoded update is returned for the other peers.
    pub fn apply_history(
        &mut self,
        session: &mut EditingSession,
        request: HistoryRequest,
    ) -> Result<(SessionOutput, Option<Vec<u8>>), BindingError> {
        self.ensure_alive()?;
        let before = self.doc.transact().state_vector();
        let changed = match request {
            HistoryRequest::Undo => self.undo.undo_blocking(),
            HistoryRequest::Redo => self.undo.redo_blocking(),
        };
        if !changed {
            log::debug!("nothing to {request:?} in {}", self.doc_id);
            return Ok((SessionOutput::default(), None));
        }
        let update = self.doc.transact().encode_diff_v1(&before);
        let shared = self.read_shared();
        let out = self.load(
            session,
            shared,
            Tags::new().with(tags::COLLABORATION).with(tags::HISTORIC),
        )?;
        self.refresh_decorations(session.editor().state());
        Ok((out, Some(update)))
    }

    /// Applies a v1 update from elsewhere and mirrors the changed records
    /// into the editor.
    pub fn apply_remote_update(
        &mut self,
        session: &mut EditingSession,
        update: &[u8],
        origin: UpdateOrigin,
    ) -> Result<SessionOutput, BindingError> {
        self.ensure_alive()?;
        if origin == self.origin() {
            return Ok(SessionOutput::default());
        }
        let update = Update::decode_v1(update).map_err(|e| BindingError::Decode(e.to_string()))?;
        {
            let mut txn = self.doc.transact_mut();
            txn.apply_update(update)
                .map_err(|e| BindingError::Apply(e.to_string()))?;
        }

        let mut update_tags = Tags::new().with(tags::COLLABORATION);
        if origin == UpdateOrigin::UndoManager {
            update_tags.insert(tags::HISTORIC);
        }
        let shared = self.read_shared();
        let out = self.load(session, shared, update_tags)?;
        self.refresh_decorations(session.editor().state());
        Ok(out)
    }

    fn load(
        &mut self,
        session: &mut EditingSession,
        shared: Snapshot,
        update_tags: Tags,
    ) -> Result<SessionOutput, BindingError> {
        let mut changed = Vec::new();
        for (key, json) in &shared.records {
            let text = shared.texts.get(key);
            if self.synced.records.get(key) == Some(json) && self.synced.texts.get(key) == text {
                continue;
            }
            let mut node = serde_json::from_str::<Node>(json)?;
            if let (NodeKind::Text(props), Some(text)) = (&mut node.kind, text) {
                props.text = text.clone();
            }
            changed.push(node);
        }
        let mut removed = Vec::new();
        for key in self.synced.records.keys().filter(|k| !shared.records.contains_key(*k)) {
            removed.push(NodeKey::from_str(key).map_err(|_| BindingError::Key(key.clone()))?);
        }
        self.synced = shared;
        if changed.is_empty() && removed.is_empty() {
            return Ok(SessionOutput::default());
        }
        log::debug!(
            "applying {} changed and {} removed records from {}",
            changed.len(),
            removed.len(),
            self.doc_id
        );
        let (_, out) = session.apply_update(update_tags, |tx| {
            for node in changed {
                tx.put_node(node);
            }
            for key in removed {
                tx.remove_node_record(key);
            }
            Ok(())
        })?;
        Ok(out)
    }

    fn read_shared(&self) -> Snapshot {
        let txn = self.doc.transact();
        let records = self
            .nodes
            .iter(&txn)
            .filter_map(|(key, value)| match value {
                Out::Any(Any::String(json)) => Some((key.to_string(), json.to_string())),
                _ => None,
            })
            .collect();
        let texts = self
            .texts
            .iter(&txn)
            .filter_map(|(key, value)| match value {
                Out::YText(text) => Some((key.to_string(), text.get_string(&txn))),
                _ => None,
            })
            .collect();
        Snapshot { records, texts }
    }

    /// Writes changed nodes into both maps. Tracked writes carry this
    /// binding's origin and become undo steps.
    fn write<'n>(
        &mut self,
        tracked: bool,
        changes: impl Iterator<Item = (NodeKey, Option<&'n Node>)>,
    ) -> Result<Option<Vec<u8>>, BindingError> {
        let before = self.doc.transact().state_vector();
        let mut wrote = false;
        {
            let mut txn = if tracked {
                self.doc.transact_mut_with(self.origin_tag.as_str())
            } else {
                self.doc.transact_mut()
            };
            for (key, node) in changes {
                let key = key.to_string();
                let Some(node) = node else {
                    if self.synced.records.remove(&key).is_some() {
                        self.nodes.remove(&mut txn, &key);
                        wrote = true;
                    }
                    wrote |= write_text(&self.texts, &mut self.synced.texts, &mut txn, &key, None)?;
                    continue;
                };
                let (record, text) = split_text(node);
                let json = serde_json::to_string(&record)?;
                if self.synced.records.get(&key) != Some(&json) {
                    self.nodes.insert(&mut txn, key.clone(), json.clone());
                    self.synced.records.insert(key.clone(), json);
                    wrote = true;
                }
                wrote |= write_text(&self.texts, &mut self.synced.texts, &mut txn, &key, text)?;
            }
        }
        if !wrote {
            return Ok(None);
        }
        Ok(Some(self.doc.transact().encode_diff_v1(&before)))
    }

    /// Full shared state as one update, for a peer joining late.
    pub fn encode_state(&self) -> Vec<u8> {
        self.doc
            .transact()
            .encode_diff_v1(&yrs::StateVector::default())
    }

    pub fn join_message(&self) -> Result<Vec<u8>, BindingError> {
        self.presence.join_message().encode()
    }

    pub fn leave_message(&self) -> Result<Vec<u8>, BindingError> {
        self.presence.leave_message().encode()
    }

    pub fn set_focus(&mut self, focusing: bool) -> Result<Vec<u8>, BindingError> {
        self.presence.set_local_focus(focusing).encode()
    }

    /// Awareness update for the local selection, unless throttled.
    pub fn broadcast_selection(&mut self, state: &EditorState) -> Result<Option<Vec<u8>>, BindingError> {
        let Some(Selection::Range { anchor, focus }) = state.selection() else {
            return Ok(None);
        };
        self.presence
            .update_local_selection(*anchor, *focus)
            .map(|msg| msg.encode())
            .transpose()
    }

    pub fn apply_awareness(&mut self, bytes: &[u8], state: &EditorState) -> Result<(), BindingError> {
        self.ensure_alive()?;
        let msg = AwarenessMessage::decode(bytes)?;
        self.presence.handle_message(&msg);
        self.refresh_decorations(state);
        Ok(())
    }

    pub fn on_viewport_resize(&mut self, state: &EditorState) {
        self.refresh_decorations(state);
    }

    fn refresh_decorations(&mut self, state: &EditorState) {
        for user in self.presence.cleanup_idle_peers() {
            log::debug!("dropping idle peer {user}");
        }
        self.decorations = self.presence.decorations(state);
    }

    pub fn decorations(&self) -> &[CursorDecoration] {
        &self.decorations
    }

    pub fn presence(&self) -> &PresenceRoom {
        &self.presence
    }

    /// Detaches from the shared doc. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.decorations.clear();
        match self.registry.try_borrow_mut() {
            Ok(mut registry) => {
                registry.remove(&self.doc_id);
            }
            Err(_) => log::warn!("doc registry busy, {} left registered", self.doc_id),
        }
        log::info!("binding {} destroyed", self.doc_id);
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> LocalUser {
        LocalUser::from_config(Uuid::new_v4(), &SessionConfig::default())
    }

    #[test]
    fn test_registry_shares_docs_by_id() {
        let registry = DocRegistry::shared();
        let a = registry.borrow_mut().doc_for("doc");
        let b = registry.borrow_mut().doc_for("doc");
        assert_eq!(a.client_id(), b.client_id());
        assert_eq!(registry.borrow().len(), 1);
    }

    #[test]
    fn test_destroy_is_idempotent_and_unregisters() {
        let registry = DocRegistry::shared();
        let mut session = EditingSession::new(SessionConfig::default());
        let mut binding = Binding::start("doc", &registry, user(), &BindingConfig::default());
        assert!(registry.borrow().contains("doc"));
        binding.destroy();
        binding.destroy();
        assert!(registry.borrow().is_empty());

        let (_, out) = session
            .apply_update(Tags::new(), |tx| {
                let p = tx.build(&NodeSpec::paragraph("late"));
                tx.append_child(NodeKey::ROOT, p)
            })
            .unwrap();
        assert!(matches!(
            binding.sync_local(&out.reports[0]),
            Err(BindingError::Destroyed)
        ));
    }

    #[test]
    fn test_drop_destroys() {
        let registry = DocRegistry::shared();
        {
            let _binding = Binding::start("doc", &registry, user(), &BindingConfig::default());
        }
        assert!(registry.borrow().is_empty());
    }

    #[test]
    fn test_seeds_only_once() {
        let registry = DocRegistry::shared();
        let mut session = EditingSession::new(SessionConfig::default());
        let mut binding = Binding::start("doc", &registry, user(), &BindingConfig::default());
        let initial = [NodeSpec::paragraph("hello")];

        let first = binding.initialize(&mut session, Some(&initial)).unwrap();
        assert!(first.is_some());
        let second = binding.initialize(&mut session, Some(&initial)).unwrap();
        assert!(second.is_none());
        assert_eq!(session.editor().state().text_content(NodeKey::ROOT), "hello");
        let shared = binding.read_shared();
        let state = session.editor().state();
        assert_eq!(shared.records.len(), state.len());
        let text = state.children(state.children(NodeKey::ROOT)[0])[0].to_string();
        assert_eq!(shared.texts.get(&text).map(String::as_str), Some("hello"));
        assert!(shared.records[&text].contains(r#""text":"""#));
        assert!(!binding.can_undo());
    }

    #[test]
    fn test_splice_covers_the_changed_span() {
        assert_eq!(splice("abc", "abc"), (3, 3, ""));
        assert_eq!(splice("ab", "aXb"), (1, 1, "X"));
        assert_eq!(splice("hello world", "hello"), (5, 11, ""));
        assert_eq!(splice("aaa", "aaaa"), (3, 3, "a"));
        assert_eq!(splice("fox", "ox"), (0, 1, ""));
        // Multi-byte chars keep both ends on boundaries.
        assert_eq!(splice("héllo", "hallo"), (1, 3, "a"));
        assert_eq!(splice("a★b", "a★★b"), (4, 4, "★"));
    }

    #[test]
    fn test_local_commits_undo_one_at_a_time() {
        let registry = DocRegistry::shared();
        let mut session = EditingSession::new(SessionConfig::default());
        session.delegate_history();
        let mut binding = Binding::start("doc", &registry, user(), &BindingConfig::default());
        binding
            .initialize(&mut session, Some(&[NodeSpec::paragraph("ab")]))
            .unwrap();
        let text = {
            let state = session.editor().state();
            state.children(state.children(NodeKey::ROOT)[0])[0]
        };
        for (at, ch) in [(2, "c"), (3, "d")] {
            let (_, out) = session
                .apply_update(Tags::new(), |tx| tx.insert_text_at(text, at, ch))
                .unwrap();
            assert!(binding.sync_local(&out.reports[0]).unwrap().is_some());
        }
        assert!(binding.can_undo());

        let (out, update) = binding.apply_history(&mut session, HistoryRequest::Undo).unwrap();
        assert!(update.is_some());
        assert!(out.reports[0].has_tag(tags::HISTORIC));
        assert_eq!(session.editor().state().text_content(NodeKey::ROOT), "abc");

        binding.apply_history(&mut session, HistoryRequest::Undo).unwrap();
        assert_eq!(session.editor().state().text_content(NodeKey::ROOT), "ab");
        assert!(!binding.can_undo());
        let (_, update) = binding.apply_history(&mut session, HistoryRequest::Undo).unwrap();
        assert!(update.is_none());

        binding.apply_history(&mut session, HistoryRequest::Redo).unwrap();
        assert_eq!(session.editor().state().text_content(NodeKey::ROOT), "abc");
        assert!(binding.can_redo());
    }

    #[test]
    fn test_garbage_update_is_a_decode_error() {
        let registry = DocRegistry::shared();
        let mut session = EditingSession::new(SessionConfig::default());
        let mut binding = Binding::start("doc", &registry, user(), &BindingConfig::default());
        let result = binding.apply_remote_update(
            &mut session,
            &[0xff, 0x01, 0x02],
            UpdateOrigin::Peer(Uuid::new_v4()),
        );
        assert!(matches!(
            result,
            Err(BindingError::Decode(_)) | Err(BindingError::Apply(_))
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config = BindingConfig::from_json(r#"{"idle_timeout_ms": 5}"#).unwrap();
        assert_eq!(config.idle_timeout_ms, 5);
        assert_eq!(config.cursor_broadcast_interval_ms, 33);
    }

    #[test]
    fn test_local_user_color_from_config() {
        let config = SessionConfig {
            user_color: Some("#102030".into()),
            ..SessionConfig::default()
        };
        let user = LocalUser::from_config(Uuid::new_v4(), &config);
        assert_eq!(user.color.to_hex(), "#102030");
    }
}
