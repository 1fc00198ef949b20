//! Transactional editor.
//!
//! ```text
//!   update(tags, f)
//!        │
//!        ├─ clone state ─► f(&mut Transaction) ──Err──► rollback
//!        │
//!        ├─ node transforms on dirty nodes (repeat to a fixpoint)
//!        ├─ drop unreachable records
//!        ├─ diff prev/next ─► UpdateReport
//!        └─ push history (unless historic / collaboration)
//! ```

use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

use crate::command::CommandRegistry;
use crate::document::EditorState;
use crate::error::EditorError;
use crate::node::{Node, NodeKey, Selection};
use crate::subscription::Subscription;

/// Well-known update tags.
pub mod tags {
    /// Undo/redo replay.
    pub const HISTORIC: &str = "historic";
    /// Applied from the shared document.
    pub const COLLABORATION: &str = "collaboration";
    /// Never pushed to the shared document.
    pub const SKIP_COLLAB: &str = "skip-collab";
    /// A suggestion was resolved or retracted.
    pub const RESOLVE_SUGGESTIONS: &str = "resolve-suggestions";
    /// List shortcut typed inside an insertion.
    pub const MARKDOWN_TRANSFORM: &str = "suggestion-md-transform";
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tag: &str) -> Self {
        self.insert(tag);
        self
    }

    pub fn insert(&mut self, tag: &str) {
        self.0.insert(tag.to_string());
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&[&str]> for Tags {
    fn from(tags: &[&str]) -> Self {
        Self(tags.iter().map(|t| t.to_string()).collect())
    }
}

/// Mutable view of the editor state inside an update.
pub struct Transaction<'a> {
    state: &'a mut EditorState,
    tags: &'a mut Tags,
}

impl Transaction<'_> {
    pub fn add_tag(&mut self, tag: &str) {
        self.tags.insert(tag);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl Deref for Transaction<'_> {
    type Target = EditorState;

    fn deref(&self) -> &EditorState {
        self.state
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut EditorState {
        self.state
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeChange {
    pub key: NodeKey,
    pub before: Option<Node>,
    pub after: Option<Node>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    Created,
    Updated,
    Destroyed,
}

/// What a committed update did.
#[derive(Clone, Debug)]
pub struct UpdateReport {
    pub tags: Tags,
    pub prev_state: Rc<EditorState>,
    pub state: Rc<EditorState>,
    pub dirty_elements: BTreeSet<NodeKey>,
    pub dirty_leaves: BTreeSet<NodeKey>,
    pub suggestion_mutations: Vec<(NodeKey, MutationKind)>,
    pub changes: Vec<NodeChange>,
}

impl UpdateReport {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Node classes a transform can be scoped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeClass {
    Any,
    Suggestion,
    Text,
    Paragraph,
}

impl NodeClass {
    fn matches(self, node: &Node) -> bool {
        match self {
            NodeClass::Any => true,
            NodeClass::Suggestion => node.is_suggestion(),
            NodeClass::Text => node.is_text(),
            NodeClass::Paragraph => matches!(node.kind, crate::node::NodeKind::Paragraph(_)),
        }
    }
}

pub type NodeTransform = Rc<dyn Fn(&mut Transaction<'_>, NodeKey) -> Result<(), EditorError>>;

#[derive(Default)]
struct TransformTable {
    entries: Vec<(u64, NodeClass, NodeTransform)>,
    next_id: u64,
}

#[derive(Clone, Debug)]
struct HistoryEntry {
    changes: Vec<NodeChange>,
    selection_before: Option<Selection>,
    selection_after: Option<Selection>,
}

pub struct Editor {
    state: Rc<EditorState>,
    editable: bool,
    composing: bool,
    registry: Rc<RefCell<CommandRegistry>>,
    transforms: Rc<RefCell<TransformTable>>,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    history_limit: usize,
    record_history: bool,
    max_transform_passes: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::with_limits(100, 32)
    }

    pub fn with_limits(history_limit: usize, max_transform_passes: usize) -> Self {
        Self {
            state: Rc::new(EditorState::new()),
            editable: true,
            composing: false,
            registry: CommandRegistry::shared(),
            transforms: Rc::new(RefCell::new(TransformTable::default())),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            history_limit,
            record_history: true,
            max_transform_passes: max_transform_passes.max(1),
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn snapshot(&self) -> Rc<EditorState> {
        self.state.clone()
    }

    pub fn registry(&self) -> &Rc<RefCell<CommandRegistry>> {
        &self.registry
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        if self.editable != editable {
            log::debug!("editor editable: {editable}");
        }
        self.editable = editable;
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn set_composing(&mut self, composing: bool) {
        self.composing = composing;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Turns the local undo stack on or off. Turning it off drops both
    /// stacks; history is then owned by whoever replays updates into us.
    pub fn set_history_enabled(&mut self, enabled: bool) {
        self.record_history = enabled;
        if !enabled {
            self.undo_stack.clear();
            self.redo_stack.clear();
        }
    }

    pub fn register_node_transform(
        &mut self,
        class: NodeClass,
        transform: impl Fn(&mut Transaction<'_>, NodeKey) -> Result<(), EditorError> + 'static,
    ) -> Subscription {
        let id = {
            let mut table = self.transforms.borrow_mut();
            let id = table.next_id;
            table.next_id += 1;
            table.entries.push((id, class, Rc::new(transform)));
            id
        };
        let weak: Weak<RefCell<TransformTable>> = Rc::downgrade(&self.transforms);
        Subscription::new(move || {
            if let Some(table) = weak.upgrade() {
                table.borrow_mut().entries.retain(|(i, _, _)| *i != id);
            }
        })
    }

    /// Runs `f` against a copy of the state and commits it if `f` succeeds.
    pub fn update<R, F>(&mut self, tags: Tags, f: F) -> Result<(R, UpdateReport), EditorError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<R, EditorError>,
    {
        let prev = self.state.clone();
        let mut next = (*prev).clone();
        let mut tags = tags;

        let value = {
            let mut tx = Transaction {
                state: &mut next,
                tags: &mut tags,
            };
            f(&mut tx)?
        };
        self.run_transforms(&prev, &mut next, &mut tags)?;
        let dropped = next.collect_garbage();
        if dropped > 0 {
            log::trace!("dropped {dropped} unreachable node records");
        }
        next.validate_selection();

        let changes = diff_states(&prev, &next);
        let next = Rc::new(next);
        let report = build_report(tags, prev.clone(), next.clone(), changes);

        let record = self.record_history
            && !report.changes.is_empty()
            && !report.has_tag(tags::HISTORIC)
            && !report.has_tag(tags::COLLABORATION);
        if record {
            self.undo_stack.push(HistoryEntry {
                changes: report.changes.clone(),
                selection_before: prev.selection().cloned(),
                selection_after: next.selection().cloned(),
            });
            if self.undo_stack.len() > self.history_limit {
                self.undo_stack.remove(0);
            }
            self.redo_stack.clear();
        }

        self.state = next;
        Ok((value, report))
    }

    /// Reverts the last recorded update. `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<UpdateReport>, EditorError> {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let (_, report) = self.update(Tags::new().with(tags::HISTORIC), |tx| {
            for change in &entry.changes {
                restore(tx, change.key, change.before.as_ref());
            }
            tx.set_selection(entry.selection_before.clone());
            Ok(())
        })?;
        self.redo_stack.push(entry);
        Ok(Some(report))
    }

    pub fn redo(&mut self) -> Result<Option<UpdateReport>, EditorError> {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let (_, report) = self.update(Tags::new().with(tags::HISTORIC), |tx| {
            for change in &entry.changes {
                restore(tx, change.key, change.after.as_ref());
            }
            tx.set_selection(entry.selection_after.clone());
            Ok(())
        })?;
        self.undo_stack.push(entry);
        Ok(Some(report))
    }

    fn run_transforms(
        &self,
        prev: &EditorState,
        next: &mut EditorState,
        tags: &mut Tags,
    ) -> Result<(), EditorError> {
        let transforms: Vec<(NodeClass, NodeTransform)> = self
            .transforms
            .borrow()
            .entries
            .iter()
            .map(|(_, class, t)| (*class, t.clone()))
            .collect();
        if transforms.is_empty() {
            return Ok(());
        }

        let mut dirty = changed_keys(prev, next);
        let mut passes = 0;
        while !dirty.is_empty() {
            if passes == self.max_transform_passes {
                log::warn!("node transforms did not settle after {passes} passes");
                break;
            }
            passes += 1;
            let before_pass = next.clone();
            {
                let mut tx = Transaction {
                    state: &mut *next,
                    tags: &mut *tags,
                };
                for key in &dirty {
                    for (class, transform) in &transforms {
                        let applies = tx.get(*key).is_some_and(|n| class.matches(n));
                        if applies {
                            transform(&mut tx, *key)?;
                        }
                    }
                }
            }
            dirty = changed_keys(&before_pass, next);
        }
        Ok(())
    }
}

fn restore(state: &mut EditorState, key: NodeKey, image: Option<&Node>) {
    match image {
        Some(node) => state.put_node(node.clone()),
        None => {
            state.remove_node_record(key);
        }
    }
}

/// Keys whose record differs between the two states, in a stable order.
fn changed_keys(a: &EditorState, b: &EditorState) -> Vec<NodeKey> {
    let mut keys: BTreeSet<NodeKey> = BTreeSet::new();
    for node in b.nodes() {
        if a.get(node.key) != Some(node) {
            keys.insert(node.key);
        }
    }
    for node in a.nodes() {
        if !b.contains(node.key) {
            keys.insert(node.key);
        }
    }
    keys.into_iter().collect()
}

fn diff_states(prev: &EditorState, next: &EditorState) -> Vec<NodeChange> {
    changed_keys(prev, next)
        .into_iter()
        .map(|key| NodeChange {
            key,
            before: prev.get(key).cloned(),
            after: next.get(key).cloned(),
        })
        .collect()
}

fn build_report(
    tags: Tags,
    prev_state: Rc<EditorState>,
    state: Rc<EditorState>,
    changes: Vec<NodeChange>,
) -> UpdateReport {
    let mut dirty_elements = BTreeSet::new();
    let mut dirty_leaves = BTreeSet::new();
    let mut suggestion_mutations = Vec::new();
    let mut seen_parents: HashSet<NodeKey> = HashSet::new();

    for change in &changes {
        let node = change.after.as_ref().or(change.before.as_ref());
        let Some(node) = node else { continue };
        if node.kind.is_leaf() {
            dirty_leaves.insert(change.key);
        } else {
            dirty_elements.insert(change.key);
        }
        for side in [&change.before, &change.after].into_iter().flatten() {
            if let Some(parent) = side.parent {
                if seen_parents.insert(parent) {
                    dirty_elements.insert(parent);
                }
            }
        }

        let was = change.before.as_ref().is_some_and(Node::is_suggestion);
        let is = change.after.as_ref().is_some_and(Node::is_suggestion);
        let kind = match (was, is) {
            (false, true) => Some(MutationKind::Created),
            (true, false) => Some(MutationKind::Destroyed),
            (true, true) => Some(MutationKind::Updated),
            (false, false) => None,
        };
        if let Some(kind) = kind {
            suggestion_mutations.push((change.key, kind));
        }
    }

    UpdateReport {
        tags,
        prev_state,
        state,
        dirty_elements,
        dirty_leaves,
        suggestion_mutations,
        changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, NodeSpec};

    fn editor_with_text(text: &str) -> (Editor, NodeKey) {
        let mut editor = Editor::new();
        let (key, _) = editor
            .update(Tags::new(), |tx| {
                let p = tx.build(&NodeSpec::paragraph(text));
                tx.append_child(NodeKey::ROOT, p)?;
                Ok(tx.children(p)[0])
            })
            .unwrap();
        (editor, key)
    }

    #[test]
    fn test_failed_update_rolls_back() {
        let (mut editor, key) = editor_with_text("hello");
        let result = editor.update(Tags::new(), |tx| {
            tx.text_mut(key)?.text = "changed".into();
            Err::<(), _>(EditorError::NotASuggestion(key))
        });
        assert!(result.is_err());
        assert_eq!(editor.state().text(key).unwrap().text, "hello");
    }

    #[test]
    fn test_report_marks_parent_dirty() {
        let (mut editor, key) = editor_with_text("hello");
        let parent = editor.state().parent(key).unwrap();
        let (_, report) = editor
            .update(Tags::new(), |tx| {
                tx.text_mut(key)?.text.push('!');
                Ok(())
            })
            .unwrap();
        assert!(report.dirty_leaves.contains(&key));
        assert!(report.dirty_elements.contains(&parent));
    }

    #[test]
    fn test_undo_redo_restore_records() {
        let (mut editor, key) = editor_with_text("hello");
        editor
            .update(Tags::new(), |tx| {
                tx.text_mut(key)?.text = "bye".into();
                Ok(())
            })
            .unwrap();

        let report = editor.undo().unwrap().unwrap();
        assert!(report.has_tag(tags::HISTORIC));
        assert_eq!(editor.state().text(key).unwrap().text, "hello");

        editor.redo().unwrap().unwrap();
        assert_eq!(editor.state().text(key).unwrap().text, "bye");
    }

    #[test]
    fn test_collaboration_updates_skip_history() {
        let (mut editor, key) = editor_with_text("hello");
        let depth = editor.undo_stack.len();
        editor
            .update(Tags::new().with(tags::COLLABORATION), |tx| {
                tx.text_mut(key)?.text = "remote".into();
                Ok(())
            })
            .unwrap();
        assert_eq!(editor.undo_stack.len(), depth);
    }

    #[test]
    fn test_disabled_history_records_nothing() {
        let (mut editor, key) = editor_with_text("hello");
        assert!(editor.can_undo());
        editor.set_history_enabled(false);
        assert!(!editor.can_undo());
        editor
            .update(Tags::new(), |tx| {
                tx.text_mut(key)?.text = "local".into();
                Ok(())
            })
            .unwrap();
        assert!(!editor.can_undo());
        assert!(editor.undo().unwrap().is_none());
    }

    #[test]
    fn test_transform_runs_to_fixpoint() {
        let (mut editor, key) = editor_with_text("aaaa");
        let _sub = editor.register_node_transform(NodeClass::Text, |tx, key| {
            let text = &mut tx.text_mut(key)?.text;
            if text.len() > 1 {
                text.pop();
            }
            Ok(())
        });
        editor
            .update(Tags::new(), |tx| {
                tx.text_mut(key)?.text.push('a');
                Ok(())
            })
            .unwrap();
        assert_eq!(editor.state().text(key).unwrap().text, "a");
    }

    #[test]
    fn test_dropped_transform_no_longer_runs() {
        let (mut editor, key) = editor_with_text("abc");
        let sub = editor.register_node_transform(NodeClass::Text, |tx, key| {
            tx.text_mut(key)?.text.clear();
            Ok(())
        });
        drop(sub);
        editor
            .update(Tags::new(), |tx| {
                tx.text_mut(key)?.text.push('d');
                Ok(())
            })
            .unwrap();
        assert_eq!(editor.state().text(key).unwrap().text, "abcd");
    }

    #[test]
    fn test_detached_records_are_collected() {
        let (mut editor, _) = editor_with_text("abc");
        let (orphan, _) = editor
            .update(Tags::new(), |tx| Ok(tx.create(NodeKind::text("x"))))
            .unwrap();
        assert!(!editor.state().contains(orphan));
    }
}
