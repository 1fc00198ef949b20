//! Editor state: the node tree plus the selection.
//!
//! `EditorState` is a value. The editor clones it at the start of every
//! update and commits the clone only when the update succeeds, so every
//! method here may leave the tree half-mutated on error.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::EditorError;
use crate::node::{BlockProps, Node, NodeKey, NodeKind, NodeSpec, Point, Selection, TextProps};
use crate::suggestion::{SuggestionId, SuggestionProps};

#[derive(Clone, Debug, PartialEq)]
pub struct EditorState {
    nodes: HashMap<NodeKey, Node>,
    selection: Option<Selection>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorState {
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(NodeKey::ROOT, Node::new(NodeKey::ROOT, NodeKind::Root));
        Self {
            nodes,
            selection: None,
        }
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(&key)
    }

    pub fn node(&self, key: NodeKey) -> Result<&Node, EditorError> {
        self.nodes.get(&key).ok_or(EditorError::NodeNotFound(key))
    }

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node, EditorError> {
        self.nodes.get_mut(&key).ok_or(EditorError::NodeNotFound(key))
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Number of node records, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root has no content.
    pub fn is_empty(&self) -> bool {
        self.children(NodeKey::ROOT).is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes
            .get(&key)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(&key).and_then(|n| n.parent)
    }

    /// Whether the node is reachable from the root.
    pub fn is_attached(&self, key: NodeKey) -> bool {
        let mut current = key;
        loop {
            if current == NodeKey::ROOT {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent(key)?;
        self.children(parent).iter().position(|k| *k == key)
    }

    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent(key)?;
        let index = self.index_in_parent(key)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Attached nodes in pre-order, root first.
    pub fn document_order(&self) -> Vec<NodeKey> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeKey::ROOT];
        while let Some(key) = stack.pop() {
            order.push(key);
            stack.extend(self.children(key).iter().rev().copied());
        }
        order
    }

    pub fn text_content(&self, key: NodeKey) -> String {
        let mut out = String::new();
        self.collect_text(key, &mut out);
        out
    }

    fn collect_text(&self, key: NodeKey, out: &mut String) {
        let Some(node) = self.nodes.get(&key) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&text.text),
            _ => {
                for (i, child) in node.children.iter().enumerate() {
                    let is_block = self.get(*child).is_some_and(|c| c.kind.is_block());
                    if is_block && i > 0 {
                        out.push('\n');
                    }
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn char_len(&self, key: NodeKey) -> Result<usize, EditorError> {
        Ok(self.text(key)?.char_len())
    }

    pub fn text(&self, key: NodeKey) -> Result<&TextProps, EditorError> {
        self.node(key)?.as_text().ok_or(EditorError::NotText(key))
    }

    /// Nearest node satisfying `pred`, starting at `key` itself.
    pub fn nearest_ancestor(&self, key: NodeKey, pred: impl Fn(&Node) -> bool) -> Option<NodeKey> {
        let mut current = Some(key);
        while let Some(k) = current {
            let node = self.nodes.get(&k)?;
            if pred(node) {
                return Some(k);
            }
            current = node.parent;
        }
        None
    }

    pub fn nearest_suggestion(&self, key: NodeKey) -> Option<(NodeKey, &SuggestionProps)> {
        let k = self.nearest_ancestor(key, Node::is_suggestion)?;
        self.get(k).and_then(|n| n.as_suggestion()).map(|s| (k, s))
    }

    /// Closest paragraph containing `key`.
    pub fn block_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.nearest_ancestor(key, |n| matches!(n.kind, NodeKind::Paragraph(_)))
    }

    /// Closest top-level container (paragraph, table or divider) of `key`.
    pub fn top_block_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.nearest_ancestor(key, |n| {
            n.kind.is_block() && n.parent.is_some_and(|p| p == NodeKey::ROOT)
        })
    }

    pub fn block(&self, key: NodeKey) -> Result<&BlockProps, EditorError> {
        match &self.node(key)?.kind {
            NodeKind::Paragraph(props) => Ok(props),
            _ => Err(EditorError::NotAnElement(key)),
        }
    }

    /// Attached suggestion nodes in document order.
    pub fn suggestion_nodes(&self) -> Vec<NodeKey> {
        self.document_order()
            .into_iter()
            .filter(|k| self.get(*k).is_some_and(Node::is_suggestion))
            .collect()
    }

    pub fn nodes_with_suggestion_id(&self, id: &SuggestionId) -> Vec<NodeKey> {
        self.document_order()
            .into_iter()
            .filter(|k| {
                self.get(*k)
                    .and_then(|n| n.as_suggestion())
                    .is_some_and(|s| &s.id == id)
            })
            .collect()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    /// Drops the selection if it references nodes that no longer exist.
    pub fn validate_selection(&mut self) {
        let valid = match &self.selection {
            Some(Selection::Range { anchor, focus }) => {
                self.is_attached(anchor.key) && self.is_attached(focus.key)
            }
            Some(Selection::Node(keys)) => keys.iter().all(|k| self.is_attached(*k)),
            None => true,
        };
        if !valid {
            self.selection = None;
        }
    }

    pub fn compare_points(&self, a: Point, b: Point) -> Ordering {
        if a.key == b.key {
            return a.offset.cmp(&b.offset);
        }
        let order = self.document_order();
        let ia = order.iter().position(|k| *k == a.key);
        let ib = order.iter().position(|k| *k == b.key);
        ia.cmp(&ib)
    }

    /// The range selection as `(start, end)` in document order.
    pub fn ordered_range(&self) -> Option<(Point, Point)> {
        match self.selection {
            Some(Selection::Range { anchor, focus }) => {
                if self.compare_points(anchor, focus) == Ordering::Greater {
                    Some((focus, anchor))
                } else {
                    Some((anchor, focus))
                }
            }
            _ => None,
        }
    }

    // ---------------------------------------------------------------
    // Raw records (history replay, shared-document sync)
    // ---------------------------------------------------------------

    pub fn put_node(&mut self, node: Node) {
        self.nodes.insert(node.key, node);
    }

    pub fn remove_node_record(&mut self, key: NodeKey) -> Option<Node> {
        if key == NodeKey::ROOT {
            return None;
        }
        self.nodes.remove(&key)
    }

    /// Drops records that are no longer reachable from the root. Returns how
    /// many were dropped.
    pub fn collect_garbage(&mut self) -> usize {
        let live: std::collections::HashSet<NodeKey> = self.document_order().into_iter().collect();
        let before = self.nodes.len();
        self.nodes.retain(|k, _| live.contains(k));
        before - self.nodes.len()
    }

    // ---------------------------------------------------------------
    // Structural mutation
    // ---------------------------------------------------------------

    /// Creates a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeKey {
        let key = NodeKey::new();
        self.nodes.insert(key, Node::new(key, kind));
        key
    }

    /// Materializes a detached subtree from a spec.
    pub fn build(&mut self, spec: &NodeSpec) -> NodeKey {
        let key = self.create(spec.kind.clone());
        for child in &spec.children {
            let child_key = self.build(child);
            if let Some(node) = self.nodes.get_mut(&child_key) {
                node.parent = Some(key);
            }
            if let Some(node) = self.nodes.get_mut(&key) {
                node.children.push(child_key);
            }
        }
        key
    }

    pub fn insert_child(&mut self, parent: NodeKey, index: usize, child: NodeKey) -> Result<(), EditorError> {
        if self.node(parent)?.kind.is_leaf() {
            return Err(EditorError::NotAnElement(parent));
        }
        self.detach(child)?;
        let parent_node = self.node_mut(parent)?;
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), EditorError> {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child)
    }

    pub fn insert_after(&mut self, sibling: NodeKey, node: NodeKey) -> Result<(), EditorError> {
        let parent = self.parent(sibling).ok_or(EditorError::NodeNotFound(sibling))?;
        self.detach(node)?;
        let index = self
            .index_in_parent(sibling)
            .ok_or(EditorError::NodeNotFound(sibling))?;
        self.insert_child(parent, index + 1, node)
    }

    pub fn insert_before(&mut self, sibling: NodeKey, node: NodeKey) -> Result<(), EditorError> {
        let parent = self.parent(sibling).ok_or(EditorError::NodeNotFound(sibling))?;
        self.detach(node)?;
        let index = self
            .index_in_parent(sibling)
            .ok_or(EditorError::NodeNotFound(sibling))?;
        self.insert_child(parent, index, node)
    }

    /// Unlinks a node from its parent, keeping its subtree.
    pub fn detach(&mut self, key: NodeKey) -> Result<(), EditorError> {
        let parent = self.node(key)?.parent;
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|k| *k != key);
            }
            self.node_mut(key)?.parent = None;
        }
        Ok(())
    }

    /// Removes a node and its whole subtree.
    pub fn remove(&mut self, key: NodeKey) -> Result<(), EditorError> {
        if key == NodeKey::ROOT {
            return Err(EditorError::InvalidSelection("cannot remove the root".into()));
        }
        self.detach(key)?;
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.remove(&k) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    /// Replaces a node with its children.
    pub fn unwrap_node(&mut self, key: NodeKey) -> Result<Vec<NodeKey>, EditorError> {
        let parent = self.parent(key).ok_or(EditorError::NodeNotFound(key))?;
        let index = self
            .index_in_parent(key)
            .ok_or(EditorError::NodeNotFound(key))?;
        let children = std::mem::take(&mut self.node_mut(key)?.children);
        {
            let parent_node = self.node_mut(parent)?;
            parent_node.children.remove(index);
            for (offset, child) in children.iter().enumerate() {
                parent_node.children.insert(index + offset, *child);
            }
        }
        for child in &children {
            self.node_mut(*child)?.parent = Some(parent);
        }
        self.nodes.remove(&key);
        Ok(children)
    }

    /// Wraps contiguous siblings in a new element of `kind`.
    pub fn wrap(&mut self, keys: &[NodeKey], kind: NodeKind) -> Result<NodeKey, EditorError> {
        let first = *keys
            .first()
            .ok_or_else(|| EditorError::InvalidSelection("nothing to wrap".into()))?;
        let parent = self.parent(first).ok_or(EditorError::NodeNotFound(first))?;
        let index = self
            .index_in_parent(first)
            .ok_or(EditorError::NodeNotFound(first))?;
        let wrapper = self.create(kind);
        for key in keys {
            self.detach(*key)?;
        }
        self.insert_child(parent, index, wrapper)?;
        for key in keys {
            self.append_child(wrapper, *key)?;
        }
        Ok(wrapper)
    }

    /// Copies a subtree under fresh keys. The copy is detached.
    pub fn deep_clone(&mut self, key: NodeKey) -> Result<NodeKey, EditorError> {
        let node = self.node(key)?.clone();
        let copy = self.create(node.kind);
        for child in node.children {
            let child_copy = self.deep_clone(child)?;
            self.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }

    pub fn kind_mut(&mut self, key: NodeKey) -> Result<&mut NodeKind, EditorError> {
        Ok(&mut self.node_mut(key)?.kind)
    }

    pub fn text_mut(&mut self, key: NodeKey) -> Result<&mut TextProps, EditorError> {
        match &mut self.node_mut(key)?.kind {
            NodeKind::Text(props) => Ok(props),
            _ => Err(EditorError::NotText(key)),
        }
    }

    pub fn block_mut(&mut self, key: NodeKey) -> Result<&mut BlockProps, EditorError> {
        match &mut self.node_mut(key)?.kind {
            NodeKind::Paragraph(props) => Ok(props),
            _ => Err(EditorError::NotAnElement(key)),
        }
    }

    pub fn suggestion_mut(&mut self, key: NodeKey) -> Result<&mut SuggestionProps, EditorError> {
        match &mut self.node_mut(key)?.kind {
            NodeKind::Suggestion(props) => Ok(props),
            _ => Err(EditorError::NotASuggestion(key)),
        }
    }

    // ---------------------------------------------------------------
    // Text editing
    // ---------------------------------------------------------------

    /// Splits a text node at a character offset and returns the key of the
    /// right half, which is inserted right after the original.
    pub fn split_text(&mut self, key: NodeKey, offset: usize) -> Result<NodeKey, EditorError> {
        let props = self.text(key)?.clone();
        let len = props.char_len();
        if offset == 0 || offset >= len {
            return Err(EditorError::OffsetOutOfBounds { key, offset });
        }
        let at = byte_offset(&props.text, offset);
        let right_text = props.text[at..].to_string();
        self.text_mut(key)?.text.truncate(at);
        let right = self.create(NodeKind::Text(TextProps {
            text: right_text,
            format: props.format,
            style: props.style,
        }));
        self.insert_after(key, right)?;
        Ok(right)
    }

    /// Splits as needed so that one text node covers exactly `[start, end)`.
    pub fn isolate_text(&mut self, key: NodeKey, start: usize, end: usize) -> Result<NodeKey, EditorError> {
        let len = self.char_len(key)?;
        if start >= end || end > len {
            return Err(EditorError::OffsetOutOfBounds { key, offset: end });
        }
        if end < len {
            self.split_text(key, end)?;
        }
        if start > 0 {
            return self.split_text(key, start);
        }
        Ok(key)
    }

    pub fn insert_text_at(&mut self, key: NodeKey, offset: usize, text: &str) -> Result<(), EditorError> {
        let props = self.text_mut(key)?;
        if offset > props.char_len() {
            return Err(EditorError::OffsetOutOfBounds { key, offset });
        }
        let at = byte_offset(&props.text, offset);
        props.text.insert_str(at, text);
        Ok(())
    }

    pub fn delete_text_range(&mut self, key: NodeKey, start: usize, end: usize) -> Result<(), EditorError> {
        let props = self.text_mut(key)?;
        if start > end || end > props.char_len() {
            return Err(EditorError::OffsetOutOfBounds { key, offset: end });
        }
        let from = byte_offset(&props.text, start);
        let to = byte_offset(&props.text, end);
        props.text.replace_range(from..to, "");
        Ok(())
    }

    /// Splits the text nodes at the selection edges and returns the text
    /// nodes now fully covered by the range selection. The selection is
    /// moved onto the returned nodes.
    pub fn selected_text_runs(&mut self) -> Result<Vec<NodeKey>, EditorError> {
        let (start, end) = self
            .ordered_range()
            .ok_or_else(|| EditorError::InvalidSelection("no range selection".into()))?;
        if start == end {
            return Ok(Vec::new());
        }
        if !self.node(start.key)?.is_text() || !self.node(end.key)?.is_text() {
            return Err(EditorError::InvalidSelection(
                "range edges must sit on text".into(),
            ));
        }

        let order = self.document_order();
        let (Some(si), Some(ei)) = (
            order.iter().position(|k| *k == start.key),
            order.iter().position(|k| *k == end.key),
        ) else {
            return Err(EditorError::InvalidSelection("detached selection".into()));
        };
        let texts: Vec<NodeKey> = order[si..=ei]
            .iter()
            .copied()
            .filter(|k| self.get(*k).is_some_and(Node::is_text))
            .collect();

        let mut runs = Vec::with_capacity(texts.len());
        for key in texts {
            let len = self.char_len(key)?;
            let from = if key == start.key { start.offset } else { 0 };
            let to = if key == end.key { end.offset } else { len };
            if from >= to {
                continue;
            }
            runs.push(self.isolate_text(key, from, to)?);
        }

        if let (Some(first), Some(last)) = (runs.first().copied(), runs.last().copied()) {
            let last_len = self.char_len(last)?;
            self.selection = Some(Selection::range(
                Point::new(first, 0),
                Point::new(last, last_len),
            ));
        }
        Ok(runs)
    }

    /// Paragraphs touched by the selection, in document order.
    pub fn selected_blocks(&self) -> Vec<NodeKey> {
        let keys: Vec<NodeKey> = match &self.selection {
            Some(Selection::Range { .. }) => {
                let Some((start, end)) = self.ordered_range() else {
                    return Vec::new();
                };
                let (Some(first), Some(last)) = (self.block_of(start.key), self.block_of(end.key))
                else {
                    return Vec::new();
                };
                let order = self.document_order();
                let (Some(fi), Some(li)) = (
                    order.iter().position(|k| *k == first),
                    order.iter().position(|k| *k == last),
                ) else {
                    return Vec::new();
                };
                order[fi..=li].to_vec()
            }
            Some(Selection::Node(keys)) => keys.iter().filter_map(|k| self.block_of(*k)).collect(),
            None => Vec::new(),
        };
        let mut blocks: Vec<NodeKey> = keys
            .into_iter()
            .filter(|k| matches!(self.get(*k).map(|n| &n.kind), Some(NodeKind::Paragraph(_))))
            .collect();
        blocks.dedup();
        blocks
    }

    /// Groups keys into runs of adjacent siblings, preserving order.
    pub fn group_contiguous(&self, keys: &[NodeKey]) -> Vec<Vec<NodeKey>> {
        let mut groups: Vec<Vec<NodeKey>> = Vec::new();
        for key in keys {
            let extends = groups
                .last()
                .and_then(|g| g.last())
                .is_some_and(|prev| self.next_sibling(*prev) == Some(*key));
            match groups.last_mut() {
                Some(group) if extends => group.push(*key),
                _ => groups.push(vec![*key]),
            }
        }
        groups
    }
}

/// Byte index of a character offset, clamped to the end of the string.
pub(crate) fn byte_offset(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(texts: &[&str]) -> (EditorState, Vec<NodeKey>) {
        let mut state = EditorState::new();
        let mut keys = Vec::new();
        for text in texts {
            let paragraph = state.build(&NodeSpec::paragraph(*text));
            state.append_child(NodeKey::ROOT, paragraph).unwrap();
            keys.push(state.children(paragraph)[0]);
        }
        (state, keys)
    }

    #[test]
    fn test_split_text_keeps_format_and_order() {
        let (mut state, keys) = doc_with(&["hello world"]);
        state.text_mut(keys[0]).unwrap().format = crate::node::TextFormat::ITALIC;

        let right = state.split_text(keys[0], 5).unwrap();
        assert_eq!(state.text(keys[0]).unwrap().text, "hello");
        assert_eq!(state.text(right).unwrap().text, " world");
        assert_eq!(state.text(right).unwrap().format, crate::node::TextFormat::ITALIC);
        assert_eq!(state.next_sibling(keys[0]), Some(right));
    }

    #[test]
    fn test_split_text_rejects_edges() {
        let (mut state, keys) = doc_with(&["abc"]);
        assert!(state.split_text(keys[0], 0).is_err());
        assert!(state.split_text(keys[0], 3).is_err());
    }

    #[test]
    fn test_multibyte_offsets() {
        let (mut state, keys) = doc_with(&["héllo"]);
        state.insert_text_at(keys[0], 2, "X").unwrap();
        assert_eq!(state.text(keys[0]).unwrap().text, "héXllo");
        state.delete_text_range(keys[0], 1, 3).unwrap();
        assert_eq!(state.text(keys[0]).unwrap().text, "hllo");
    }

    #[test]
    fn test_selected_runs_across_paragraphs() {
        let (mut state, keys) = doc_with(&["first", "second"]);
        state.set_selection(Some(Selection::range(
            Point::new(keys[0], 2),
            Point::new(keys[1], 3),
        )));

        let runs = state.selected_text_runs().unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(state.text(runs[0]).unwrap().text, "rst");
        assert_eq!(state.text(runs[1]).unwrap().text, "sec");
        assert_eq!(state.text(keys[0]).unwrap().text, "fi");
    }

    #[test]
    fn test_backward_selection_is_normalized() {
        let (mut state, keys) = doc_with(&["abcdef"]);
        state.set_selection(Some(Selection::range(
            Point::new(keys[0], 4),
            Point::new(keys[0], 1),
        )));
        let runs = state.selected_text_runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(state.text(runs[0]).unwrap().text, "bcd");
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let (mut state, keys) = doc_with(&["abc"]);
        let paragraph = state.parent(keys[0]).unwrap();
        let right = state.split_text(keys[0], 1).unwrap();

        let wrapper = state.wrap(&[keys[0], right], NodeKind::Link { url: "x".into() }).unwrap();
        assert_eq!(state.children(paragraph), &[wrapper]);
        assert_eq!(state.children(wrapper), &[keys[0], right]);

        state.unwrap_node(wrapper).unwrap();
        assert_eq!(state.children(paragraph), &[keys[0], right]);
        assert!(!state.contains(wrapper));
    }

    #[test]
    fn test_remove_drops_subtree() {
        let (mut state, keys) = doc_with(&["abc"]);
        let paragraph = state.parent(keys[0]).unwrap();
        state.remove(paragraph).unwrap();
        assert!(!state.contains(paragraph));
        assert!(!state.contains(keys[0]));
        assert!(state.is_empty());
    }

    #[test]
    fn test_deep_clone_uses_fresh_keys() {
        let (mut state, keys) = doc_with(&["abc"]);
        let paragraph = state.parent(keys[0]).unwrap();
        let copy = state.deep_clone(paragraph).unwrap();
        assert_ne!(copy, paragraph);
        assert!(!state.is_attached(copy));
        assert_eq!(state.text_content(copy), "abc");
    }

    #[test]
    fn test_group_contiguous() {
        let (mut state, keys) = doc_with(&["abcdef"]);
        let b = state.split_text(keys[0], 2).unwrap();
        let c = state.split_text(b, 2).unwrap();
        let groups = state.group_contiguous(&[keys[0], b, c]);
        assert_eq!(groups, vec![vec![keys[0], b, c]]);
        let groups = state.group_contiguous(&[keys[0], c]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_text_content_joins_blocks() {
        let (state, _) = doc_with(&["one", "two"]);
        assert_eq!(state.text_content(NodeKey::ROOT), "one\ntwo");
    }
}
