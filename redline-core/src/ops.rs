//! Direct document operations.
//!
//! These mutate content in place. Plain editing uses them for everything,
//! suggestion resolution uses them to materialize a suggestion, and the
//! overlay uses them for edits inside the user's own insertions.

use crate::document::EditorState;
use crate::error::EditorError;
use crate::node::{
    Alignment, BlockType, FormatType, NodeKey, NodeKind, Point, Selection, TextFormat,
};
use crate::suggestion::{SuggestionProps, SuggestionType};

// ───────────────────────────────────────────────────────────────────
// Traversal
// ───────────────────────────────────────────────────────────────────

/// Pre-order descendants of `key`, excluding `key` itself.
pub fn descendants(state: &EditorState, key: NodeKey) -> Vec<NodeKey> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeKey> = state.children(key).iter().rev().copied().collect();
    while let Some(k) = stack.pop() {
        out.push(k);
        stack.extend(state.children(k).iter().rev().copied());
    }
    out
}

pub fn text_descendants(state: &EditorState, key: NodeKey) -> Vec<NodeKey> {
    if state.get(key).is_some_and(|n| n.is_text()) {
        return vec![key];
    }
    descendants(state, key)
        .into_iter()
        .filter(|k| state.get(*k).is_some_and(|n| n.is_text()))
        .collect()
}

/// Type of the closest suggestion wrapping `key`, if any.
pub fn enclosing_suggestion_type(state: &EditorState, key: NodeKey) -> Option<SuggestionType> {
    state.nearest_suggestion(key).map(|(_, s)| s.suggestion_type)
}

pub fn is_inside(state: &EditorState, key: NodeKey, ty: SuggestionType) -> bool {
    enclosing_suggestion_type(state, key) == Some(ty)
}

/// First direct child of `parent` that is a suggestion marker of type `ty`.
pub fn find_marker(state: &EditorState, parent: NodeKey, ty: SuggestionType) -> Option<NodeKey> {
    state.children(parent).iter().copied().find(|k| {
        state
            .get(*k)
            .and_then(|n| n.as_suggestion())
            .is_some_and(|s| s.suggestion_type == ty)
    })
}

/// Inserts an empty suggestion node as the first child of `parent`.
pub fn insert_marker(
    state: &mut EditorState,
    parent: NodeKey,
    props: SuggestionProps,
) -> Result<NodeKey, EditorError> {
    let marker = state.create(NodeKind::Suggestion(props));
    state.insert_child(parent, 0, marker)?;
    Ok(marker)
}

// ───────────────────────────────────────────────────────────────────
// Text formatting
// ───────────────────────────────────────────────────────────────────

/// Toggles a format over `texts`: removed if every node has it, added
/// otherwise.
pub fn toggle_format(
    state: &mut EditorState,
    texts: &[NodeKey],
    format: FormatType,
) -> Result<(), EditorError> {
    let flag = format.flag();
    let mut all = !texts.is_empty();
    for key in texts {
        all &= state.text(*key)?.format.contains(flag);
    }
    for key in texts {
        let props = state.text_mut(*key)?;
        if all {
            props.format.remove(flag);
        } else {
            props.format.insert(flag);
            if flag == TextFormat::SUBSCRIPT {
                props.format.remove(TextFormat::SUPERSCRIPT);
            } else if flag == TextFormat::SUPERSCRIPT {
                props.format.remove(TextFormat::SUBSCRIPT);
            }
        }
    }
    Ok(())
}

pub fn set_style(
    state: &mut EditorState,
    texts: &[NodeKey],
    property: &str,
    value: Option<&str>,
) -> Result<(), EditorError> {
    for key in texts {
        let props = state.text_mut(*key)?;
        match value {
            Some(v) => {
                props.style.insert(property.to_string(), v.to_string());
            }
            None => {
                props.style.remove(property);
            }
        }
    }
    Ok(())
}

pub fn clear_formatting(state: &mut EditorState, texts: &[NodeKey]) -> Result<(), EditorError> {
    for key in texts {
        let props = state.text_mut(*key)?;
        props.format = TextFormat::empty();
        props.style.clear();
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────────
// Blocks
// ───────────────────────────────────────────────────────────────────

pub fn set_alignment(state: &mut EditorState, block: NodeKey, align: Alignment) -> Result<(), EditorError> {
    state.block_mut(block)?.align = align;
    Ok(())
}

/// Adds `delta` to the block indent, never going below zero.
pub fn adjust_indent(state: &mut EditorState, block: NodeKey, delta: i32) -> Result<(), EditorError> {
    let props = state.block_mut(block)?;
    props.indent = props.indent.saturating_add_signed(delta);
    Ok(())
}

pub fn set_block_type(state: &mut EditorState, block: NodeKey, block_type: BlockType) -> Result<(), EditorError> {
    state.block_mut(block)?.block_type = block_type;
    Ok(())
}

/// Moves the content of `block` to the end of the paragraph before it and
/// removes `block`. Returns `false` if there is no paragraph to merge into.
pub fn merge_with_previous(state: &mut EditorState, block: NodeKey) -> Result<bool, EditorError> {
    let Some(prev) = state.previous_sibling(block) else {
        return Ok(false);
    };
    if state.block(prev).is_err() {
        return Ok(false);
    }
    let children = state.children(block).to_vec();
    for child in children {
        state.append_child(prev, child)?;
    }
    state.remove(block)?;
    Ok(true)
}

/// Splits the paragraph containing `point` in two and returns the new
/// paragraph, which holds everything after the point. Inline wrappers that
/// straddle the point are split as well.
pub fn split_block_at(state: &mut EditorState, point: Point) -> Result<NodeKey, EditorError> {
    let block = state
        .block_of(point.key)
        .ok_or_else(|| EditorError::InvalidSelection("point is not inside a paragraph".into()))?;

    let node = state.node(point.key)?;
    let (mut right_start, mut container) = if node.is_text() {
        let len = state.char_len(point.key)?;
        let parent = state
            .parent(point.key)
            .ok_or(EditorError::NodeNotFound(point.key))?;
        let start = if point.offset == 0 {
            Some(point.key)
        } else if point.offset >= len {
            state.next_sibling(point.key)
        } else {
            Some(state.split_text(point.key, point.offset)?)
        };
        (start, parent)
    } else {
        (state.children(point.key).get(point.offset).copied(), point.key)
    };

    while container != block {
        let parent = state
            .parent(container)
            .ok_or(EditorError::NodeNotFound(container))?;
        let children = state.children(container).to_vec();
        let moving: Vec<NodeKey> = match right_start {
            Some(start) => {
                let at = children.iter().position(|k| *k == start).unwrap_or(children.len());
                children[at..].to_vec()
            }
            None => Vec::new(),
        };
        right_start = if moving.is_empty() {
            state.next_sibling(container)
        } else if moving.len() == children.len() {
            Some(container)
        } else {
            let kind = state.node(container)?.kind.clone();
            let copy = state.create(kind);
            state.insert_after(container, copy)?;
            for key in moving {
                state.append_child(copy, key)?;
            }
            Some(copy)
        };
        container = parent;
    }

    let kind = state.node(block)?.kind.clone();
    let new_block = state.create(kind);
    state.insert_after(block, new_block)?;
    if let Some(start) = right_start {
        let children = state.children(block).to_vec();
        if let Some(at) = children.iter().position(|k| *k == start) {
            for key in &children[at..] {
                state.append_child(new_block, *key)?;
            }
        }
    }
    Ok(new_block)
}

// ───────────────────────────────────────────────────────────────────
// Caret
// ───────────────────────────────────────────────────────────────────

/// The collapsed caret, or `None` for node selections and ranges.
pub fn caret(state: &EditorState) -> Option<Point> {
    match state.selection() {
        Some(Selection::Range { anchor, focus }) if anchor == focus => Some(*focus),
        _ => None,
    }
}

pub fn set_caret(state: &mut EditorState, point: Point) {
    state.set_selection(Some(Selection::caret(point)));
}

/// Position right after `key`.
pub fn point_after(state: &EditorState, key: NodeKey) -> Point {
    if let Ok(text) = state.text(key) {
        return Point::new(key, text.char_len());
    }
    match (state.parent(key), state.index_in_parent(key)) {
        (Some(parent), Some(index)) => Point::new(parent, index + 1),
        _ => Point::new(key, state.children(key).len()),
    }
}

/// First text position of a block, or the block itself after any markers.
pub fn block_start(state: &EditorState, block: NodeKey) -> Point {
    match text_descendants(state, block).first() {
        Some(text) => Point::new(*text, 0),
        None => Point::new(block, state.children(block).len()),
    }
}

/// Turns an element point into an equivalent text point where possible.
pub fn normalize_point(state: &EditorState, point: Point) -> Point {
    if state.get(point.key).map_or(true, |n| n.is_text()) {
        return point;
    }
    let children = state.children(point.key);
    if point.offset > 0 {
        if let Some(before) = children.get(point.offset - 1) {
            if let Some(last) = text_descendants(state, *before).last() {
                let len = state.char_len(*last).unwrap_or(0);
                return Point::new(*last, len);
            }
        }
    }
    if let Some(after) = children.get(point.offset) {
        if let Some(first) = text_descendants(state, *after).first() {
            return Point::new(*first, 0);
        }
    }
    point
}

/// Character before `point` in the same paragraph, skipping text for which
/// `skip` is true. Returns the text node and the character index.
pub fn prev_char(
    state: &EditorState,
    point: Point,
    skip: impl Fn(&EditorState, NodeKey) -> bool,
) -> Option<(NodeKey, usize)> {
    let point = normalize_point(state, point);
    let block = state.block_of(point.key)?;
    let texts = text_descendants(state, block);
    let at = texts.iter().position(|k| *k == point.key)?;
    for j in (0..=at).rev() {
        let key = texts[j];
        if skip(state, key) {
            continue;
        }
        let upper = if j == at {
            point.offset
        } else {
            state.char_len(key).ok()?
        };
        if upper > 0 {
            return Some((key, upper - 1));
        }
    }
    None
}

/// Character after `point` in the same paragraph.
pub fn next_char(
    state: &EditorState,
    point: Point,
    skip: impl Fn(&EditorState, NodeKey) -> bool,
) -> Option<(NodeKey, usize)> {
    let point = normalize_point(state, point);
    let block = state.block_of(point.key)?;
    let texts = text_descendants(state, block);
    let at = texts.iter().position(|k| *k == point.key)?;
    for (j, key) in texts.iter().enumerate().skip(at) {
        if skip(state, *key) {
            continue;
        }
        let lower = if j == at { point.offset } else { 0 };
        if lower < state.char_len(*key).ok()? {
            return Some((*key, lower));
        }
    }
    None
}

/// Caret position just before `key`: the end of the preceding text in the
/// same paragraph, or the paragraph itself.
pub fn point_before(state: &EditorState, key: NodeKey) -> Point {
    let start = text_descendants(state, key)
        .first()
        .map(|t| Point::new(*t, 0));
    if let Some(start) = start {
        if let Some((text, index)) = prev_char(state, start, |_, _| false) {
            return Point::new(text, index + 1);
        }
    }
    match state.block_of(key) {
        Some(block) if block != key => Point::new(block, 0),
        _ => Point::new(NodeKey::ROOT, 0),
    }
}

/// Removes one character. An emptied text node is removed and the caret
/// moves to the position before it.
pub fn delete_char(state: &mut EditorState, key: NodeKey, index: usize) -> Result<Point, EditorError> {
    state.delete_text_range(key, index, index + 1)?;
    if state.char_len(key)? > 0 {
        return Ok(Point::new(key, index));
    }
    let caret = point_before(state, key);
    state.remove(key)?;
    Ok(caret)
}

/// Where to insert inline content for the collapsed caret, splitting text
/// as needed. Returns `(parent, child index)`.
pub fn insertion_point(state: &mut EditorState) -> Result<(NodeKey, usize), EditorError> {
    let point = caret(state).ok_or_else(|| EditorError::InvalidSelection("no caret".into()))?;
    let node = state.node(point.key)?.clone();
    match &node.kind {
        NodeKind::Text(text) => {
            let len = text.char_len();
            let parent = state
                .parent(point.key)
                .ok_or(EditorError::NodeNotFound(point.key))?;
            let index = state
                .index_in_parent(point.key)
                .ok_or(EditorError::NodeNotFound(point.key))?;
            if point.offset == 0 {
                Ok((parent, index))
            } else if point.offset >= len {
                Ok((parent, index + 1))
            } else {
                state.split_text(point.key, point.offset)?;
                Ok((parent, index + 1))
            }
        }
        NodeKind::Root => {
            let paragraph = state.create(NodeKind::paragraph());
            state.insert_child(NodeKey::ROOT, point.offset, paragraph)?;
            Ok((paragraph, 0))
        }
        NodeKind::Image(_) => {
            let parent = state
                .parent(point.key)
                .ok_or(EditorError::NodeNotFound(point.key))?;
            let index = state.index_in_parent(point.key).unwrap_or(0);
            Ok((parent, index + 1))
        }
        _ => Ok((point.key, point.offset.min(node.children.len()))),
    }
}

/// Places detached nodes at the caret and moves the caret after them.
pub fn insert_at_caret(state: &mut EditorState, nodes: &[NodeKey]) -> Result<(), EditorError> {
    let (parent, index) = insertion_point(state)?;
    for (i, key) in nodes.iter().enumerate() {
        state.insert_child(parent, index + i, *key)?;
    }
    if let Some(last) = nodes.last() {
        let point = point_after(state, *last);
        set_caret(state, point);
    }
    Ok(())
}

/// Places a detached block after the top-level block holding the
/// selection, or at the end of the document.
pub fn insert_block_after_selection(state: &mut EditorState, block: NodeKey) -> Result<(), EditorError> {
    let anchor = match state.selection() {
        Some(Selection::Range { focus, .. }) => Some(focus.key),
        Some(Selection::Node(keys)) => keys.first().copied(),
        None => None,
    };
    match anchor.and_then(|k| state.top_block_of(k)) {
        Some(top) => state.insert_after(top, block),
        None => state.append_child(NodeKey::ROOT, block),
    }
}

/// Removes the text covered by the range selection and collapses the caret
/// to its start.
pub fn delete_selection(state: &mut EditorState) -> Result<(), EditorError> {
    let runs = state.selected_text_runs()?;
    let Some(first) = runs.first().copied() else {
        return Ok(());
    };
    let caret = point_before(state, first);
    for run in runs {
        state.remove(run)?;
    }
    set_caret(state, caret);
    Ok(())
}

// ───────────────────────────────────────────────────────────────────
// Tables
// ───────────────────────────────────────────────────────────────────

pub fn new_cell(state: &mut EditorState) -> Result<NodeKey, EditorError> {
    let cell = state.create(NodeKind::TableCell);
    let paragraph = state.create(NodeKind::paragraph());
    state.append_child(cell, paragraph)?;
    Ok(cell)
}

/// Detached `rows` x `columns` table of empty cells.
pub fn new_table(state: &mut EditorState, rows: usize, columns: usize) -> Result<NodeKey, EditorError> {
    let table = state.create(NodeKind::Table);
    for _ in 0..rows.max(1) {
        let row = state.create(NodeKind::TableRow);
        for _ in 0..columns.max(1) {
            let cell = new_cell(state)?;
            state.append_child(row, cell)?;
        }
        state.append_child(table, row)?;
    }
    Ok(table)
}

pub fn cell_of(state: &EditorState, key: NodeKey) -> Option<NodeKey> {
    state.nearest_ancestor(key, |n| matches!(n.kind, NodeKind::TableCell))
}

pub fn row_of(state: &EditorState, key: NodeKey) -> Option<NodeKey> {
    state.nearest_ancestor(key, |n| matches!(n.kind, NodeKind::TableRow))
}

pub fn table_of(state: &EditorState, key: NodeKey) -> Option<NodeKey> {
    state.nearest_ancestor(key, |n| matches!(n.kind, NodeKind::Table))
}

pub fn first_cell(state: &EditorState, table: NodeKey) -> Option<NodeKey> {
    let row = *state.children(table).first()?;
    state.children(row).first().copied()
}

/// Cells at `column` in every row that has one.
pub fn column_cells(state: &EditorState, table: NodeKey, column: usize) -> Vec<NodeKey> {
    state
        .children(table)
        .iter()
        .filter_map(|row| state.children(*row).get(column).copied())
        .collect()
}

/// The cell holding the selection anchor.
pub fn selected_cell(state: &EditorState) -> Option<NodeKey> {
    match state.selection()? {
        Selection::Range { anchor, .. } => cell_of(state, anchor.key),
        Selection::Node(keys) => keys.first().and_then(|k| cell_of(state, *k)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSpec;

    fn paragraph(state: &mut EditorState, text: &str) -> (NodeKey, NodeKey) {
        let p = state.build(&NodeSpec::paragraph(text));
        state.append_child(NodeKey::ROOT, p).unwrap();
        (p, state.children(p)[0])
    }

    #[test]
    fn test_toggle_format_all_or_nothing() {
        let mut state = EditorState::new();
        let (_, a) = paragraph(&mut state, "a");
        let (_, b) = paragraph(&mut state, "b");
        state.text_mut(a).unwrap().format = TextFormat::BOLD;

        toggle_format(&mut state, &[a, b], FormatType::Bold).unwrap();
        assert!(state.text(b).unwrap().format.contains(TextFormat::BOLD));

        toggle_format(&mut state, &[a, b], FormatType::Bold).unwrap();
        assert!(state.text(a).unwrap().format.is_empty());
        assert!(state.text(b).unwrap().format.is_empty());
    }

    #[test]
    fn test_split_block_splits_wrappers() {
        let mut state = EditorState::new();
        let (p, text) = paragraph(&mut state, "hello");
        let link = state.wrap(&[text], NodeKind::Link { url: "u".into() }).unwrap();

        let new_block = split_block_at(&mut state, Point::new(text, 2)).unwrap();
        assert_eq!(state.text_content(p), "he");
        assert_eq!(state.text_content(new_block), "llo");
        let moved_link = state.children(new_block)[0];
        assert_ne!(moved_link, link);
        assert_eq!(
            state.node(moved_link).unwrap().kind,
            NodeKind::Link { url: "u".into() }
        );
    }

    #[test]
    fn test_split_block_at_end_leaves_empty_paragraph() {
        let mut state = EditorState::new();
        let (p, text) = paragraph(&mut state, "abc");
        let new_block = split_block_at(&mut state, Point::new(text, 3)).unwrap();
        assert_eq!(state.text_content(p), "abc");
        assert!(state.children(new_block).is_empty());
        assert_eq!(state.next_sibling(p), Some(new_block));
    }

    #[test]
    fn test_merge_with_previous() {
        let mut state = EditorState::new();
        let (p1, _) = paragraph(&mut state, "ab");
        let (p2, _) = paragraph(&mut state, "cd");
        assert!(merge_with_previous(&mut state, p2).unwrap());
        assert_eq!(state.text_content(p1), "abcd");
        assert!(!state.contains(p2));
        assert!(!merge_with_previous(&mut state, p1).unwrap());
    }

    #[test]
    fn test_prev_char_skips() {
        let mut state = EditorState::new();
        let (_, text) = paragraph(&mut state, "abcd");
        let right = state.split_text(text, 2).unwrap();

        let found = prev_char(&state, Point::new(right, 0), |_, _| false);
        assert_eq!(found, Some((text, 1)));

        let skipped = prev_char(&state, Point::new(right, 1), |_, k| k == right);
        assert_eq!(skipped, Some((text, 1)));

        assert_eq!(prev_char(&state, Point::new(text, 0), |_, _| false), None);
    }

    #[test]
    fn test_delete_char_removes_emptied_text() {
        let mut state = EditorState::new();
        let (p, text) = paragraph(&mut state, "x");
        let caret = delete_char(&mut state, text, 0).unwrap();
        assert!(!state.contains(text));
        assert_eq!(caret, Point::new(p, 0));

        let (_, second) = paragraph(&mut state, "ab");
        let right = state.split_text(second, 1).unwrap();
        let caret = delete_char(&mut state, right, 0).unwrap();
        assert_eq!(caret, Point::new(second, 1));
    }

    #[test]
    fn test_new_table_shape() {
        let mut state = EditorState::new();
        let table = new_table(&mut state, 2, 3).unwrap();
        assert_eq!(state.children(table).len(), 2);
        assert_eq!(column_cells(&state, table, 2).len(), 2);
        assert!(first_cell(&state, table).is_some());
    }
}
