//! Default rich-text behavior used outside suggestion mode.

use crate::command::InputEvent;
use crate::editor::Transaction;
use crate::error::EditorError;
use crate::node::{
    Alignment, BlockType, FormatType, ImageProps, NodeKey, NodeKind, NodeSpec, Point, Selection,
    TextProps,
};
use crate::ops;

fn range_runs(tx: &mut Transaction<'_>) -> Result<Vec<NodeKey>, EditorError> {
    match tx.selection() {
        Some(Selection::Range { .. }) => tx.selected_text_runs(),
        _ => Ok(Vec::new()),
    }
}

/// Removes selected content, if the selection is a non-empty range.
fn delete_selected(tx: &mut Transaction<'_>) -> Result<(), EditorError> {
    let ranged = matches!(tx.selection(), Some(s @ Selection::Range { .. }) if !s.is_collapsed());
    if ranged {
        ops::delete_selection(tx)?;
    }
    Ok(())
}

pub fn format_text(tx: &mut Transaction<'_>, format: FormatType) -> Result<bool, EditorError> {
    let runs = range_runs(tx)?;
    ops::toggle_format(tx, &runs, format)?;
    Ok(true)
}

pub fn set_style(
    tx: &mut Transaction<'_>,
    property: &str,
    value: Option<&str>,
) -> Result<bool, EditorError> {
    let runs = range_runs(tx)?;
    ops::set_style(tx, &runs, property, value)?;
    Ok(true)
}

pub fn clear_formatting(tx: &mut Transaction<'_>) -> Result<bool, EditorError> {
    let runs = range_runs(tx)?;
    ops::clear_formatting(tx, &runs)?;
    Ok(true)
}

pub fn set_alignment(tx: &mut Transaction<'_>, align: Alignment) -> Result<bool, EditorError> {
    for block in tx.selected_blocks() {
        ops::set_alignment(tx, block, align)?;
    }
    Ok(true)
}

pub fn indent(tx: &mut Transaction<'_>, delta: i32) -> Result<bool, EditorError> {
    for block in tx.selected_blocks() {
        ops::adjust_indent(tx, block, delta)?;
    }
    Ok(true)
}

pub fn set_block_type(tx: &mut Transaction<'_>, block_type: BlockType) -> Result<bool, EditorError> {
    for block in tx.selected_blocks() {
        ops::set_block_type(tx, block, block_type.clone())?;
    }
    Ok(true)
}

/// Inserts `text` at the selection, replacing any selected content.
pub fn insert_text(tx: &mut Transaction<'_>, text: &str) -> Result<bool, EditorError> {
    if text.is_empty() || !matches!(tx.selection(), Some(Selection::Range { .. })) {
        return Ok(true);
    }
    delete_selected(tx)?;
    let Some(caret) = ops::caret(tx) else {
        return Ok(true);
    };
    let caret = ops::normalize_point(tx, caret);
    if tx.node(caret.key)?.is_text() {
        tx.insert_text_at(caret.key, caret.offset, text)?;
        ops::set_caret(tx, Point::new(caret.key, caret.offset + text.chars().count()));
        return Ok(true);
    }
    ops::set_caret(tx, caret);
    let node = tx.create(NodeKind::Text(TextProps::plain(text)));
    ops::insert_at_caret(tx, &[node])?;
    Ok(true)
}

fn delete(tx: &mut Transaction<'_>, backward: bool) -> Result<bool, EditorError> {
    match tx.selection().cloned() {
        None => Ok(true),
        Some(Selection::Node(keys)) => {
            for key in keys {
                if tx.contains(key) && key != NodeKey::ROOT {
                    tx.remove(key)?;
                }
            }
            tx.set_selection(None);
            Ok(true)
        }
        Some(selection) if !selection.is_collapsed() => {
            delete_selected(tx)?;
            Ok(true)
        }
        Some(Selection::Range { focus, .. }) => {
            let no_skip = |_: &crate::document::EditorState, _: NodeKey| false;
            let target = if backward {
                ops::prev_char(tx, focus, no_skip)
            } else {
                ops::next_char(tx, focus, no_skip)
            };
            if let Some((key, index)) = target {
                let caret = ops::delete_char(tx, key, index)?;
                ops::set_caret(tx, caret);
                return Ok(true);
            }
            let Some(block) = tx.block_of(focus.key) else {
                return Ok(true);
            };
            let second = if backward {
                Some(block)
            } else {
                tx.next_sibling(block)
            };
            if let Some(second) = second {
                let first = tx.previous_sibling(second);
                let end = first.and_then(|f| ops::text_descendants(tx, f).last().copied());
                if ops::merge_with_previous(tx, second)? {
                    if let Some(end) = end {
                        let len = tx.char_len(end)?;
                        ops::set_caret(tx, Point::new(end, len));
                    }
                }
            }
            Ok(true)
        }
    }
}

fn insert_paragraph(tx: &mut Transaction<'_>) -> Result<bool, EditorError> {
    delete_selected(tx)?;
    let Some(caret) = ops::caret(tx) else {
        return Ok(true);
    };
    if tx.block_of(caret.key).is_none() {
        return Ok(true);
    }
    let block = ops::split_block_at(tx, caret)?;
    let start = ops::block_start(tx, block);
    ops::set_caret(tx, start);
    Ok(true)
}

pub fn before_input(tx: &mut Transaction<'_>, event: &InputEvent) -> Result<bool, EditorError> {
    match event {
        InputEvent::InsertText(text) => insert_text(tx, text),
        InputEvent::DeleteBackward => delete(tx, true),
        InputEvent::DeleteForward => delete(tx, false),
        InputEvent::InsertParagraph => insert_paragraph(tx),
    }
}

pub fn insert_clipboard_nodes(tx: &mut Transaction<'_>, specs: &[NodeSpec]) -> Result<bool, EditorError> {
    delete_selected(tx)?;
    let (blocks, inline): (Vec<&NodeSpec>, Vec<&NodeSpec>) =
        specs.iter().partition(|s| s.kind.is_block());
    if ops::caret(tx).is_some() && !inline.is_empty() {
        let nodes: Vec<NodeKey> = inline.into_iter().map(|s| tx.build(s)).collect();
        ops::insert_at_caret(tx, &nodes)?;
    }
    let mut previous = None;
    for spec in blocks {
        let block = tx.build(spec);
        match previous {
            Some(prev) => tx.insert_after(prev, block)?,
            None => ops::insert_block_after_selection(tx, block)?,
        }
        previous = Some(block);
    }
    if let Some(last) = previous {
        let end = ops::point_after(tx, last);
        ops::set_caret(tx, end);
    }
    Ok(true)
}

pub fn insert_image(tx: &mut Transaction<'_>, image: &ImageProps) -> Result<bool, EditorError> {
    let spec = NodeSpec::image(image.src.clone(), image.width, image.height);
    insert_clipboard_nodes(tx, &[spec])
}

pub fn set_image_size(
    tx: &mut Transaction<'_>,
    key: NodeKey,
    width: u32,
    height: u32,
) -> Result<bool, EditorError> {
    if let NodeKind::Image(image) = tx.kind_mut(key)? {
        image.width = width;
        image.height = height;
    }
    Ok(true)
}

pub fn drop_image(tx: &mut Transaction<'_>, image: NodeKey, target: Point) -> Result<bool, EditorError> {
    if !tx.contains(target.key) || !matches!(tx.node(image)?.kind, NodeKind::Image(_)) {
        return Ok(true);
    }
    tx.detach(image)?;
    ops::set_caret(tx, target);
    ops::insert_at_caret(tx, &[image])?;
    Ok(true)
}

pub fn link_change(
    tx: &mut Transaction<'_>,
    url: Option<&str>,
    text: Option<&str>,
) -> Result<bool, EditorError> {
    let anchor = match tx.selection() {
        Some(Selection::Range { anchor, .. }) => anchor.key,
        _ => return Ok(true),
    };
    let link = tx.nearest_ancestor(anchor, |n| matches!(n.kind, NodeKind::Link { .. }));
    match (link, url) {
        (Some(link), None) => {
            tx.unwrap_node(link)?;
        }
        (Some(link), Some(new_url)) => {
            if let NodeKind::Link { url } = tx.kind_mut(link)? {
                *url = new_url.to_string();
            }
            if let Some(new_text) = text {
                for child in tx.children(link).to_vec() {
                    tx.remove(child)?;
                }
                let node = tx.create(NodeKind::text(new_text));
                tx.append_child(link, node)?;
                ops::set_caret(tx, Point::new(node, new_text.chars().count()));
            }
        }
        (None, Some(new_url)) => match text {
            Some(new_text) => {
                delete_selected(tx)?;
                let link = tx.create(NodeKind::Link {
                    url: new_url.to_string(),
                });
                let node = tx.create(NodeKind::text(new_text));
                tx.append_child(link, node)?;
                ops::insert_at_caret(tx, &[link])?;
            }
            None => {
                let runs = range_runs(tx)?;
                for group in tx.group_contiguous(&runs) {
                    tx.wrap(
                        &group,
                        NodeKind::Link {
                            url: new_url.to_string(),
                        },
                    )?;
                }
            }
        },
        (None, None) => {}
    }
    Ok(true)
}

pub fn insert_divider(tx: &mut Transaction<'_>) -> Result<bool, EditorError> {
    let divider = tx.create(NodeKind::Divider);
    ops::insert_block_after_selection(tx, divider)?;
    Ok(true)
}

// ───────────────────────────────────────────────────────────────────
// Tables
// ───────────────────────────────────────────────────────────────────

pub fn insert_table(tx: &mut Transaction<'_>, rows: usize, columns: usize) -> Result<bool, EditorError> {
    let table = ops::new_table(tx, rows, columns)?;
    ops::insert_block_after_selection(tx, table)?;
    if let Some(cell) = ops::first_cell(tx, table) {
        let start = ops::block_start(tx, cell);
        ops::set_caret(tx, start);
    }
    Ok(true)
}

pub fn delete_table(tx: &mut Transaction<'_>, table: NodeKey) -> Result<bool, EditorError> {
    if ops::table_of(tx, table) == Some(table) {
        tx.remove(table)?;
    }
    Ok(true)
}

pub fn insert_table_row(tx: &mut Transaction<'_>, insert_after: bool) -> Result<bool, EditorError> {
    let Some(row) = ops::selected_cell(tx).and_then(|c| ops::row_of(tx, c)) else {
        return Ok(true);
    };
    let width = tx.children(row).len().max(1);
    let new_row = tx.create(NodeKind::TableRow);
    for _ in 0..width {
        let cell = ops::new_cell(tx)?;
        tx.append_child(new_row, cell)?;
    }
    if insert_after {
        tx.insert_after(row, new_row)?;
    } else {
        tx.insert_before(row, new_row)?;
    }
    Ok(true)
}

pub fn duplicate_table_row(tx: &mut Transaction<'_>, row: NodeKey) -> Result<bool, EditorError> {
    if ops::row_of(tx, row) == Some(row) {
        let copy = tx.deep_clone(row)?;
        tx.insert_after(row, copy)?;
    }
    Ok(true)
}

pub fn delete_table_row(tx: &mut Transaction<'_>, row: NodeKey) -> Result<bool, EditorError> {
    if ops::row_of(tx, row) == Some(row) {
        tx.remove(row)?;
    }
    Ok(true)
}

pub fn insert_table_column(tx: &mut Transaction<'_>, insert_after: bool) -> Result<bool, EditorError> {
    let Some(cell) = ops::selected_cell(tx) else {
        return Ok(true);
    };
    let (Some(table), Some(column)) = (ops::table_of(tx, cell), tx.index_in_parent(cell)) else {
        return Ok(true);
    };
    let at = if insert_after { column + 1 } else { column };
    for row in tx.children(table).to_vec() {
        let new_cell = ops::new_cell(tx)?;
        tx.insert_child(row, at, new_cell)?;
    }
    Ok(true)
}

pub fn duplicate_table_column(tx: &mut Transaction<'_>, cell: NodeKey) -> Result<bool, EditorError> {
    let (Some(table), Some(column)) = (ops::table_of(tx, cell), tx.index_in_parent(cell)) else {
        return Ok(true);
    };
    for original in ops::column_cells(tx, table, column) {
        let copy = tx.deep_clone(original)?;
        tx.insert_after(original, copy)?;
    }
    Ok(true)
}

pub fn delete_table_column(tx: &mut Transaction<'_>, cell: NodeKey) -> Result<bool, EditorError> {
    let (Some(table), Some(column)) = (ops::table_of(tx, cell), tx.index_in_parent(cell)) else {
        return Ok(true);
    };
    for target in ops::column_cells(tx, table, column) {
        tx.remove(target)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{Editor, Tags};
    use crate::node::TextFormat;

    fn setup(paragraphs: &[&str]) -> (Editor, Vec<NodeKey>) {
        let mut editor = Editor::new();
        let (texts, _) = editor
            .update(Tags::new(), |tx| {
                let mut texts = Vec::new();
                for p in paragraphs {
                    let block = tx.build(&NodeSpec::paragraph(*p));
                    tx.append_child(NodeKey::ROOT, block)?;
                    texts.push(tx.children(block)[0]);
                }
                Ok(texts)
            })
            .unwrap();
        (editor, texts)
    }

    #[test]
    fn test_bold_applies_in_place() {
        let (mut editor, texts) = setup(&["hello"]);
        editor
            .update(Tags::new(), |tx| {
                tx.set_selection(Some(Selection::range(
                    Point::new(texts[0], 0),
                    Point::new(texts[0], 5),
                )));
                format_text(tx, FormatType::Bold)
            })
            .unwrap();
        assert_eq!(editor.state().text(texts[0]).unwrap().format, TextFormat::BOLD);
        assert!(editor.state().suggestion_nodes().is_empty());
    }

    #[test]
    fn test_typing_and_backspace() {
        let (mut editor, texts) = setup(&["ac"]);
        editor
            .update(Tags::new(), |tx| {
                ops::set_caret(tx, Point::new(texts[0], 1));
                before_input(tx, &InputEvent::InsertText("b".into()))?;
                before_input(tx, &InputEvent::DeleteBackward)
            })
            .unwrap();
        assert_eq!(editor.state().text_content(NodeKey::ROOT), "ac");
    }

    #[test]
    fn test_enter_and_join() {
        let (mut editor, texts) = setup(&["abcd"]);
        editor
            .update(Tags::new(), |tx| {
                ops::set_caret(tx, Point::new(texts[0], 2));
                before_input(tx, &InputEvent::InsertParagraph)
            })
            .unwrap();
        assert_eq!(editor.state().text_content(NodeKey::ROOT), "ab\ncd");

        editor
            .update(Tags::new(), |tx| before_input(tx, &InputEvent::DeleteBackward))
            .unwrap();
        assert_eq!(editor.state().text_content(NodeKey::ROOT), "abcd");
    }

    #[test]
    fn test_table_row_and_column_edits() {
        let (mut editor, _) = setup(&[]);
        editor
            .update(Tags::new(), |tx| {
                insert_table(tx, 2, 2)?;
                insert_table_row(tx, true)?;
                insert_table_column(tx, false)
            })
            .unwrap();
        let state = editor.state();
        let table = state.children(NodeKey::ROOT)[0];
        assert_eq!(state.children(table).len(), 3);
        for row in state.children(table) {
            assert_eq!(state.children(*row).len(), 3);
        }
    }
}
