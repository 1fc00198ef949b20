//! Accepting and rejecting suggestions.
//!
//! Both walk every node carrying the id in document order. Accepting
//! materializes the suggested change and drops the suggestion node;
//! rejecting discards it and leaves the document as it was before the
//! suggestion was made.

use crate::editor::{tags, Transaction};
use crate::error::EditorError;
use crate::node::{NodeKey, NodeKind};
use crate::ops;
use crate::suggestion::{summary, SuggestionChange, SuggestionId, SuggestionProps, SuggestionType};

/// Applies the suggestion. Returns `false` if no node carries `id`.
pub fn accept(tx: &mut Transaction<'_>, id: &SuggestionId) -> Result<bool, EditorError> {
    let resolved = resolve(tx, id, accept_node)?;
    if resolved {
        summary::record_resolved(true);
    }
    Ok(resolved)
}

/// Discards the suggestion. Returns `false` if no node carries `id`.
pub fn reject(tx: &mut Transaction<'_>, id: &SuggestionId) -> Result<bool, EditorError> {
    let resolved = resolve(tx, id, reject_node)?;
    if resolved {
        summary::record_resolved(false);
    }
    Ok(resolved)
}

fn resolve(
    tx: &mut Transaction<'_>,
    id: &SuggestionId,
    apply: fn(&mut Transaction<'_>, NodeKey, &SuggestionProps) -> Result<(), EditorError>,
) -> Result<bool, EditorError> {
    let keys = tx.nodes_with_suggestion_id(id);
    if keys.is_empty() {
        return Ok(false);
    }
    for key in keys {
        // An earlier node of the same id may have removed this one.
        if !tx.is_attached(key) {
            continue;
        }
        let props = tx
            .node(key)?
            .as_suggestion()
            .cloned()
            .ok_or(EditorError::NotASuggestion(key))?;
        apply(tx, key, &props)?;
    }
    tx.validate_selection();
    tx.add_tag(tags::RESOLVE_SUGGESTIONS);
    log::debug!("resolved suggestion {id}");
    Ok(true)
}

fn parent_of(tx: &Transaction<'_>, key: NodeKey) -> Result<NodeKey, EditorError> {
    tx.parent(key).ok_or(EditorError::NodeNotFound(key))
}

fn accept_node(
    tx: &mut Transaction<'_>,
    key: NodeKey,
    props: &SuggestionProps,
) -> Result<(), EditorError> {
    use SuggestionType::*;
    match props.suggestion_type {
        Insert | InsertImage | AddLink => {
            tx.unwrap_node(key)?;
        }
        Delete | DeleteImage => tx.remove(key)?,
        PropertyChange | StyleChange | ClearFormatting => {
            let texts = ops::text_descendants(tx, key);
            match &props.change {
                SuggestionChange::Format { format } => ops::toggle_format(tx, &texts, *format)?,
                SuggestionChange::Style { property, value } => {
                    ops::set_style(tx, &texts, property, value.as_deref())?
                }
                SuggestionChange::ClearFormatting { .. } => ops::clear_formatting(tx, &texts)?,
                _ => {}
            }
            tx.unwrap_node(key)?;
        }
        AlignChange | IndentChange | BlockTypeChange => {
            let block = parent_of(tx, key)?;
            match &props.change {
                SuggestionChange::Align { to, .. } => ops::set_alignment(tx, block, *to)?,
                SuggestionChange::Indent { delta } => ops::adjust_indent(tx, block, *delta)?,
                SuggestionChange::BlockType { to, .. } => {
                    ops::set_block_type(tx, block, to.clone())?
                }
                _ => {}
            }
            tx.remove(key)?;
        }
        LinkChange => {
            let link = parent_of(tx, key)?;
            if let SuggestionChange::Link { to: Some(url), .. } = &props.change {
                if let NodeKind::Link { url: current } = tx.kind_mut(link)? {
                    *current = url.clone();
                }
            }
            tx.unwrap_node(key)?;
        }
        DeleteLink => {
            let link = parent_of(tx, key)?;
            tx.unwrap_node(key)?;
            if matches!(tx.node(link)?.kind, NodeKind::Link { .. }) {
                tx.unwrap_node(link)?;
            }
        }
        ImageChange => {
            if let SuggestionChange::ImageSize { to, .. } = props.change {
                for child in tx.children(key).to_vec() {
                    if let NodeKind::Image(image) = tx.kind_mut(child)? {
                        (image.width, image.height) = to;
                    }
                }
            }
            tx.unwrap_node(key)?;
        }
        Split | InsertTable | InsertTableRow | DuplicateTableRow | InsertTableColumn
        | DuplicateTableColumn | InsertDivider => tx.remove(key)?,
        Join => {
            let block = parent_of(tx, key)?;
            tx.remove(key)?;
            ops::merge_with_previous(tx, block)?;
        }
        DeleteTable => {
            if let Some(table) = ops::table_of(tx, key) {
                tx.remove(table)?;
            }
        }
        DeleteTableRow => {
            if let Some(row) = ops::row_of(tx, key) {
                remove_table_part(tx, row)?;
            }
        }
        DeleteTableColumn => {
            if let Some(cell) = ops::cell_of(tx, key) {
                remove_table_part(tx, cell)?;
            }
        }
        DeleteDivider => {
            let divider = parent_of(tx, key)?;
            tx.remove(divider)?;
        }
    }
    Ok(())
}

fn reject_node(
    tx: &mut Transaction<'_>,
    key: NodeKey,
    props: &SuggestionProps,
) -> Result<(), EditorError> {
    use SuggestionType::*;
    match props.suggestion_type {
        Insert | InsertImage => tx.remove(key)?,
        Delete | DeleteImage | PropertyChange | StyleChange | ClearFormatting | LinkChange
        | DeleteLink | ImageChange => {
            tx.unwrap_node(key)?;
        }
        AddLink => {
            for child in tx.children(key).to_vec() {
                if matches!(tx.node(child)?.kind, NodeKind::Link { .. }) {
                    tx.unwrap_node(child)?;
                }
            }
            tx.unwrap_node(key)?;
        }
        Split => {
            let block = parent_of(tx, key)?;
            tx.remove(key)?;
            ops::merge_with_previous(tx, block)?;
        }
        Join | AlignChange | IndentChange | BlockTypeChange | DeleteTable | DeleteTableRow
        | DeleteTableColumn | DeleteDivider => tx.remove(key)?,
        InsertTable => {
            if let Some(table) = ops::table_of(tx, key) {
                tx.remove(table)?;
            }
        }
        InsertTableRow | DuplicateTableRow => {
            if let Some(row) = ops::row_of(tx, key) {
                remove_table_part(tx, row)?;
            }
        }
        InsertTableColumn | DuplicateTableColumn => {
            if let Some(cell) = ops::cell_of(tx, key) {
                remove_table_part(tx, cell)?;
            }
        }
        InsertDivider => {
            let divider = parent_of(tx, key)?;
            tx.remove(divider)?;
        }
    }
    Ok(())
}

/// Removes a row or cell, then any row or table it leaves empty.
fn remove_table_part(tx: &mut Transaction<'_>, key: NodeKey) -> Result<(), EditorError> {
    let mut current = key;
    loop {
        let parent = tx.parent(current);
        tx.remove(current)?;
        match parent {
            Some(p) if p != NodeKey::ROOT && tx.children(p).is_empty() => current = p,
            _ => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{Editor, Tags};
    use crate::node::{Alignment, FormatType, NodeSpec, Point, Selection, TextFormat};
    use crate::suggestion::overlay;

    fn setup(text: &str) -> (Editor, NodeKey) {
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

    fn suggest(
        editor: &mut Editor,
        selection: Selection,
        f: impl FnOnce(&mut Transaction<'_>, &mut overlay::OnCreated<'_>) -> Result<bool, EditorError>,
    ) -> Vec<SuggestionId> {
        let mut ids = Vec::new();
        editor
            .update(Tags::new(), |tx| {
                tx.set_selection(Some(selection));
                let mut record = |id: &SuggestionId| ids.push(id.clone());
                f(tx, &mut record)
            })
            .unwrap();
        ids
    }

    fn all_formats(editor: &Editor) -> TextFormat {
        editor
            .state()
            .nodes()
            .filter_map(|n| n.as_text())
            .fold(TextFormat::empty(), |acc, t| acc | t.format)
    }

    #[test]
    fn test_accept_format_applies_it() {
        let (mut editor, text) = setup("bold me");
        let ids = suggest(
            &mut editor,
            Selection::range(Point::new(text, 0), Point::new(text, 4)),
            |tx, cb| overlay::format_text(tx, FormatType::Bold, cb),
        );
        let (accepted, report) = editor
            .update(Tags::new(), |tx| accept(tx, &ids[0]))
            .unwrap();
        assert!(accepted);
        assert!(report.has_tag(tags::RESOLVE_SUGGESTIONS));
        assert!(editor.state().suggestion_nodes().is_empty());
        assert_eq!(all_formats(&editor), TextFormat::BOLD);
    }

    #[test]
    fn test_reject_format_leaves_text_plain() {
        let (mut editor, text) = setup("bold me");
        let ids = suggest(
            &mut editor,
            Selection::range(Point::new(text, 0), Point::new(text, 4)),
            |tx, cb| overlay::format_text(tx, FormatType::Bold, cb),
        );
        editor
            .update(Tags::new(), |tx| reject(tx, &ids[0]))
            .unwrap();
        assert!(editor.state().suggestion_nodes().is_empty());
        assert!(all_formats(&editor).is_empty());
        assert_eq!(editor.state().text_content(NodeKey::ROOT), "bold me");
    }

    #[test]
    fn test_replace_accept_and_reject() {
        for accept_it in [true, false] {
            let (mut editor, text) = setup("old tail");
            let ids = suggest(
                &mut editor,
                Selection::range(Point::new(text, 0), Point::new(text, 3)),
                |tx, cb| overlay::insert_text(tx, "new", cb),
            );
            editor
                .update(Tags::new(), |tx| {
                    if accept_it {
                        accept(tx, &ids[0])
                    } else {
                        reject(tx, &ids[0])
                    }
                })
                .unwrap();
            let expected = if accept_it { "new tail" } else { "old tail" };
            assert_eq!(editor.state().text_content(NodeKey::ROOT), expected);
            assert!(editor.state().suggestion_nodes().is_empty());
        }
    }

    #[test]
    fn test_accept_alignment_marker() {
        let (mut editor, text) = setup("centered");
        let ids = suggest(
            &mut editor,
            Selection::caret(Point::new(text, 0)),
            |tx, cb| overlay::set_alignment(tx, Alignment::Center, cb),
        );
        editor
            .update(Tags::new(), |tx| accept(tx, &ids[0]))
            .unwrap();
        let block = editor.state().parent(text).unwrap();
        assert_eq!(editor.state().block(block).unwrap().align, Alignment::Center);
        assert!(editor.state().suggestion_nodes().is_empty());
    }

    #[test]
    fn test_reject_split_merges_paragraphs() {
        let (mut editor, text) = setup("abcd");
        let ids = suggest(
            &mut editor,
            Selection::caret(Point::new(text, 2)),
            overlay::insert_paragraph,
        );
        assert_eq!(editor.state().children(NodeKey::ROOT).len(), 2);
        editor
            .update(Tags::new(), |tx| reject(tx, &ids[0]))
            .unwrap();
        assert_eq!(editor.state().children(NodeKey::ROOT).len(), 1);
        assert_eq!(editor.state().text_content(NodeKey::ROOT), "abcd");
    }

    #[test]
    fn test_accept_row_deletion_removes_row() {
        let mut editor = Editor::new();
        let ids = suggest(
            &mut editor,
            Selection::Node(Vec::new()),
            |tx, cb| overlay::insert_table(tx, 2, 2, cb),
        );
        editor
            .update(Tags::new(), |tx| accept(tx, &ids[0]))
            .unwrap();
        let table = editor.state().children(NodeKey::ROOT)[0];
        let row = editor.state().children(table)[1];

        let ids = suggest(
            &mut editor,
            Selection::Node(vec![row]),
            |tx, cb| overlay::delete_table_row(tx, row, cb),
        );
        editor
            .update(Tags::new(), |tx| accept(tx, &ids[0]))
            .unwrap();
        assert!(!editor.state().contains(row));
        assert_eq!(editor.state().children(table).len(), 1);
    }

    #[test]
    fn test_unknown_id_is_not_resolved() {
        let (mut editor, _) = setup("text");
        let (resolved, _) = editor
            .update(Tags::new(), |tx| accept(tx, &SuggestionId::from("missing")))
            .unwrap();
        assert!(!resolved);
    }
}
