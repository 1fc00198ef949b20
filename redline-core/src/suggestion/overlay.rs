//! Suggestion-mode command handlers.
//!
//! Each handler runs inside an editor update and turns the intended direct
//! mutation into suggestion nodes. Every fresh id is reported through
//! `on_created` so the session can track what it created. Handlers return
//! `Ok(true)` once they have taken the command, including when there was
//! nothing to do, so plain editing never runs behind them.
//!
//! Edits that land inside the user's own `insert` suggestion are applied
//! directly: that content does not exist yet for anyone else.

use crate::editor::{tags, Transaction};
use crate::error::EditorError;
use crate::node::{
    Alignment, BlockType, FormatType, ImageProps, ListType, NodeKey, NodeKind, NodeSpec, Point,
    Selection, TextFormat, TextProps,
};
use crate::ops;
use crate::suggestion::{SuggestionChange, SuggestionId, SuggestionProps, SuggestionType};

pub type OnCreated<'a> = dyn FnMut(&SuggestionId) + 'a;

fn fresh_id(on_created: &mut OnCreated<'_>) -> SuggestionId {
    let id = SuggestionId::generate();
    log::info!("Created suggestion node with ID: {id}");
    on_created(&id);
    id
}

/// One id shared by every node a command creates, generated on first use.
fn lazy_id(slot: &mut Option<SuggestionId>, on_created: &mut OnCreated<'_>) -> SuggestionId {
    match slot {
        Some(id) => id.clone(),
        None => {
            let id = fresh_id(on_created);
            *slot = Some(id.clone());
            id
        }
    }
}

fn suggestion(id: SuggestionId, ty: SuggestionType, change: SuggestionChange) -> NodeKind {
    NodeKind::Suggestion(SuggestionProps::new(id, ty).with_change(change))
}

fn wrap_groups(
    tx: &mut Transaction<'_>,
    keys: &[NodeKey],
    kind: &NodeKind,
) -> Result<Vec<NodeKey>, EditorError> {
    let mut wrappers = Vec::new();
    for group in tx.group_contiguous(keys) {
        wrappers.push(tx.wrap(&group, kind.clone())?);
    }
    Ok(wrappers)
}

fn has_range(tx: &Transaction<'_>) -> bool {
    matches!(tx.selection(), Some(Selection::Range { .. }))
}

fn is_collapsed(tx: &Transaction<'_>) -> bool {
    tx.selection().is_some_and(Selection::is_collapsed)
}

/// Splits the selected runs into the user's own insertions and the rest.
fn partition_runs(tx: &mut Transaction<'_>) -> Result<(Vec<NodeKey>, Vec<NodeKey>), EditorError> {
    if !has_range(tx) {
        return Ok((Vec::new(), Vec::new()));
    }
    let runs = tx.selected_text_runs()?;
    Ok(runs
        .into_iter()
        .partition(|k| ops::is_inside(tx, *k, SuggestionType::Insert)))
}

// ───────────────────────────────────────────────────────────────────
// Inline formatting
// ───────────────────────────────────────────────────────────────────

pub fn format_text(
    tx: &mut Transaction<'_>,
    format: FormatType,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let (own, others) = partition_runs(tx)?;
    ops::toggle_format(tx, &own, format)?;
    if !others.is_empty() {
        let id = fresh_id(on_created);
        let kind = suggestion(
            id,
            SuggestionType::PropertyChange,
            SuggestionChange::Format { format },
        );
        wrap_groups(tx, &others, &kind)?;
    }
    Ok(true)
}

pub fn patch_style(
    tx: &mut Transaction<'_>,
    property: &str,
    value: Option<&str>,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let (own, others) = partition_runs(tx)?;
    ops::set_style(tx, &own, property, value)?;
    if !others.is_empty() {
        let id = fresh_id(on_created);
        let kind = suggestion(
            id,
            SuggestionType::StyleChange,
            SuggestionChange::Style {
                property: property.to_string(),
                value: value.map(str::to_string),
            },
        );
        wrap_groups(tx, &others, &kind)?;
    }
    Ok(true)
}

pub fn clear_formatting(
    tx: &mut Transaction<'_>,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let (own, others) = partition_runs(tx)?;
    ops::clear_formatting(tx, &own)?;

    let mut previous = TextFormat::empty();
    let mut formatted = Vec::new();
    for key in others {
        let text = tx.text(key)?;
        if !text.format.is_empty() || !text.style.is_empty() {
            previous |= text.format;
            formatted.push(key);
        }
    }
    if !formatted.is_empty() {
        let id = fresh_id(on_created);
        let kind = suggestion(
            id,
            SuggestionType::ClearFormatting,
            SuggestionChange::ClearFormatting { previous },
        );
        wrap_groups(tx, &formatted, &kind)?;
    }
    Ok(true)
}

// ───────────────────────────────────────────────────────────────────
// Block markers
// ───────────────────────────────────────────────────────────────────

pub fn set_alignment(
    tx: &mut Transaction<'_>,
    align: Alignment,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let mut id = None;
    for block in tx.selected_blocks() {
        let current = tx.block(block)?.align;
        if let Some(marker) = ops::find_marker(tx, block, SuggestionType::AlignChange) {
            let from = match &tx.node(marker)?.kind {
                NodeKind::Suggestion(SuggestionProps {
                    change: SuggestionChange::Align { from, .. },
                    ..
                }) => *from,
                _ => current,
            };
            if from == align {
                tx.remove(marker)?;
                tx.add_tag(tags::RESOLVE_SUGGESTIONS);
            } else if let SuggestionChange::Align { to, .. } = &mut tx.suggestion_mut(marker)?.change {
                *to = align;
            }
            continue;
        }
        if current == align {
            continue;
        }
        let props = SuggestionProps::new(lazy_id(&mut id, on_created), SuggestionType::AlignChange)
            .with_change(SuggestionChange::Align {
                from: current,
                to: align,
            });
        ops::insert_marker(tx, block, props)?;
    }
    Ok(true)
}

pub fn indent(
    tx: &mut Transaction<'_>,
    delta: i32,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let mut id = None;
    for block in tx.selected_blocks() {
        let current = i64::from(tx.block(block)?.indent);
        if let Some(marker) = ops::find_marker(tx, block, SuggestionType::IndentChange) {
            let pending = match &tx.node(marker)?.kind {
                NodeKind::Suggestion(SuggestionProps {
                    change: SuggestionChange::Indent { delta },
                    ..
                }) => *delta,
                _ => 0,
            };
            let combined = pending + delta;
            if current + i64::from(combined) < 0 {
                continue;
            }
            if combined == 0 {
                tx.remove(marker)?;
                tx.add_tag(tags::RESOLVE_SUGGESTIONS);
            } else if let SuggestionChange::Indent { delta } = &mut tx.suggestion_mut(marker)?.change {
                *delta = combined;
            }
            continue;
        }
        if current + i64::from(delta) < 0 {
            continue;
        }
        let props = SuggestionProps::new(lazy_id(&mut id, on_created), SuggestionType::IndentChange)
            .with_change(SuggestionChange::Indent { delta });
        ops::insert_marker(tx, block, props)?;
    }
    Ok(true)
}

pub fn set_block_type(
    tx: &mut Transaction<'_>,
    block_type: BlockType,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let mut id = None;
    for block in tx.selected_blocks() {
        let current = tx.block(block)?.block_type.clone();
        if let Some(marker) = ops::find_marker(tx, block, SuggestionType::BlockTypeChange) {
            let from = match &tx.node(marker)?.kind {
                NodeKind::Suggestion(SuggestionProps {
                    change: SuggestionChange::BlockType { from, .. },
                    ..
                }) => from.clone(),
                _ => current,
            };
            if from == block_type {
                tx.remove(marker)?;
                tx.add_tag(tags::RESOLVE_SUGGESTIONS);
            } else if let SuggestionChange::BlockType { to, .. } =
                &mut tx.suggestion_mut(marker)?.change
            {
                *to = block_type.clone();
            }
            continue;
        }
        if current == block_type {
            continue;
        }
        let props =
            SuggestionProps::new(lazy_id(&mut id, on_created), SuggestionType::BlockTypeChange)
                .with_change(SuggestionChange::BlockType {
                    from: current,
                    to: block_type.clone(),
                });
        ops::insert_marker(tx, block, props)?;
    }
    Ok(true)
}

/// Lists are a block type, so a list insertion is a block type change.
pub fn insert_list(
    tx: &mut Transaction<'_>,
    list_type: ListType,
    marker: Option<String>,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    set_block_type(tx, BlockType::List { list_type, marker }, on_created)
}

// ───────────────────────────────────────────────────────────────────
// Typing and deleting
// ───────────────────────────────────────────────────────────────────

/// Moves a caret sitting inside deleted text to just outside the deletion.
fn escape_deletion(tx: &mut Transaction<'_>) {
    let Some(caret) = ops::caret(tx) else {
        return;
    };
    let Some((wrapper, props)) = tx.nearest_suggestion(caret.key) else {
        return;
    };
    if props.suggestion_type != SuggestionType::Delete {
        return;
    }
    let (Some(parent), Some(index)) = (tx.parent(wrapper), tx.index_in_parent(wrapper)) else {
        return;
    };
    let at_start = caret.offset == 0
        && ops::text_descendants(tx, wrapper).first() == Some(&caret.key);
    let slot = if at_start { index } else { index + 1 };
    ops::set_caret(tx, Point::new(parent, slot));
}

/// Wraps the selected text in `delete` suggestions under `id`. Text inside
/// the user's own insertion is removed instead. The caret ends after the
/// last wrapper.
fn delete_range(tx: &mut Transaction<'_>, id: &SuggestionId) -> Result<(), EditorError> {
    let runs = tx.selected_text_runs()?;
    let Some(first) = runs.first().copied() else {
        return Ok(());
    };
    let fallback = ops::point_before(tx, first);

    let mut to_wrap = Vec::new();
    let mut last_kept = None;
    for run in runs {
        match ops::enclosing_suggestion_type(tx, run) {
            Some(SuggestionType::Insert) => {
                tx.remove(run)?;
                tx.add_tag(tags::RESOLVE_SUGGESTIONS);
            }
            Some(SuggestionType::Delete) => last_kept = Some(run),
            _ => to_wrap.push(run),
        }
    }
    let kind = suggestion(id.clone(), SuggestionType::Delete, SuggestionChange::None);
    let wrappers = wrap_groups(tx, &to_wrap, &kind)?;

    let caret = match wrappers.last().copied().or(last_kept) {
        Some(last) => ops::point_after(tx, last),
        None => fallback,
    };
    ops::set_caret(tx, caret);
    Ok(())
}

pub fn insert_text(
    tx: &mut Transaction<'_>,
    text: &str,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    if !has_range(tx) || text.is_empty() {
        return Ok(true);
    }

    let mut replace_id = None;
    if !is_collapsed(tx) {
        let id = fresh_id(on_created);
        delete_range(tx, &id)?;
        replace_id = Some(id);
    }
    let Some(caret) = ops::caret(tx) else {
        return Ok(true);
    };

    if replace_id.is_none()
        && tx.node(caret.key)?.is_text()
        && ops::is_inside(tx, caret.key, SuggestionType::Insert)
    {
        tx.insert_text_at(caret.key, caret.offset, text)?;
        ops::set_caret(
            tx,
            Point::new(caret.key, caret.offset + text.chars().count()),
        );
        return Ok(true);
    }

    escape_deletion(tx);
    let (format, style) = match ops::caret(tx).and_then(|p| tx.text(p.key).ok()) {
        Some(t) => (t.format, t.style.clone()),
        None => Default::default(),
    };
    let id = match replace_id {
        Some(id) => id,
        None => fresh_id(on_created),
    };
    let text_node = tx.create(NodeKind::Text(TextProps {
        text: text.to_string(),
        format,
        style,
    }));
    let wrapper = tx.create(suggestion(id, SuggestionType::Insert, SuggestionChange::None));
    tx.append_child(wrapper, text_node)?;
    ops::insert_at_caret(tx, &[wrapper])?;
    ops::set_caret(tx, Point::new(text_node, text.chars().count()));
    Ok(true)
}

fn is_delete_wrapper(tx: &Transaction<'_>, key: NodeKey) -> bool {
    tx.get(key)
        .and_then(|n| n.as_suggestion())
        .is_some_and(|s| s.suggestion_type == SuggestionType::Delete)
}

pub fn delete(
    tx: &mut Transaction<'_>,
    backward: bool,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    match tx.selection().cloned() {
        None => Ok(true),
        Some(Selection::Node(keys)) => delete_nodes(tx, &keys, on_created),
        Some(Selection::Range { .. }) if !is_collapsed(tx) => {
            let id = fresh_id(on_created);
            delete_range(tx, &id)?;
            Ok(true)
        }
        Some(Selection::Range { focus, .. }) => delete_collapsed(tx, focus, backward, on_created),
    }
}

fn delete_collapsed(
    tx: &mut Transaction<'_>,
    caret: Point,
    backward: bool,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let skip = |s: &crate::document::EditorState, k: NodeKey| {
        ops::is_inside(s, k, SuggestionType::Delete)
    };
    let target = if backward {
        ops::prev_char(tx, caret, skip)
    } else {
        ops::next_char(tx, caret, skip)
    };
    let Some((key, index)) = target else {
        return join_blocks(tx, caret, backward, on_created);
    };

    if ops::is_inside(tx, key, SuggestionType::Insert) {
        let point = ops::delete_char(tx, key, index)?;
        ops::set_caret(tx, point);
        tx.add_tag(tags::RESOLVE_SUGGESTIONS);
        return Ok(true);
    }

    let run = tx.isolate_text(key, index, index + 1)?;
    let neighbour = if backward {
        tx.next_sibling(run)
    } else {
        tx.previous_sibling(run)
    };
    match neighbour.filter(|n| is_delete_wrapper(tx, *n)) {
        Some(wrapper) if backward => tx.insert_child(wrapper, 0, run)?,
        Some(wrapper) => tx.append_child(wrapper, run)?,
        None => {
            let id = fresh_id(on_created);
            tx.wrap(
                &[run],
                suggestion(id, SuggestionType::Delete, SuggestionChange::None),
            )?;
        }
    }
    let caret = Point::new(run, if backward { 0 } else { 1 });
    ops::set_caret(tx, caret);
    Ok(true)
}

/// Backspace at the start of a paragraph or delete at its end. A pending
/// split between the two paragraphs is retracted, otherwise a `join` marker
/// goes at the start of the second one.
fn join_blocks(
    tx: &mut Transaction<'_>,
    caret: Point,
    backward: bool,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let Some(block) = tx.block_of(caret.key) else {
        return Ok(true);
    };
    let (first, second) = if backward {
        match tx.previous_sibling(block) {
            Some(prev) => (prev, block),
            None => return Ok(true),
        }
    } else {
        match tx.next_sibling(block) {
            Some(next) => (block, next),
            None => return Ok(true),
        }
    };
    if tx.block(first).is_err() || tx.block(second).is_err() {
        return Ok(true);
    }

    if let Some(split) = ops::find_marker(tx, second, SuggestionType::Split) {
        let end = match ops::text_descendants(tx, first).last() {
            Some(last) => Point::new(*last, tx.char_len(*last)?),
            None => Point::new(first, tx.children(first).len()),
        };
        tx.remove(split)?;
        ops::merge_with_previous(tx, second)?;
        ops::set_caret(tx, end);
        tx.add_tag(tags::RESOLVE_SUGGESTIONS);
        return Ok(true);
    }
    if ops::find_marker(tx, second, SuggestionType::Join).is_some() {
        return Ok(true);
    }
    let id = fresh_id(on_created);
    ops::insert_marker(tx, second, SuggestionProps::new(id, SuggestionType::Join))?;
    Ok(true)
}

pub fn insert_paragraph(
    tx: &mut Transaction<'_>,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    if !has_range(tx) {
        return Ok(true);
    }
    if !is_collapsed(tx) {
        let id = fresh_id(on_created);
        delete_range(tx, &id)?;
    }
    let Some(caret) = ops::caret(tx) else {
        return Ok(true);
    };
    if tx.block_of(caret.key).is_none() {
        return Ok(true);
    }
    let new_block = ops::split_block_at(tx, caret)?;
    let id = fresh_id(on_created);
    ops::insert_marker(tx, new_block, SuggestionProps::new(id, SuggestionType::Split))?;
    let start = ops::block_start(tx, new_block);
    ops::set_caret(tx, start);
    Ok(true)
}

/// Node selections: dividers, images and tables.
fn delete_nodes(
    tx: &mut Transaction<'_>,
    keys: &[NodeKey],
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let mut id = None;
    for key in keys {
        let kind = match tx.get(*key) {
            Some(node) => node.kind.clone(),
            None => continue,
        };
        match kind {
            NodeKind::Divider => {
                if ops::find_marker(tx, *key, SuggestionType::InsertDivider).is_some() {
                    tx.remove(*key)?;
                    tx.add_tag(tags::RESOLVE_SUGGESTIONS);
                } else if ops::find_marker(tx, *key, SuggestionType::DeleteDivider).is_none() {
                    let props =
                        SuggestionProps::new(lazy_id(&mut id, on_created), SuggestionType::DeleteDivider);
                    ops::insert_marker(tx, *key, props)?;
                }
            }
            NodeKind::Image(_) => match ops::enclosing_suggestion_type(tx, *key) {
                Some(SuggestionType::InsertImage) => {
                    tx.remove(*key)?;
                    tx.add_tag(tags::RESOLVE_SUGGESTIONS);
                }
                Some(SuggestionType::DeleteImage) => {}
                _ => {
                    let kind = suggestion(
                        lazy_id(&mut id, on_created),
                        SuggestionType::DeleteImage,
                        SuggestionChange::None,
                    );
                    tx.wrap(&[*key], kind)?;
                }
            },
            NodeKind::Table => {
                delete_table(tx, *key, on_created)?;
            }
            _ => {}
        }
    }
    Ok(true)
}

// ───────────────────────────────────────────────────────────────────
// Insertion of content
// ───────────────────────────────────────────────────────────────────

/// Tags a freshly built block as inserted.
fn mark_inserted_block(
    tx: &mut Transaction<'_>,
    block: NodeKey,
    id: &SuggestionId,
) -> Result<(), EditorError> {
    let kind = tx.node(block)?.kind.clone();
    match kind {
        NodeKind::Paragraph(_) => {
            let children = tx.children(block).to_vec();
            if !children.is_empty() {
                let kind = suggestion(id.clone(), SuggestionType::Insert, SuggestionChange::None);
                tx.wrap(&children, kind)?;
            }
            ops::insert_marker(
                tx,
                block,
                SuggestionProps::new(id.clone(), SuggestionType::Split),
            )?;
        }
        NodeKind::Table => {
            if let Some(cell) = ops::first_cell(tx, block) {
                ops::insert_marker(
                    tx,
                    cell,
                    SuggestionProps::new(id.clone(), SuggestionType::InsertTable),
                )?;
            }
        }
        NodeKind::Divider => {
            ops::insert_marker(
                tx,
                block,
                SuggestionProps::new(id.clone(), SuggestionType::InsertDivider),
            )?;
        }
        _ => {}
    }
    Ok(())
}

pub fn insert_clipboard_nodes(
    tx: &mut Transaction<'_>,
    specs: &[NodeSpec],
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    if !has_range(tx) || specs.is_empty() {
        return Ok(true);
    }
    let mut id = None;
    if !is_collapsed(tx) {
        let delete_id = lazy_id(&mut id, on_created);
        delete_range(tx, &delete_id)?;
    }
    escape_deletion(tx);
    let inside_insert = ops::caret(tx)
        .is_some_and(|p| ops::is_inside(tx, p.key, SuggestionType::Insert));

    let (blocks, inline): (Vec<&NodeSpec>, Vec<&NodeSpec>) =
        specs.iter().partition(|s| s.kind.is_block());

    let mut placed: Vec<NodeKey> = Vec::new();
    let mut open_insert: Option<NodeKey> = None;
    for spec in inline {
        let node = tx.build(spec);
        let is_image = matches!(spec.kind, NodeKind::Image(_));
        if is_image {
            open_insert = None;
            let wrapper = tx.create(suggestion(
                lazy_id(&mut id, on_created),
                SuggestionType::InsertImage,
                SuggestionChange::None,
            ));
            tx.append_child(wrapper, node)?;
            placed.push(wrapper);
        } else if inside_insert {
            placed.push(node);
        } else {
            match open_insert {
                Some(wrapper) => tx.append_child(wrapper, node)?,
                None => {
                    let wrapper = tx.create(suggestion(
                        lazy_id(&mut id, on_created),
                        SuggestionType::Insert,
                        SuggestionChange::None,
                    ));
                    tx.append_child(wrapper, node)?;
                    placed.push(wrapper);
                    open_insert = Some(wrapper);
                }
            }
        }
    }
    if !placed.is_empty() {
        ops::insert_at_caret(tx, &placed)?;
    }

    let mut previous: Option<NodeKey> = None;
    for spec in blocks {
        let block = tx.build(spec);
        mark_inserted_block(tx, block, &lazy_id(&mut id, on_created))?;
        match previous {
            Some(prev) => tx.insert_after(prev, block)?,
            None => ops::insert_block_after_selection(tx, block)?,
        }
        previous = Some(block);
    }
    if let Some(last) = previous {
        let end = match ops::text_descendants(tx, last).last() {
            Some(text) => Point::new(*text, tx.char_len(*text)?),
            None => ops::point_after(tx, last),
        };
        ops::set_caret(tx, end);
    }
    Ok(true)
}

pub fn insert_image(
    tx: &mut Transaction<'_>,
    image: &ImageProps,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let spec = NodeSpec::image(image.src.clone(), image.width, image.height);
    insert_clipboard_nodes(tx, &[spec], on_created)
}

pub fn insert_divider(
    tx: &mut Transaction<'_>,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let divider = tx.create(NodeKind::Divider);
    let id = fresh_id(on_created);
    ops::insert_marker(tx, divider, SuggestionProps::new(id, SuggestionType::InsertDivider))?;
    ops::insert_block_after_selection(tx, divider)?;
    Ok(true)
}

// ───────────────────────────────────────────────────────────────────
// Links and images
// ───────────────────────────────────────────────────────────────────

fn new_linked_text(
    tx: &mut Transaction<'_>,
    url: &str,
    text: &str,
) -> Result<(NodeKey, NodeKey), EditorError> {
    let link = tx.create(NodeKind::Link { url: url.to_string() });
    let text_node = tx.create(NodeKind::text(text));
    tx.append_child(link, text_node)?;
    Ok((link, text_node))
}

pub fn link_change(
    tx: &mut Transaction<'_>,
    url: Option<&str>,
    text: Option<&str>,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let anchor = match tx.selection() {
        Some(Selection::Range { anchor, .. }) => anchor.key,
        _ => return Ok(true),
    };
    let link = tx.nearest_ancestor(anchor, |n| matches!(n.kind, NodeKind::Link { .. }));

    match link {
        Some(link) => {
            let old_url = match &tx.node(link)?.kind {
                NodeKind::Link { url } => url.clone(),
                _ => return Ok(true),
            };
            let children = tx.children(link).to_vec();
            if let Some(new_text) = text {
                if !children.is_empty() {
                    let delete_id = fresh_id(on_created);
                    tx.wrap(
                        &children,
                        suggestion(delete_id, SuggestionType::Delete, SuggestionChange::None),
                    )?;
                }
                let insert_id = fresh_id(on_created);
                let new_url = url.unwrap_or(old_url.as_str()).to_string();
                let (new_link, text_node) = new_linked_text(tx, &new_url, new_text)?;
                let wrapper =
                    tx.create(suggestion(insert_id, SuggestionType::Insert, SuggestionChange::None));
                tx.append_child(wrapper, new_link)?;
                tx.insert_after(link, wrapper)?;
                ops::set_caret(tx, Point::new(text_node, new_text.chars().count()));
                return Ok(true);
            }

            let existing = children
                .first()
                .copied()
                .filter(|_| children.len() == 1)
                .and_then(|c| tx.get(c).and_then(|n| n.as_suggestion()).map(|s| (c, s.clone())));
            match (url, existing) {
                (None, Some((_, s))) if s.suggestion_type == SuggestionType::DeleteLink => {}
                (Some(u), Some((wrapper, s))) if s.suggestion_type == SuggestionType::LinkChange => {
                    if u == old_url {
                        tx.unwrap_node(wrapper)?;
                        tx.add_tag(tags::RESOLVE_SUGGESTIONS);
                    } else if let SuggestionChange::Link { to, .. } =
                        &mut tx.suggestion_mut(wrapper)?.change
                    {
                        *to = Some(u.to_string());
                    }
                }
                (Some(u), _) if u == old_url => {}
                (target, _) => {
                    if children.is_empty() {
                        return Ok(true);
                    }
                    let ty = if target.is_some() {
                        SuggestionType::LinkChange
                    } else {
                        SuggestionType::DeleteLink
                    };
                    let id = fresh_id(on_created);
                    let change = SuggestionChange::Link {
                        from: Some(old_url),
                        to: target.map(str::to_string),
                    };
                    tx.wrap(&children, suggestion(id, ty, change))?;
                }
            }
            Ok(true)
        }
        None => {
            let Some(url) = url else {
                return Ok(true);
            };
            if let Some(new_text) = text {
                if !is_collapsed(tx) {
                    let delete_id = fresh_id(on_created);
                    delete_range(tx, &delete_id)?;
                }
                escape_deletion(tx);
                let insert_id = fresh_id(on_created);
                let (new_link, text_node) = new_linked_text(tx, url, new_text)?;
                let wrapper =
                    tx.create(suggestion(insert_id, SuggestionType::Insert, SuggestionChange::None));
                tx.append_child(wrapper, new_link)?;
                ops::insert_at_caret(tx, &[wrapper])?;
                ops::set_caret(tx, Point::new(text_node, new_text.chars().count()));
                return Ok(true);
            }

            let runs = tx.selected_text_runs()?;
            if runs.is_empty() {
                return Ok(true);
            }
            let id = fresh_id(on_created);
            for group in tx.group_contiguous(&runs) {
                let new_link = tx.wrap(&group, NodeKind::Link { url: url.to_string() })?;
                tx.wrap(
                    &[new_link],
                    suggestion(
                        id.clone(),
                        SuggestionType::AddLink,
                        SuggestionChange::Link {
                            from: None,
                            to: Some(url.to_string()),
                        },
                    ),
                )?;
            }
            Ok(true)
        }
    }
}

fn image_props(tx: &Transaction<'_>, key: NodeKey) -> Option<ImageProps> {
    match &tx.get(key)?.kind {
        NodeKind::Image(props) => Some(props.clone()),
        _ => None,
    }
}

pub fn set_image_size(
    tx: &mut Transaction<'_>,
    key: NodeKey,
    width: u32,
    height: u32,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let Some(image) = image_props(tx, key) else {
        return Ok(true);
    };
    if ops::is_inside(tx, key, SuggestionType::InsertImage) {
        if let NodeKind::Image(props) = tx.kind_mut(key)? {
            props.width = width;
            props.height = height;
        }
        return Ok(true);
    }

    let existing = tx
        .nearest_suggestion(key)
        .filter(|(wrapper, s)| {
            s.suggestion_type == SuggestionType::ImageChange && tx.parent(key) == Some(*wrapper)
        })
        .map(|(wrapper, s)| (wrapper, s.change.clone()));
    if let Some((wrapper, change)) = existing {
        let from = match change {
            SuggestionChange::ImageSize { from, .. } => from,
            _ => (image.width, image.height),
        };
        if from == (width, height) {
            tx.unwrap_node(wrapper)?;
            tx.add_tag(tags::RESOLVE_SUGGESTIONS);
        } else if let SuggestionChange::ImageSize { to, .. } = &mut tx.suggestion_mut(wrapper)?.change {
            *to = (width, height);
        }
        return Ok(true);
    }
    if (image.width, image.height) == (width, height) {
        return Ok(true);
    }

    let id = fresh_id(on_created);
    tx.wrap(
        &[key],
        suggestion(
            id,
            SuggestionType::ImageChange,
            SuggestionChange::ImageSize {
                from: (image.width, image.height),
                to: (width, height),
            },
        ),
    )?;
    Ok(true)
}

/// Moving an image is a deletion at the old place and an insertion at the
/// new one, under one id.
pub fn drop_image(
    tx: &mut Transaction<'_>,
    image: NodeKey,
    target: Point,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    if image_props(tx, image).is_none() || !tx.contains(target.key) {
        return Ok(true);
    }

    if let Some((wrapper, props)) = tx.nearest_suggestion(image) {
        if props.suggestion_type == SuggestionType::InsertImage {
            tx.detach(wrapper)?;
            ops::set_caret(tx, target);
            ops::insert_at_caret(tx, &[wrapper])?;
            return Ok(true);
        }
    }

    let id = fresh_id(on_created);
    let copy = tx.deep_clone(image)?;
    if !ops::is_inside(tx, image, SuggestionType::DeleteImage) {
        tx.wrap(
            &[image],
            suggestion(id.clone(), SuggestionType::DeleteImage, SuggestionChange::None),
        )?;
    }
    let wrapper = tx.create(suggestion(id, SuggestionType::InsertImage, SuggestionChange::None));
    tx.append_child(wrapper, copy)?;
    ops::set_caret(tx, target);
    ops::insert_at_caret(tx, &[wrapper])?;
    Ok(true)
}

// ───────────────────────────────────────────────────────────────────
// Tables
// ───────────────────────────────────────────────────────────────────

fn has_marker(tx: &Transaction<'_>, cell: NodeKey, types: &[SuggestionType]) -> bool {
    types
        .iter()
        .any(|ty| ops::find_marker(tx, cell, *ty).is_some())
}

pub fn insert_table(
    tx: &mut Transaction<'_>,
    rows: usize,
    columns: usize,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let table = ops::new_table(tx, rows, columns)?;
    let id = fresh_id(on_created);
    if let Some(cell) = ops::first_cell(tx, table) {
        ops::insert_marker(tx, cell, SuggestionProps::new(id, SuggestionType::InsertTable))?;
        let paragraph = tx
            .children(cell)
            .iter()
            .copied()
            .find(|k| tx.block(*k).is_ok());
        ops::insert_block_after_selection(tx, table)?;
        if let Some(paragraph) = paragraph {
            ops::set_caret(tx, Point::new(paragraph, 0));
        }
    } else {
        ops::insert_block_after_selection(tx, table)?;
    }
    Ok(true)
}

pub fn delete_table(
    tx: &mut Transaction<'_>,
    table: NodeKey,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let Some(cell) = ops::first_cell(tx, table) else {
        return Ok(true);
    };
    if has_marker(tx, cell, &[SuggestionType::InsertTable]) {
        tx.remove(table)?;
        tx.add_tag(tags::RESOLVE_SUGGESTIONS);
        return Ok(true);
    }
    if has_marker(tx, cell, &[SuggestionType::DeleteTable]) {
        return Ok(true);
    }
    let id = fresh_id(on_created);
    ops::insert_marker(tx, cell, SuggestionProps::new(id, SuggestionType::DeleteTable))?;
    Ok(true)
}

fn new_marked_cell(
    tx: &mut Transaction<'_>,
    id: &SuggestionId,
    ty: SuggestionType,
) -> Result<NodeKey, EditorError> {
    let cell = ops::new_cell(tx)?;
    ops::insert_marker(tx, cell, SuggestionProps::new(id.clone(), ty))?;
    Ok(cell)
}

pub fn insert_table_row(
    tx: &mut Transaction<'_>,
    insert_after: bool,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let Some(row) = ops::selected_cell(tx).and_then(|c| ops::row_of(tx, c)) else {
        return Ok(true);
    };
    let width = tx.children(row).len().max(1);
    let id = fresh_id(on_created);
    let new_row = tx.create(NodeKind::TableRow);
    for _ in 0..width {
        let cell = new_marked_cell(tx, &id, SuggestionType::InsertTableRow)?;
        tx.append_child(new_row, cell)?;
    }
    if insert_after {
        tx.insert_after(row, new_row)?;
    } else {
        tx.insert_before(row, new_row)?;
    }
    Ok(true)
}

pub fn duplicate_table_row(
    tx: &mut Transaction<'_>,
    row: NodeKey,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    if ops::row_of(tx, row) != Some(row) {
        return Ok(true);
    }
    let id = fresh_id(on_created);
    let copy = tx.deep_clone(row)?;
    for cell in tx.children(copy).to_vec() {
        ops::insert_marker(
            tx,
            cell,
            SuggestionProps::new(id.clone(), SuggestionType::DuplicateTableRow),
        )?;
    }
    tx.insert_after(row, copy)?;
    Ok(true)
}

/// Marks every cell of the row. The row and its cells stay in place.
pub fn delete_table_row(
    tx: &mut Transaction<'_>,
    row: NodeKey,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    if ops::row_of(tx, row) != Some(row) {
        return Ok(true);
    }
    let cells = tx.children(row).to_vec();
    let own = cells.iter().any(|c| {
        has_marker(
            tx,
            *c,
            &[SuggestionType::InsertTableRow, SuggestionType::DuplicateTableRow],
        )
    });
    if own {
        tx.remove(row)?;
        tx.add_tag(tags::RESOLVE_SUGGESTIONS);
        return Ok(true);
    }
    if cells
        .iter()
        .any(|c| has_marker(tx, *c, &[SuggestionType::DeleteTableRow]))
    {
        return Ok(true);
    }
    let id = fresh_id(on_created);
    for cell in cells {
        ops::insert_marker(
            tx,
            cell,
            SuggestionProps::new(id.clone(), SuggestionType::DeleteTableRow),
        )?;
    }
    Ok(true)
}

pub fn insert_table_column(
    tx: &mut Transaction<'_>,
    insert_after: bool,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let Some(cell) = ops::selected_cell(tx) else {
        return Ok(true);
    };
    let (Some(table), Some(column)) = (ops::table_of(tx, cell), tx.index_in_parent(cell)) else {
        return Ok(true);
    };
    let at = if insert_after { column + 1 } else { column };
    let id = fresh_id(on_created);
    for row in tx.children(table).to_vec() {
        let new_cell = new_marked_cell(tx, &id, SuggestionType::InsertTableColumn)?;
        tx.insert_child(row, at, new_cell)?;
    }
    Ok(true)
}

pub fn duplicate_table_column(
    tx: &mut Transaction<'_>,
    cell: NodeKey,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let (Some(table), Some(column)) = (ops::table_of(tx, cell), tx.index_in_parent(cell)) else {
        return Ok(true);
    };
    let id = fresh_id(on_created);
    for original in ops::column_cells(tx, table, column) {
        let copy = tx.deep_clone(original)?;
        ops::insert_marker(
            tx,
            copy,
            SuggestionProps::new(id.clone(), SuggestionType::DuplicateTableColumn),
        )?;
        tx.insert_after(original, copy)?;
    }
    Ok(true)
}

pub fn delete_table_column(
    tx: &mut Transaction<'_>,
    cell: NodeKey,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let (Some(table), Some(column)) = (ops::table_of(tx, cell), tx.index_in_parent(cell)) else {
        return Ok(true);
    };
    let mut id = None;
    for target in ops::column_cells(tx, table, column) {
        if has_marker(
            tx,
            target,
            &[SuggestionType::InsertTableColumn, SuggestionType::DuplicateTableColumn],
        ) {
            tx.remove(target)?;
            tx.add_tag(tags::RESOLVE_SUGGESTIONS);
        } else if !has_marker(tx, target, &[SuggestionType::DeleteTableColumn]) {
            let props = SuggestionProps::new(
                lazy_id(&mut id, on_created),
                SuggestionType::DeleteTableColumn,
            );
            ops::insert_marker(tx, target, props)?;
        }
    }
    Ok(true)
}

// ───────────────────────────────────────────────────────────────────
// Maintenance
// ───────────────────────────────────────────────────────────────────

/// Node transform: removes a suggestion node that has lost all its
/// children unless its type is a marker type.
pub fn prune_empty(tx: &mut Transaction<'_>, key: NodeKey) -> Result<(), EditorError> {
    let node = tx.node(key)?;
    let Some(props) = node.as_suggestion() else {
        return Ok(());
    };
    if props.suggestion_type.can_be_empty() || !node.children.is_empty() {
        return Ok(());
    }
    log::info!(
        "Removing empty suggestion node {} {}",
        props.id,
        props.suggestion_type
    );
    tx.remove(key)
}

/// List shortcut typed at the start of one's own insertion (`- `, `1. `,
/// `[ ] `). The typed prefix is dropped and the paragraph gets a suggested
/// list block type. Returns `false` when the caret is not on such a prefix.
pub fn list_shortcut(
    tx: &mut Transaction<'_>,
    on_created: &mut OnCreated<'_>,
) -> Result<bool, EditorError> {
    let Some(caret) = ops::caret(tx) else {
        return Ok(false);
    };
    let Ok(text) = tx.text(caret.key) else {
        return Ok(false);
    };
    if text.format.contains(TextFormat::CODE) || caret.offset == 0 {
        return Ok(false);
    }
    let prefix: String = text.text.chars().take(caret.offset).collect();
    let Some(list_type) = list_prefix(&prefix) else {
        return Ok(false);
    };
    if !ops::is_inside(tx, caret.key, SuggestionType::Insert) {
        return Ok(false);
    }
    let Some(block) = tx.block_of(caret.key) else {
        return Ok(false);
    };
    let top_level = tx.parent(block) == Some(NodeKey::ROOT);
    let first_text = ops::text_descendants(tx, block).first() == Some(&caret.key);
    if !top_level || !first_text {
        return Ok(false);
    }

    tx.delete_text_range(caret.key, 0, caret.offset)?;
    let start = if tx.char_len(caret.key)? == 0 {
        let point = ops::point_before(tx, caret.key);
        tx.remove(caret.key)?;
        point
    } else {
        Point::new(caret.key, 0)
    };
    ops::set_caret(tx, start);
    set_block_type(
        tx,
        BlockType::List {
            list_type,
            marker: None,
        },
        on_created,
    )?;
    tx.add_tag(tags::MARKDOWN_TRANSFORM);
    Ok(true)
}

fn list_prefix(prefix: &str) -> Option<ListType> {
    let body = prefix.strip_suffix(' ')?;
    match body {
        "-" | "*" | "+" => Some(ListType::Bullet),
        "[]" | "[ ]" | "[x]" => Some(ListType::Check),
        _ => {
            let digits = body.strip_suffix('.')?;
            (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
                .then_some(ListType::Number)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{Editor, Tags};

    struct Fixture {
        editor: Editor,
        created: Vec<SuggestionId>,
        _prune: crate::subscription::Subscription,
    }

    impl Fixture {
        fn new(paragraphs: &[&str]) -> (Self, Vec<NodeKey>) {
            let mut editor = Editor::new();
            let prune =
                editor.register_node_transform(crate::editor::NodeClass::Suggestion, prune_empty);
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
            (
                Self {
                    editor,
                    created: Vec::new(),
                    _prune: prune,
                },
                texts,
            )
        }

        fn select(&mut self, anchor: Point, focus: Point) {
            self.editor
                .update(Tags::new(), |tx| {
                    tx.set_selection(Some(Selection::range(anchor, focus)));
                    Ok(())
                })
                .unwrap();
        }

        fn run(
            &mut self,
            f: impl FnOnce(&mut Transaction<'_>, &mut OnCreated<'_>) -> Result<bool, EditorError>,
        ) -> crate::editor::UpdateReport {
            let created = &mut self.created;
            let (handled, report) = self
                .editor
                .update(Tags::new(), |tx| {
                    let mut record = |id: &SuggestionId| created.push(id.clone());
                    f(tx, &mut record)
                })
                .unwrap();
            assert!(handled);
            report
        }

        fn suggestions(&self, ty: SuggestionType) -> Vec<NodeKey> {
            let state = self.editor.state();
            state
                .suggestion_nodes()
                .into_iter()
                .filter(|k| state.node(*k).unwrap().suggestion_type().unwrap() == ty)
                .collect()
        }
    }

    #[test]
    fn test_bold_wraps_without_touching_format() {
        let (mut fx, texts) = Fixture::new(&["hello world"]);
        fx.select(Point::new(texts[0], 0), Point::new(texts[0], 5));
        fx.run(|tx, cb| format_text(tx, FormatType::Bold, cb));

        let wrappers = fx.suggestions(SuggestionType::PropertyChange);
        assert_eq!(wrappers.len(), 1);
        assert_eq!(fx.created.len(), 1);
        let state = fx.editor.state();
        assert_eq!(state.text_content(wrappers[0]), "hello");
        for node in state.nodes() {
            if let Some(text) = node.as_text() {
                assert!(text.format.is_empty());
            }
        }
    }

    #[test]
    fn test_typing_extends_own_insertion() {
        let (mut fx, texts) = Fixture::new(&["ab"]);
        fx.select(Point::new(texts[0], 1), Point::new(texts[0], 1));
        fx.run(|tx, cb| insert_text(tx, "x", cb));
        fx.run(|tx, cb| insert_text(tx, "y", cb));

        assert_eq!(fx.created.len(), 1);
        let inserts = fx.suggestions(SuggestionType::Insert);
        assert_eq!(inserts.len(), 1);
        let state = fx.editor.state();
        assert_eq!(state.text_content(inserts[0]), "xy");
        assert_eq!(state.text_content(NodeKey::ROOT), "axyb");
    }

    #[test]
    fn test_pasting_text_into_own_insertion_creates_no_id() {
        let (mut fx, texts) = Fixture::new(&["ab"]);
        fx.select(Point::new(texts[0], 1), Point::new(texts[0], 1));
        fx.run(|tx, cb| insert_text(tx, "x", cb));
        assert_eq!(fx.created.len(), 1);

        fx.run(|tx, cb| insert_clipboard_nodes(tx, &[NodeSpec::text("pasted")], cb));
        assert_eq!(fx.created.len(), 1);
        assert_eq!(fx.suggestions(SuggestionType::Insert).len(), 1);
        assert!(fx
            .editor
            .state()
            .text_content(NodeKey::ROOT)
            .contains("pasted"));

        fx.run(|tx, cb| insert_clipboard_nodes(tx, &[NodeSpec::image("cat.png", 4, 4)], cb));
        assert_eq!(fx.created.len(), 2);
    }

    #[test]
    fn test_typing_over_selection_is_a_replace() {
        let (mut fx, texts) = Fixture::new(&["old text"]);
        fx.select(Point::new(texts[0], 0), Point::new(texts[0], 3));
        fx.run(|tx, cb| insert_text(tx, "new", cb));

        assert_eq!(fx.created.len(), 1);
        let state = fx.editor.state();
        let deletes = fx.suggestions(SuggestionType::Delete);
        let inserts = fx.suggestions(SuggestionType::Insert);
        assert_eq!(deletes.len(), 1);
        assert_eq!(inserts.len(), 1);
        assert_eq!(
            state.node(deletes[0]).unwrap().suggestion_id().unwrap(),
            state.node(inserts[0]).unwrap().suggestion_id().unwrap()
        );
        assert_eq!(state.next_sibling(deletes[0]), Some(inserts[0]));
    }

    #[test]
    fn test_backspace_extends_deletion() {
        let (mut fx, texts) = Fixture::new(&["abc"]);
        fx.select(Point::new(texts[0], 3), Point::new(texts[0], 3));
        fx.run(|tx, cb| delete(tx, true, cb));
        fx.run(|tx, cb| delete(tx, true, cb));

        let deletes = fx.suggestions(SuggestionType::Delete);
        assert_eq!(deletes.len(), 1);
        assert_eq!(fx.created.len(), 1);
        let state = fx.editor.state();
        assert_eq!(state.text_content(deletes[0]), "bc");
        assert_eq!(state.text_content(NodeKey::ROOT), "abc");
    }

    #[test]
    fn test_backspace_inside_own_insertion_removes_text() {
        let (mut fx, texts) = Fixture::new(&["ab"]);
        fx.select(Point::new(texts[0], 2), Point::new(texts[0], 2));
        fx.run(|tx, cb| insert_text(tx, "z", cb));
        let report = fx.run(|tx, cb| delete(tx, true, cb));

        assert!(report.has_tag(tags::RESOLVE_SUGGESTIONS));
        assert!(fx.suggestions(SuggestionType::Insert).is_empty());
        assert_eq!(fx.editor.state().text_content(NodeKey::ROOT), "ab");
    }

    #[test]
    fn test_enter_then_backspace_retracts_split() {
        let (mut fx, texts) = Fixture::new(&["abcd"]);
        fx.select(Point::new(texts[0], 2), Point::new(texts[0], 2));
        fx.run(|tx, cb| insert_paragraph(tx, cb));
        assert_eq!(fx.suggestions(SuggestionType::Split).len(), 1);
        assert_eq!(fx.editor.state().children(NodeKey::ROOT).len(), 2);

        fx.run(|tx, cb| delete(tx, true, cb));
        assert!(fx.suggestions(SuggestionType::Split).is_empty());
        assert_eq!(fx.editor.state().children(NodeKey::ROOT).len(), 1);
        assert_eq!(fx.editor.state().text_content(NodeKey::ROOT), "abcd");
    }

    #[test]
    fn test_backspace_at_block_start_adds_join_marker() {
        let (mut fx, texts) = Fixture::new(&["one", "two"]);
        fx.select(Point::new(texts[1], 0), Point::new(texts[1], 0));
        fx.run(|tx, cb| delete(tx, true, cb));
        let joins = fx.suggestions(SuggestionType::Join);
        assert_eq!(joins.len(), 1);
        let block = fx.editor.state().parent(texts[1]).unwrap();
        assert_eq!(fx.editor.state().parent(joins[0]), Some(block));
    }

    #[test]
    fn test_alignment_marker_round_trip() {
        let (mut fx, texts) = Fixture::new(&["text"]);
        fx.select(Point::new(texts[0], 0), Point::new(texts[0], 0));
        fx.run(|tx, cb| set_alignment(tx, Alignment::Center, cb));
        assert_eq!(fx.suggestions(SuggestionType::AlignChange).len(), 1);

        fx.run(|tx, cb| set_alignment(tx, Alignment::Left, cb));
        assert!(fx.suggestions(SuggestionType::AlignChange).is_empty());
        assert_eq!(fx.created.len(), 1);
    }

    #[test]
    fn test_outdent_at_zero_is_ignored() {
        let (mut fx, texts) = Fixture::new(&["text"]);
        fx.select(Point::new(texts[0], 0), Point::new(texts[0], 0));
        fx.run(|tx, cb| indent(tx, -1, cb));
        assert!(fx.suggestions(SuggestionType::IndentChange).is_empty());
        assert!(fx.created.is_empty());
    }

    #[test]
    fn test_link_change_with_text_emits_two_ids() {
        let (mut fx, texts) = Fixture::new(&["see docs"]);
        fx.editor
            .update(Tags::new(), |tx| {
                let right = tx.split_text(texts[0], 4)?;
                tx.wrap(&[right], NodeKind::Link { url: "a".into() })?;
                tx.set_selection(Some(Selection::caret(Point::new(right, 1))));
                Ok(())
            })
            .unwrap();
        fx.run(|tx, cb| link_change(tx, Some("b"), Some("manual"), cb));

        assert_eq!(fx.created.len(), 2);
        assert_eq!(fx.suggestions(SuggestionType::Delete).len(), 1);
        assert_eq!(fx.suggestions(SuggestionType::Insert).len(), 1);
    }

    #[test]
    fn test_delete_table_row_keeps_cells() {
        let (mut fx, _) = Fixture::new(&[]);
        fx.run(|tx, cb| insert_table(tx, 2, 2, cb));
        let state = fx.editor.state();
        let table = state.children(NodeKey::ROOT)[0];
        let row = state.children(table)[1];
        let cells = state.children(row).to_vec();

        fx.run(|tx, cb| delete_table_row(tx, row, cb));
        let state = fx.editor.state();
        assert!(state.contains(row));
        for cell in &cells {
            assert!(state.contains(*cell));
            assert!(ops::find_marker(state, *cell, SuggestionType::DeleteTableRow).is_some());
        }
    }

    #[test]
    fn test_empty_insert_is_pruned() {
        let (mut fx, texts) = Fixture::new(&["ab"]);
        let report = fx.run(|tx, _| {
            let wrapper = tx.wrap(
                &[texts[0]],
                suggestion(SuggestionId::from("s-1"), SuggestionType::Insert, SuggestionChange::None),
            )?;
            tx.remove(texts[0])?;
            Ok(tx.contains(wrapper))
        });
        assert!(fx.editor.state().suggestion_nodes().is_empty());
        assert!(report.suggestion_mutations.is_empty());
    }

    #[test]
    fn test_list_prefixes() {
        assert_eq!(list_prefix("- "), Some(ListType::Bullet));
        assert_eq!(list_prefix("12. "), Some(ListType::Number));
        assert_eq!(list_prefix("[x] "), Some(ListType::Check));
        assert_eq!(list_prefix("-"), None);
        assert_eq!(list_prefix(". "), None);
    }
}
