//! One user's editing session: the editor, the mode router and the
//! suggestion reconciler, driven by [`EditingSession::dispatch`].
//!
//! Dispatch asks the registry who handles a command and runs the owners in
//! order until one reports the command handled. The session itself holds the
//! always-on registrations (mode toggle, accept/reject, history, plain
//! rich-text); the router adds the suggest-mode interceptors on top.

use std::time::Instant;

use crate::command::{
    CommandKind, CommandPriority, CommandRegistry, EditorCommand, FileRef, HandlerOwner,
    InputEvent, KeyEvent, PastePayload,
};
use crate::config::SessionConfig;
use crate::editor::{Editor, NodeClass, Tags, Transaction, UpdateReport};
use crate::error::EditorError;
use crate::node::{ImageProps, Selection};
use crate::plain;
use crate::router::{resolve_key, CommandRouter, EditorMode, KeyAction, ModeChange};
use crate::subscription::SubscriptionSet;
use crate::suggestion::overlay::{self, OnCreated};
use crate::suggestion::reconciler::{MarkMap, ReconcileBatch, SuggestionReconciler, ThreadCreation};
use crate::suggestion::summary::{self, generate_summary};
use crate::suggestion::{resolve, SuggestionId};

/// Blocking messages for the host UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// IME composition is not supported while suggesting.
    LanguageNotSupported,
}

impl Notice {
    pub fn title(&self) -> &'static str {
        match self {
            Notice::LanguageNotSupported => "Language not supported",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Notice::LanguageNotSupported => {
                "The language you're using isn't currently supported in suggestion mode. \
                 Please switch to edit mode or change the language."
            }
        }
    }
}

/// An undo or redo left for the owner of the shared history to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryRequest {
    Undo,
    Redo,
}

/// Everything one dispatch produced.
#[derive(Debug, Default)]
pub struct SessionOutput {
    pub handled: bool,
    /// Committed updates, in commit order.
    pub reports: Vec<UpdateReport>,
    pub thread_creations: Vec<ThreadCreation>,
    /// Undo/redo requests, only filled once history is delegated.
    pub history: Vec<HistoryRequest>,
}

impl SessionOutput {
    pub fn merge(&mut self, other: SessionOutput) {
        self.handled |= other.handled;
        self.reports.extend(other.reports);
        self.thread_creations.extend(other.thread_creations);
        self.history.extend(other.history);
    }
}

pub struct EditingSession {
    editor: Editor,
    router: CommandRouter,
    reconciler: SuggestionReconciler,
    config: SessionConfig,
    registrations: SubscriptionSet,
    notices: Vec<Notice>,
    mode_changes: Vec<ModeChange>,
    history_delegated: bool,
}

impl EditingSession {
    pub fn new(config: SessionConfig) -> Self {
        let mut editor = Editor::with_limits(config.history_limit, config.max_transform_passes);
        let registry = editor.registry().clone();

        let mut registrations = SubscriptionSet::new();
        let mut register = |kinds: &[CommandKind], priority: CommandPriority, owner: HandlerOwner| {
            for kind in kinds {
                registrations.push(CommandRegistry::register(&registry, *kind, priority, owner));
            }
        };
        register(
            CommandKind::RICH_TEXT_DEFAULTS,
            CommandPriority::Editor,
            HandlerOwner::RichText,
        );
        register(
            &[CommandKind::Undo, CommandKind::Redo],
            CommandPriority::Editor,
            HandlerOwner::History,
        );
        register(
            CommandKind::PLUGIN_COMMANDS,
            CommandPriority::Critical,
            HandlerOwner::SuggestionPlugin,
        );
        registrations.push(editor.register_node_transform(NodeClass::Suggestion, overlay::prune_empty));

        Self {
            router: CommandRouter::new(config.platform),
            reconciler: SuggestionReconciler::new(config.debounce()),
            editor,
            config,
            registrations,
            notices: Vec::new(),
            mode_changes: Vec::new(),
            history_delegated: false,
        }
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn mode(&self) -> EditorMode {
        self.router.mode()
    }

    pub fn mark_map(&self) -> &MarkMap {
        self.reconciler.mark_map()
    }

    /// Switches mode. Preview makes the editor read-only.
    pub fn set_mode(&mut self, to: EditorMode) -> Option<ModeChange> {
        let change = self.router.set_mode(to, self.editor.registry())?;
        self.editor.set_editable(to != EditorMode::Preview);
        self.mode_changes.push(change);
        Some(change)
    }

    pub fn take_mode_changes(&mut self) -> Vec<ModeChange> {
        std::mem::take(&mut self.mode_changes)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn select(&mut self, selection: Option<Selection>) -> Result<UpdateReport, EditorError> {
        let (_, report) = self.editor.update(Tags::new(), |tx| {
            tx.set_selection(selection);
            Ok(())
        })?;
        Ok(report)
    }

    /// Runs an arbitrary update, e.g. one applying shared-document records,
    /// and feeds it to the reconciler.
    pub fn apply_update<R, F>(&mut self, tags: Tags, f: F) -> Result<(R, SessionOutput), EditorError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<R, EditorError>,
    {
        let (value, report) = self.editor.update(tags, f)?;
        let mut out = SessionOutput {
            handled: true,
            ..SessionOutput::default()
        };
        self.absorb(report, &mut out)?;
        Ok((value, out))
    }

    /// Hands undo/redo to the caller: history commands come back as
    /// [`SessionOutput::history`] and the editor keeps no stack of its own.
    /// A shared document uses this so undo only reverts this user's edits.
    pub fn delegate_history(&mut self) {
        self.history_delegated = true;
        self.editor.set_history_enabled(false);
    }

    pub fn is_history_delegated(&self) -> bool {
        self.history_delegated
    }

    /// Rebuilds the mark map from the current document.
    pub fn reseed_marks(&mut self) {
        self.reconciler.seed(self.editor.state());
    }

    pub fn thread_created(&mut self, id: &SuggestionId) {
        let primary = self.reconciler.mark_map().get(id).and_then(|keys| {
            generate_summary(self.editor.state(), keys.iter().copied())
                .first()
                .map(|item| item.summary_type)
        });
        summary::record_created(primary);
        self.reconciler.thread_created(id);
    }

    pub fn thread_creation_failed(&mut self, id: &SuggestionId) {
        log::warn!("thread creation failed for suggestion {id}, will retry on next change");
        self.reconciler.thread_creation_failed(id);
    }

    pub fn next_reconcile_deadline(&self) -> Option<Instant> {
        self.reconciler.next_deadline()
    }

    /// The pending undo/redo batch, once its quiet period has passed.
    pub fn poll_reconcile(&mut self, now: Instant) -> Option<ReconcileBatch> {
        self.reconciler.take_due(now)
    }

    pub fn dispatch(&mut self, command: EditorCommand) -> Result<SessionOutput, EditorError> {
        let owners = self.editor.registry().borrow().handlers_for(command.kind());
        let mut out = SessionOutput::default();
        for owner in owners {
            let handled = match owner {
                HandlerOwner::SuggestionOverlay => self.run_overlay(&command, &mut out)?,
                HandlerOwner::SuggestionPlugin => self.run_plugin(&command, &mut out)?,
                HandlerOwner::History => self.run_history(&command, &mut out)?,
                HandlerOwner::RichText => self.run_rich_text(&command, &mut out)?,
            };
            if handled {
                out.handled = true;
                break;
            }
        }
        Ok(out)
    }

    fn redispatch(&mut self, command: EditorCommand, out: &mut SessionOutput) -> Result<bool, EditorError> {
        let inner = self.dispatch(command)?;
        let handled = inner.handled;
        out.merge(inner);
        Ok(handled)
    }

    fn absorb(&mut self, report: UpdateReport, out: &mut SessionOutput) -> Result<(), EditorError> {
        let creations = self.reconciler.process(&report, Instant::now())?;
        out.thread_creations.extend(creations);
        out.reports.push(report);
        Ok(())
    }

    fn suggest<F>(&mut self, out: &mut SessionOutput, f: F) -> Result<bool, EditorError>
    where
        F: FnOnce(&mut Transaction<'_>, &mut OnCreated<'_>) -> Result<bool, EditorError>,
    {
        let mut created = Vec::new();
        let (handled, report) = self.editor.update(Tags::new(), |tx| {
            let mut record = |id: &SuggestionId| created.push(id.clone());
            f(tx, &mut record)
        })?;
        for id in created {
            self.reconciler.mark_created(id);
        }
        self.absorb(report, out)?;
        Ok(handled)
    }

    fn plain<F>(&mut self, out: &mut SessionOutput, f: F) -> Result<bool, EditorError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<bool, EditorError>,
    {
        let (handled, report) = self.editor.update(Tags::new(), f)?;
        self.absorb(report, out)?;
        Ok(handled)
    }

    fn disable_for_composition(&mut self) {
        log::info!("Editor is composing, disabling suggestion mode");
        self.editor.set_composing(false);
        self.set_mode(EditorMode::Preview);
        self.notices.push(Notice::LanguageNotSupported);
    }

    fn handle_key(&mut self, event: &KeyEvent, out: &mut SessionOutput) -> Result<bool, EditorError> {
        let Some(action) = resolve_key(event, self.router.platform()) else {
            return Ok(false);
        };
        match action {
            KeyAction::ToggleSuggestionMode => {
                let to = self.router.toggle_target();
                self.set_mode(to);
                Ok(true)
            }
            KeyAction::Undo => self.redispatch(EditorCommand::Undo, out),
            KeyAction::Redo => self.redispatch(EditorCommand::Redo, out),
            KeyAction::Indent => self.redispatch(EditorCommand::Indent, out),
            KeyAction::Outdent => self.redispatch(EditorCommand::Outdent, out),
            KeyAction::Format(format) => self.redispatch(EditorCommand::FormatText(format), out),
        }
    }

    /// Files become image insertions or plain text, routed so suggest mode
    /// sees them.
    fn insert_file(&mut self, file: &FileRef, out: &mut SessionOutput) -> Result<bool, EditorError> {
        let command = if file.is_image() {
            EditorCommand::InsertImage(ImageProps {
                src: file.name.clone(),
                ..ImageProps::default()
            })
        } else {
            EditorCommand::BeforeInput(InputEvent::InsertText(file.name.clone()))
        };
        self.redispatch(command, out)
    }

    fn paste_files(&mut self, paste: &PastePayload, out: &mut SessionOutput) -> Result<(), EditorError> {
        for file in &paste.files {
            self.redispatch(EditorCommand::InsertFile(file.clone()), out)?;
        }
        Ok(())
    }

    fn run_overlay(&mut self, command: &EditorCommand, out: &mut SessionOutput) -> Result<bool, EditorError> {
        if !self.editor.is_editable() {
            return Ok(false);
        }
        match command {
            EditorCommand::FormatText(format) => {
                self.suggest(out, |tx, cb| overlay::format_text(tx, *format, cb))
            }
            EditorCommand::SetStyleProperty { property, value } => self.suggest(out, |tx, cb| {
                overlay::patch_style(tx, property, value.as_deref(), cb)
            }),
            EditorCommand::FormatElement(align) => {
                self.suggest(out, |tx, cb| overlay::set_alignment(tx, *align, cb))
            }
            // Tabs are not tracked as suggestions; swallow them.
            EditorCommand::InsertTab => Ok(true),
            EditorCommand::Indent => self.suggest(out, |tx, cb| overlay::indent(tx, 1, cb)),
            EditorCommand::Outdent => self.suggest(out, |tx, cb| overlay::indent(tx, -1, cb)),
            EditorCommand::InsertClipboardNodes(specs) => {
                self.suggest(out, |tx, cb| overlay::insert_clipboard_nodes(tx, specs, cb))
            }
            EditorCommand::BeforeInput(_) if self.editor.is_composing() => {
                self.disable_for_composition();
                Ok(true)
            }
            EditorCommand::BeforeInput(event) => match event {
                InputEvent::InsertText(text) => self.suggest(out, |tx, cb| {
                    overlay::insert_text(tx, text, cb)?;
                    overlay::list_shortcut(tx, cb)?;
                    Ok(true)
                }),
                InputEvent::DeleteBackward => self.suggest(out, |tx, cb| overlay::delete(tx, true, cb)),
                InputEvent::DeleteForward => self.suggest(out, |tx, cb| overlay::delete(tx, false, cb)),
                InputEvent::InsertParagraph => {
                    self.suggest(out, |tx, cb| overlay::insert_paragraph(tx, cb))
                }
            },
            EditorCommand::Paste(paste) => {
                if !paste.files.is_empty() && !paste.has_text() {
                    self.paste_files(paste, out)?;
                }
                Ok(true)
            }
            EditorCommand::KeyDown(event) => self.handle_key(event, out),
            EditorCommand::LinkChange { url, text } => self.suggest(out, |tx, cb| {
                overlay::link_change(tx, url.as_deref(), text.as_deref(), cb)
            }),
            EditorCommand::InsertImage(image) => {
                self.suggest(out, |tx, cb| overlay::insert_image(tx, image, cb))
            }
            EditorCommand::SetImageSize { key, width, height } => self.suggest(out, |tx, cb| {
                overlay::set_image_size(tx, *key, *width, *height, cb)
            }),
            EditorCommand::DropImage { image, target } => {
                self.suggest(out, |tx, cb| overlay::drop_image(tx, *image, *target, cb))
            }
            EditorCommand::CompositionStart => {
                self.disable_for_composition();
                Ok(true)
            }
            EditorCommand::InsertTable { rows, columns } => {
                self.suggest(out, |tx, cb| overlay::insert_table(tx, *rows, *columns, cb))
            }
            EditorCommand::DeleteTable(table) => {
                self.suggest(out, |tx, cb| overlay::delete_table(tx, *table, cb))
            }
            EditorCommand::InsertTableRow { insert_after } => {
                self.suggest(out, |tx, cb| overlay::insert_table_row(tx, *insert_after, cb))
            }
            EditorCommand::DuplicateTableRow(row) => {
                self.suggest(out, |tx, cb| overlay::duplicate_table_row(tx, *row, cb))
            }
            EditorCommand::DeleteTableRow(row) => {
                self.suggest(out, |tx, cb| overlay::delete_table_row(tx, *row, cb))
            }
            EditorCommand::InsertTableColumn { insert_after } => {
                self.suggest(out, |tx, cb| overlay::insert_table_column(tx, *insert_after, cb))
            }
            EditorCommand::DuplicateTableColumn(cell) => {
                self.suggest(out, |tx, cb| overlay::duplicate_table_column(tx, *cell, cb))
            }
            EditorCommand::DeleteTableColumn(cell) => {
                self.suggest(out, |tx, cb| overlay::delete_table_column(tx, *cell, cb))
            }
            EditorCommand::InsertList { list_type, marker } => self.suggest(out, |tx, cb| {
                overlay::insert_list(tx, *list_type, marker.clone(), cb)
            }),
            EditorCommand::SetBlockType(block_type) => {
                self.suggest(out, |tx, cb| overlay::set_block_type(tx, block_type.clone(), cb))
            }
            EditorCommand::InsertDivider => self.suggest(out, overlay::insert_divider),
            EditorCommand::ClearFormatting => self.suggest(out, overlay::clear_formatting),
            EditorCommand::ToggleSuggestionMode
            | EditorCommand::AcceptSuggestion(_)
            | EditorCommand::RejectSuggestion(_)
            | EditorCommand::CompositionEnd
            | EditorCommand::InsertFile(_)
            | EditorCommand::Undo
            | EditorCommand::Redo => Ok(false),
        }
    }

    fn run_plugin(&mut self, command: &EditorCommand, out: &mut SessionOutput) -> Result<bool, EditorError> {
        match command {
            EditorCommand::KeyDown(event) => self.handle_key(event, out),
            EditorCommand::ToggleSuggestionMode => {
                let to = self.router.toggle_target();
                self.set_mode(to);
                Ok(true)
            }
            EditorCommand::AcceptSuggestion(id) | EditorCommand::RejectSuggestion(id) => {
                if !self.editor.is_editable() {
                    return Ok(false);
                }
                let accept = matches!(command, EditorCommand::AcceptSuggestion(_));
                self.plain(out, |tx| {
                    if accept {
                        resolve::accept(tx, id)
                    } else {
                        resolve::reject(tx, id)
                    }
                })
            }
            _ => Ok(false),
        }
    }

    fn run_history(&mut self, command: &EditorCommand, out: &mut SessionOutput) -> Result<bool, EditorError> {
        if !self.editor.is_editable() {
            return Ok(false);
        }
        let request = match command {
            EditorCommand::Undo => HistoryRequest::Undo,
            EditorCommand::Redo => HistoryRequest::Redo,
            _ => return Ok(false),
        };
        if self.history_delegated {
            out.history.push(request);
            return Ok(true);
        }
        let report = match request {
            HistoryRequest::Undo => self.editor.undo()?,
            HistoryRequest::Redo => self.editor.redo()?,
        };
        if let Some(report) = report {
            self.absorb(report, out)?;
        }
        Ok(true)
    }

    fn run_rich_text(&mut self, command: &EditorCommand, out: &mut SessionOutput) -> Result<bool, EditorError> {
        match command {
            EditorCommand::CompositionStart => {
                self.editor.set_composing(true);
                return Ok(true);
            }
            EditorCommand::CompositionEnd => {
                self.editor.set_composing(false);
                return Ok(true);
            }
            _ if !self.editor.is_editable() => return Ok(false),
            _ => {}
        }
        match command {
            EditorCommand::FormatText(format) => self.plain(out, |tx| plain::format_text(tx, *format)),
            EditorCommand::SetStyleProperty { property, value } => {
                self.plain(out, |tx| plain::set_style(tx, property, value.as_deref()))
            }
            EditorCommand::FormatElement(align) => self.plain(out, |tx| plain::set_alignment(tx, *align)),
            EditorCommand::InsertTab => self.plain(out, |tx| plain::insert_text(tx, "\t")),
            EditorCommand::Indent => self.plain(out, |tx| plain::indent(tx, 1)),
            EditorCommand::Outdent => self.plain(out, |tx| plain::indent(tx, -1)),
            EditorCommand::InsertClipboardNodes(specs) => {
                self.plain(out, |tx| plain::insert_clipboard_nodes(tx, specs))
            }
            EditorCommand::BeforeInput(event) => self.plain(out, |tx| plain::before_input(tx, event)),
            EditorCommand::Paste(paste) => {
                if !paste.files.is_empty() && !paste.has_text() {
                    self.paste_files(paste, out)?;
                    return Ok(true);
                }
                match &paste.text {
                    Some(text) => self.plain(out, |tx| plain::insert_text(tx, text)),
                    None => Ok(true),
                }
            }
            EditorCommand::KeyDown(event) => self.handle_key(event, out),
            EditorCommand::LinkChange { url, text } => {
                self.plain(out, |tx| plain::link_change(tx, url.as_deref(), text.as_deref()))
            }
            EditorCommand::InsertImage(image) => self.plain(out, |tx| plain::insert_image(tx, image)),
            EditorCommand::SetImageSize { key, width, height } => {
                self.plain(out, |tx| plain::set_image_size(tx, *key, *width, *height))
            }
            EditorCommand::DropImage { image, target } => {
                self.plain(out, |tx| plain::drop_image(tx, *image, *target))
            }
            EditorCommand::InsertTable { rows, columns } => {
                self.plain(out, |tx| plain::insert_table(tx, *rows, *columns))
            }
            EditorCommand::DeleteTable(table) => self.plain(out, |tx| plain::delete_table(tx, *table)),
            EditorCommand::InsertTableRow { insert_after } => {
                self.plain(out, |tx| plain::insert_table_row(tx, *insert_after))
            }
            EditorCommand::DuplicateTableRow(row) => {
                self.plain(out, |tx| plain::duplicate_table_row(tx, *row))
            }
            EditorCommand::DeleteTableRow(row) => self.plain(out, |tx| plain::delete_table_row(tx, *row)),
            EditorCommand::InsertTableColumn { insert_after } => {
                self.plain(out, |tx| plain::insert_table_column(tx, *insert_after))
            }
            EditorCommand::DuplicateTableColumn(cell) => {
                self.plain(out, |tx| plain::duplicate_table_column(tx, *cell))
            }
            EditorCommand::DeleteTableColumn(cell) => {
                self.plain(out, |tx| plain::delete_table_column(tx, *cell))
            }
            EditorCommand::InsertList { list_type, marker } => self.plain(out, |tx| {
                plain::set_block_type(
                    tx,
                    crate::node::BlockType::List {
                        list_type: *list_type,
                        marker: marker.clone(),
                    },
                )
            }),
            EditorCommand::SetBlockType(block_type) => {
                self.plain(out, |tx| plain::set_block_type(tx, block_type.clone()))
            }
            EditorCommand::InsertDivider => self.plain(out, plain::insert_divider),
            EditorCommand::ClearFormatting => self.plain(out, plain::clear_formatting),
            EditorCommand::InsertFile(file) => self.insert_file(file, out),
            EditorCommand::CompositionStart
            | EditorCommand::CompositionEnd
            | EditorCommand::ToggleSuggestionMode
            | EditorCommand::AcceptSuggestion(_)
            | EditorCommand::RejectSuggestion(_)
            | EditorCommand::Undo
            | EditorCommand::Redo => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FormatType, NodeKey, NodeSpec, Point};
    use crate::router::Platform;
    use crate::suggestion::SuggestionType;
    use std::time::Duration;

    fn session_with(text: &str) -> (EditingSession, NodeKey) {
        let config = SessionConfig {
            platform: Platform::Other,
            ..SessionConfig::default()
        };
        let mut session = EditingSession::new(config);
        let (key, _) = session
            .apply_update(Tags::new(), |tx| {
                let p = tx.build(&NodeSpec::paragraph(text));
                tx.append_child(NodeKey::ROOT, p)?;
                Ok(tx.children(p).first().copied().unwrap_or(p))
            })
            .unwrap();
        (session, key)
    }

    fn suggestion_types(session: &EditingSession) -> Vec<SuggestionType> {
        let state = session.editor().state();
        state
            .suggestion_nodes()
            .into_iter()
            .map(|k| state.node(k).unwrap().suggestion_type().unwrap())
            .collect()
    }

    #[test]
    fn test_bold_in_suggest_mode_requests_thread() {
        let (mut session, text) = session_with("hello world");
        session.dispatch(EditorCommand::ToggleSuggestionMode).unwrap();
        session
            .select(Some(Selection::range(Point::new(text, 0), Point::new(text, 5))))
            .unwrap();
        let out = session
            .dispatch(EditorCommand::FormatText(FormatType::Bold))
            .unwrap();

        assert!(out.handled);
        assert_eq!(suggestion_types(&session), vec![SuggestionType::PropertyChange]);
        assert_eq!(out.thread_creations.len(), 1);
        assert_eq!(
            out.thread_creations[0].content,
            r#"[{"type":"property-change","content":"hello"}]"#
        );
        assert_eq!(session.mark_map().len(), 1);
    }

    #[test]
    fn test_edit_mode_formats_directly() {
        let (mut session, text) = session_with("hello");
        session
            .select(Some(Selection::range(Point::new(text, 0), Point::new(text, 5))))
            .unwrap();
        session
            .dispatch(EditorCommand::KeyDown(KeyEvent::new("b").ctrl()))
            .unwrap();
        assert!(suggestion_types(&session).is_empty());
        assert!(session
            .editor()
            .state()
            .text(text)
            .unwrap()
            .format
            .contains(crate::node::TextFormat::BOLD));
    }

    #[test]
    fn test_mode_round_trip_restores_registry() {
        let (mut session, _) = session_with("x");
        let before = session.editor().registry().borrow().registered();
        session
            .dispatch(EditorCommand::KeyDown(KeyEvent::new("s").ctrl().alt().shift()))
            .unwrap();
        assert_eq!(session.mode(), EditorMode::Suggest);
        session.dispatch(EditorCommand::ToggleSuggestionMode).unwrap();
        assert_eq!(session.mode(), EditorMode::Edit);
        assert_eq!(session.editor().registry().borrow().registered(), before);
        assert_eq!(
            session.take_mode_changes(),
            vec![
                ModeChange {
                    from: EditorMode::Edit,
                    to: EditorMode::Suggest
                },
                ModeChange {
                    from: EditorMode::Suggest,
                    to: EditorMode::Edit
                },
            ]
        );
    }

    #[test]
    fn test_composition_falls_back_to_preview_once() {
        let (mut session, text) = session_with("x");
        session.set_mode(EditorMode::Suggest);
        session.select(Some(Selection::caret(Point::new(text, 1)))).unwrap();
        session.dispatch(EditorCommand::CompositionStart).unwrap();

        assert_eq!(session.mode(), EditorMode::Preview);
        assert!(!session.editor().is_editable());
        assert!(!session.editor().is_composing());
        let notices = session.take_notices();
        assert_eq!(notices, vec![Notice::LanguageNotSupported]);
        assert_eq!(notices[0].title(), "Language not supported");

        let out = session
            .dispatch(EditorCommand::BeforeInput(InputEvent::InsertText("a".into())))
            .unwrap();
        assert!(!out.handled);
        session.dispatch(EditorCommand::CompositionStart).unwrap();
        assert!(session.take_notices().is_empty());
        assert_eq!(session.editor().state().text_content(NodeKey::ROOT), "x");
    }

    #[test]
    fn test_file_paste_becomes_image_suggestion() {
        let (mut session, text) = session_with("ab");
        session.set_mode(EditorMode::Suggest);
        session.select(Some(Selection::caret(Point::new(text, 1)))).unwrap();
        let paste = PastePayload {
            files: vec![FileRef {
                name: "cat.png".into(),
                mime: "image/png".into(),
            }],
            text: None,
        };
        let out = session.dispatch(EditorCommand::Paste(paste)).unwrap();
        assert!(out.handled);
        assert_eq!(suggestion_types(&session), vec![SuggestionType::InsertImage]);

        let text_paste = PastePayload {
            files: Vec::new(),
            text: Some("swallowed".into()),
        };
        let out = session.dispatch(EditorCommand::Paste(text_paste)).unwrap();
        assert!(out.handled);
        assert!(out.reports.is_empty());
    }

    #[test]
    fn test_undo_rejects_thread_after_quiet_period() {
        let (mut session, text) = session_with("ab");
        session.set_mode(EditorMode::Suggest);
        session.select(Some(Selection::caret(Point::new(text, 2)))).unwrap();
        session
            .dispatch(EditorCommand::BeforeInput(InputEvent::InsertText("c".into())))
            .unwrap();
        let id = session.mark_map().keys().next().cloned().unwrap();
        session.thread_created(&id);

        session
            .dispatch(EditorCommand::KeyDown(KeyEvent::new("z").ctrl()))
            .unwrap();
        assert!(session.mark_map().is_empty());
        let deadline = session.next_reconcile_deadline().unwrap();
        let batch = session
            .poll_reconcile(deadline + Duration::from_millis(1))
            .unwrap();
        assert!(batch.reject.contains(&id));
    }

    #[test]
    fn test_delegated_history_is_handed_back() {
        let (mut session, text) = session_with("ab");
        session.delegate_history();
        session.select(Some(Selection::caret(Point::new(text, 2)))).unwrap();
        session
            .dispatch(EditorCommand::BeforeInput(InputEvent::InsertText("c".into())))
            .unwrap();
        assert!(!session.editor().can_undo());

        let out = session
            .dispatch(EditorCommand::KeyDown(KeyEvent::new("z").ctrl()))
            .unwrap();
        assert!(out.handled);
        assert_eq!(out.history, vec![HistoryRequest::Undo]);
        assert!(out.reports.is_empty());
        assert_eq!(session.editor().state().text_content(NodeKey::ROOT), "abc");
    }

    #[test]
    fn test_created_and_resolved_suggestions_are_counted() {
        use crate::suggestion::summary::counting::CountingRecorder;
        use crate::suggestion::summary::{SUGGESTIONS_CREATED, SUGGESTIONS_RESOLVED};

        let recorder = CountingRecorder::default();
        recorder.record(|| {
            let (mut session, text) = session_with("hello world");
            session.set_mode(EditorMode::Suggest);
            session.select(Some(Selection::caret(Point::new(text, 11)))).unwrap();
            session
                .dispatch(EditorCommand::BeforeInput(InputEvent::InsertText("!".into())))
                .unwrap();
            session
                .select(Some(Selection::range(Point::new(text, 0), Point::new(text, 5))))
                .unwrap();
            session
                .dispatch(EditorCommand::FormatText(FormatType::Bold))
                .unwrap();
            let ids: Vec<_> = session.mark_map().keys().cloned().collect();
            assert_eq!(ids.len(), 2);
            for id in &ids {
                session.thread_created(id);
            }

            session.set_mode(EditorMode::Edit);
            session
                .dispatch(EditorCommand::AcceptSuggestion(ids[0].clone()))
                .unwrap();
            session
                .dispatch(EditorCommand::RejectSuggestion(ids[1].clone()))
                .unwrap();
            // Unknown ids resolve nothing and count nothing.
            session
                .dispatch(EditorCommand::AcceptSuggestion(SuggestionId::from("s-missing")))
                .unwrap();
        });

        assert_eq!(recorder.get(SUGGESTIONS_CREATED, "style"), 1);
        assert_eq!(recorder.get(SUGGESTIONS_CREATED, "insertion"), 1);
        assert_eq!(recorder.get(SUGGESTIONS_RESOLVED, "accepted"), 1);
        assert_eq!(recorder.get(SUGGESTIONS_RESOLVED, "rejected"), 1);
    }

    #[test]
    fn test_tab_is_swallowed_in_suggest_mode() {
        let (mut session, text) = session_with("ab");
        session.set_mode(EditorMode::Suggest);
        session.select(Some(Selection::caret(Point::new(text, 1)))).unwrap();
        let out = session.dispatch(EditorCommand::InsertTab).unwrap();
        assert!(out.handled);
        assert!(out.reports.is_empty());
        assert!(suggestion_types(&session).is_empty());
        assert_eq!(session.editor().state().text_content(NodeKey::ROOT), "ab");

        session.set_mode(EditorMode::Edit);
        session.dispatch(EditorCommand::InsertTab).unwrap();
        assert_eq!(session.editor().state().text_content(NodeKey::ROOT), "a\tb");
    }

    #[test]
    fn test_accept_requires_editable() {
        let (mut session, text) = session_with("hello");
        session.set_mode(EditorMode::Suggest);
        session
            .select(Some(Selection::range(Point::new(text, 0), Point::new(text, 5))))
            .unwrap();
        session
            .dispatch(EditorCommand::FormatText(FormatType::Italic))
            .unwrap();
        let id = session.mark_map().keys().next().cloned().unwrap();

        session.set_mode(EditorMode::Preview);
        let out = session
            .dispatch(EditorCommand::AcceptSuggestion(id.clone()))
            .unwrap();
        assert!(!out.handled);

        session.set_mode(EditorMode::Edit);
        let out = session.dispatch(EditorCommand::AcceptSuggestion(id)).unwrap();
        assert!(out.handled);
        assert!(suggestion_types(&session).is_empty());
    }

    #[test]
    fn test_list_shortcut_in_own_insertion() {
        let (mut session, block) = session_with("");
        session.set_mode(EditorMode::Suggest);
        session.select(Some(Selection::caret(Point::new(block, 0)))).unwrap();
        for ch in ["-", " "] {
            session
                .dispatch(EditorCommand::BeforeInput(InputEvent::InsertText(ch.into())))
                .unwrap();
        }
        assert_eq!(suggestion_types(&session), vec![SuggestionType::BlockTypeChange]);
        assert_eq!(session.editor().state().text_content(NodeKey::ROOT), "");
    }
}
