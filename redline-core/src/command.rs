//! Editing commands and the priority-ordered handler registry.
//!
//! Commands are a closed enum. Handlers are not closures: a registration
//! names the [`HandlerOwner`] that should see the command, and the session
//! matches on the owner to run the right code. The registry only decides
//! order.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::node::{Alignment, BlockType, FormatType, ImageProps, ListType, NodeKey, NodeSpec, Point};
use crate::subscription::Subscription;
use crate::suggestion::SuggestionId;

/// A file handed over by paste or drop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub mime: String,
}

impl FileRef {
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastePayload {
    pub files: Vec<FileRef>,
    pub text: Option<String>,
}

impl PastePayload {
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Intent carried by a `beforeinput` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    InsertText(String),
    DeleteBackward,
    DeleteForward,
    InsertParagraph,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EditorCommand {
    FormatText(FormatType),
    SetStyleProperty { property: String, value: Option<String> },
    FormatElement(Alignment),
    InsertTab,
    Indent,
    Outdent,
    InsertClipboardNodes(Vec<NodeSpec>),
    BeforeInput(InputEvent),
    Paste(PastePayload),
    KeyDown(KeyEvent),
    ToggleSuggestionMode,
    AcceptSuggestion(SuggestionId),
    RejectSuggestion(SuggestionId),
    /// Set, change or remove (`url: None`) the link at the selection,
    /// optionally replacing its text.
    LinkChange { url: Option<String>, text: Option<String> },
    InsertImage(ImageProps),
    SetImageSize { key: NodeKey, width: u32, height: u32 },
    DropImage { image: NodeKey, target: Point },
    CompositionStart,
    CompositionEnd,
    InsertTable { rows: usize, columns: usize },
    DeleteTable(NodeKey),
    InsertTableRow { insert_after: bool },
    DuplicateTableRow(NodeKey),
    DeleteTableRow(NodeKey),
    InsertTableColumn { insert_after: bool },
    DuplicateTableColumn(NodeKey),
    DeleteTableColumn(NodeKey),
    InsertList { list_type: ListType, marker: Option<String> },
    SetBlockType(BlockType),
    InsertDivider,
    ClearFormatting,
    InsertFile(FileRef),
    Undo,
    Redo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    FormatText,
    SetStyleProperty,
    FormatElement,
    InsertTab,
    Indent,
    Outdent,
    InsertClipboardNodes,
    BeforeInput,
    Paste,
    KeyDown,
    ToggleSuggestionMode,
    AcceptSuggestion,
    RejectSuggestion,
    LinkChange,
    InsertImage,
    SetImageSize,
    DropImage,
    CompositionStart,
    CompositionEnd,
    InsertTable,
    DeleteTable,
    InsertTableRow,
    DuplicateTableRow,
    DeleteTableRow,
    InsertTableColumn,
    DuplicateTableColumn,
    DeleteTableColumn,
    InsertList,
    SetBlockType,
    InsertDivider,
    ClearFormatting,
    InsertFile,
    Undo,
    Redo,
}

impl CommandKind {
    /// Everything the suggestion overlay takes over while suggesting.
    pub const SUGGESTION_INTERCEPTS: &'static [CommandKind] = &[
        CommandKind::FormatText,
        CommandKind::SetStyleProperty,
        CommandKind::FormatElement,
        CommandKind::InsertTab,
        CommandKind::Indent,
        CommandKind::Outdent,
        CommandKind::InsertClipboardNodes,
        CommandKind::BeforeInput,
        CommandKind::Paste,
        CommandKind::KeyDown,
        CommandKind::LinkChange,
        CommandKind::InsertImage,
        CommandKind::SetImageSize,
        CommandKind::DropImage,
        CommandKind::CompositionStart,
        CommandKind::InsertTable,
        CommandKind::DeleteTable,
        CommandKind::InsertTableRow,
        CommandKind::DuplicateTableRow,
        CommandKind::DeleteTableRow,
        CommandKind::InsertTableColumn,
        CommandKind::DuplicateTableColumn,
        CommandKind::DeleteTableColumn,
        CommandKind::InsertList,
        CommandKind::SetBlockType,
        CommandKind::InsertDivider,
        CommandKind::ClearFormatting,
    ];

    /// Handled by the suggestion plugin in every mode.
    pub const PLUGIN_COMMANDS: &'static [CommandKind] = &[
        CommandKind::KeyDown,
        CommandKind::ToggleSuggestionMode,
        CommandKind::AcceptSuggestion,
        CommandKind::RejectSuggestion,
    ];

    /// Editing commands with a default, unannotated implementation.
    pub const RICH_TEXT_DEFAULTS: &'static [CommandKind] = &[
        CommandKind::FormatText,
        CommandKind::SetStyleProperty,
        CommandKind::FormatElement,
        CommandKind::InsertTab,
        CommandKind::Indent,
        CommandKind::Outdent,
        CommandKind::InsertClipboardNodes,
        CommandKind::BeforeInput,
        CommandKind::Paste,
        CommandKind::KeyDown,
        CommandKind::LinkChange,
        CommandKind::InsertImage,
        CommandKind::SetImageSize,
        CommandKind::DropImage,
        CommandKind::CompositionStart,
        CommandKind::CompositionEnd,
        CommandKind::InsertTable,
        CommandKind::DeleteTable,
        CommandKind::InsertTableRow,
        CommandKind::DuplicateTableRow,
        CommandKind::DeleteTableRow,
        CommandKind::InsertTableColumn,
        CommandKind::DuplicateTableColumn,
        CommandKind::DeleteTableColumn,
        CommandKind::InsertList,
        CommandKind::SetBlockType,
        CommandKind::InsertDivider,
        CommandKind::ClearFormatting,
        CommandKind::InsertFile,
    ];
}

impl EditorCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            EditorCommand::FormatText(_) => CommandKind::FormatText,
            EditorCommand::SetStyleProperty { .. } => CommandKind::SetStyleProperty,
            EditorCommand::FormatElement(_) => CommandKind::FormatElement,
            EditorCommand::InsertTab => CommandKind::InsertTab,
            EditorCommand::Indent => CommandKind::Indent,
            EditorCommand::Outdent => CommandKind::Outdent,
            EditorCommand::InsertClipboardNodes(_) => CommandKind::InsertClipboardNodes,
            EditorCommand::BeforeInput(_) => CommandKind::BeforeInput,
            EditorCommand::Paste(_) => CommandKind::Paste,
            EditorCommand::KeyDown(_) => CommandKind::KeyDown,
            EditorCommand::ToggleSuggestionMode => CommandKind::ToggleSuggestionMode,
            EditorCommand::AcceptSuggestion(_) => CommandKind::AcceptSuggestion,
            EditorCommand::RejectSuggestion(_) => CommandKind::RejectSuggestion,
            EditorCommand::LinkChange { .. } => CommandKind::LinkChange,
            EditorCommand::InsertImage(_) => CommandKind::InsertImage,
            EditorCommand::SetImageSize { .. } => CommandKind::SetImageSize,
            EditorCommand::DropImage { .. } => CommandKind::DropImage,
            EditorCommand::CompositionStart => CommandKind::CompositionStart,
            EditorCommand::CompositionEnd => CommandKind::CompositionEnd,
            EditorCommand::InsertTable { .. } => CommandKind::InsertTable,
            EditorCommand::DeleteTable(_) => CommandKind::DeleteTable,
            EditorCommand::InsertTableRow { .. } => CommandKind::InsertTableRow,
            EditorCommand::DuplicateTableRow(_) => CommandKind::DuplicateTableRow,
            EditorCommand::DeleteTableRow(_) => CommandKind::DeleteTableRow,
            EditorCommand::InsertTableColumn { .. } => CommandKind::InsertTableColumn,
            EditorCommand::DuplicateTableColumn(_) => CommandKind::DuplicateTableColumn,
            EditorCommand::DeleteTableColumn(_) => CommandKind::DeleteTableColumn,
            EditorCommand::InsertList { .. } => CommandKind::InsertList,
            EditorCommand::SetBlockType(_) => CommandKind::SetBlockType,
            EditorCommand::InsertDivider => CommandKind::InsertDivider,
            EditorCommand::ClearFormatting => CommandKind::ClearFormatting,
            EditorCommand::InsertFile(_) => CommandKind::InsertFile,
            EditorCommand::Undo => CommandKind::Undo,
            EditorCommand::Redo => CommandKind::Redo,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandPriority {
    Editor,
    Low,
    Normal,
    High,
    Critical,
}

/// Which piece of code a registration dispatches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerOwner {
    /// Suggest-mode interceptors.
    SuggestionOverlay,
    /// Mode toggle, accept/reject and the mode shortcut.
    SuggestionPlugin,
    /// Undo/redo.
    History,
    /// Plain rich-text behavior.
    RichText,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Registration {
    pub kind: CommandKind,
    pub priority: CommandPriority,
    pub owner: HandlerOwner,
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    entries: Vec<(u64, Registration)>,
    next_id: u64,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Registers a handler. Dropping the returned subscription removes it.
    pub fn register(
        registry: &Rc<RefCell<Self>>,
        kind: CommandKind,
        priority: CommandPriority,
        owner: HandlerOwner,
    ) -> Subscription {
        let id = {
            let mut inner = registry.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((
                id,
                Registration {
                    kind,
                    priority,
                    owner,
                },
            ));
            id
        };
        let weak: Weak<RefCell<Self>> = Rc::downgrade(registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry.borrow_mut().entries.retain(|(i, _)| *i != id);
            }
        })
    }

    /// Owners to try for `kind`: highest priority first, and within one
    /// priority the most recent registration first.
    pub fn handlers_for(&self, kind: CommandKind) -> Vec<HandlerOwner> {
        let mut matching: Vec<&(u64, Registration)> =
            self.entries.iter().filter(|(_, r)| r.kind == kind).collect();
        matching.sort_by(|(a_id, a), (b_id, b)| {
            b.priority.cmp(&a.priority).then_with(|| b_id.cmp(a_id))
        });
        matching.into_iter().map(|(_, r)| r.owner).collect()
    }

    /// Sorted snapshot of every live registration.
    pub fn registered(&self) -> Vec<Registration> {
        let mut all: Vec<Registration> = self.entries.iter().map(|(_, r)| *r).collect();
        all.sort();
        all
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_then_recency() {
        let registry = CommandRegistry::shared();
        let _a = CommandRegistry::register(
            &registry,
            CommandKind::FormatText,
            CommandPriority::Editor,
            HandlerOwner::RichText,
        );
        let _b = CommandRegistry::register(
            &registry,
            CommandKind::FormatText,
            CommandPriority::Critical,
            HandlerOwner::SuggestionOverlay,
        );
        let handlers = registry.borrow().handlers_for(CommandKind::FormatText);
        assert_eq!(
            handlers,
            vec![HandlerOwner::SuggestionOverlay, HandlerOwner::RichText]
        );
    }

    #[test]
    fn test_dropping_subscription_unregisters() {
        let registry = CommandRegistry::shared();
        let sub = CommandRegistry::register(
            &registry,
            CommandKind::Undo,
            CommandPriority::Editor,
            HandlerOwner::History,
        );
        assert_eq!(registry.borrow().len(), 1);
        drop(sub);
        assert!(registry.borrow().is_empty());
    }

    #[test]
    fn test_subscription_outliving_registry() {
        let registry = CommandRegistry::shared();
        let sub = CommandRegistry::register(
            &registry,
            CommandKind::Undo,
            CommandPriority::Editor,
            HandlerOwner::History,
        );
        drop(registry);
        drop(sub);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(EditorCommand::InsertDivider.kind(), CommandKind::InsertDivider);
        assert_eq!(
            EditorCommand::KeyDown(KeyEvent::new("b").ctrl()).kind(),
            CommandKind::KeyDown
        );
    }
}
