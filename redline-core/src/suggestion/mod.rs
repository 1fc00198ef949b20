//! Suggestion annotations: ids, types, change payloads.
//!
//! - [`overlay`]: turns editing commands into suggestion nodes
//! - [`resolve`]: accept/reject of a suggestion id
//! - [`summary`]: structured summary sent along with a new thread
//! - [`reconciler`]: mark map, thread creation and undo/redo reconciliation

pub mod overlay;
pub mod reconciler;
pub mod resolve;
pub mod summary;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::node::{Alignment, BlockType, FormatType, TextFormat};

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(String);

impl SuggestionId {
    /// Fresh id. Never reused for another logical suggestion.
    pub fn generate() -> Self {
        Self(format!("s-{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SuggestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SuggestionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Debug for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SuggestionId({})", self.0)
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionType {
    Insert,
    Delete,
    PropertyChange,
    StyleChange,
    Split,
    Join,
    LinkChange,
    AddLink,
    DeleteLink,
    ImageChange,
    InsertImage,
    DeleteImage,
    IndentChange,
    InsertTable,
    DeleteTable,
    InsertTableRow,
    DuplicateTableRow,
    DeleteTableRow,
    InsertTableColumn,
    DeleteTableColumn,
    DuplicateTableColumn,
    BlockTypeChange,
    InsertDivider,
    DeleteDivider,
    ClearFormatting,
    AlignChange,
}

/// Types whose nodes are markers and stay valid with no children.
pub const SUGGESTION_TYPES_THAT_CAN_BE_EMPTY: &[SuggestionType] = &[
    SuggestionType::Split,
    SuggestionType::Join,
    SuggestionType::IndentChange,
    SuggestionType::AlignChange,
    SuggestionType::BlockTypeChange,
    SuggestionType::InsertTable,
    SuggestionType::DeleteTable,
    SuggestionType::InsertTableRow,
    SuggestionType::DuplicateTableRow,
    SuggestionType::DeleteTableRow,
    SuggestionType::InsertTableColumn,
    SuggestionType::DeleteTableColumn,
    SuggestionType::DuplicateTableColumn,
    SuggestionType::InsertDivider,
    SuggestionType::DeleteDivider,
];

impl SuggestionType {
    pub fn can_be_empty(self) -> bool {
        SUGGESTION_TYPES_THAT_CAN_BE_EMPTY.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionType::Insert => "insert",
            SuggestionType::Delete => "delete",
            SuggestionType::PropertyChange => "property-change",
            SuggestionType::StyleChange => "style-change",
            SuggestionType::Split => "split",
            SuggestionType::Join => "join",
            SuggestionType::LinkChange => "link-change",
            SuggestionType::AddLink => "add-link",
            SuggestionType::DeleteLink => "delete-link",
            SuggestionType::ImageChange => "image-change",
            SuggestionType::InsertImage => "insert-image",
            SuggestionType::DeleteImage => "delete-image",
            SuggestionType::IndentChange => "indent-change",
            SuggestionType::InsertTable => "insert-table",
            SuggestionType::DeleteTable => "delete-table",
            SuggestionType::InsertTableRow => "insert-table-row",
            SuggestionType::DuplicateTableRow => "duplicate-table-row",
            SuggestionType::DeleteTableRow => "delete-table-row",
            SuggestionType::InsertTableColumn => "insert-table-column",
            SuggestionType::DeleteTableColumn => "delete-table-column",
            SuggestionType::DuplicateTableColumn => "duplicate-table-column",
            SuggestionType::BlockTypeChange => "block-type-change",
            SuggestionType::InsertDivider => "insert-divider",
            SuggestionType::DeleteDivider => "delete-divider",
            SuggestionType::ClearFormatting => "clear-formatting",
            SuggestionType::AlignChange => "align-change",
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a suggestion would do once accepted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SuggestionChange {
    #[default]
    None,
    Format { format: FormatType },
    Style { property: String, value: Option<String> },
    ClearFormatting { previous: TextFormat },
    Align { from: Alignment, to: Alignment },
    Indent { delta: i32 },
    BlockType { from: BlockType, to: BlockType },
    Link { from: Option<String>, to: Option<String> },
    ImageSize { from: (u32, u32), to: (u32, u32) },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestionProps {
    pub id: SuggestionId,
    pub suggestion_type: SuggestionType,
    #[serde(default)]
    pub change: SuggestionChange,
}

impl SuggestionProps {
    pub fn new(id: SuggestionId, suggestion_type: SuggestionType) -> Self {
        Self {
            id,
            suggestion_type,
            change: SuggestionChange::None,
        }
    }

    pub fn with_change(mut self, change: SuggestionChange) -> Self {
        self.change = change;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = SuggestionId::generate();
        let b = SuggestionId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("s-"));
    }

    #[test]
    fn test_type_serializes_kebab_case() {
        let json = serde_json::to_string(&SuggestionType::DuplicateTableColumn).unwrap();
        assert_eq!(json, "\"duplicate-table-column\"");
        assert_eq!(
            SuggestionType::DuplicateTableColumn.as_str(),
            "duplicate-table-column"
        );
    }

    #[test]
    fn test_can_be_empty() {
        assert!(SuggestionType::DeleteTableRow.can_be_empty());
        assert!(SuggestionType::AlignChange.can_be_empty());
        assert!(!SuggestionType::Insert.can_be_empty());
        assert!(!SuggestionType::PropertyChange.can_be_empty());
    }
}
