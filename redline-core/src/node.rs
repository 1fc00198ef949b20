//! Rich-text node model.
//!
//! Nodes live in a flat map keyed by [`NodeKey`] and reference their parent
//! and children by key. Keys are UUID-backed so node records can be shared
//! between peers without renumbering.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EditorError;
use crate::suggestion::{SuggestionId, SuggestionProps, SuggestionType};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(Uuid);

impl NodeKey {
    /// The document root. Every peer shares it.
    pub const ROOT: NodeKey = NodeKey(Uuid::nil());

    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NodeKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ROOT {
            return write!(f, "NodeKey(root)");
        }
        write!(f, "NodeKey({})", &self.0.simple().to_string()[..8])
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(NodeKey)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TextFormat: u32 {
        const BOLD = 1;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKETHROUGH = 1 << 3;
        const CODE = 1 << 4;
        const SUBSCRIPT = 1 << 5;
        const SUPERSCRIPT = 1 << 6;
        const HIGHLIGHT = 1 << 7;
    }
}

/// A single toggleable text format, as carried by format commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Subscript,
    Superscript,
    Highlight,
}

impl FormatType {
    pub fn flag(self) -> TextFormat {
        match self {
            FormatType::Bold => TextFormat::BOLD,
            FormatType::Italic => TextFormat::ITALIC,
            FormatType::Underline => TextFormat::UNDERLINE,
            FormatType::Strikethrough => TextFormat::STRIKETHROUGH,
            FormatType::Code => TextFormat::CODE,
            FormatType::Subscript => TextFormat::SUBSCRIPT,
            FormatType::Superscript => TextFormat::SUPERSCRIPT,
            FormatType::Highlight => TextFormat::HIGHLIGHT,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Bullet,
    Number,
    Check,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "block", rename_all = "kebab-case")]
pub enum BlockType {
    #[default]
    Paragraph,
    Heading { level: u8 },
    Quote,
    Code,
    List { list_type: ListType, marker: Option<String> },
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Paragraph => write!(f, "paragraph"),
            BlockType::Heading { level } => write!(f, "h{level}"),
            BlockType::Quote => write!(f, "quote"),
            BlockType::Code => write!(f, "code"),
            BlockType::List { list_type, .. } => match list_type {
                ListType::Bullet => write!(f, "bullet-list"),
                ListType::Number => write!(f, "number-list"),
                ListType::Check => write!(f, "check-list"),
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProps {
    pub align: Alignment,
    pub indent: u32,
    pub block_type: BlockType,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextProps {
    pub text: String,
    pub format: TextFormat,
    pub style: BTreeMap<String, String>,
}

impl TextProps {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageProps {
    pub src: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    Root,
    Paragraph(BlockProps),
    Text(TextProps),
    Link { url: String },
    Image(ImageProps),
    Divider,
    Table,
    TableRow,
    TableCell,
    Suggestion(SuggestionProps),
}

impl NodeKind {
    pub fn paragraph() -> Self {
        NodeKind::Paragraph(BlockProps::default())
    }

    pub fn text(text: impl Into<String>) -> Self {
        NodeKind::Text(TextProps::plain(text))
    }

    /// Leaves never hold children.
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Text(_) | NodeKind::Image(_))
    }

    /// Top-level content that sits directly under the root or a table cell.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph(_) | NodeKind::Table | NodeKind::Divider
        )
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text(_) | NodeKind::Link { .. } | NodeKind::Image(_) | NodeKind::Suggestion(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: NodeKey,
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(key: NodeKey, kind: NodeKind) -> Self {
        Self {
            key,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    pub fn is_suggestion(&self) -> bool {
        matches!(self.kind, NodeKind::Suggestion(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    pub fn as_suggestion(&self) -> Option<&SuggestionProps> {
        match &self.kind {
            NodeKind::Suggestion(props) => Some(props),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextProps> {
        match &self.kind {
            NodeKind::Text(props) => Some(props),
            _ => None,
        }
    }

    pub fn suggestion_id(&self) -> Result<&SuggestionId, EditorError> {
        self.as_suggestion()
            .map(|s| &s.id)
            .ok_or(EditorError::NotASuggestion(self.key))
    }

    pub fn suggestion_type(&self) -> Result<SuggestionType, EditorError> {
        self.as_suggestion()
            .map(|s| s.suggestion_type)
            .ok_or(EditorError::NotASuggestion(self.key))
    }
}

/// Detached description of a subtree, used for clipboard content and
/// initial document content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(kind: NodeKind, children: Vec<NodeSpec>) -> Self {
        Self { kind, children }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::text(text), Vec::new())
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![Self::text(text)]
        };
        Self::new(NodeKind::paragraph(), children)
    }

    pub fn image(src: impl Into<String>, width: u32, height: u32) -> Self {
        Self::new(
            NodeKind::Image(ImageProps {
                src: src.into(),
                width,
                height,
            }),
            Vec::new(),
        )
    }
}

/// A caret position. On text nodes `offset` counts characters; on elements
/// it is a child index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
}

impl Point {
    pub fn new(key: NodeKey, offset: usize) -> Self {
        Self { key, offset }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    Range { anchor: Point, focus: Point },
    Node(Vec<NodeKey>),
}

impl Selection {
    pub fn caret(point: Point) -> Self {
        Selection::Range {
            anchor: point,
            focus: point,
        }
    }

    pub fn range(anchor: Point, focus: Point) -> Self {
        Selection::Range { anchor, focus }
    }

    pub fn is_collapsed(&self) -> bool {
        match self {
            Selection::Range { anchor, focus } => anchor == focus,
            Selection::Node(keys) => keys.is_empty(),
        }
    }

    pub fn anchor(&self) -> Option<Point> {
        match self {
            Selection::Range { anchor, .. } => Some(*anchor),
            Selection::Node(_) => None,
        }
    }
}
