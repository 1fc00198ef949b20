//! Suggestion-mode ("track changes") editing on top of a rich-text node
//! tree.
//!
//! An [`EditingSession`] owns the [`Editor`], routes every [`EditorCommand`]
//! through the priority registry, and turns edits made in suggest mode into
//! suggestion wrapper and marker nodes instead of direct changes. Accepting
//! or rejecting a suggestion resolves every node sharing its id.

pub mod command;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod node;
pub mod ops;
pub mod plain;
pub mod router;
pub mod session;
pub mod subscription;
pub mod suggestion;

pub use command::{CommandKind, EditorCommand, FileRef, InputEvent, KeyEvent, PastePayload};
pub use config::SessionConfig;
pub use document::EditorState;
pub use editor::{tags, Editor, Tags, Transaction, UpdateReport};
pub use error::{ConfigError, EditorError};
pub use node::{Node, NodeKey, NodeKind, NodeSpec, Point, Selection};
pub use router::{EditorMode, ModeChange, Platform};
pub use session::{EditingSession, HistoryRequest, Notice, SessionOutput};
pub use suggestion::reconciler::{MarkMap, ReconcileBatch, ThreadCreation};
pub use suggestion::summary::{generate_summary, SuggestionSummaryItem, SuggestionSummaryType};
pub use suggestion::{SuggestionId, SuggestionProps, SuggestionType};
