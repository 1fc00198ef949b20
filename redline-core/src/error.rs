use thiserror::Error;

use crate::node::NodeKey;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeKey),
    /// Reading suggestion data off a node that carries none. Aborts the
    /// surrounding update.
    #[error("Node {0} is not a suggestion node")]
    NotASuggestion(NodeKey),
    #[error("Node {0} cannot hold children")]
    NotAnElement(NodeKey),
    #[error("Node {0} is not a text node")]
    NotText(NodeKey),
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
    #[error("Offset {offset} out of bounds for node {key}")]
    OffsetOutOfBounds { key: NodeKey, offset: usize },
    #[error("Editor is not editable")]
    NotEditable,
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EditorError {
    fn from(e: serde_json::Error) -> Self {
        EditorError::Serialization(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid session config: {0}")]
    Parse(#[from] serde_json::Error),
}
