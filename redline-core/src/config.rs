use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::router::Platform;

/// Editing session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period before undo/redo thread updates are flushed, in ms
    pub debounce_ms: u64,
    /// Decides the primary shortcut modifier
    pub platform: Platform,
    /// Display name shown to other peers
    pub user_name: String,
    /// Cursor color as `#rrggbb` (None = derived from the user id)
    pub user_color: Option<String>,
    /// Maximum undo steps kept
    pub history_limit: usize,
    /// Upper bound on node transform passes per update
    pub max_transform_passes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            platform: Platform::current(),
            user_name: "Anonymous".to_string(),
            user_color: None,
            history_limit: 100,
            max_transform_passes: 32,
        }
    }
}

impl SessionConfig {
    /// Parses a config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SessionConfig::from_json(r#"{"debounce_ms": 10, "platform": "apple"}"#).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(10));
        assert_eq!(config.platform, Platform::Apple);
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.max_transform_passes, 32);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(
            SessionConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
