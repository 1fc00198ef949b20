//! Editing modes and keyboard routing.
//!
//! The router owns the suggest-mode interceptor registrations. Entering
//! `Suggest` registers them at critical priority; leaving drops the set, which
//! restores the registry to exactly what it was before.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::command::{CommandKind, CommandPriority, CommandRegistry, HandlerOwner, KeyEvent};
use crate::node::FormatType;
use crate::subscription::SubscriptionSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    #[default]
    Edit,
    Suggest,
    Preview,
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorMode::Edit => write!(f, "edit"),
            EditorMode::Suggest => write!(f, "suggest"),
            EditorMode::Preview => write!(f, "preview"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    pub from: EditorMode,
    pub to: EditorMode,
}

/// Decides which modifier is the primary one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Apple,
    #[default]
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            Platform::Apple
        } else {
            Platform::Other
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    ToggleSuggestionMode,
    Undo,
    Redo,
    Indent,
    Outdent,
    Format(FormatType),
}

/// Maps a key press to an editor action. Checked in order: mode shortcut,
/// undo, redo, tab, bold, italic, underline.
pub fn resolve_key(event: &KeyEvent, platform: Platform) -> Option<KeyAction> {
    let apple = platform == Platform::Apple;
    let primary = if apple { event.meta } else { event.ctrl };
    let key = event.key.to_lowercase();
    let is = |k: &str| key == k;

    if is("s") && primary && event.alt && event.shift {
        return Some(KeyAction::ToggleSuggestionMode);
    }
    if is("z") && primary && !event.shift {
        return Some(KeyAction::Undo);
    }
    let redo = if apple {
        is("z") && event.meta && event.shift
    } else {
        (is("y") && event.ctrl) || (is("z") && event.ctrl && event.shift)
    };
    if redo {
        return Some(KeyAction::Redo);
    }
    if event.key == "Tab" && !event.alt && !event.ctrl && !event.meta {
        return Some(if event.shift {
            KeyAction::Outdent
        } else {
            KeyAction::Indent
        });
    }
    if !primary || event.alt {
        return None;
    }
    match key.as_str() {
        "b" => Some(KeyAction::Format(FormatType::Bold)),
        "i" => Some(KeyAction::Format(FormatType::Italic)),
        "u" => Some(KeyAction::Format(FormatType::Underline)),
        _ => None,
    }
}

pub struct CommandRouter {
    mode: EditorMode,
    platform: Platform,
    interceptors: SubscriptionSet,
}

impl CommandRouter {
    pub fn new(platform: Platform) -> Self {
        Self {
            mode: EditorMode::Edit,
            platform,
            interceptors: SubscriptionSet::new(),
        }
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Where the toggle command leads from the current mode.
    pub fn toggle_target(&self) -> EditorMode {
        match self.mode {
            EditorMode::Suggest => EditorMode::Edit,
            EditorMode::Edit | EditorMode::Preview => EditorMode::Suggest,
        }
    }

    pub fn is_intercepting(&self) -> bool {
        !self.interceptors.is_empty()
    }

    /// Switches mode. Returns `None` if already in `to`.
    pub fn set_mode(
        &mut self,
        to: EditorMode,
        registry: &Rc<RefCell<CommandRegistry>>,
    ) -> Option<ModeChange> {
        let from = self.mode;
        if from == to {
            return None;
        }
        self.interceptors.clear();
        if to == EditorMode::Suggest {
            self.interceptors
                .extend(CommandKind::SUGGESTION_INTERCEPTS.iter().map(|kind| {
                    CommandRegistry::register(
                        registry,
                        *kind,
                        CommandPriority::Critical,
                        HandlerOwner::SuggestionOverlay,
                    )
                }));
        }
        self.mode = to;
        log::info!("Editor mode changed from {from} to {to}");
        Some(ModeChange { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_precedence_other_platform() {
        let p = Platform::Other;
        let shortcut = KeyEvent::new("S").ctrl().alt().shift();
        assert_eq!(resolve_key(&shortcut, p), Some(KeyAction::ToggleSuggestionMode));
        assert_eq!(resolve_key(&KeyEvent::new("z").ctrl(), p), Some(KeyAction::Undo));
        assert_eq!(resolve_key(&KeyEvent::new("y").ctrl(), p), Some(KeyAction::Redo));
        assert_eq!(
            resolve_key(&KeyEvent::new("z").ctrl().shift(), p),
            Some(KeyAction::Redo)
        );
        assert_eq!(resolve_key(&KeyEvent::new("Tab"), p), Some(KeyAction::Indent));
        assert_eq!(resolve_key(&KeyEvent::new("Tab").shift(), p), Some(KeyAction::Outdent));
        assert_eq!(resolve_key(&KeyEvent::new("Tab").ctrl(), p), None);
        assert_eq!(
            resolve_key(&KeyEvent::new("b").ctrl(), p),
            Some(KeyAction::Format(FormatType::Bold))
        );
        assert_eq!(resolve_key(&KeyEvent::new("b").meta(), p), None);
        assert_eq!(resolve_key(&KeyEvent::new("i").ctrl().alt(), p), None);
    }

    #[test]
    fn test_key_precedence_apple() {
        let p = Platform::Apple;
        assert_eq!(resolve_key(&KeyEvent::new("z").meta(), p), Some(KeyAction::Undo));
        assert_eq!(
            resolve_key(&KeyEvent::new("z").meta().shift(), p),
            Some(KeyAction::Redo)
        );
        assert_eq!(resolve_key(&KeyEvent::new("y").ctrl(), p), None);
        assert_eq!(
            resolve_key(&KeyEvent::new("u").meta(), p),
            Some(KeyAction::Format(FormatType::Underline))
        );
    }

    #[test]
    fn test_suggest_mode_registers_and_releases_interceptors() {
        let registry = CommandRegistry::shared();
        let _base = CommandRegistry::register(
            &registry,
            CommandKind::FormatText,
            CommandPriority::Editor,
            HandlerOwner::RichText,
        );
        let before = registry.borrow().registered();
        let mut router = CommandRouter::new(Platform::Other);

        let change = router.set_mode(EditorMode::Suggest, &registry).unwrap();
        assert_eq!(change.from, EditorMode::Edit);
        assert_eq!(
            registry.borrow().len(),
            before.len() + CommandKind::SUGGESTION_INTERCEPTS.len()
        );
        assert_eq!(
            registry.borrow().handlers_for(CommandKind::FormatText)[0],
            HandlerOwner::SuggestionOverlay
        );
        assert!(router.set_mode(EditorMode::Suggest, &registry).is_none());

        router.set_mode(EditorMode::Edit, &registry).unwrap();
        assert_eq!(registry.borrow().registered(), before);
        assert!(!router.is_intercepting());
    }

    #[test]
    fn test_toggle_target() {
        let registry = CommandRegistry::shared();
        let mut router = CommandRouter::new(Platform::Other);
        assert_eq!(router.toggle_target(), EditorMode::Suggest);
        router.set_mode(EditorMode::Preview, &registry);
        assert_eq!(router.toggle_target(), EditorMode::Suggest);
        router.set_mode(EditorMode::Suggest, &registry);
        assert_eq!(router.toggle_target(), EditorMode::Edit);
    }
}
