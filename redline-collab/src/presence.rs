//! Awareness for collaborative text editing: who is in the document, where
//! their caret is, and how to decorate it locally.
//!
//! ```text
//! local selection change
//!       │
//!       ▼
//! PresenceRoom::update_local_selection()   (rate-limited)
//!       │
//!       ▼
//! AwarenessMessage::Cursor { anchor, focus, timestamp }
//!       │   (bincode over the awareness channel)
//!       ▼
//! remote PresenceRoom::handle_message()
//!       │
//!       ▼
//! PresenceRoom::decorations(&state)
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use redline_core::{EditorState, Point};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::binding::BindingError;

/// RGBA cursor color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl CursorColor {
    /// Stable color for a user id. The hue comes from the id so every peer
    /// renders the same user the same way.
    pub fn from_uuid(id: Uuid) -> Self {
        let hue = ((id.as_u128() % 360) as f32) / 360.0;
        let (r, g, b) = hsl_to_rgb(hue, 0.7, 0.6);
        Self { r, g, b, a: 1.0 }
    }

    /// Parses `#rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .ok()
                .map(|v| f32::from(v) / 255.0)
        };
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: 1.0,
        })
    }

    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }
}

impl Default for CursorColor {
    fn default() -> Self {
        Self {
            r: 0.26,
            g: 0.52,
            b: 0.96,
            a: 1.0,
        }
    }
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (l, l, l);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Awareness messages exchanged between peers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AwarenessMessage {
    Join {
        user_id: Uuid,
        user_name: String,
        user_color: CursorColor,
        focusing: bool,
    },
    Leave {
        user_id: Uuid,
    },
    /// Selection update. `timestamp` is monotonic per sender.
    Cursor {
        user_id: Uuid,
        anchor: Point,
        focus: Point,
        timestamp: u64,
    },
    Focus {
        user_id: Uuid,
        focusing: bool,
    },
}

impl AwarenessMessage {
    pub fn encode(&self) -> Result<Vec<u8>, BindingError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| BindingError::Awareness(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BindingError> {
        let (msg, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| BindingError::Awareness(e.to_string()))?;
        Ok(msg)
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            AwarenessMessage::Join { user_id, .. }
            | AwarenessMessage::Leave { user_id }
            | AwarenessMessage::Cursor { user_id, .. }
            | AwarenessMessage::Focus { user_id, .. } => *user_id,
        }
    }
}

/// A remote peer as seen locally.
#[derive(Debug, Clone)]
pub struct RemotePeer {
    pub user_id: Uuid,
    pub user_name: String,
    pub color: CursorColor,
    pub focusing: bool,
    pub anchor: Option<Point>,
    pub focus: Option<Point>,
    last_update: Instant,
    last_timestamp: u64,
}

impl RemotePeer {
    pub fn new(user_id: Uuid, user_name: String, color: CursorColor) -> Self {
        Self {
            user_id,
            user_name,
            color,
            focusing: false,
            anchor: None,
            focus: None,
            last_update: Instant::now(),
            last_timestamp: 0,
        }
    }

    /// Applies a cursor update unless it is older than the last one seen.
    pub fn update_cursor(&mut self, anchor: Point, focus: Point, timestamp: u64) {
        if timestamp < self.last_timestamp {
            return;
        }
        self.anchor = Some(anchor);
        self.focus = Some(focus);
        self.last_update = Instant::now();
        self.last_timestamp = timestamp;
    }

    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_update.elapsed() > timeout
    }
}

/// How a remote caret is drawn locally.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorDecoration {
    pub user_id: Uuid,
    pub user_name: String,
    pub color: CursorColor,
    pub caret: Point,
    /// The other end of a non-collapsed selection.
    pub selection_anchor: Option<Point>,
}

/// Presence state for one document: the local user plus every remote peer.
pub struct PresenceRoom {
    local_user_id: Uuid,
    local_name: String,
    local_color: CursorColor,
    local_focusing: bool,
    peers: HashMap<Uuid, RemotePeer>,
    last_cursor_broadcast: Option<Instant>,
    cursor_broadcast_interval: Duration,
    timestamp_counter: u64,
    idle_timeout: Duration,
}

impl PresenceRoom {
    pub fn new(
        local_user_id: Uuid,
        local_name: String,
        local_color: CursorColor,
        cursor_broadcast_interval: Duration,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            local_user_id,
            local_name,
            local_color,
            local_focusing: false,
            peers: HashMap::new(),
            last_cursor_broadcast: None,
            cursor_broadcast_interval,
            timestamp_counter: 0,
            idle_timeout,
        }
    }

    pub fn local_user_id(&self) -> Uuid {
        self.local_user_id
    }

    pub fn local_color(&self) -> CursorColor {
        self.local_color
    }

    pub fn join_message(&self) -> AwarenessMessage {
        AwarenessMessage::Join {
            user_id: self.local_user_id,
            user_name: self.local_name.clone(),
            user_color: self.local_color,
            focusing: self.local_focusing,
        }
    }

    pub fn leave_message(&self) -> AwarenessMessage {
        AwarenessMessage::Leave {
            user_id: self.local_user_id,
        }
    }

    pub fn set_local_focus(&mut self, focusing: bool) -> AwarenessMessage {
        self.local_focusing = focusing;
        AwarenessMessage::Focus {
            user_id: self.local_user_id,
            focusing,
        }
    }

    /// Returns a message to broadcast, or `None` while throttled.
    pub fn update_local_selection(&mut self, anchor: Point, focus: Point) -> Option<AwarenessMessage> {
        if self
            .last_cursor_broadcast
            .is_some_and(|t| t.elapsed() < self.cursor_broadcast_interval)
        {
            return None;
        }
        self.timestamp_counter += 1;
        self.last_cursor_broadcast = Some(Instant::now());
        Some(AwarenessMessage::Cursor {
            user_id: self.local_user_id,
            anchor,
            focus,
            timestamp: self.timestamp_counter,
        })
    }

    /// Folds in a remote message. Our own messages are ignored.
    pub fn handle_message(&mut self, msg: &AwarenessMessage) {
        if msg.user_id() == self.local_user_id {
            return;
        }
        match msg {
            AwarenessMessage::Join {
                user_id,
                user_name,
                user_color,
                focusing,
            } => {
                log::debug!("peer {user_name} joined");
                let mut peer = RemotePeer::new(*user_id, user_name.clone(), *user_color);
                peer.focusing = *focusing;
                self.peers.insert(*user_id, peer);
            }
            AwarenessMessage::Leave { user_id } => {
                self.peers.remove(user_id);
            }
            AwarenessMessage::Cursor {
                user_id,
                anchor,
                focus,
                timestamp,
            } => {
                let peer = self.peers.entry(*user_id).or_insert_with(|| {
                    RemotePeer::new(
                        *user_id,
                        format!("Peer-{}", &user_id.simple().to_string()[..8]),
                        CursorColor::from_uuid(*user_id),
                    )
                });
                peer.update_cursor(*anchor, *focus, *timestamp);
            }
            AwarenessMessage::Focus { user_id, focusing } => {
                if let Some(peer) = self.peers.get_mut(user_id) {
                    peer.focusing = *focusing;
                }
            }
        }
    }

    pub fn peer(&self, user_id: &Uuid) -> Option<&RemotePeer> {
        self.peers.get(user_id)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Drops peers with no update within the idle timeout.
    pub fn cleanup_idle_peers(&mut self) -> Vec<Uuid> {
        let timeout = self.idle_timeout;
        let stale: Vec<Uuid> = self
            .peers
            .iter()
            .filter(|(_, p)| p.is_idle(timeout))
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            self.peers.remove(id);
        }
        stale
    }

    /// Decorations for focused peers whose caret points at a live node.
    /// Sorted by user id.
    pub fn decorations(&self, state: &EditorState) -> Vec<CursorDecoration> {
        let live = |p: &Point| state.is_attached(p.key);
        let mut out: Vec<CursorDecoration> = self
            .peers
            .values()
            .filter(|p| p.focusing)
            .filter_map(|peer| {
                let caret = peer.focus.filter(live)?;
                let selection_anchor = peer.anchor.filter(|a| live(a) && *a != caret);
                Some(CursorDecoration {
                    user_id: peer.user_id,
                    user_name: peer.user_name.clone(),
                    color: peer.color,
                    caret,
                    selection_anchor,
                })
            })
            .collect();
        out.sort_by_key(|d| d.user_id);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_core::NodeKey;

    fn room(id: Uuid) -> PresenceRoom {
        PresenceRoom::new(
            id,
            "Local".into(),
            CursorColor::from_uuid(id),
            Duration::from_millis(33),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_cursor_color_from_uuid_stable() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(CursorColor::from_uuid(id), CursorColor::from_uuid(id));
        assert_eq!(CursorColor::from_uuid(id).a, 1.0);
    }

    #[test]
    fn test_hex_colors() {
        let c = CursorColor::from_hex("#ff8000").unwrap();
        assert_eq!(c.to_hex(), "#ff8000");
        assert!(CursorColor::from_hex("ff8000").is_none());
        assert!(CursorColor::from_hex("#ff80").is_none());
    }

    #[test]
    fn test_hsl_achromatic() {
        assert_eq!(hsl_to_rgb(0.3, 0.0, 0.5), (0.5, 0.5, 0.5));
    }

    #[test]
    fn test_cursor_message_survives_the_wire() {
        let key = NodeKey::new();
        let msg = AwarenessMessage::Cursor {
            user_id: Uuid::new_v4(),
            anchor: Point::new(key, 2),
            focus: Point::new(key, 5),
            timestamp: 7,
        };
        let decoded = AwarenessMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
        assert!(AwarenessMessage::decode(&[0xff, 0xff]).is_err());
    }

    #[test]
    fn test_local_cursor_is_throttled() {
        let mut room = room(Uuid::new_v4());
        let p = Point::new(NodeKey::ROOT, 0);
        assert!(room.update_local_selection(p, p).is_some());
        assert!(room.update_local_selection(p, p).is_none());
    }

    #[test]
    fn test_stale_cursor_is_ignored() {
        let mut room = room(Uuid::new_v4());
        let peer = Uuid::new_v4();
        let a = Point::new(NodeKey::ROOT, 1);
        let b = Point::new(NodeKey::ROOT, 0);
        room.handle_message(&AwarenessMessage::Cursor {
            user_id: peer,
            anchor: a,
            focus: a,
            timestamp: 5,
        });
        room.handle_message(&AwarenessMessage::Cursor {
            user_id: peer,
            anchor: b,
            focus: b,
            timestamp: 3,
        });
        assert_eq!(room.peer(&peer).unwrap().focus, Some(a));
    }

    #[test]
    fn test_own_messages_ignored_and_leave_removes() {
        let local = Uuid::new_v4();
        let mut room = room(local);
        room.handle_message(&room.join_message());
        assert_eq!(room.peer_count(), 0);

        let peer = Uuid::new_v4();
        room.handle_message(&AwarenessMessage::Join {
            user_id: peer,
            user_name: "Alice".into(),
            user_color: CursorColor::default(),
            focusing: true,
        });
        assert_eq!(room.peer_count(), 1);
        room.handle_message(&AwarenessMessage::Leave { user_id: peer });
        assert_eq!(room.peer_count(), 0);
    }

    #[test]
    fn test_decorations_skip_unfocused_and_dangling() {
        let mut room = room(Uuid::new_v4());
        let state = EditorState::new();
        let focused = Uuid::new_v4();
        let blurred = Uuid::new_v4();
        for (id, focusing) in [(focused, true), (blurred, false)] {
            room.handle_message(&AwarenessMessage::Join {
                user_id: id,
                user_name: "p".into(),
                user_color: CursorColor::default(),
                focusing,
            });
            let root = Point::new(NodeKey::ROOT, 0);
            room.handle_message(&AwarenessMessage::Cursor {
                user_id: id,
                anchor: root,
                focus: root,
                timestamp: 1,
            });
        }
        let decorations = room.decorations(&state);
        assert_eq!(decorations.len(), 1);
        assert_eq!(decorations[0].user_id, focused);
        assert_eq!(decorations[0].selection_anchor, None);

        let gone = Point::new(NodeKey::new(), 0);
        room.handle_message(&AwarenessMessage::Cursor {
            user_id: focused,
            anchor: gone,
            focus: gone,
            timestamp: 2,
        });
        assert!(room.decorations(&state).is_empty());
    }
}
