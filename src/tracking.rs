use serde::{Deserialize, Serialize};

use crate::Point2D;

pub type SessionId = u64;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CursorState {
    Active,
    /// Unmatched for one frame; removed if still unmatched next frame
    Stopped,
    Removed,
}

/// A persistent touch point, in normalised ROI coordinates
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub session_id: SessionId,
    pub x: f32,
    pub y: f32,
    /// Position change since the previous match, per frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<[f32; 2]>,
    pub state: CursorState,
    pub first_frame: u64,
    pub last_updated_frame: u64,
}

impl Cursor {
    pub fn new(session_id: SessionId, position: Point2D, frame: u64) -> Self {
        Cursor {
            session_id,
            x: position.0,
            y: position.1,
            velocity: None,
            state: CursorState::Active,
            first_frame: frame,
            last_updated_frame: frame,
        }
    }

    pub fn position(&self) -> Point2D {
        (self.x, self.y)
    }
}

/// Lifecycle change of a single cursor within one committed frame
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CursorEvent {
    #[serde(rename_all = "camelCase")]
    Add { session_id: SessionId, x: f32, y: f32 },
    #[serde(rename_all = "camelCase")]
    Update { session_id: SessionId, x: f32, y: f32 },
    #[serde(rename_all = "camelCase")]
    Remove { session_id: SessionId },
}

impl CursorEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            CursorEvent::Add { session_id, .. }
            | CursorEvent::Update { session_id, .. }
            | CursorEvent::Remove { session_id } => *session_id,
        }
    }
}

/// Ordered batch of events for one frame, handed to the protocol adapter
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameEvents {
    pub frame: u64,
    pub events: Vec<CursorEvent>,
}

impl FrameEvents {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Full committed tracker state, for periodic re-announcement
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrackerSnapshot {
    pub frame: Option<u64>,
    pub cursors: Vec<Cursor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialise_with_type_tag() {
        let add = CursorEvent::Add {
            session_id: 3,
            x: 0.5,
            y: 0.25,
        };
        let json = serde_json::to_string(&add).unwrap();
        assert_eq!(json, r#"{"type":"add","sessionId":3,"x":0.5,"y":0.25}"#);

        let remove = CursorEvent::Remove { session_id: 3 };
        let json = serde_json::to_string(&remove).unwrap();
        assert_eq!(json, r#"{"type":"remove","sessionId":3}"#);
        assert_eq!(remove.session_id(), 3);
    }

    #[test]
    fn new_cursor_is_active() {
        let c = Cursor::new(7, (0.1, 0.9), 12);
        assert_eq!(c.state, CursorState::Active);
        assert_eq!(c.position(), (0.1, 0.9));
        assert_eq!(c.first_frame, 12);
        assert_eq!(c.last_updated_frame, 12);
        assert!(c.velocity.is_none());
    }
}
