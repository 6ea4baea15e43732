use indexmap::IndexMap;
use log::debug;

use crate::{
    Point2D,
    error::TouchError,
    geometry_utils::{delta, distance_points},
    tracking::{Cursor, CursorEvent, CursorState, SessionId, TrackerSnapshot},
};

/// Keeps persistent identities for touch points across frames.
///
/// Matching is greedy nearest-neighbour, in candidate order, with no distance
/// cutoff: a candidate claims the closest cursor nobody has claimed yet this
/// frame, even if a later candidate would have been closer to it. A cursor left
/// unmatched goes `Active -> Stopped`; a `Stopped` cursor unmatched again is
/// removed. Session ids come from a counter and are never handed out twice.
pub struct CursorTracker {
    cursors: IndexMap<SessionId, Cursor>,
    next_session_id: SessionId,
    last_frame: Option<u64>,
    removed_count: u64,
}

impl Default for CursorTracker {
    fn default() -> Self {
        CursorTracker::new()
    }
}

impl CursorTracker {
    pub fn new() -> Self {
        CursorTracker {
            cursors: IndexMap::new(),
            next_session_id: 0,
            last_frame: None,
            removed_count: 0,
        }
    }

    /// Feed the (normalised) candidate positions for a frame and get back the
    /// ordered lifecycle events: ADD/UPDATE in candidate order, then REMOVE.
    pub fn update(
        &mut self,
        candidates: &[Point2D],
        frame_index: u64,
    ) -> Result<Vec<CursorEvent>, TouchError> {
        if let Some(last) = self.last_frame {
            if frame_index <= last {
                return Err(TouchError::OutOfSequence {
                    last,
                    got: frame_index,
                });
            }
        }

        let stopped_before: Vec<SessionId> = self
            .cursors
            .values()
            .filter(|c| c.state == CursorState::Stopped)
            .map(|c| c.session_id)
            .collect();

        let mut matched: Vec<SessionId> = Vec::new();
        let mut events = Vec::new();

        for &position in candidates {
            let closest = self
                .cursors
                .values()
                .filter(|c| !matched.contains(&c.session_id))
                .map(|c| (c.session_id, distance_points(&c.position(), &position)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _d)| id);

            match closest.and_then(|id| self.cursors.get_mut(&id)) {
                Some(cursor) => {
                    let velocity = delta(&cursor.position(), &position);
                    let frames = (frame_index - cursor.last_updated_frame) as f32;
                    cursor.velocity = Some([velocity[0] / frames, velocity[1] / frames]);
                    cursor.x = position.0;
                    cursor.y = position.1;
                    cursor.state = CursorState::Active;
                    cursor.last_updated_frame = frame_index;
                    matched.push(cursor.session_id);
                    events.push(CursorEvent::Update {
                        session_id: cursor.session_id,
                        x: position.0,
                        y: position.1,
                    });
                }
                None => {
                    let session_id = self.next_session_id;
                    self.next_session_id += 1;
                    let cursor = Cursor::new(session_id, position, frame_index);
                    debug!("Added new cursor {:?}", &cursor);
                    self.cursors.insert(session_id, cursor);
                    matched.push(session_id);
                    events.push(CursorEvent::Add {
                        session_id,
                        x: position.0,
                        y: position.1,
                    });
                }
            }
        }

        for cursor in self.cursors.values_mut() {
            if cursor.state == CursorState::Active && !matched.contains(&cursor.session_id) {
                debug!("Cursor {} untouched; stopped", cursor.session_id);
                cursor.state = CursorState::Stopped;
            }
        }

        for session_id in stopped_before {
            if matched.contains(&session_id) {
                continue;
            }
            if let Some(mut cursor) = self.cursors.shift_remove(&session_id) {
                cursor.state = CursorState::Removed;
                debug!("Removed expired cursor {:?}", cursor);
                self.removed_count += 1;
                events.push(CursorEvent::Remove { session_id });
            }
        }

        self.last_frame = Some(frame_index);
        Ok(events)
    }

    /// Closest active cursor to a normalised point; stopped cursors are skipped
    pub fn nearest(&self, point: &Point2D) -> Option<&Cursor> {
        self.cursors
            .values()
            .filter(|c| c.state == CursorState::Active)
            .min_by(|a, b| {
                distance_points(&a.position(), point)
                    .total_cmp(&distance_points(&b.position(), point))
            })
    }

    pub fn get(&self, session_id: SessionId) -> Option<&Cursor> {
        self.cursors.get(&session_id)
    }

    /// All live cursors (active or stopped), oldest first
    pub fn cursors(&self) -> Vec<&Cursor> {
        self.cursors.values().collect()
    }

    /// Only the cursors matched in the last committed frame
    pub fn active_cursors(&self) -> Vec<&Cursor> {
        self.cursors
            .values()
            .filter(|c| c.state == CursorState::Active)
            .collect()
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    /// Total number of cursors retired so far; their ids stay retired
    pub fn removed_count(&self) -> u64 {
        self.removed_count
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            frame: self.last_frame,
            cursors: self.cursors.values().cloned().collect(),
        }
    }
}
