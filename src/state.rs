//! The game state and the objects that live in it.

use crate::chart::{Lane, Note};
use crate::config::{BASELINE_Y, NOTE_RADIUS, Tuning, lane_x};
use crate::event::ObjectId;

/// A circle, used for falling bodies, tail heads and the lane targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Circle {
    /// True when the two circles touch or overlap.
    pub fn touches(&self, other: &Circle) -> bool {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt() <= self.radius + other.radius
    }

    pub fn top(&self) -> f64 {
        self.y - self.radius
    }
}

/// The fixed target circle on the baseline of a lane.
pub fn target(lane: Lane) -> Circle {
    Circle {
        x: lane_x(lane),
        y: BASELINE_Y,
        radius: NOTE_RADIUS,
    }
}

/// A falling short note.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub id: ObjectId,
    /// Tick on which the body spawned.
    pub created_at: u64,
    pub lane: Lane,
    pub radius: f64,
    pub x: f64,
    /// 0 at spawn, grows as the body falls.
    pub y: f64,
    pub note: Note,
    /// Set once the body was resolved as a hit.
    pub clicked: bool,
}

impl Body {
    pub fn circle(&self) -> Circle {
        Circle {
            x: self.x,
            y: self.y,
            radius: self.radius,
        }
    }
}

/// A sustained note: a head circle plus the segment `y_start..y_end`.
///
/// `y_end` is the lower edge, the one that reaches the baseline first.
#[derive(Debug, Clone, PartialEq)]
pub struct Tail {
    pub id: ObjectId,
    pub created_at: u64,
    pub lane: Lane,
    pub x: f64,
    pub y_start: f64,
    pub y_end: f64,
    pub head: Circle,
    pub note: Note,
    pub is_pressed: bool,
    /// Set the first time the tail is held; the audio side keys its attack on it.
    pub has_attacked: bool,
}

impl Tail {
    pub fn length(&self) -> f64 {
        self.y_end - self.y_start
    }
}

/// One immutable snapshot of the game.
///
/// `exit`, `bg_exit`, `tail_exit`, `head_exit` and `pending_feedback_notes`
/// are one-shot: they describe what happened during the reduction that
/// produced this snapshot and are rebuilt by the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub tuning: Tuning,
    pub time: u64,
    pub score: f64,
    pub multiplier: f64,
    pub missed_clicks: u32,
    pub consecutive_hits: u32,
    pub game_end: bool,

    pub active_bodies: Vec<Body>,
    pub active_tails: Vec<Tail>,
    pub collided_tails: Vec<Tail>,

    /// Played bodies that left the field, hit (`clicked`) or missed.
    pub exit: Vec<Body>,
    /// Background bodies that reached the baseline.
    pub bg_exit: Vec<Body>,
    /// Fully consumed tails.
    pub tail_exit: Vec<Tail>,
    /// Collided tails whose head has fallen past the targets.
    pub head_exit: Vec<ObjectId>,
    pub pending_feedback_notes: Vec<Note>,

    next_id: u64,
}

impl State {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            time: 0,
            score: 0.0,
            multiplier: 1.0,
            missed_clicks: 0,
            consecutive_hits: 0,
            game_end: false,
            active_bodies: Vec::new(),
            active_tails: Vec::new(),
            collided_tails: Vec::new(),
            exit: Vec::new(),
            bg_exit: Vec::new(),
            tail_exit: Vec::new(),
            head_exit: Vec::new(),
            pending_feedback_notes: Vec::new(),
            next_id: 0,
        }
    }

    /// Hands out the next object identity.
    pub(crate) fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn clear_one_shot(&mut self) {
        self.exit.clear();
        self.bg_exit.clear();
        self.tail_exit.clear();
        self.head_exit.clear();
        self.pending_feedback_notes.clear();
    }

    /// No object is on the field and nothing is waiting to be presented.
    pub fn is_settled(&self) -> bool {
        self.active_bodies.is_empty()
            && self.active_tails.is_empty()
            && self.collided_tails.is_empty()
            && self.exit.is_empty()
            && self.bg_exit.is_empty()
            && self.tail_exit.is_empty()
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new(Tuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circles_touch_at_combined_radius() {
        let a = Circle {
            x: 0.0,
            y: 0.0,
            radius: 14.0,
        };
        let b = Circle {
            x: 0.0,
            y: 28.0,
            radius: 14.0,
        };
        let c = Circle { y: 28.01, ..b };
        assert!(a.touches(&b));
        assert!(!a.touches(&c));
    }

    #[test]
    fn fresh_state_is_settled() {
        let s = State::default();
        assert!(s.is_settled());
        assert_eq!(s.multiplier, 1.0);
        assert!(!s.game_end);
    }

    #[test]
    fn ids_are_unique() {
        let mut s = State::default();
        let a = s.allocate_id();
        let b = s.allocate_id();
        assert_ne!(a, b);
    }
}
