//! The state transition function.

use crate::chart::Note;
use crate::config::{NOTE_RADIUS, lane_x};
use crate::event::{Event, ObjectId};
use crate::physics;
use crate::scoring;
use crate::state::{Body, Circle, State, Tail};
use log::{debug, trace};

/// Answers whether the presentation side currently knows about an object.
///
/// A body can only be hit once it has been shown to the player.
pub trait Visibility {
    fn is_visible(&self, id: ObjectId) -> bool;
}

/// Treats every object as visible. Used when no presenter is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllVisible;

impl Visibility for AllVisible {
    fn is_visible(&self, _id: ObjectId) -> bool {
        true
    }
}

/// Folds one event into the state.
pub fn reduce(state: State, event: &Event) -> State {
    reduce_with(state, event, &AllVisible)
}

/// Like [`reduce`], consulting `visible` for hit detection.
///
/// A finished game is terminal: every event leaves it unchanged.
pub fn reduce_with(mut state: State, event: &Event, visible: &dyn Visibility) -> State {
    if state.game_end {
        return state;
    }
    trace!("{} at tick {}", event.kind(), state.time);
    state.clear_one_shot();
    match event {
        Event::BodySpawn(note) => create_body(state, note),
        Event::TailSpawn(note) => create_tail(state, note),
        Event::KeyPress { lane, pressed } => {
            scoring::handle_key_press(state, *lane, *pressed, visible)
        }
        Event::Tick { elapsed } => physics::tick(state, *elapsed),
    }
}

pub fn create_body(mut state: State, note: &Note) -> State {
    if !note.has_instrument() {
        debug!("skipping body for note without instrument (pitch {})", note.pitch);
        return state;
    }
    let lane = note.lane();
    let body = Body {
        id: state.allocate_id(),
        created_at: state.time,
        lane,
        radius: NOTE_RADIUS,
        x: lane_x(lane),
        y: 0.0,
        note: note.clone(),
        clicked: false,
    };
    debug!("spawned body {:?} on lane {}", body.id, lane.index());
    state.active_bodies.push(body);
    state
}

pub fn create_tail(mut state: State, note: &Note) -> State {
    if !note.has_instrument() {
        debug!("skipping tail for note without instrument (pitch {})", note.pitch);
        return state;
    }
    let lane = note.lane();
    let x = lane_x(lane);
    let length = note.duration() * state.tuning.ticks_per_second() * state.tuning.difficulty;
    let tail = Tail {
        id: state.allocate_id(),
        created_at: state.time,
        lane,
        x,
        y_start: -length,
        y_end: 0.0,
        head: Circle {
            x,
            y: -NOTE_RADIUS,
            radius: NOTE_RADIUS,
        },
        note: note.clone(),
        is_pressed: false,
        has_attacked: false,
    };
    debug!(
        "spawned tail {:?} on lane {} ({length:.1} units)",
        tail.id,
        lane.index()
    );
    state.active_tails.push(tail);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Lane;

    fn note(pitch: i32, start: f64, end: f64) -> Note {
        Note {
            user_played: true,
            instrument_name: "piano".into(),
            velocity: 0.8,
            pitch,
            start,
            end,
        }
    }

    #[test]
    fn body_spawn_appends_to_lane() {
        let s = reduce(State::default(), &Event::BodySpawn(note(62, 0.0, 0.5)));
        assert_eq!(s.active_bodies.len(), 1);
        let b = &s.active_bodies[0];
        assert_eq!(b.lane, Lane::from_pitch(62));
        assert_eq!(b.x, 120.0);
        assert_eq!(b.y, 0.0);
        assert!(!b.clicked);
    }

    #[test]
    fn spawn_leaves_existing_objects_alone() {
        let s = reduce(State::default(), &Event::BodySpawn(note(60, 0.0, 0.5)));
        let s = reduce(s, &Event::Tick { elapsed: 0 });
        let before = s.active_bodies[0].clone();
        let s = reduce(s, &Event::BodySpawn(note(61, 0.0, 0.5)));
        assert_eq!(s.active_bodies.len(), 2);
        assert_eq!(s.active_bodies[0], before);
        assert_ne!(s.active_bodies[0].id, s.active_bodies[1].id);
    }

    #[test]
    fn note_without_instrument_is_skipped() {
        let mut bad = note(60, 0.0, 0.5);
        bad.instrument_name = String::new();
        let s = reduce(State::default(), &Event::BodySpawn(bad.clone()));
        assert!(s.active_bodies.is_empty());
        bad.end = 3.0;
        let s = reduce(s, &Event::TailSpawn(bad));
        assert!(s.active_tails.is_empty());
    }

    #[test]
    fn tail_length_follows_duration() {
        let s = reduce(State::default(), &Event::TailSpawn(note(63, 1.0, 3.0)));
        let t = &s.active_tails[0];
        // 2 s at 20 ticks/s and 7 units per tick
        assert!((t.length() - 280.0).abs() < 1e-9);
        assert_eq!(t.y_end, 0.0);
        assert_eq!(t.head.y, -NOTE_RADIUS);
        assert_eq!(t.lane.index(), 3);
    }

    #[test]
    fn finished_game_ignores_events() {
        let mut s = State::default();
        s.game_end = true;
        let after = reduce(s.clone(), &Event::BodySpawn(note(60, 0.0, 0.5)));
        assert_eq!(after, s);
        let after = reduce(after, &Event::Tick { elapsed: 9 });
        assert_eq!(after, s);
    }
}
