//! Consumes snapshots on behalf of the renderer and the audio sink.
//!
//! Every snapshot must pass through [`Presenter::observe`] so no one-shot
//! list is lost; drawing may happen at a lower rate.

use crate::audio::NoteSink;
use crate::chart::LANE_COUNT;
use crate::event::ObjectId;
use crate::reducer::Visibility;
use crate::render::{self, Overlay, PixelBuf};
use crate::state::State;
use std::collections::HashSet;

/// Frames the field stays tinted after a mis-press.
const FLASH_FRAMES: u8 = 3;

pub struct Presenter<S: NoteSink> {
    sink: S,
    /// Bodies the player has seen at least once.
    shown: HashSet<ObjectId>,
    /// Tails with a sustained voice running.
    sounding: HashSet<ObjectId>,
    flash_frames: u8,
    ended: bool,
}

impl<S: NoteSink> Presenter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            shown: HashSet::new(),
            sounding: HashSet::new(),
            flash_frames: 0,
            ended: false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Forgets everything about the previous session and silences held voices.
    pub fn reset(&mut self) {
        for id in self.sounding.drain() {
            self.sink.release(id);
        }
        self.shown.clear();
        self.flash_frames = 0;
        self.ended = false;
    }

    /// Triggers the audio for one snapshot and retires the objects that left.
    pub fn observe(&mut self, state: &State) {
        for body in &state.exit {
            if body.clicked {
                self.sink.play(&body.note);
            }
            self.shown.remove(&body.id);
        }
        for body in &state.bg_exit {
            self.sink.play(&body.note);
            self.shown.remove(&body.id);
        }
        for tail in &state.tail_exit {
            if self.sounding.remove(&tail.id) {
                self.sink.release(tail.id);
            }
        }
        for tail in &state.collided_tails {
            if tail.is_pressed && tail.has_attacked && self.sounding.insert(tail.id) {
                self.sink.attack(tail.id, &tail.note);
            } else if !tail.is_pressed && self.sounding.remove(&tail.id) {
                self.sink.release(tail.id);
            }
        }
        if !state.pending_feedback_notes.is_empty() {
            self.flash_frames = FLASH_FRAMES;
        }
        for note in &state.pending_feedback_notes {
            self.sink.play(note);
        }
        if state.game_end && !self.ended {
            self.ended = true;
            self.sounding.clear();
            self.sink.game_over();
        }
    }

    /// Draws a snapshot and marks its bodies as shown.
    pub fn draw(&mut self, state: &State, keys_down: [bool; LANE_COUNT], buf: &mut PixelBuf) {
        let overlay = Overlay {
            keys_down,
            flash: self.flash_frames > 0,
        };
        self.flash_frames = self.flash_frames.saturating_sub(1);
        render::draw(state, &overlay, buf);
        self.shown.extend(state.active_bodies.iter().map(|b| b.id));
    }
}

impl<S: NoteSink> Visibility for Presenter<S> {
    fn is_visible(&self, id: ObjectId) -> bool {
        self.shown.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{Lane, Note};
    use crate::event::Event;
    use crate::reducer::{reduce, reduce_with};

    #[derive(Default)]
    struct Recorder {
        played: Vec<Note>,
        attacks: Vec<ObjectId>,
        releases: Vec<ObjectId>,
        game_overs: usize,
    }

    impl NoteSink for Recorder {
        fn play(&mut self, note: &Note) {
            self.played.push(note.clone());
        }
        fn attack(&mut self, id: ObjectId, _note: &Note) {
            self.attacks.push(id);
        }
        fn release(&mut self, id: ObjectId) {
            self.releases.push(id);
        }
        fn game_over(&mut self) {
            self.game_overs += 1;
        }
    }

    fn note(pitch: i32, end: f64) -> Note {
        Note {
            user_played: true,
            instrument_name: "piano".into(),
            velocity: 1.0,
            pitch,
            start: 0.0,
            end,
        }
    }

    fn press(lane: usize, pressed: bool) -> Event {
        Event::KeyPress {
            lane: Lane::new(lane).unwrap(),
            pressed,
        }
    }

    #[test]
    fn undrawn_bodies_cannot_be_hit() {
        let mut presenter = Presenter::new(Recorder::default());
        let mut s = reduce(State::default(), &Event::BodySpawn(note(60, 0.2)));
        s.active_bodies[0].y = 350.0;

        let missed = reduce_with(s.clone(), &press(0, true), &presenter);
        assert_eq!(missed.missed_clicks, 1);

        let mut buf = PixelBuf::new(60, 40);
        presenter.draw(&s, [false; LANE_COUNT], &mut buf);
        let hit = reduce_with(s, &press(0, true), &presenter);
        assert_eq!(hit.exit.len(), 1);

        presenter.observe(&hit);
        assert_eq!(presenter.sink().played.len(), 1);
        assert!(!presenter.is_visible(hit.exit[0].id));
    }

    #[test]
    fn held_tail_attacks_once_and_releases() {
        let mut presenter = Presenter::new(Recorder::default());
        let mut s = reduce(State::default(), &Event::TailSpawn(note(62, 4.0)));
        let tail = s.active_tails.remove(0);
        let id = tail.id;
        s.collided_tails.push(tail);

        let s = reduce(s, &press(2, true));
        presenter.observe(&s);
        let s = reduce(s, &Event::Tick { elapsed: 1 });
        presenter.observe(&s);
        assert_eq!(presenter.sink().attacks, vec![id]);

        let s = reduce(s, &press(2, false));
        presenter.observe(&s);
        assert_eq!(presenter.sink().releases, vec![id]);
    }

    #[test]
    fn mis_press_sounds_feedback_and_flashes() {
        let mut presenter = Presenter::new(Recorder::default());
        let s = reduce(State::default(), &press(3, true));
        presenter.observe(&s);
        assert_eq!(presenter.sink().played, s.pending_feedback_notes);
        assert_eq!(presenter.flash_frames, FLASH_FRAMES);
    }

    #[test]
    fn game_over_is_signalled_once() {
        let mut presenter = Presenter::new(Recorder::default());
        let mut s = State::default();
        s.game_end = true;
        presenter.observe(&s);
        presenter.observe(&s);
        assert_eq!(presenter.sink().game_overs, 1);
    }
}
