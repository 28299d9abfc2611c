//! The driver that owns the authoritative state, and end-of-game detection.

use crate::chart::{Lane, Note};
use crate::config::Tuning;
use crate::event::Event;
use crate::reducer::{Visibility, reduce_with};
use crate::scheduler::EventMerger;
use crate::state::State;
use log::{debug, info};

/// The game is over once the chart has nothing left to spawn and every
/// object collection, including the one-shot exit lists, is empty.
pub fn should_end(spawns_exhausted: bool, state: &State) -> bool {
    spawns_exhausted && state.is_settled()
}

/// One play-through of a chart.
///
/// Events are pulled from the merger in order and folded into the state
/// one at a time; every reduction yields a snapshot. After the terminal
/// snapshot the merger is dropped and nothing else is processed.
pub struct Session {
    merger: Option<EventMerger>,
    state: State,
}

impl Session {
    pub fn new(notes: &[Note], tuning: Tuning) -> Self {
        info!(
            "starting session: {} notes, {} ms ticks",
            notes.len(),
            tuning.tick_ms
        );
        Self {
            merger: Some(EventMerger::new(notes, tuning)),
            state: State::new(tuning),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.game_end
    }

    /// Forwards a raw key state. Ignored once the game is over.
    pub fn key(&mut self, now_ms: u64, lane: Lane, pressed: bool) {
        if let Some(merger) = &mut self.merger {
            merger.key(now_ms, lane, pressed);
        }
    }

    pub fn is_key_down(&self, lane: Lane) -> bool {
        self.merger.as_ref().is_some_and(|m| m.is_key_down(lane))
    }

    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.merger.as_ref().map(EventMerger::next_deadline_ms)
    }

    /// Processes every event due by `now_ms` and returns the snapshot after
    /// each reduction, ending with the terminal one if the game finished.
    pub fn advance(&mut self, now_ms: u64, visible: &dyn Visibility) -> Vec<State> {
        let mut snapshots = Vec::new();
        if self.finish_if_done(&mut snapshots) {
            return snapshots;
        }
        while let Some(event) = self.next_event(now_ms) {
            self.apply(&event, visible);
            snapshots.push(self.state.clone());
            if self.finish_if_done(&mut snapshots) {
                break;
            }
        }
        snapshots
    }

    fn next_event(&mut self, now_ms: u64) -> Option<Event> {
        self.merger.as_mut()?.next_due(now_ms)
    }

    fn apply(&mut self, event: &Event, visible: &dyn Visibility) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce_with(state, event, visible);
    }

    fn finish_if_done(&mut self, snapshots: &mut Vec<State>) -> bool {
        let Some(merger) = &self.merger else {
            return true;
        };
        if !should_end(merger.spawns_exhausted(), &self.state) {
            return false;
        }
        debug!("chart exhausted and field empty at tick {}", self.state.time);
        info!(
            "game over: score {:.1}, {} missed",
            self.state.score, self.state.missed_clicks
        );
        self.state.clear_one_shot();
        self.state.game_end = true;
        self.merger = None;
        snapshots.push(self.state.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::AllVisible;

    #[test]
    fn empty_chart_ends_immediately() {
        let mut session = Session::new(&[], Tuning::default());
        let snaps = session.advance(0, &AllVisible);
        assert_eq!(snaps.len(), 1);
        assert!(snaps[0].game_end);
        assert!(session.is_finished());
        assert!(session.advance(10_000, &AllVisible).is_empty());
    }

    #[test]
    fn pending_spawn_keeps_game_alive() {
        let note = Note {
            user_played: true,
            instrument_name: "piano".into(),
            velocity: 1.0,
            pitch: 60,
            start: 1.0,
            end: 1.2,
        };
        let mut session = Session::new(&[note], Tuning::default());
        let snaps = session.advance(500, &AllVisible);
        assert!(snaps.iter().all(|s| !s.game_end));
        assert!(!session.is_finished());
    }

    #[test]
    fn should_end_needs_exhausted_spawns() {
        let s = State::default();
        assert!(!should_end(false, &s));
        assert!(should_end(true, &s));
    }
}
