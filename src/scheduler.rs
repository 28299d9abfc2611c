//! Turns the chart, the clock and the keyboard into one ordered event stream.
//!
//! Every source is reduced to events stamped with the millisecond (relative
//! to session start) at which they become due. The [`EventMerger`] keeps
//! them in a priority queue and hands them out in time order. At equal
//! times spawns come first, then key transitions, then ticks; within a
//! class, insertion order wins.

use crate::chart::{LANE_COUNT, Lane, Note};
use crate::config::Tuning;
use crate::event::Event;
use log::{debug, trace};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Milliseconds after session start at which a note spawns.
pub fn spawn_delay_ms(note: &Note) -> u64 {
    (note.start.max(0.0) * 1000.0).round() as u64
}

/// `BodySpawn` for every short note, stamped with its onset.
pub fn body_spawns(notes: &[Note]) -> impl Iterator<Item = (u64, Event)> + '_ {
    notes
        .iter()
        .filter(|n| !n.is_sustained())
        .map(|n| (spawn_delay_ms(n), Event::BodySpawn(n.clone())))
}

/// `TailSpawn` for every played sustained note, stamped with its onset.
pub fn tail_spawns(notes: &[Note]) -> impl Iterator<Item = (u64, Event)> + '_ {
    notes
        .iter()
        .filter(|n| n.user_played && n.is_sustained())
        .map(|n| (spawn_delay_ms(n), Event::TailSpawn(n.clone())))
}

/// Fixed-period clock. Tick `k` carries `elapsed = k` and is due at
/// `(k + 1) * period`.
#[derive(Debug, Clone)]
pub struct TickClock {
    period_ms: u64,
    next: u64,
}

impl TickClock {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            next: 0,
        }
    }

    pub fn next_due_ms(&self) -> u64 {
        (self.next + 1) * self.period_ms
    }

    /// Returns the next tick if it is due at or before `now_ms`.
    pub fn poll(&mut self, now_ms: u64) -> Option<(u64, Event)> {
        let at = self.next_due_ms();
        if at > now_ms {
            return None;
        }
        let elapsed = self.next;
        self.next += 1;
        Some((at, Event::Tick { elapsed }))
    }
}

/// Edge filter for lane keys: only real press/release transitions pass.
#[derive(Debug, Clone, Default)]
pub struct KeyLatch {
    down: [bool; LANE_COUNT],
}

impl KeyLatch {
    pub fn observe(&mut self, lane: Lane, pressed: bool) -> Option<Event> {
        let slot = &mut self.down[lane.index()];
        if *slot == pressed {
            return None;
        }
        *slot = pressed;
        Some(Event::KeyPress { lane, pressed })
    }

    pub fn is_down(&self, lane: Lane) -> bool {
        self.down[lane.index()]
    }
}

#[derive(Debug)]
struct Scheduled {
    at_ms: u64,
    class: u8,
    seq: u64,
    event: Event,
}

impl Scheduled {
    fn key(&self) -> (u64, u8, u64) {
        (self.at_ms, self.class, self.seq)
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

fn class_of(event: &Event) -> u8 {
    match event {
        Event::BodySpawn(_) | Event::TailSpawn(_) => 0,
        Event::KeyPress { .. } => 1,
        Event::Tick { .. } => 2,
    }
}

/// Merges spawn schedules, the tick clock and key input into one ordered
/// sequence.
///
/// Spawns are finite; ticks and keys continue until the merger is dropped.
pub struct EventMerger {
    queue: BinaryHeap<Reverse<Scheduled>>,
    clock: TickClock,
    latch: KeyLatch,
    pending_spawns: usize,
    seq: u64,
}

impl EventMerger {
    pub fn new(notes: &[Note], tuning: Tuning) -> Self {
        let mut merger = Self {
            queue: BinaryHeap::new(),
            clock: TickClock::new(tuning.tick_ms),
            latch: KeyLatch::default(),
            pending_spawns: 0,
            seq: 0,
        };
        for (at_ms, event) in body_spawns(notes).chain(tail_spawns(notes)) {
            merger.schedule(at_ms, event);
        }
        debug!(
            "scheduled {} spawns from {} notes",
            merger.pending_spawns,
            notes.len()
        );
        merger
    }

    fn schedule(&mut self, at_ms: u64, event: Event) {
        if event.is_spawn() {
            self.pending_spawns += 1;
        }
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Reverse(Scheduled {
            at_ms,
            class: class_of(&event),
            seq,
            event,
        }));
    }

    /// Records a raw key state at `now_ms`. Repeats of the current state
    /// are dropped.
    pub fn key(&mut self, now_ms: u64, lane: Lane, pressed: bool) {
        match self.latch.observe(lane, pressed) {
            Some(event) => self.schedule(now_ms, event),
            None => trace!("suppressed repeat on lane {}", lane.index()),
        }
    }

    pub fn is_key_down(&self, lane: Lane) -> bool {
        self.latch.is_down(lane)
    }

    /// Pops the earliest event due at or before `now_ms`.
    pub fn next_due(&mut self, now_ms: u64) -> Option<Event> {
        while let Some((at_ms, tick)) = self.clock.poll(now_ms) {
            self.schedule(at_ms, tick);
        }
        if self.queue.peek().is_some_and(|Reverse(s)| s.at_ms <= now_ms) {
            let Reverse(scheduled) = self.queue.pop()?;
            if scheduled.event.is_spawn() {
                self.pending_spawns -= 1;
            }
            return Some(scheduled.event);
        }
        None
    }

    /// Every event due at or before `now_ms`, in order.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<Event> {
        std::iter::from_fn(|| self.next_due(now_ms)).collect()
    }

    /// When the next queued or clock event becomes due.
    pub fn next_deadline_ms(&self) -> u64 {
        let clock = self.clock.next_due_ms();
        self.queue
            .peek()
            .map_or(clock, |Reverse(s)| s.at_ms.min(clock))
    }

    /// All chart spawns have been delivered.
    pub fn spawns_exhausted(&self) -> bool {
        self.pending_spawns == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(user_played: bool, start: f64, end: f64) -> Note {
        Note {
            user_played,
            instrument_name: "trumpet".into(),
            velocity: 0.7,
            pitch: 64,
            start,
            end,
        }
    }

    #[test]
    fn notes_split_into_bodies_and_tails() {
        let notes = vec![
            note(true, 0.0, 0.5),
            note(false, 0.2, 1.2),
            note(true, 0.5, 1.5),
            note(true, 1.0, 3.0),
            note(false, 1.0, 4.0),
        ];
        assert_eq!(body_spawns(&notes).count(), 3);
        assert_eq!(tail_spawns(&notes).count(), 1);
        let (at, ev) = tail_spawns(&notes).next().unwrap();
        assert_eq!(at, 1000);
        assert!(matches!(ev, Event::TailSpawn(ref n) if n.end == 3.0));
    }

    #[test]
    fn clock_ticks_on_period_boundaries() {
        let mut clock = TickClock::new(50);
        assert!(clock.poll(49).is_none());
        assert_eq!(clock.poll(50), Some((50, Event::Tick { elapsed: 0 })));
        assert!(clock.poll(50).is_none());
        assert_eq!(clock.poll(200), Some((100, Event::Tick { elapsed: 1 })));
        assert_eq!(clock.poll(200), Some((150, Event::Tick { elapsed: 2 })));
    }

    #[test]
    fn latch_only_passes_transitions() {
        let lane = Lane::new(2).unwrap();
        let mut latch = KeyLatch::default();
        assert!(latch.observe(lane, false).is_none());
        assert!(latch.observe(lane, true).is_some());
        assert!(latch.observe(lane, true).is_none());
        assert!(latch.observe(lane, false).is_some());
    }

    #[test]
    fn merger_orders_by_time_with_spawns_first() {
        let notes = vec![note(true, 0.1, 0.3), note(true, 0.05, 0.2)];
        let mut merger = EventMerger::new(
            &notes,
            Tuning {
                tick_ms: 50,
                difficulty: 7.0,
            },
        );
        assert!(!merger.spawns_exhausted());
        let events = merger.drain_due(100);
        let kinds: Vec<&str> = events.iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec!["body-spawn", "tick", "body-spawn", "tick"]
        );
        assert!(matches!(events[0], Event::BodySpawn(ref n) if n.start == 0.05));
        assert!(merger.spawns_exhausted());
        assert_eq!(merger.next_deadline_ms(), 150);
    }

    #[test]
    fn merger_dedupes_keys() {
        let mut merger = EventMerger::new(&[], Tuning::default());
        let lane = Lane::new(0).unwrap();
        merger.key(10, lane, true);
        merger.key(12, lane, true);
        merger.key(20, lane, false);
        let events = merger.drain_due(30);
        assert_eq!(
            events,
            vec![
                Event::KeyPress {
                    lane,
                    pressed: true
                },
                Event::KeyPress {
                    lane,
                    pressed: false
                },
            ]
        );
        assert!(merger.spawns_exhausted());
    }
}
