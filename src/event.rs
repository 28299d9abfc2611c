use crate::chart::{Lane, Note};

/// Stable identity of a spawned body or tail. Presentation keys on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// Everything that can change the game state.
///
/// Events are produced by the [`EventMerger`](crate::scheduler::EventMerger)
/// and are the only inputs to [`reduce`](crate::reducer::reduce).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Clock tick. `elapsed` counts ticks since the session started.
    Tick { elapsed: u64 },
    /// Edge-triggered lane key transition.
    KeyPress { lane: Lane, pressed: bool },
    /// A short note reaches its onset.
    BodySpawn(Note),
    /// A sustained note reaches its onset.
    TailSpawn(Note),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Tick { .. } => "tick",
            Event::KeyPress { .. } => "key",
            Event::BodySpawn(_) => "body-spawn",
            Event::TailSpawn(_) => "tail-spawn",
        }
    }

    pub fn is_spawn(&self) -> bool {
        matches!(self, Event::BodySpawn(_) | Event::TailSpawn(_))
    }
}
