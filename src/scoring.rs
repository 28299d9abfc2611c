//! Key handling: tail holds, body hits, combo and mis-press feedback.

use crate::chart::{Lane, Note};
use crate::reducer::Visibility;
use crate::state::{Body, State, target};
use log::debug;

/// Instruments a mis-press can sound with.
pub const FEEDBACK_INSTRUMENTS: [&str; 4] = ["piano", "violin", "flute", "bass-electric"];
const FEEDBACK_PITCH_BASE: i32 = 75;
const FEEDBACK_PITCH_SPAN: u64 = 25;
const FEEDBACK_MIN_S: f64 = 0.1;
const FEEDBACK_MAX_S: f64 = 0.5;

const LCG_MODULUS: u64 = 1 << 31;

/// Combo bonus: +0.2 for every 10 consecutive hits.
pub fn multiplier_for(consecutive_hits: u32) -> f64 {
    1.0 + (consecutive_hits / 10) as f64 * 0.2
}

/// `(1103515245 * seed + 12345) mod 2^31`.
pub fn lcg_hash(seed: u64) -> u64 {
    seed.wrapping_mul(1_103_515_245).wrapping_add(12_345) % LCG_MODULUS
}

fn unit(hash: u64) -> f64 {
    hash as f64 / LCG_MODULUS as f64
}

/// The note sounded on a mis-press. A pure function of `time`.
pub fn feedback_note(time: u64) -> Note {
    let instrument = (unit(lcg_hash(time)) * FEEDBACK_INSTRUMENTS.len() as f64) as usize;
    let pitch = (unit(lcg_hash(time + 1)) * FEEDBACK_PITCH_SPAN as f64) as i32;
    let duration = FEEDBACK_MIN_S + unit(lcg_hash(time + 2)) * (FEEDBACK_MAX_S - FEEDBACK_MIN_S);
    Note {
        user_played: false,
        instrument_name: FEEDBACK_INSTRUMENTS[instrument.min(FEEDBACK_INSTRUMENTS.len() - 1)]
            .to_string(),
        velocity: 1.0,
        pitch: FEEDBACK_PITCH_BASE + pitch,
        start: -1.0,
        end: duration,
    }
}

fn hittable(body: &Body, lane: Lane, visible: &dyn Visibility) -> bool {
    body.lane == lane
        && body.circle().touches(&target(lane))
        && visible.is_visible(body.id)
        && body.note.user_played
}

/// Applies a lane key transition.
///
/// Holding is lane-exclusive: any event other than a press on a tail's own
/// lane clears its hold.
pub fn handle_key_press(
    mut state: State,
    lane: Lane,
    pressed: bool,
    visible: &dyn Visibility,
) -> State {
    let mut holds_started = 0usize;
    for tail in &mut state.collided_tails {
        if pressed && tail.lane == lane {
            if !tail.is_pressed {
                tail.is_pressed = true;
                tail.has_attacked = true;
                holds_started += 1;
            }
        } else {
            tail.is_pressed = false;
        }
    }

    let mut hits = Vec::new();
    if pressed {
        let (hit, rest): (Vec<Body>, Vec<Body>) = std::mem::take(&mut state.active_bodies)
            .into_iter()
            .partition(|b| hittable(b, lane, visible));
        state.active_bodies = rest;
        hits = hit;
    }

    if holds_started > 0 || !hits.is_empty() {
        state.score += hits.len() as f64 * state.multiplier;
        state.consecutive_hits += 1;
        state.multiplier = multiplier_for(state.consecutive_hits);
        for mut body in hits {
            debug!("hit body {:?} on lane {}", body.id, lane.index());
            body.clicked = true;
            state.exit.push(body);
        }
    } else if pressed {
        debug!("mis-press on lane {} at tick {}", lane.index(), state.time);
        state.missed_clicks += 1;
        state.consecutive_hits = 0;
        state.multiplier = 1.0;
        let note = feedback_note(state.time);
        state.pending_feedback_notes.push(note);
    }
    state
}
