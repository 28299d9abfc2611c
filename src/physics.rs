//! Per-tick advancement: expiry, tail arrival, consumption, shaving and motion.

use crate::chart::Lane;
use crate::config::{
    BASELINE_Y, HOLD_SCORE_PER_TICK, NOTE_RADIUS, TAIL_ARRIVAL_MARGIN, TAIL_CONSUMED_LENGTH,
};
use crate::state::{Body, State, Tail, target};
use log::debug;

/// A body below this line has passed its target.
fn expired(body: &Body) -> bool {
    body.y > BASELINE_Y
}

/// A tail whose lower edge is past this line has arrived at the targets.
fn arrived(tail: &Tail) -> bool {
    tail.y_end > BASELINE_Y - NOTE_RADIUS - TAIL_ARRIVAL_MARGIN
}

fn consumed(tail: &Tail) -> bool {
    tail.y_start > 0.0 && tail.length() < TAIL_CONSUMED_LENGTH
}

/// Distance from the lower edge of the tail to the top of its target.
/// Negative once the tail reaches into the target.
pub fn collision_distance(tail: &Tail) -> f64 {
    target(tail.lane).top() - tail.y_end
}

/// Trims the part of a tail that has run into its target.
fn shave(mut tail: Tail) -> Tail {
    let distance = collision_distance(&tail);
    if distance <= 0.0 {
        tail.y_end = (tail.y_end - distance.abs()).max(tail.y_start);
    }
    tail
}

fn move_body(mut body: Body, step: f64) -> Body {
    body.y += step;
    body
}

fn move_tail(mut tail: Tail, step: f64) -> Tail {
    tail.y_start += step;
    tail.y_end += step;
    tail.head.y += step;
    tail
}

fn head_threshold(lane: Lane) -> f64 {
    let t = target(lane);
    t.y + t.radius
}

/// Advances the simulation by one tick.
///
/// Classification happens on the positions from the previous tick, before
/// anything moves, and shaving happens before the uniform motion step.
pub fn tick(mut state: State, elapsed: u64) -> State {
    let step = state.tuning.difficulty;

    let (expired_bodies, active_bodies): (Vec<Body>, Vec<Body>) =
        std::mem::take(&mut state.active_bodies)
            .into_iter()
            .partition(expired);
    let (exit, bg_exit): (Vec<Body>, Vec<Body>) = expired_bodies
        .into_iter()
        .partition(|b| b.note.user_played);

    let (newly_collided, active_tails): (Vec<Tail>, Vec<Tail>) =
        std::mem::take(&mut state.active_tails)
            .into_iter()
            .partition(arrived);

    let (tail_exit, still_collided): (Vec<Tail>, Vec<Tail>) =
        std::mem::take(&mut state.collided_tails)
            .into_iter()
            .partition(consumed);

    for t in &newly_collided {
        debug!("tail {:?} reached the baseline", t.id);
    }
    for t in &tail_exit {
        debug!("tail {:?} consumed", t.id);
    }

    let collided: Vec<Tail> = still_collided
        .into_iter()
        .chain(newly_collided)
        .map(shave)
        .collect();

    let held = collided.iter().filter(|t| t.is_pressed).count();
    state.score += held as f64 * HOLD_SCORE_PER_TICK;

    let mut head_exit = Vec::new();
    let collided: Vec<Tail> = collided
        .into_iter()
        .map(|t| {
            let before = t.head.y;
            let moved = move_tail(t, step);
            let threshold = head_threshold(moved.lane);
            if before <= threshold && moved.head.y > threshold {
                head_exit.push(moved.id);
            }
            moved
        })
        .collect();

    state.time = elapsed;
    state.exit = exit;
    state.bg_exit = bg_exit;
    state.tail_exit = tail_exit;
    state.head_exit = head_exit;
    state.active_bodies = active_bodies
        .into_iter()
        .map(|b| move_body(b, step))
        .collect();
    state.active_tails = active_tails
        .into_iter()
        .map(|t| move_tail(t, step))
        .collect();
    state.collided_tails = collided;
    state.pending_feedback_notes.clear();
    state
}
