//! notefall - a four-lane falling-note rhythm game.
//!
//! The simulation core is a pure fold of [`event::Event`]s into
//! [`state::State`] snapshots:
//!
//! - [`scheduler`] turns a chart, a fixed-period clock and lane keys into
//!   one time-ordered event sequence
//! - [`reducer`] dispatches each event to body/tail creation, key handling
//!   ([`scoring`]) or tick advancement ([`physics`])
//! - [`session`] owns the authoritative state and detects the end of the game
//!
//! The terminal front end lives in [`render`], [`audio`] and [`presenter`];
//! they only read snapshots.
//!
//! ```
//! use notefall::chart::Note;
//! use notefall::config::Tuning;
//! use notefall::reducer::AllVisible;
//! use notefall::session::Session;
//!
//! let note = Note {
//!     user_played: true,
//!     instrument_name: "piano".into(),
//!     velocity: 0.8,
//!     pitch: 60,
//!     start: 0.0,
//!     end: 0.25,
//! };
//! let mut session = Session::new(&[note], Tuning::default());
//! let snapshots = session.advance(100, &AllVisible);
//! assert_eq!(snapshots.last().unwrap().active_bodies.len(), 1);
//! ```

pub mod audio;
pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod physics;
pub mod presenter;
pub mod reducer;
pub mod render;
pub mod scheduler;
pub mod scoring;
pub mod session;
pub mod state;
