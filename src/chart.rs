//! Chart notes and the CSV chart loader.
//!
//! A chart is a header row followed by one note per line:
//!
//! ```text
//! user_played,instrument_name,velocity,pitch,start,end
//! True,piano,90,61,0.5,0.75
//! ```
//!
//! `velocity` is a MIDI velocity (0-127) scaled to 0-1 on load, `start`
//! and `end` are seconds from the start of the song.

use crate::error::ChartError;
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Notes longer than this many seconds become sustained tails.
pub const SUSTAIN_THRESHOLD_S: f64 = 1.0;

pub const LANE_COUNT: usize = 4;

const FIELD_COUNT: usize = 6;

/// A single note of the chart. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub user_played: bool,
    pub instrument_name: String,
    pub velocity: f32,
    pub pitch: i32,
    pub start: f64,
    pub end: f64,
}

impl Note {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_sustained(&self) -> bool {
        self.duration() > SUSTAIN_THRESHOLD_S
    }

    pub fn lane(&self) -> Lane {
        Lane::from_pitch(self.pitch)
    }

    /// How long the note sounds. Notes with a negative onset play
    /// immediately for `end` seconds.
    pub fn sounding_duration(&self) -> f64 {
        if self.start < 0.0 {
            self.end
        } else {
            self.duration()
        }
    }

    /// Whether the note names an instrument. Notes without one are never spawned.
    pub fn has_instrument(&self) -> bool {
        !self.instrument_name.trim().is_empty()
    }
}

/// One of the four target columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lane(u8);

impl Lane {
    pub const ALL: [Lane; LANE_COUNT] = [Lane(0), Lane(1), Lane(2), Lane(3)];

    pub fn new(index: usize) -> Option<Lane> {
        (index < LANE_COUNT).then_some(Lane(index as u8))
    }

    pub fn from_pitch(pitch: i32) -> Lane {
        Lane(pitch.rem_euclid(LANE_COUNT as i32) as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn color(self) -> LaneColor {
        match self.0 {
            0 => LaneColor::Green,
            1 => LaneColor::Red,
            2 => LaneColor::Blue,
            _ => LaneColor::Yellow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneColor {
    Green,
    Red,
    Blue,
    Yellow,
}

/// Reads and parses a chart file. See [`parse_chart`].
pub fn load_chart(path: impl AsRef<Path>, strict: bool) -> Result<Vec<Note>, ChartError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ChartError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_chart(&contents, strict)
}

/// Parses chart text into notes, in file order.
///
/// Blank lines are ignored. A malformed row is skipped with a warning, or
/// returned as an error when `strict` is set. A row with an empty instrument
/// name is kept: spawning skips it later.
pub fn parse_chart(contents: &str, strict: bool) -> Result<Vec<Note>, ChartError> {
    let mut lines = contents.lines().enumerate();
    if lines.next().is_none() {
        return Err(ChartError::MissingHeader);
    }

    let mut notes = Vec::new();
    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(idx + 1, line) {
            Ok(note) => notes.push(note),
            Err(err) if strict => return Err(err),
            Err(err) => warn!("skipping chart row: {err}"),
        }
    }
    debug!("parsed {} notes", notes.len());
    Ok(notes)
}

fn parse_row(line: usize, row: &str) -> Result<Note, ChartError> {
    let fields: Vec<&str> = row.split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(ChartError::FieldCount {
            line,
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    let invalid = |field: &'static str, value: &str| ChartError::InvalidField {
        line,
        field,
        value: value.to_string(),
    };

    let velocity: f32 = fields[2]
        .parse()
        .map_err(|_| invalid("velocity", fields[2]))?;
    let pitch: i32 = fields[3].parse().map_err(|_| invalid("pitch", fields[3]))?;
    let start: f64 = fields[4].parse().map_err(|_| invalid("start", fields[4]))?;
    let end: f64 = fields[5].parse().map_err(|_| invalid("end", fields[5]))?;
    if !start.is_finite() {
        return Err(invalid("start", fields[4]));
    }
    if !end.is_finite() {
        return Err(invalid("end", fields[5]));
    }

    Ok(Note {
        user_played: fields[0] == "True",
        instrument_name: fields[1].to_string(),
        velocity: (velocity / 127.0).clamp(0.0, 1.0),
        pitch,
        start,
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = "user_played,instrument_name,velocity,pitch,start,end
True,piano,127,60,0.5,0.75
False,violin,64,57,1.0,3.5

True,,100,62,2.0,2.2
";

    #[test]
    fn parses_rows_and_scales_velocity() {
        let notes = parse_chart(CHART, true).unwrap();
        assert_eq!(notes.len(), 3);
        assert!(notes[0].user_played);
        assert_eq!(notes[0].instrument_name, "piano");
        assert!((notes[0].velocity - 1.0).abs() < 1e-6);
        assert!(!notes[1].user_played);
        assert!((notes[1].velocity - 64.0 / 127.0).abs() < 1e-6);
        assert!(notes[1].is_sustained());
        assert!(!notes[0].is_sustained());
    }

    #[test]
    fn empty_instrument_is_kept_but_flagged() {
        let notes = parse_chart(CHART, true).unwrap();
        assert!(!notes[2].has_instrument());
    }

    #[test]
    fn malformed_row_is_skipped_unless_strict() {
        let chart = "header\nTrue,piano,100,60,zero,1.0\nTrue,piano,100,61,1.0,1.5\n";
        let lenient = parse_chart(chart, false).unwrap();
        assert_eq!(lenient.len(), 1);
        assert_eq!(lenient[0].pitch, 61);

        match parse_chart(chart, true) {
            Err(ChartError::InvalidField { line, field, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(field, "start");
            }
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn wrong_field_count_is_reported() {
        let err = parse_chart("header\nTrue,piano,100\n", true).unwrap_err();
        assert!(matches!(
            err,
            ChartError::FieldCount {
                line: 2,
                expected: 6,
                found: 3
            }
        ));
    }

    #[test]
    fn empty_text_has_no_header() {
        assert!(matches!(
            parse_chart("", false),
            Err(ChartError::MissingHeader)
        ));
    }

    #[test]
    fn lane_wraps_pitch_modulo_four() {
        assert_eq!(Lane::from_pitch(60).index(), 0);
        assert_eq!(Lane::from_pitch(61).index(), 1);
        assert_eq!(Lane::from_pitch(63).index(), 3);
        assert_eq!(Lane::from_pitch(-1).index(), 3);
        assert_eq!(Lane::from_pitch(61).color(), LaneColor::Red);
    }
}
