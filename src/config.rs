use crate::chart::{LANE_COUNT, Lane};
use crate::error::ConfigError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ── Playfield geometry (canvas units) ───────────────────────────────────────

pub const CANVAS_WIDTH: f64 = 200.0;
pub const CANVAS_HEIGHT: f64 = 400.0;
pub const NOTE_RADIUS: f64 = 0.07 * CANVAS_WIDTH;
pub const TAIL_WIDTH: f64 = 10.0;
/// Vertical position of the target circles.
pub const BASELINE_Y: f64 = 350.0;
/// Extra distance above the targets at which a falling tail counts as arrived.
pub const TAIL_ARRIVAL_MARGIN: f64 = 20.0;
/// A collided tail shorter than this is consumed.
pub const TAIL_CONSUMED_LENGTH: f64 = 10.0;
/// Score accrued per tick by every held tail.
pub const HOLD_SCORE_PER_TICK: f64 = 0.05;

/// Horizontal centre of a lane: 20, 40, 60 and 80 percent of the width.
pub fn lane_x(lane: Lane) -> f64 {
    CANVAS_WIDTH * (20.0 + 20.0 * lane.index() as f64) / 100.0
}

// ── Simulation tuning ───────────────────────────────────────────────────────

/// The part of the configuration the simulation itself depends on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    #[serde(default = "Tuning::default_tick_ms")]
    pub tick_ms: u64,
    /// Units every object falls per tick.
    #[serde(default = "Tuning::default_difficulty")]
    pub difficulty: f64,
}

impl Tuning {
    fn default_tick_ms() -> u64 {
        50
    }
    fn default_difficulty() -> f64 {
        7.0
    }

    pub fn ticks_per_second(&self) -> f64 {
        1000.0 / self.tick_ms.max(1) as f64
    }

    /// Objects must move down every tick or the chart never drains.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty.is_finite() && self.difficulty > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::Difficulty(self.difficulty))
        }
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tick_ms: Self::default_tick_ms(),
            difficulty: Self::default_difficulty(),
        }
    }
}

// ── Front-end configuration ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(flatten)]
    pub tuning: Tuning,
    #[serde(default = "TimingConfig::default_render_fps")]
    pub render_fps: u32,
}

impl TimingConfig {
    fn default_render_fps() -> u32 {
        60
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tuning: Tuning::default(),
            render_fps: Self::default_render_fps(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyConfig {
    #[serde(default = "KeyConfig::default_lanes")]
    pub lanes: [String; LANE_COUNT],
}

impl KeyConfig {
    fn default_lanes() -> [String; LANE_COUNT] {
        ["h", "j", "k", "l"].map(String::from)
    }

    /// The key character bound to each lane, in lane order.
    pub fn lane_chars(&self) -> Result<[char; LANE_COUNT], ConfigError> {
        let mut out = ['\0'; LANE_COUNT];
        for (slot, key) in out.iter_mut().zip(&self.lanes) {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => *slot = c.to_ascii_lowercase(),
                _ => return Err(ConfigError::LaneKey(key.clone())),
            }
        }
        Ok(out)
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            lanes: Self::default_lanes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Hold time assumed for a key when the terminal cannot report releases.
    #[serde(default = "InputConfig::default_release_timeout_ms")]
    pub release_timeout_ms: u64,
    /// Presses closer together than this are auto-repeat; wider gaps are new taps.
    #[serde(default = "InputConfig::default_repeat_gap_ms")]
    pub repeat_gap_ms: u64,
}

impl InputConfig {
    fn default_release_timeout_ms() -> u64 {
        600
    }
    fn default_repeat_gap_ms() -> u64 {
        100
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            release_timeout_ms: Self::default_release_timeout_ms(),
            repeat_gap_ms: Self::default_repeat_gap_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "AudioConfig::default_volume")]
    pub volume: f32,
}

impl AudioConfig {
    fn default_enabled() -> bool {
        true
    }
    fn default_volume() -> f32 {
        0.5
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            volume: Self::default_volume(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub keys: KeyConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

impl GameConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: GameConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.keys.lane_chars()?;
        cfg.timing.tuning.validate()?;
        Ok(cfg)
    }

    /// Loads `path` if it exists, falling back to defaults when it is
    /// missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("{err}. Using defaults.");
                Self::default()
            }
        }
    }
}
