use std::io;
use std::path::PathBuf;

/// Failures while loading a chart file.
#[derive(thiserror::Error, Debug)]
pub enum ChartError {
    #[error("failed to read chart {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("chart is empty, expected a header row")]
    MissingHeader,
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid {field} value {value:?}")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// Failures while loading the TOML configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("lane key {0:?} must be a single character")]
    LaneKey(String),
    #[error("difficulty must be a positive number of units per tick, got {0}")]
    Difficulty(f64),
}

/// Failures while opening the audio output.
#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("no audio output device: {0}")]
    Stream(#[from] rodio::StreamError),
    #[error("failed to create sink: {0}")]
    Play(#[from] rodio::PlayError),
}
