use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Chart CSV to play
    #[arg(value_name = "CHART")]
    pub chart: PathBuf,

    /// Path to config TOML
    #[arg(long, default_value = "notefall.toml")]
    pub config: PathBuf,

    /// Where to write logs (the terminal is taken by the game)
    #[arg(long, default_value = "notefall.log")]
    pub log_file: PathBuf,

    /// Tick period in milliseconds (overrides config)
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Units an object falls per tick (overrides config)
    #[arg(long, value_parser = positive_f64)]
    pub difficulty: Option<f64>,

    /// Fail on the first malformed chart row instead of skipping it
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    /// Run without sound
    #[arg(long, default_value_t = false)]
    pub mute: bool,
}

fn positive_f64(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} is not a positive number"))
    }
}
