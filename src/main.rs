use clap::Parser;
use crossterm::{
    cursor,
    event::{
        self, Event as TermEvent, KeyCode, KeyEventKind, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, terminal,
};
use log::{LevelFilter, error, info, warn};
use notefall::audio::{Audio, Muted, NoteSink};
use notefall::chart::{LANE_COUNT, Lane, Note, load_chart};
use notefall::cli::Args;
use notefall::config::{GameConfig, Tuning};
use notefall::presenter::Presenter;
use notefall::render::PixelBuf;
use notefall::session::Session;
use std::error::Error;
use std::fs::File;
use std::io::{self, stdout};
use std::path::Path;
use std::time::{Duration, Instant};

fn init_logging(path: &Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info) // Default level
        .filter_module("rodio", LevelFilter::Warn)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Synthesizes key releases for terminals that only report presses.
///
/// Auto-repeat keeps a key held and silence for `timeout` releases it. A
/// press arriving more than `repeat_gap` after the previous one on a held
/// lane is a fresh tap, not auto-repeat.
struct LegacyHolds {
    timeout: Duration,
    repeat_gap: Duration,
    last_seen: [Option<Instant>; LANE_COUNT],
}

impl LegacyHolds {
    fn new(timeout: Duration, repeat_gap: Duration) -> Self {
        Self {
            timeout,
            repeat_gap,
            last_seen: [None; LANE_COUNT],
        }
    }

    /// Records a press. Returns true when it re-taps a lane that is still
    /// held, so the caller must release it before pressing again.
    fn seen(&mut self, lane: Lane, at: Instant) -> bool {
        let slot = &mut self.last_seen[lane.index()];
        let retap = slot.is_some_and(|t| at.saturating_duration_since(t) > self.repeat_gap);
        *slot = Some(at);
        retap
    }

    fn expired(&mut self, now: Instant) -> Vec<Lane> {
        let mut out = Vec::new();
        for lane in Lane::ALL {
            let slot = &mut self.last_seen[lane.index()];
            if slot.is_some_and(|t| now.saturating_duration_since(t) >= self.timeout) {
                *slot = None;
                out.push(lane);
            }
        }
        out
    }
}

struct Game {
    notes: Vec<Note>,
    tuning: Tuning,
    lane_keys: [char; LANE_COUNT],
    frame_dur: Duration,
    release_timeout: Duration,
    repeat_gap: Duration,
    enhanced: bool,
}

impl Game {
    fn lane_for(&self, code: KeyCode) -> Option<Lane> {
        let KeyCode::Char(c) = code else {
            return None;
        };
        let c = c.to_ascii_lowercase();
        self.lane_keys
            .iter()
            .position(|&k| k == c)
            .and_then(Lane::new)
    }

    fn run<S: NoteSink>(
        &self,
        out: &mut io::Stdout,
        presenter: &mut Presenter<S>,
    ) -> io::Result<()> {
        let (cols, rows) = terminal::size()?;
        let mut buf = PixelBuf::new(cols as usize, rows as usize * 2);

        let mut session = Session::new(&self.notes, self.tuning);
        let mut holds = LegacyHolds::new(self.release_timeout, self.repeat_gap);
        let mut start = Instant::now();
        let mut next_frame = start;

        loop {
            let now = Instant::now();
            let now_ms = now.duration_since(start).as_millis() as u64;

            // Input
            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    TermEvent::Key(key) => match key.code {
                        KeyCode::Char('q') | KeyCode::Esc if key.kind != KeyEventKind::Release => {
                            return Ok(());
                        }
                        KeyCode::Char('r') if key.kind == KeyEventKind::Press => {
                            info!("restarting chart");
                            presenter.reset();
                            session = Session::new(&self.notes, self.tuning);
                            holds = LegacyHolds::new(self.release_timeout, self.repeat_gap);
                            start = Instant::now();
                            next_frame = start;
                        }
                        code => {
                            if let Some(lane) = self.lane_for(code) {
                                match key.kind {
                                    KeyEventKind::Press => {
                                        if holds.seen(lane, now) && !self.enhanced {
                                            session.key(now_ms, lane, false);
                                        }
                                        session.key(now_ms, lane, true);
                                    }
                                    KeyEventKind::Repeat => {
                                        holds.seen(lane, now);
                                    }
                                    KeyEventKind::Release => session.key(now_ms, lane, false),
                                }
                            }
                        }
                    },
                    TermEvent::Resize(c, r) => buf.resize(c as usize, r as usize * 2),
                    _ => {}
                }
            }
            if !self.enhanced {
                for lane in holds.expired(now) {
                    session.key(now_ms, lane, false);
                }
            }

            // Update
            let now_ms = Instant::now().duration_since(start).as_millis() as u64;
            for snapshot in session.advance(now_ms, &*presenter) {
                presenter.observe(&snapshot);
            }

            // Render
            let now = Instant::now();
            if now >= next_frame {
                let keys = Lane::ALL.map(|lane| session.is_key_down(lane));
                presenter.draw(session.state(), keys, &mut buf);
                buf.render(out)?;
                next_frame = now + self.frame_dur;
            }

            // Pacing: wake for the next frame, the next event or input.
            let mut wake = next_frame;
            if let Some(deadline) = session.next_deadline_ms() {
                wake = wake.min(start + Duration::from_millis(deadline));
            }
            let wait = wake.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                event::poll(wait)?;
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let mut config = GameConfig::load_or_default(&args.config);
    if let Some(tick_ms) = args.tick_ms {
        config.timing.tuning.tick_ms = tick_ms.max(1);
    }
    if let Some(difficulty) = args.difficulty {
        config.timing.tuning.difficulty = difficulty;
    }
    config.timing.tuning.validate()?;
    let lane_keys = config.keys.lane_chars()?;

    let notes = load_chart(&args.chart, args.strict)?;
    info!("loaded {} notes from {}", notes.len(), args.chart.display());

    let sink: Box<dyn NoteSink> = if args.mute || !config.audio.enabled {
        Box::new(Muted)
    } else {
        match Audio::open(config.audio.volume) {
            Ok(audio) => Box::new(audio),
            Err(err) => {
                warn!("{err}; playing without sound");
                Box::new(Muted)
            }
        }
    };
    let mut presenter = Presenter::new(sink);

    let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
    if !enhanced {
        warn!("terminal does not report key releases; holds end after a timeout");
    }

    let game = Game {
        notes,
        tuning: config.timing.tuning,
        lane_keys,
        frame_dur: Duration::from_secs_f64(1.0 / config.timing.render_fps.max(1) as f64),
        release_timeout: Duration::from_millis(config.input.release_timeout_ms),
        repeat_gap: Duration::from_millis(config.input.repeat_gap_ms),
        enhanced,
    };

    terminal::enable_raw_mode()?;
    let mut out = stdout();
    execute!(
        out,
        terminal::EnterAlternateScreen,
        cursor::Hide,
        terminal::DisableLineWrap,
    )?;
    if enhanced {
        execute!(
            out,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }

    let cleanup = |out: &mut io::Stdout| -> io::Result<()> {
        if enhanced {
            execute!(out, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            out,
            terminal::LeaveAlternateScreen,
            cursor::Show,
            terminal::EnableLineWrap,
        )?;
        terminal::disable_raw_mode()
    };

    let result = game.run(&mut out, &mut presenter);
    cleanup(&mut out)?;
    if let Err(err) = &result {
        error!("game loop failed: {err}");
    }
    Ok(result?)
}
