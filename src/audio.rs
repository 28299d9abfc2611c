use crate::chart::Note;
use crate::error::AudioError;
use crate::event::ObjectId;
use fundsp::prelude::*;
use log::{debug, warn};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::collections::HashMap;
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 44_100;

const ATTACK_S: f32 = 0.01;
const RELEASE_S: f32 = 0.5;

/// Where the presenter sends sound. The game only ever emits identities
/// and note attributes; the sink decides how they sound.
pub trait NoteSink {
    /// Plays a note once, for its sounding duration.
    fn play(&mut self, note: &Note);
    /// Starts a sustained voice for a held tail.
    fn attack(&mut self, id: ObjectId, note: &Note);
    /// Stops the sustained voice of a tail, if any.
    fn release(&mut self, id: ObjectId);
    fn game_over(&mut self);
}

impl<T: NoteSink + ?Sized> NoteSink for Box<T> {
    fn play(&mut self, note: &Note) {
        (**self).play(note);
    }
    fn attack(&mut self, id: ObjectId, note: &Note) {
        (**self).attack(id, note);
    }
    fn release(&mut self, id: ObjectId) {
        (**self).release(id);
    }
    fn game_over(&mut self) {
        (**self).game_over();
    }
}

/// A sink that drops everything.
#[derive(Debug, Default)]
pub struct Muted;

impl NoteSink for Muted {
    fn play(&mut self, _note: &Note) {}
    fn attack(&mut self, _id: ObjectId, _note: &Note) {}
    fn release(&mut self, _id: ObjectId) {}
    fn game_over(&mut self) {}
}

// ── Synthesis ───────────────────────────────────────────────────────────────

/// Amplitude shape applied on top of a voice's oscillator graph.
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// Attack, hold for `hold` seconds, then release to silence.
    OneShot { gain: f32, hold: f32 },
    /// Attack, then hold until the sink is stopped.
    Sustain { gain: f32 },
    /// The graph shapes itself.
    Flat,
}

impl Shape {
    fn gain_at(self, t: f32) -> f32 {
        match self {
            Shape::OneShot { gain, hold } => {
                let release = if t > hold {
                    (1.0 - (t - hold) / RELEASE_S).max(0.0)
                } else {
                    1.0
                };
                gain * (t / ATTACK_S).min(1.0) * release
            }
            Shape::Sustain { gain } => gain * (t / ATTACK_S).min(1.0),
            Shape::Flat => 1.0,
        }
    }
}

/// A mono fundsp graph rendered sample by sample for rodio.
pub struct Voice {
    unit: Box<dyn AudioUnit + Send>,
    shape: Shape,
    sample: u64,
    remaining: Option<usize>,
}

impl Voice {
    fn new(mut unit: Box<dyn AudioUnit + Send>, shape: Shape, seconds: Option<f32>) -> Self {
        unit.set_sample_rate(SAMPLE_RATE as f64);
        Self {
            unit,
            shape,
            sample: 0,
            remaining: seconds.map(|s| (s.max(0.0) * SAMPLE_RATE as f32) as usize),
        }
    }
}

impl Iterator for Voice {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if let Some(left) = &mut self.remaining {
            if *left == 0 {
                return None;
            }
            *left -= 1;
        }
        let t = self.sample as f32 / SAMPLE_RATE as f32;
        self.sample += 1;
        Some(self.unit.get_mono() * self.shape.gain_at(t))
    }
}

impl Source for Voice {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        self.remaining
            .map(|n| Duration::from_secs_f64(n as f64 / SAMPLE_RATE as f64))
    }
}

/// Tone colour for an instrument name, at `hz`.
fn timbre(instrument: &str, hz: f32) -> Box<dyn AudioUnit + Send> {
    match instrument {
        "piano" => Box::new(sine_hz::<f32>(hz) * 0.7 + sine_hz::<f32>(hz * 2.0) * 0.2 + sine_hz::<f32>(hz * 3.0) * 0.1),
        "violin" => Box::new(saw_hz(hz) >> lowpass_hz(hz * 4.0, 1.0)),
        "flute" => Box::new(sine_hz::<f32>(hz) * 0.9 + (noise() >> lowpass_hz(hz * 2.0, 1.0)) * 0.05),
        "bass-electric" => Box::new(square_hz(hz) >> lowpass_hz(hz * 3.0, 1.0)),
        "trumpet" | "trombone" => Box::new(saw_hz(hz) >> lowpass_hz(hz * 6.0, 1.5)),
        "saxophone" => Box::new(square_hz(hz) * 0.6 + saw_hz(hz) * 0.4 >> lowpass_hz(hz * 5.0, 1.0)),
        _ => Box::new(sine_hz::<f32>(hz)),
    }
}

/// One-shot voice: attack, hold for the note's duration, then release.
pub fn note_voice(note: &Note) -> Voice {
    let hold = note.sounding_duration().max(0.05) as f32;
    let shape = Shape::OneShot {
        gain: note.velocity.clamp(0.0, 1.0) * 0.3,
        hold,
    };
    let unit = timbre(&note.instrument_name, midi_hz(note.pitch as f32));
    Voice::new(unit, shape, Some(hold + RELEASE_S))
}

/// Open-ended voice for a held tail; it sounds until its sink is stopped.
pub fn sustained_voice(note: &Note) -> Voice {
    let shape = Shape::Sustain {
        gain: note.velocity.clamp(0.0, 1.0) * 0.3,
    };
    let unit = timbre(&note.instrument_name, midi_hz(note.pitch as f32));
    Voice::new(unit, shape, None)
}

/// Falling saw sweep (400 Hz to 80 Hz over 0.4 s) played when the chart ends.
pub fn game_over_voice() -> Voice {
    // 1. Frequency ramp
    let freq = lfo(|t: f32| lerp(400.0, 80.0, (t / 0.4).min(1.0)));
    // 2. Gain ramp
    let gain = lfo(|t: f32| lerp(0.15, 0.0, (t / 0.5).min(1.0)));
    // 3. freq >> sawtooth * gain
    let sound = (freq >> saw()) * gain;
    Voice::new(Box::new(sound), Shape::Flat, Some(0.5))
}

// ── Output ──────────────────────────────────────────────────────────────────

/// Plays notes on the default output device.
///
/// Sustained voices are kept per tail identity so they can be released.
pub struct Audio {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    volume: f32,
    held: HashMap<ObjectId, Sink>,
}

impl Audio {
    pub fn open(volume: f32) -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
            volume,
            held: HashMap::new(),
        })
    }

    fn sink(&self) -> Result<Sink, AudioError> {
        let sink = Sink::try_new(&self.handle)?;
        sink.set_volume(self.volume);
        Ok(sink)
    }

    fn fire(&self, voice: Voice) {
        match self.sink() {
            Ok(sink) => {
                sink.append(voice);
                sink.detach(); // Play in background
            }
            Err(err) => warn!("dropping note: {err}"),
        }
    }
}

impl NoteSink for Audio {
    fn play(&mut self, note: &Note) {
        self.fire(note_voice(note));
    }

    fn attack(&mut self, id: ObjectId, note: &Note) {
        if self.held.contains_key(&id) {
            return;
        }
        match self.sink() {
            Ok(sink) => {
                debug!("attack {id:?} ({} {})", note.instrument_name, note.pitch);
                sink.append(sustained_voice(note));
                self.held.insert(id, sink);
            }
            Err(err) => warn!("dropping sustained note: {err}"),
        }
    }

    fn release(&mut self, id: ObjectId) {
        if let Some(sink) = self.held.remove(&id) {
            debug!("release {id:?}");
            sink.stop();
        }
    }

    fn game_over(&mut self) {
        for (_, sink) in self.held.drain() {
            sink.stop();
        }
        self.fire(game_over_voice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(instrument: &str, start: f64, end: f64) -> Note {
        Note {
            user_played: true,
            instrument_name: instrument.into(),
            velocity: 1.0,
            pitch: 69,
            start,
            end,
        }
    }

    #[test]
    fn one_shot_voice_has_finite_length() {
        let voice = note_voice(&note("piano", 0.0, 0.2));
        let expected = ((0.2 + RELEASE_S) * SAMPLE_RATE as f32) as usize;
        let samples: Vec<f32> = voice.collect();
        assert!((samples.len() as i64 - expected as i64).abs() <= 1);
        assert!(samples.iter().all(|s| s.is_finite()));
        assert!(samples.iter().any(|s| s.abs() > 1e-4));
    }

    #[test]
    fn feedback_style_notes_play_for_end_seconds() {
        let voice = note_voice(&note("flute", -1.0, 0.3));
        let secs = voice.total_duration().unwrap().as_secs_f64();
        assert!((secs - (0.3 + RELEASE_S as f64)).abs() < 1e-3);
    }

    #[test]
    fn sustained_voice_never_ends_on_its_own() {
        let mut voice = sustained_voice(&note("violin", 0.0, 5.0));
        assert!(voice.total_duration().is_none());
        for _ in 0..SAMPLE_RATE {
            assert!(voice.next().is_some());
        }
    }

    #[test]
    fn unknown_instrument_still_sounds() {
        let samples: Vec<f32> = note_voice(&note("kazoo", 0.0, 0.1)).take(4410).collect();
        assert!(samples.iter().any(|s| s.abs() > 1e-4));
    }
}
