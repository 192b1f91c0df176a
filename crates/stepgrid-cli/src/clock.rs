//! Step clock for the player
//!
//! Converts a tempo into the time between steps and a pulse stream.

use crossbeam_channel::Receiver;
use std::time::{Duration, Instant};

use crate::config::{TransportSettings, DEFAULT_BPM};

const MIN_BPM: f64 = 20.0;
const MAX_BPM: f64 = 400.0;

/// BPM clock that turns tempo into a stream of step pulses.
///
/// Timing is only as good as the OS timer behind `crossbeam_channel::tick`;
/// the pattern store makes no precision assumptions either way.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepClock {
    bpm: f64,
    steps_per_beat: u32,
}

impl StepClock {
    /// Non-finite tempos fall back to [`DEFAULT_BPM`]; others are clamped.
    pub fn new(bpm: f64, steps_per_beat: u32) -> Self {
        let bpm = if bpm.is_finite() { bpm } else { DEFAULT_BPM };
        Self {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            steps_per_beat: steps_per_beat.max(1),
        }
    }

    pub fn from_settings(settings: &TransportSettings) -> Self {
        Self::new(settings.bpm, settings.steps_per_beat)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Time between two steps.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / (self.bpm * self.steps_per_beat as f64))
    }

    /// Number of whole steps that fit in `duration` (at least one).
    pub fn steps_in(&self, duration: Duration) -> u64 {
        let steps = duration.as_secs_f64() / self.interval().as_secs_f64();
        (steps.floor() as u64).max(1)
    }

    /// Start emitting one pulse per step interval.
    pub fn start(&self) -> Receiver<Instant> {
        crossbeam_channel::tick(self.interval())
    }
}
