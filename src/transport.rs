// src/transport.rs

use crate::groove::step_duration_samples;

//
// ===============================
// MARK: Engine-side transport (RT-safe)
// ===============================
//

/// Transport state expressed in the sample domain.
///
/// This struct:
/// - is real-time safe
/// - is copyable
/// - is advanced once per rendered block, never per step
///
/// Owned by the step sequencer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transport {
    /// Absolute sample position of the next block
    sample_pos: u64,

    /// Tempo in BPM (already clamped)
    tempo: f64,

    /// Sample rate (Hz)
    sample_rate: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            sample_pos: 0,
            tempo: 120.0,
            sample_rate: 48_000.0,
        }
    }
}

impl Transport {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    // -------------------------------
    // MARK: Time advancement
    // -------------------------------

    /// Advance by a number of rendered frames.
    #[inline]
    pub fn advance(&mut self, frames: usize) {
        self.sample_pos += frames as u64;
    }

    /// Return to sample zero, keeping tempo and rate.
    #[inline]
    pub fn rewind(&mut self) {
        self.sample_pos = 0;
    }

    // -------------------------------
    // MARK: Accessors
    // -------------------------------

    #[inline]
    pub fn sample_position(&self) -> u64 {
        self.sample_pos
    }

    #[inline]
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Absolute time in seconds.
    #[inline]
    pub fn seconds(&self) -> f64 {
        self.sample_pos as f64 / self.sample_rate
    }

    /// Position in beats at the current tempo (display only).
    #[inline]
    pub fn beats(&self) -> f64 {
        self.seconds() * (self.tempo / 60.0)
    }

    /// Samples per step at the current tempo.
    #[inline]
    pub fn step_duration(&self) -> f64 {
        step_duration_samples(self.tempo, self.sample_rate)
    }

    /// Samples per full pattern cycle of `length` steps.
    #[inline]
    pub fn cycle_duration(&self, length: usize) -> f64 {
        self.step_duration() * length as f64
    }

    // -------------------------------
    // MARK: Mutators
    // -------------------------------

    pub fn set_tempo(&mut self, tempo: f64) {
        self.tempo = tempo;
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }
}
