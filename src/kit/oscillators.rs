// Sound sources for kit synthesis.

use std::f32::consts::TAU;

// ═══════════════════════════════════════════════════════════════════
// Sine Oscillator
// ═══════════════════════════════════════════════════════════════════

/// Phase-accumulating sine, frequency supplied per sample.
#[derive(Debug, Clone)]
pub struct SineOsc {
    phase: f32,
    sample_rate: f32,
}

impl SineOsc {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            sample_rate,
        }
    }

    #[inline]
    pub fn next_sample(&mut self, freq: f32) -> f32 {
        let out = (self.phase * TAU).sin();
        self.phase = (self.phase + freq / self.sample_rate).fract();
        out
    }
}

// ═══════════════════════════════════════════════════════════════════
// Square Oscillator
// ═══════════════════════════════════════════════════════════════════

/// Naive square, used for metallic (cowbell, hat) partials.
#[derive(Debug, Clone)]
pub struct SquareOsc {
    phase: f32,
    inc: f32,
}

impl SquareOsc {
    pub fn new(freq: f32, sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            inc: freq / sample_rate,
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let out = if self.phase < 0.5 { 1.0 } else { -1.0 };
        self.phase = (self.phase + self.inc).fract();
        out
    }
}

// ═══════════════════════════════════════════════════════════════════
// Noise
// ═══════════════════════════════════════════════════════════════════

/// Seeded white noise (xorshift32), so every kit build is identical.
#[derive(Debug, Clone)]
pub struct Noise {
    state: u32,
}

impl Noise {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    /// Uniform in [-1, 1).
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x >> 8) as f32 / (1u32 << 23) as f32 - 1.0
    }
}
