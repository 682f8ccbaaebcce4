// Amplitude and pitch envelopes for one-shot synthesis.

/// Level below which a decaying envelope is considered finished (-80 dB).
const SILENCE: f32 = 1.0e-4;

// ═══════════════════════════════════════════════════════════════════
// Attack / Decay Envelope
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
}

/// Linear attack into an exponential decay.
///
/// `decay` is the time to fall 60 dB, which is how drum machines usually
/// label their decay knobs.
#[derive(Debug, Clone)]
pub struct DecayEnvelope {
    stage: EnvelopeStage,
    level: f32,

    // Parameters (in seconds)
    attack: f32,
    decay: f32,

    sample_rate: f32,
    attack_rate: f32,
    decay_coeff: f32,
}

impl DecayEnvelope {
    pub fn new(attack: f32, decay: f32, sample_rate: f32) -> Self {
        let mut env = Self {
            stage: EnvelopeStage::Idle,
            level: 0.0,
            attack: attack.max(0.0),
            decay: decay.max(0.001),
            sample_rate,
            attack_rate: 1.0,
            decay_coeff: 0.0,
        };
        env.recalc();
        env
    }

    fn recalc(&mut self) {
        self.attack_rate = 1.0 / (self.attack * self.sample_rate).max(1.0);
        // 0.001 = -60 dB
        self.decay_coeff = (0.001f32.ln() / (self.decay * self.sample_rate).max(1.0)).exp();
    }

    pub fn trigger(&mut self) {
        self.level = 0.0;
        self.stage = EnvelopeStage::Attack;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => 0.0,

            EnvelopeStage::Attack => {
                self.level += self.attack_rate;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
                self.level
            }

            EnvelopeStage::Decay => {
                self.level *= self.decay_coeff;
                if self.level <= SILENCE {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
                self.level
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Pitch Sweep
// ═══════════════════════════════════════════════════════════════════

/// Exponential glide from `start` Hz to `end` Hz.
#[derive(Debug, Clone)]
pub struct PitchSweep {
    current: f32,
    end: f32,
    coeff: f32,
}

impl PitchSweep {
    /// `time` is the time constant in seconds.
    pub fn new(start: f32, end: f32, time: f32, sample_rate: f32) -> Self {
        Self {
            current: start,
            end,
            coeff: (-1.0 / (time * sample_rate).max(1.0)).exp(),
        }
    }

    #[inline]
    pub fn next_hz(&mut self) -> f32 {
        let hz = self.current;
        self.current = self.end + (self.current - self.end) * self.coeff;
        hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_peaks_then_finishes() {
        let mut env = DecayEnvelope::new(0.001, 0.05, 48_000.0);
        assert_eq!(env.next_sample(), 0.0);

        env.trigger();
        let samples: Vec<f32> = (0..48_000).map(|_| env.next_sample()).collect();
        let peak = samples.iter().cloned().fold(0.0f32, f32::max);
        assert_eq!(peak, 1.0);
        assert!(!env.is_active());
        assert_eq!(*samples.last().unwrap_or(&1.0), 0.0);
    }

    #[test]
    fn test_sweep_approaches_target() {
        let mut sweep = PitchSweep::new(200.0, 50.0, 0.01, 48_000.0);
        assert_eq!(sweep.next_hz(), 200.0);
        for _ in 0..48_000 {
            sweep.next_hz();
        }
        assert!((sweep.next_hz() - 50.0).abs() < 0.01);
    }
}
