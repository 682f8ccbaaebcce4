// src/kit/mod.rs
//
// One-shot drum samples for the sixteen tracks.
//
// Samples are synthesized from each track's `DrumSound` at `prepare()`
// (never on the audio thread) or replaced by user audio through
// `DrumKit::replace`, which is kept and resampled again whenever the
// rate changes. Voices only read from the finished buffers.

mod envelope;
mod filters;
mod oscillators;
mod resample;

pub use envelope::*;
pub use filters::*;
pub use oscillators::*;
pub use resample::*;

use log::debug;

use crate::error::{EngineError, EngineResult};
use crate::state::{DrumSound, TrackTable, NUM_TRACKS};

/// Longest synthesized one-shot.
const MAX_SAMPLE_SECONDS: f32 = 3.0;

/// 808-style square partials for hats and cymbals (Hz).
const METALLIC_PARTIALS: [f32; 6] = [205.3, 304.4, 369.6, 522.7, 540.0, 800.0];

// ═══════════════════════════════════════════════════════════════════
// Drum Sample
// ═══════════════════════════════════════════════════════════════════

/// Mono one-shot at the engine sample rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrumSample {
    data: Vec<f32>,
}

impl DrumSample {
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════
// Drum Kit
// ═══════════════════════════════════════════════════════════════════

/// User audio as loaded, so it can be resampled again on a rate change.
#[derive(Debug, Clone, PartialEq)]
struct UserSample {
    data: Vec<f32>,
    source_rate: f64,
}

/// One sample per track.
#[derive(Debug, Clone)]
pub struct DrumKit {
    samples: [DrumSample; NUM_TRACKS],
    user: [Option<UserSample>; NUM_TRACKS],
    sample_rate: f64,
}

impl DrumKit {
    /// A kit of silent (empty) samples.
    pub fn empty() -> Self {
        Self {
            samples: std::array::from_fn(|_| DrumSample::default()),
            user: std::array::from_fn(|_| None),
            sample_rate: 0.0,
        }
    }

    /// Build every track's one-shot from the track table. Allocates.
    #[cfg(test)]
    pub fn synthesize(table: &TrackTable, sample_rate: f64) -> Self {
        let mut kit = Self::empty();
        kit.rebuild(table, sample_rate);
        kit
    }

    /// Move the kit to a new sample rate. Tracks holding user audio are
    /// resampled from the loaded data; the rest are synthesized. Allocates.
    pub fn rebuild(&mut self, table: &TrackTable, sample_rate: f64) {
        let sr = sample_rate as f32;
        for track in 0..NUM_TRACKS {
            self.samples[track] = match &self.user[track] {
                Some(user) => {
                    DrumSample::new(resample_linear(&user.data, user.source_rate, sample_rate))
                }
                None => {
                    let sound = table.slot(track).map(|s| s.sound).unwrap_or(DrumSound::Rim);
                    DrumSample::new(render_sound(sound, track as u32 + 1, sr))
                }
            };
        }
        self.sample_rate = sample_rate;
        debug!(
            "built kit at {sample_rate} Hz ({} user tracks, {} frames total)",
            self.user.iter().flatten().count(),
            self.samples.iter().map(DrumSample::len).sum::<usize>()
        );
    }

    /// Replace a track's one-shot with user audio recorded at `source_rate`.
    pub fn replace(&mut self, track: usize, samples: &[f32], source_rate: f64) -> EngineResult<()> {
        if track >= NUM_TRACKS {
            return Err(EngineError::TrackOutOfRange(track));
        }
        if samples.is_empty() {
            return Err(EngineError::EmptySample(track));
        }
        if !(source_rate.is_finite() && source_rate > 0.0) {
            return Err(EngineError::InvalidSampleRate(source_rate));
        }
        self.samples[track] = DrumSample::new(resample_linear(samples, source_rate, self.sample_rate));
        self.user[track] = Some(UserSample {
            data: samples.to_vec(),
            source_rate,
        });
        Ok(())
    }

    #[inline]
    pub fn sample(&self, track: usize) -> &[f32] {
        self.samples.get(track).map(DrumSample::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl Default for DrumKit {
    fn default() -> Self {
        Self::empty()
    }
}

// ═══════════════════════════════════════════════════════════════════
// Synthesis
// ═══════════════════════════════════════════════════════════════════

/// Run `source` through `env` until the envelope finishes.
fn render(env: &mut DecayEnvelope, sample_rate: f32, mut source: impl FnMut() -> f32) -> Vec<f32> {
    let max_len = (MAX_SAMPLE_SECONDS * sample_rate) as usize;
    let mut out = Vec::with_capacity(max_len.min(sample_rate as usize));
    env.trigger();
    while env.is_active() && out.len() < max_len {
        let gain = env.next_sample();
        out.push(source() * gain);
    }
    out
}

/// Bank of detuned squares for metallic sounds.
struct Metallic {
    oscs: [SquareOsc; METALLIC_PARTIALS.len()],
}

impl Metallic {
    fn new(sample_rate: f32) -> Self {
        Self {
            oscs: METALLIC_PARTIALS.map(|f| SquareOsc::new(f, sample_rate)),
        }
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        self.oscs.iter_mut().map(SquareOsc::next_sample).sum::<f32>() / self.oscs.len() as f32
    }
}

/// Synthesize one drum sound. `seed` keeps noise-based sounds distinct.
pub fn render_sound(sound: DrumSound, seed: u32, sr: f32) -> Vec<f32> {
    match sound {
        DrumSound::Kick { pitch, decay } => {
            let mut sweep = PitchSweep::new(pitch * 4.0, pitch, 0.03, sr);
            let mut osc = SineOsc::new(sr);
            let mut env = DecayEnvelope::new(0.0005, decay, sr);
            render(&mut env, sr, || osc.next_sample(sweep.next_hz()))
        }

        DrumSound::Snare { tone, decay } => {
            let mut osc = SineOsc::new(sr);
            let mut body = DecayEnvelope::new(0.0005, decay * 0.5, sr);
            body.trigger();
            let mut noise = Noise::new(seed);
            let mut hp = SvfFilter::highpass(1500.0, 0.2, sr);
            let mut env = DecayEnvelope::new(0.0005, decay, sr);
            render(&mut env, sr, || {
                let tone_part = osc.next_sample(tone) * body.next_sample() * 0.6;
                tone_part + hp.process_sample(noise.next_sample()) * 0.7
            })
        }

        DrumSound::Clap => {
            let mut noise = Noise::new(seed);
            let mut bp = SvfFilter::bandpass(1200.0, 0.4, sr);
            let burst = (0.01 * sr) as usize;
            let mut n = 0usize;
            let mut env = DecayEnvelope::new(0.0005, 0.25, sr);
            render(&mut env, sr, || {
                // Three short bursts ahead of the tail
                let flutter = if n < burst * 3 {
                    1.0 - (n % burst) as f32 / burst as f32
                } else {
                    1.0
                };
                n += 1;
                bp.process_sample(noise.next_sample()) * flutter * 1.5
            })
        }

        DrumSound::Rim => {
            let mut osc = SineOsc::new(sr);
            let mut noise = Noise::new(seed);
            let mut bp = SvfFilter::bandpass(2500.0, 0.5, sr);
            let mut env = DecayEnvelope::new(0.0002, 0.035, sr);
            render(&mut env, sr, || {
                osc.next_sample(1700.0) * 0.6 + bp.process_sample(noise.next_sample()) * 0.4
            })
        }

        DrumSound::ClosedHat => metallic_hit(sr, seed, 7000.0, 0.06),
        DrumSound::OpenHat => metallic_hit(sr, seed, 7000.0, 0.45),
        DrumSound::Cymbal { decay } => metallic_hit(sr, seed, 5000.0, decay),

        DrumSound::Tom { pitch } => {
            let mut sweep = PitchSweep::new(pitch * 1.5, pitch, 0.05, sr);
            let mut osc = SineOsc::new(sr);
            let mut env = DecayEnvelope::new(0.0005, 0.35, sr);
            render(&mut env, sr, || osc.next_sample(sweep.next_hz()))
        }

        DrumSound::Cowbell => {
            let mut low = SquareOsc::new(540.0, sr);
            let mut high = SquareOsc::new(800.0, sr);
            let mut bp = SvfFilter::bandpass(800.0, 0.6, sr);
            let mut env = DecayEnvelope::new(0.0005, 0.25, sr);
            render(&mut env, sr, || {
                bp.process_sample((low.next_sample() + high.next_sample()) * 0.5)
            })
        }

        DrumSound::Shaker => {
            let mut noise = Noise::new(seed);
            let mut hp = SvfFilter::highpass(6000.0, 0.1, sr);
            let mut env = DecayEnvelope::new(0.01, 0.12, sr);
            render(&mut env, sr, || hp.process_sample(noise.next_sample()) * 0.8)
        }
    }
}

fn metallic_hit(sr: f32, seed: u32, cutoff: f32, decay: f32) -> Vec<f32> {
    let mut metal = Metallic::new(sr);
    let mut noise = Noise::new(seed);
    let mut hp = SvfFilter::highpass(cutoff, 0.3, sr);
    let mut env = DecayEnvelope::new(0.0005, decay, sr);
    render(&mut env, sr, || {
        hp.process_sample(metal.next_sample() * 0.7 + noise.next_sample() * 0.3)
    })
}
