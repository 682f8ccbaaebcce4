// src/groove.rs
//
// Groove model: per-step, per-track micro-timing.
//
// offset = swing term + role term + humanization term, clamped to the
// configured maximum drift. All three terms are pure functions of the
// current settings and `(step, track, pattern revision)`, so the same
// pattern position always lands in the same place.

use crate::state::{ParamId, Role, TrackSlot};

/// Steps per beat; patterns are one bar of 16th notes.
pub const STEPS_PER_BEAT: f64 = 4.0;

/// Velocity floor for structure-driven variation.
const MIN_VARIED_VELOCITY: f32 = 0.2;

/// Maximum velocity swing at `structure = 1`.
const MAX_VELOCITY_VARIATION: f32 = 0.35;

/// Humanization bias for roles without a dedicated parameter.
const OTHER_ROLE_BIAS: f64 = 0.5;

// Hash salts so timing, density and velocity decisions are independent.
const SALT_TIMING: u64 = 0x01;
const SALT_DENSITY: u64 = 0x02;
const SALT_VELOCITY: u64 = 0x03;

/// Which steps count as swung "off" subdivisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwingGrid {
    /// Every odd step is delayed; subdivision is one step.
    #[default]
    Sixteenth,
    /// Steps 2, 6, 10, 14 are delayed; subdivision is two steps.
    Eighth,
}

impl SwingGrid {
    /// Grid actually used for a pattern length.
    ///
    /// Only bar-regular lengths (multiples of 4, at least 8) honor the
    /// configured grid; anything else swings 16ths.
    #[inline]
    pub fn for_pattern_length(self, length: usize) -> SwingGrid {
        if length >= 8 && length % 4 == 0 {
            self
        } else {
            SwingGrid::Sixteenth
        }
    }

    #[inline]
    pub fn is_off_step(self, step: usize) -> bool {
        match self {
            SwingGrid::Sixteenth => step % 2 == 1,
            SwingGrid::Eighth => step % 4 == 2,
        }
    }

    #[inline]
    pub fn subdivision_steps(self) -> f64 {
        match self {
            SwingGrid::Sixteenth => 1.0,
            SwingGrid::Eighth => 2.0,
        }
    }
}

/// Current values of every parameter the groove depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrooveSettings {
    pub tempo: f64,
    pub swing: f64,
    pub pocket_offset: f64,
    pub push_offset: f64,
    pub pull_offset: f64,
    pub dilla_amount: f64,
    pub dilla_hat_bias: f64,
    pub dilla_snare_late: f64,
    pub dilla_kick_tight: f64,
    pub dilla_max_drift: f64,
    pub structure: f32,
    pub pattern_length: usize,
}

impl Default for GrooveSettings {
    fn default() -> Self {
        Self {
            tempo: 120.0,
            swing: 0.0,
            pocket_offset: 0.0,
            push_offset: -0.04,
            pull_offset: 0.06,
            dilla_amount: 0.6,
            dilla_hat_bias: 0.55,
            dilla_snare_late: 0.8,
            dilla_kick_tight: 0.7,
            dilla_max_drift: 0.15,
            structure: 0.5,
            pattern_length: 16,
        }
    }
}

/// Stateless-per-call timing model.
#[derive(Debug, Clone)]
pub struct GrooveModel {
    settings: GrooveSettings,
    grid: SwingGrid,
    seed: u64,
    revision: u32,
}

impl GrooveModel {
    pub fn new(seed: u64, grid: SwingGrid) -> Self {
        Self {
            settings: GrooveSettings::default(),
            grid,
            seed,
            revision: 0,
        }
    }

    /// Forward an already-clamped parameter value.
    ///
    /// Parameters the groove does not use are ignored.
    pub fn set_param(&mut self, id: ParamId, value: f32) {
        let s = &mut self.settings;
        let v = value as f64;
        match id {
            ParamId::Tempo => s.tempo = v,
            ParamId::Swing => s.swing = v,
            ParamId::PocketOffset => s.pocket_offset = v,
            ParamId::PushOffset => s.push_offset = v,
            ParamId::PullOffset => s.pull_offset = v,
            ParamId::DillaAmount => s.dilla_amount = v,
            ParamId::DillaHatBias => s.dilla_hat_bias = v,
            ParamId::DillaSnareLate => s.dilla_snare_late = v,
            ParamId::DillaKickTight => s.dilla_kick_tight = v,
            ParamId::DillaMaxDrift => s.dilla_max_drift = v,
            ParamId::Structure => s.structure = value,
            ParamId::PatternLength => {
                s.pattern_length = crate::state::pattern_length_from(value)
            }
            _ => {}
        }
    }

    #[inline]
    pub fn settings(&self) -> &GrooveSettings {
        &self.settings
    }

    /// Re-key the humanization hash (called when the pattern is edited).
    #[inline]
    pub fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }

    // -------------------------------
    // MARK: Timing
    // -------------------------------

    /// Duration of one step (a 16th note) at the current tempo.
    #[inline]
    pub fn step_duration_samples(&self, sample_rate: f64) -> f64 {
        step_duration_samples(self.settings.tempo, sample_rate)
    }

    /// Largest magnitude any offset may have: `dillaMaxDrift * sampleRate`.
    #[inline]
    pub fn max_offset_samples(&self, sample_rate: f64) -> f64 {
        self.settings.dilla_max_drift * sample_rate
    }

    /// Swing delay for a step. Zero on "on" subdivisions.
    pub fn swing_samples(&self, step_index: usize, sample_rate: f64) -> f64 {
        let grid = self.grid.for_pattern_length(self.settings.pattern_length);
        if !grid.is_off_step(step_index) {
            return 0.0;
        }
        let subdivision = self.step_duration_samples(sample_rate) * grid.subdivision_steps();
        self.settings.swing * subdivision / 2.0
    }

    /// Fixed ahead/behind nudge for a role.
    pub fn role_samples(&self, role: Role, sample_rate: f64) -> f64 {
        let seconds = match role {
            Role::Kick | Role::Other => self.settings.pocket_offset,
            Role::Hat => self.settings.push_offset,
            Role::Snare => self.settings.pull_offset,
        };
        seconds * sample_rate
    }

    /// Humanization drift for one step of one track.
    pub fn dilla_samples(&self, step_index: usize, slot: &TrackSlot, sample_rate: f64) -> f64 {
        let s = &self.settings;
        if s.dilla_amount == 0.0 {
            return 0.0;
        }
        let bias = match slot.role {
            Role::Hat => s.dilla_hat_bias,
            Role::Snare => s.dilla_snare_late,
            Role::Kick => 1.0 - s.dilla_kick_tight,
            Role::Other => OTHER_ROLE_BIAS,
        };
        let jitter = self.unit(step_index, slot.index, SALT_TIMING);
        let direction = match slot.role {
            // Snares only ever drag
            Role::Snare => jitter,
            _ => jitter * 2.0 - 1.0,
        };
        s.dilla_amount * bias * self.max_offset_samples(sample_rate) * direction
    }

    /// Combined, clamped offset in (fractional) samples.
    pub fn compute_offset_samples(&self, step_index: usize, slot: &TrackSlot, sample_rate: f64) -> f64 {
        let limit = self.max_offset_samples(sample_rate);
        let raw = self.swing_samples(step_index, sample_rate)
            + self.role_samples(slot.role, sample_rate)
            + self.dilla_samples(step_index, slot, sample_rate);
        raw.clamp(-limit, limit)
    }

    // -------------------------------
    // MARK: Structure
    // -------------------------------

    /// Apply the structure macro to an authored hit.
    ///
    /// Returns the velocity multiplier, or `None` when the hit is thinned
    /// out. At `structure = 0.5` every hit plays at full velocity.
    pub fn shape_hit(&self, step_index: usize, track: usize) -> Option<f32> {
        let structure = self.settings.structure;

        let anchor = step_index % 4 == 0;
        let keep_probability = (structure * 2.0).min(1.0) as f64;
        if !anchor && self.unit(step_index, track, SALT_DENSITY) >= keep_probability {
            return None;
        }

        let depth = ((structure * 2.0 - 1.0).max(0.0)) * MAX_VELOCITY_VARIATION;
        if depth == 0.0 {
            return Some(1.0);
        }
        let variation = (self.unit(step_index, track, SALT_VELOCITY) * 2.0 - 1.0) as f32;
        Some((1.0 + variation * depth).clamp(MIN_VARIED_VELOCITY, 1.0))
    }

    // -------------------------------
    // MARK: Hashing
    // -------------------------------

    /// Deterministic value in [0, 1) for `(step, track)` under the current
    /// seed and pattern revision.
    #[inline]
    fn unit(&self, step_index: usize, track: usize, salt: u64) -> f64 {
        let key = splitmix64(self.seed ^ u64::from(self.revision))
            ^ ((step_index as u64) << 16)
            ^ ((track as u64) << 8)
            ^ (salt << 56);
        (splitmix64(key) >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// One step (a 16th note) in samples.
#[inline]
pub fn step_duration_samples(tempo: f64, sample_rate: f64) -> f64 {
    (60.0 / tempo) * sample_rate / STEPS_PER_BEAT
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{TrackTable, NUM_TRACKS};

    const SR: f64 = 48_000.0;

    fn model() -> GrooveModel {
        GrooveModel::new(1234, SwingGrid::Sixteenth)
    }

    fn set(model: &mut GrooveModel, id: ParamId, value: f32) {
        model.set_param(id, id.info().clamp(value));
    }

    #[test]
    fn test_step_duration() {
        // 120 BPM, 16th notes: quarter = 0.5 s, step = 0.125 s
        assert_eq!(step_duration_samples(120.0, SR), 6000.0);
        assert_eq!(step_duration_samples(60.0, 44_100.0), 11_025.0);
    }

    #[test]
    fn test_zero_dilla_is_swing_plus_role() {
        let table = TrackTable::standard();
        let mut groove = model();
        set(&mut groove, ParamId::DillaAmount, 0.0);
        set(&mut groove, ParamId::DillaMaxDrift, 0.3);
        set(&mut groove, ParamId::Swing, 0.4);
        set(&mut groove, ParamId::PushOffset, -0.02);
        set(&mut groove, ParamId::PullOffset, 0.03);
        set(&mut groove, ParamId::PocketOffset, 0.01);

        for slot in table.slots() {
            for step in 0..16 {
                let expected = groove.swing_samples(step, SR) + groove.role_samples(slot.role, SR);
                assert_eq!(groove.dilla_samples(step, slot, SR), 0.0);
                assert_eq!(groove.compute_offset_samples(step, slot, SR), expected);
            }
        }
    }

    #[test]
    fn test_swing_only_delays_off_steps() {
        let mut groove = model();
        set(&mut groove, ParamId::Swing, 0.5);
        let step = groove.step_duration_samples(SR);
        assert_eq!(groove.swing_samples(0, SR), 0.0);
        assert_eq!(groove.swing_samples(2, SR), 0.0);
        assert_eq!(groove.swing_samples(1, SR), 0.5 * step / 2.0);
        assert_eq!(groove.swing_samples(15, SR), 0.5 * step / 2.0);
    }

    #[test]
    fn test_eighth_grid_falls_back_for_irregular_lengths() {
        let mut groove = GrooveModel::new(1, SwingGrid::Eighth);
        set(&mut groove, ParamId::Swing, 1.0);
        let step = groove.step_duration_samples(SR);

        assert_eq!(groove.swing_samples(1, SR), 0.0);
        assert_eq!(groove.swing_samples(2, SR), step); // 2 steps / 2
        assert_eq!(groove.swing_samples(6, SR), step);

        set(&mut groove, ParamId::PatternLength, 7.0);
        assert_eq!(groove.swing_samples(1, SR), step / 2.0);
        assert_eq!(groove.swing_samples(2, SR), 0.0);
    }

    #[test]
    fn test_offset_never_exceeds_max_drift() {
        let table = TrackTable::standard();
        let mut groove = model();
        for &drift in &[0.0f32, 0.01, 0.05, 0.3] {
            for &swing in &[0.0f32, 0.5, 1.0] {
                for &amount in &[0.0f32, 0.6, 1.0] {
                    for &offset in &[-0.1f32, 0.0, 0.1] {
                        set(&mut groove, ParamId::DillaMaxDrift, drift);
                        set(&mut groove, ParamId::Swing, swing);
                        set(&mut groove, ParamId::DillaAmount, amount);
                        set(&mut groove, ParamId::PushOffset, offset);
                        set(&mut groove, ParamId::PullOffset, offset);
                        set(&mut groove, ParamId::PocketOffset, offset);
                        set(&mut groove, ParamId::Tempo, 60.0);
                        let limit = groove.max_offset_samples(SR);
                        for slot in table.slots() {
                            for step in 0..16 {
                                let off = groove.compute_offset_samples(step, slot, SR);
                                assert!(off.abs() <= limit, "{off} > {limit}");
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_humanization_is_deterministic() {
        let table = TrackTable::standard();
        let a = model();
        let b = model();
        for slot in table.slots() {
            for step in 0..16 {
                assert_eq!(
                    a.compute_offset_samples(step, slot, SR),
                    b.compute_offset_samples(step, slot, SR)
                );
            }
        }
    }

    #[test]
    fn test_revision_rekeys_humanization() {
        let table = TrackTable::standard();
        let hat = table.slot(2).copied().expect("hat slot");
        let mut groove = model();
        let before: Vec<f64> = (0..16).map(|s| groove.dilla_samples(s, &hat, SR)).collect();
        groove.set_revision(7);
        let after: Vec<f64> = (0..16).map(|s| groove.dilla_samples(s, &hat, SR)).collect();
        assert_ne!(before, after);
    }

    #[test]
    fn test_large_revisions_stay_independent_of_salt() {
        let base = model();
        let mut edited = model();
        edited.set_revision(1 << 24);
        for step in 0..16 {
            for track in 0..NUM_TRACKS {
                let density = edited.unit(step, track, SALT_DENSITY);
                let velocity = base.unit(step, track, SALT_VELOCITY);
                assert_ne!(density, velocity, "step {step} track {track}");
            }
        }
    }

    #[test]
    fn test_full_kick_tightness_removes_kick_drift() {
        let table = TrackTable::standard();
        let kick = table.slot(0).copied().expect("kick slot");
        let mut groove = model();
        set(&mut groove, ParamId::DillaAmount, 1.0);
        set(&mut groove, ParamId::DillaKickTight, 1.0);
        for step in 0..16 {
            assert_eq!(groove.dilla_samples(step, &kick, SR), 0.0);
        }
    }

    #[test]
    fn test_snare_drift_is_late() {
        let table = TrackTable::standard();
        let snare = table.slot(1).copied().expect("snare slot");
        let mut groove = model();
        set(&mut groove, ParamId::DillaAmount, 1.0);
        set(&mut groove, ParamId::DillaSnareLate, 1.0);
        for step in 0..16 {
            assert!(groove.dilla_samples(step, &snare, SR) >= 0.0);
        }
    }

    #[test]
    fn test_structure_default_plays_everything() {
        let groove = model();
        for track in 0..16 {
            for step in 0..16 {
                assert_eq!(groove.shape_hit(step, track), Some(1.0));
            }
        }
    }

    #[test]
    fn test_structure_zero_keeps_only_anchors() {
        let mut groove = model();
        set(&mut groove, ParamId::Structure, 0.0);
        for step in 0..16 {
            let hit = groove.shape_hit(step, 0);
            if step % 4 == 0 {
                assert_eq!(hit, Some(1.0));
            } else {
                assert_eq!(hit, None);
            }
        }
    }

    #[test]
    fn test_structure_high_varies_velocity_within_bounds() {
        let mut groove = model();
        set(&mut groove, ParamId::Structure, 1.0);
        let velocities: Vec<f32> = (0..16).filter_map(|s| groove.shape_hit(s, 5)).collect();
        assert_eq!(velocities.len(), 16);
        assert!(velocities.iter().all(|v| (MIN_VARIED_VELOCITY..=1.0).contains(v)));
        assert!(velocities.iter().any(|&v| v < 1.0));
    }
}
