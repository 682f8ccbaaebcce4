// src/state/pattern.rs
//
// Step grid: 16 steps x 16 tracks.
//
// The grid always holds all sixteen steps. `patternLength` only decides
// how many of them the sequencer visits, so shortening a pattern never
// loses authored steps.

use super::track_table::NUM_TRACKS;

/// Maximum steps in one pattern (one bar of 16th notes).
pub const MAX_STEPS: usize = 16;

/// Velocity used for sequenced hits.
pub const DEFAULT_STEP_VELOCITY: f32 = 0.8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Step {
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// Indexed `[track][step]`
    steps: [[Step; MAX_STEPS]; NUM_TRACKS],

    /// Bumped on every edit; feeds the humanization hash
    revision: u32,
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            steps: [[Step::default(); MAX_STEPS]; NUM_TRACKS],
            revision: 0,
        }
    }
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Four-on-the-floor kick, backbeat snare, 8th-note closed hats.
    pub fn basic_beat() -> Self {
        let mut pattern = Self::new();
        for step in [0, 4, 8, 12] {
            pattern.set(0, step, true);
        }
        for step in [4, 12] {
            pattern.set(1, step, true);
        }
        for step in (0..MAX_STEPS).step_by(2) {
            pattern.set(2, step, true);
        }
        pattern.set(3, 14, true);
        pattern
    }

    /// Whether the step exists and is active. Out-of-range reads are inactive.
    #[inline]
    pub fn is_active(&self, track: usize, step: usize) -> bool {
        self.steps
            .get(track)
            .and_then(|t| t.get(step))
            .map(|s| s.active)
            .unwrap_or(false)
    }

    /// Set a step. Returns `false` (and changes nothing) when out of range.
    pub fn set(&mut self, track: usize, step: usize, active: bool) -> bool {
        let Some(cell) = self.steps.get_mut(track).and_then(|t| t.get_mut(step)) else {
            return false;
        };
        if cell.active != active {
            cell.active = active;
            self.revision = self.revision.wrapping_add(1);
        }
        true
    }

    /// Flip a step. Returns the new state, or `None` when out of range.
    pub fn toggle(&mut self, track: usize, step: usize) -> Option<bool> {
        let active = !self.steps.get(track)?.get(step)?.active;
        self.set(track, step, active);
        Some(active)
    }

    /// Deactivate every step of a track.
    pub fn clear_track(&mut self, track: usize) {
        if let Some(steps) = self.steps.get_mut(track) {
            if steps.iter().any(|s| s.active) {
                *steps = [Step::default(); MAX_STEPS];
                self.revision = self.revision.wrapping_add(1);
            }
        }
    }

    pub fn clear(&mut self) {
        for track in 0..NUM_TRACKS {
            self.clear_track(track);
        }
    }

    #[inline]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Number of active steps for a track within the first `length` steps.
    pub fn active_count(&self, track: usize, length: usize) -> usize {
        self.steps
            .get(track)
            .map(|t| t.iter().take(length).filter(|s| s.active).count())
            .unwrap_or(0)
    }
}
