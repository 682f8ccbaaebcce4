// src/state/config.rs
//
// Engine construction settings.

use crate::error::{EngineError, EngineResult};
use crate::groove::SwingGrid;

/// Default audio configuration
pub const DEFAULT_MAX_BLOCK: usize = 512;
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;
pub const DEFAULT_COMMAND_CAPACITY: usize = 256;
pub const DEFAULT_HUMANIZE_SEED: u64 = 0x0D11_1A5E_ED00_0001;

/// Settings that are fixed for the lifetime of a prepared engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Sample rate in Hz (e.g., 44100.0, 48000.0).
    pub sample_rate: f64,
    /// Maximum audio block size in frames; larger host blocks are split.
    pub max_block_size: usize,
    /// Seed for the humanization hash.
    pub humanize_seed: u64,
    /// Swing subdivision used for regular pattern lengths.
    pub swing_grid: SwingGrid,
    /// Capacity of the control → audio command ring.
    pub command_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: DEFAULT_MAX_BLOCK,
            humanize_seed: DEFAULT_HUMANIZE_SEED,
            swing_grid: SwingGrid::Sixteenth,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn with_audio(mut self, sample_rate: f64, max_block_size: usize) -> Self {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.humanize_seed = seed;
        self
    }

    pub fn with_swing_grid(mut self, grid: SwingGrid) -> Self {
        self.swing_grid = grid;
        self
    }

    /// Check the values `prepare` relies on.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(EngineError::InvalidSampleRate(self.sample_rate));
        }
        if self.max_block_size == 0 {
            return Err(EngineError::InvalidBlockSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_audio_settings() {
        let config = EngineConfig::default().with_audio(0.0, 512);
        assert_eq!(config.validate(), Err(EngineError::InvalidSampleRate(0.0)));

        let config = EngineConfig::default().with_audio(f64::NAN, 512);
        assert!(matches!(config.validate(), Err(EngineError::InvalidSampleRate(_))));

        let config = EngineConfig::default().with_audio(44_100.0, 0);
        assert_eq!(config.validate(), Err(EngineError::InvalidBlockSize));
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_audio(44_100.0, 128)
            .with_seed(7)
            .with_swing_grid(SwingGrid::Eighth);
        assert_eq!(config.sample_rate, 44_100.0);
        assert_eq!(config.max_block_size, 128);
        assert_eq!(config.humanize_seed, 7);
        assert_eq!(config.swing_grid, SwingGrid::Eighth);
        assert_eq!(config.command_capacity, DEFAULT_COMMAND_CAPACITY);
    }
}
