// src/error.rs
//
// Errors for the off-real-time control surface.
//
// The audio path never returns these: it clamps or ignores instead.

use thiserror::Error;

/// Error raised by configuration, control-thread and loading APIs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// `prepare` was handed a sample rate that is not a positive number.
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    /// `prepare` was handed a zero block size.
    #[error("max block size must be at least 1 frame")]
    InvalidBlockSize,

    /// A parameter name did not resolve.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    /// Track index outside 0..16.
    #[error("track {0} is out of range")]
    TrackOutOfRange(usize),

    /// Step index outside 0..16.
    #[error("step {0} is out of range")]
    StepOutOfRange(usize),

    /// No factory preset with that name or index.
    #[error("no preset named '{0}'")]
    UnknownPreset(String),

    /// A custom sample had no frames.
    #[error("sample for track {0} is empty")]
    EmptySample(usize),

    /// The engine has not been prepared yet.
    #[error("engine is not prepared")]
    NotPrepared,

    /// The control → audio command ring is full.
    #[error("command queue is full")]
    CommandQueueFull,
}

/// Result alias for fallible control-side operations.
pub type EngineResult<T> = Result<T, EngineError>;
