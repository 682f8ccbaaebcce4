// src/event.rs

/// Where a trigger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// Released by the sequencer for this step index
    Step(usize),
    /// Live input (`trackTrigger`, MIDI, pad)
    Manual,
}

/// A trigger expressed in sample time.
///
/// These events:
/// - are RT-safe (`Copy`, no heap data)
/// - carry a block-relative offset, never musical time
/// - are dispatched by the engine exactly once
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerEvent {
    pub track: usize,
    /// Frames from the start of the current block
    pub offset: usize,
    pub velocity: f32,
    pub source: TriggerSource,
}
