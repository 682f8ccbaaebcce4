// src/lib.rs
//
// Library entry point for Rust, FFI (iOS/Swift, plugin hosts) and web
// consumers.

mod audio_buffer;
mod bridge;
mod engine;
mod error;
mod event;
mod groove;
mod kit;
mod mixer;
mod renderer;
mod sequencer;
mod state;
mod transport;
mod voice;
mod voice_allocator;

pub mod ffi;

#[cfg(feature = "web")]
mod wasm;

// Re-export key types for Rust consumers
pub use bridge::{create_bridge, AudioHandle, ControlHandle, EngineReadback};
pub use engine::{Engine, MANUAL_TRIGGER_VELOCITY};
pub use error::{EngineError, EngineResult};
pub use event::{TriggerEvent, TriggerSource};
pub use groove::{GrooveModel, GrooveSettings, SwingGrid};
pub use sequencer::SequencerState;
pub use transport::Transport;
pub use state::{
    ChokePolicy, Command, EngineConfig, EngineParams, MixBus, ParamId, ParamInfo, Pattern,
    Preset, Role, TrackTable, DEFAULT_SAMPLE_RATE, MAX_STEPS, NUM_TRACKS,
};
