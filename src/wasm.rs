//! WebAssembly bindings via wasm-bindgen for browser integration.
//!
//! This module is only compiled when the `web` feature is enabled.
//!
//! # Usage
//!
//! Build with wasm-pack:
//! ```bash
//! wasm-pack build --target web --features web
//! ```
//!
//! # JavaScript Example
//!
//! ```javascript
//! import init, { drumgroove_init, DrumMachine } from './drumgroove.js';
//!
//! await init();
//! drumgroove_init();
//!
//! const machine = new DrumMachine(sampleRate, 128);
//! machine.apply_preset("J Dilla Style");
//! machine.set_step(7, 2, true);
//!
//! // Inside the AudioWorklet's process()
//! machine.process(outputs[0][0], outputs[0][1]);
//! ```

use wasm_bindgen::prelude::*;

use crate::bridge::{AudioHandle, ControlHandle, EngineReadback, create_bridge};
use crate::engine::Engine;
use crate::state::{EngineConfig, ParamId, Preset, DEFAULT_MAX_BLOCK};

// ═══════════════════════════════════════════════════════════════════════════
// Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the wasm module. Call this once before using any other functions.
/// Sets up panic hooks and console logging.
#[wasm_bindgen]
pub fn drumgroove_init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// Readback Data
// ═══════════════════════════════════════════════════════════════════════════

/// Playhead and voice state for UI displays.
#[wasm_bindgen]
#[derive(Clone, Copy, Default)]
pub struct DrumReadback {
    /// Frames rendered since the last reset.
    pub sample_position: u64,
    /// Last step the playhead crossed, or -1.
    pub current_step: i32,
    /// Number of sounding voices.
    pub active_voices: u32,
    /// Whether the sequencer is running.
    pub running: bool,
}

impl From<EngineReadback> for DrumReadback {
    fn from(r: EngineReadback) -> Self {
        Self {
            sample_position: r.sample_position,
            current_step: r.current_step.map(|s| s as i32).unwrap_or(-1),
            active_voices: r.active_voices as u32,
            running: r.running,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DrumMachine
// ═══════════════════════════════════════════════════════════════════════════

/// Engine plus both bridge handles, for a single-threaded AudioWorklet.
#[wasm_bindgen]
pub struct DrumMachine {
    control: ControlHandle,
    audio: AudioHandle,
}

#[wasm_bindgen]
impl DrumMachine {
    /// Create a prepared machine. Invalid settings fall back to defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64, max_block_size: u32) -> DrumMachine {
        let config = EngineConfig::default().with_audio(sample_rate, max_block_size as usize);
        let engine = Engine::with_config(config).unwrap_or_else(|err| {
            log::warn!("DrumMachine::new: {err}, using defaults");
            let mut engine = Engine::new(EngineConfig::default());
            engine.prepare(config.sample_rate.max(1.0), DEFAULT_MAX_BLOCK);
            engine
        });
        let (control, audio) = create_bridge(engine, config.command_capacity);
        DrumMachine { control, audio }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parameters
    // ─────────────────────────────────────────────────────────────────────────

    /// Set a parameter by name. Unknown names are ignored.
    pub fn set_parameter(&mut self, name: &str, value: f32) {
        self.control.set_parameter(name, value);
    }

    /// Last value written for a parameter (0 if unknown).
    pub fn get_parameter(&self, name: &str) -> f32 {
        ParamId::from_name(name)
            .map(|id| self.control.param(id))
            .unwrap_or(0.0)
    }

    /// Apply a factory preset by name. Returns `false` if unknown.
    pub fn apply_preset(&mut self, name: &str) -> bool {
        match Preset::by_name(name) {
            Ok(preset) => {
                self.control.apply_preset(preset);
                true
            }
            Err(err) => {
                log::warn!("{err}");
                false
            }
        }
    }

    /// Names of the factory presets, in program order.
    pub fn preset_names() -> Vec<String> {
        Preset::factory().iter().map(|p| p.name.to_string()).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Live input and pattern
    // ─────────────────────────────────────────────────────────────────────────

    /// Fire a track at the start of the next block.
    pub fn trigger(&mut self, track: u32, velocity: f32) -> bool {
        self.control.trigger(track as usize, velocity).is_ok()
    }

    pub fn set_step(&mut self, track: u32, step: u32, active: bool) -> bool {
        self.control
            .set_step(track as usize, step as usize, active)
            .is_ok()
    }

    pub fn toggle_step(&mut self, track: u32, step: u32) -> bool {
        self.control
            .toggle_step(track as usize, step as usize)
            .is_ok()
    }

    pub fn clear_track(&mut self, track: u32) -> bool {
        self.control.clear_track(track as usize).is_ok()
    }

    /// Whether a step is active in the engine's pattern.
    pub fn is_step_active(&self, track: u32, step: u32) -> bool {
        self.audio
            .engine()
            .pattern()
            .is_active(track as usize, step as usize)
    }

    /// Replace a track's sound with mono sample data.
    pub fn load_sample(&mut self, track: u32, samples: &[f32], source_rate: f64) -> bool {
        match self.audio.load_sample(track as usize, samples, source_rate) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("load_sample: {err}");
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Audio
    // ─────────────────────────────────────────────────────────────────────────

    /// Re-prepare for a new sample rate and block size.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: u32) -> bool {
        let check = EngineConfig::default().with_audio(sample_rate, max_block_size as usize);
        if let Err(err) = check.validate() {
            log::warn!("prepare: {err}");
            return false;
        }
        self.audio.prepare(sample_rate, max_block_size as usize);
        true
    }

    /// Zero transport and voices.
    pub fn reset(&mut self) {
        self.audio.engine_mut().reset();
        self.audio.sync_readback();
    }

    /// Render one block into the worklet's output channels (overwritten).
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        left.fill(0.0);
        right.fill(0.0);
        let frames = left.len().min(right.len());
        let mut outputs = [left, right];
        self.audio.process(&mut outputs, frames);
    }

    /// Render one block into a single channel (mono fold).
    pub fn process_mono(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let frames = output.len();
        let mut outputs = [output];
        self.audio.process(&mut outputs, frames);
    }

    pub fn readback(&self) -> DrumReadback {
        self.control.readback().into()
    }
}
