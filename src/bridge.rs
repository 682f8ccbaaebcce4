//! Thread-safe bridge between the control thread and the audio engine.
//!
//! # Architecture
//!
//! - **Control thread** owns [`ControlHandle`]
//! - **Audio thread** owns [`AudioHandle`] with the [`Engine`]
//! - Parameter levels travel through one `AtomicU32` per parameter
//!   (last write wins, picked up at the next block)
//! - Actions (triggers, step edits, reset) travel through a lock-free SPSC
//!   ring of `Copy` [`Command`]s
//! - Readback (position, step, voices) travels back through atomics
//!
//! # Usage
//!
//! ```ignore
//! let (mut control, mut audio) = create_bridge(engine, 256);
//!
//! // Control thread
//! control.set_parameter("tempo", 96.0);
//! control.trigger(3, 1.0)?;
//!
//! // Audio thread, once per callback
//! audio.process(&mut outputs, frames);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
};

use log::{debug, warn};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

use crate::engine::{Engine, MANUAL_TRIGGER_VELOCITY};
use crate::error::{EngineError, EngineResult};
use crate::sequencer::SequencerState;
use crate::state::{Command, ParamId, Preset, MAX_STEPS, NUM_TRACKS, STORED_PARAM_COUNT};

/// `current_step` value meaning "no step reached yet".
const NO_STEP: u32 = u32::MAX;

/// Snapshot of engine state for the control thread.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineReadback {
    pub sample_position: u64,
    pub current_step: Option<usize>,
    pub active_voices: usize,
    pub running: bool,
}

/// Latest parameter values, stored as `f32` bits.
struct SharedParams {
    values: [AtomicU32; STORED_PARAM_COUNT],
}

impl SharedParams {
    fn from_engine(engine: &Engine) -> Self {
        let current = engine.params().values();
        Self {
            values: std::array::from_fn(|i| AtomicU32::new(current[i].to_bits())),
        }
    }
}

/// Lock-free engine -> control readback.
struct SharedReadback {
    sample_position: AtomicU64,
    current_step: AtomicU32,
    active_voices: AtomicU32,
    running: AtomicBool,
}

impl SharedReadback {
    fn new() -> Self {
        Self {
            sample_position: AtomicU64::new(0),
            current_step: AtomicU32::new(NO_STEP),
            active_voices: AtomicU32::new(0),
            running: AtomicBool::new(false),
        }
    }
}

/// Handle for the control (UI / host automation) thread.
pub struct ControlHandle {
    params: Arc<SharedParams>,
    commands: HeapProd<Command>,
    readback: Arc<SharedReadback>,
    capacity: usize,
}

/// Handle for the audio thread; owns the engine.
pub struct AudioHandle {
    engine: Engine,
    params: Arc<SharedParams>,
    commands: HeapCons<Command>,
    readback: Arc<SharedReadback>,

    /// Bits last forwarded to the engine, per parameter
    applied: [u32; STORED_PARAM_COUNT],
}

/// Create a linked pair of handles around `engine`.
///
/// `capacity` is the command ring size (at least 1).
pub fn create_bridge(engine: Engine, capacity: usize) -> (ControlHandle, AudioHandle) {
    let capacity = capacity.max(1);
    let (producer, consumer) = HeapRb::<Command>::new(capacity).split();
    let params = Arc::new(SharedParams::from_engine(&engine));
    let readback = Arc::new(SharedReadback::new());
    let current = engine.params().values();
    let applied = std::array::from_fn(|i| current[i].to_bits());

    let control = ControlHandle {
        params: Arc::clone(&params),
        commands: producer,
        readback: Arc::clone(&readback),
        capacity,
    };

    let audio = AudioHandle {
        engine,
        params,
        commands: consumer,
        readback,
        applied,
    };

    (control, audio)
}

// ═══════════════════════════════════════════════════════════════════
// ControlHandle - Control Thread API
// ═══════════════════════════════════════════════════════════════════

impl ControlHandle {
    /// Set a parameter by name. Unknown names and a full command queue are
    /// logged and otherwise ignored.
    pub fn set_parameter(&mut self, name: &str, value: f32) {
        if let Err(err) = self.try_set_parameter(name, value) {
            debug!("set_parameter('{name}', {value}) ignored: {err}");
        }
    }

    /// Strict form of [`ControlHandle::set_parameter`].
    pub fn try_set_parameter(&mut self, name: &str, value: f32) -> EngineResult<()> {
        let id = ParamId::resolve(name)?;
        self.set_param(id, value)
    }

    /// Set a typed parameter. The value is clamped here, so
    /// [`ControlHandle::param`] reads back exactly what the engine will use.
    pub fn set_param(&mut self, id: ParamId, value: f32) -> EngineResult<()> {
        if id == ParamId::TrackTrigger {
            if !value.is_finite() {
                return Ok(());
            }
            let track = (value.trunc() as i64).rem_euclid(NUM_TRACKS as i64) as usize;
            return self.trigger(track, MANUAL_TRIGGER_VELOCITY);
        }
        if let Some(index) = id.index() {
            let clamped = id.info().clamp(value);
            self.params.values[index].store(clamped.to_bits(), Ordering::Relaxed);
        }
        Ok(())
    }

    /// Last value written for `id` (clamped).
    pub fn param(&self, id: ParamId) -> f32 {
        id.index()
            .map(|i| f32::from_bits(self.params.values[i].load(Ordering::Relaxed)))
            .unwrap_or(0.0)
    }

    pub fn apply_preset(&mut self, preset: &Preset) {
        debug!("queueing preset '{}'", preset.name);
        for (id, value) in preset.parameters() {
            // Preset values are never triggers, so this cannot fail
            let _ = self.set_param(id, value);
        }
    }

    // ───────────────────────────────────────────────────────────────
    // Commands
    // ───────────────────────────────────────────────────────────────

    fn send(&mut self, command: Command) -> EngineResult<()> {
        if self.commands.try_push(command).is_err() {
            warn!(
                "command queue full (capacity {}), dropped {command:?}",
                self.capacity
            );
            return Err(EngineError::CommandQueueFull);
        }
        Ok(())
    }

    /// Fire a track at the start of the next block.
    pub fn trigger(&mut self, track: usize, velocity: f32) -> EngineResult<()> {
        self.trigger_at(track, velocity, 0)
    }

    pub fn trigger_at(&mut self, track: usize, velocity: f32, offset: usize) -> EngineResult<()> {
        if track >= NUM_TRACKS {
            return Err(EngineError::TrackOutOfRange(track));
        }
        self.send(Command::Trigger {
            track,
            velocity,
            offset,
        })
    }

    pub fn set_step(&mut self, track: usize, step: usize, active: bool) -> EngineResult<()> {
        check_cell(track, step)?;
        self.send(Command::SetStep { track, step, active })
    }

    pub fn toggle_step(&mut self, track: usize, step: usize) -> EngineResult<()> {
        check_cell(track, step)?;
        self.send(Command::ToggleStep { track, step })
    }

    pub fn clear_track(&mut self, track: usize) -> EngineResult<()> {
        if track >= NUM_TRACKS {
            return Err(EngineError::TrackOutOfRange(track));
        }
        self.send(Command::ClearTrack { track })
    }

    /// Rewind transport and silence voices at the next block.
    pub fn reset(&mut self) -> EngineResult<()> {
        self.send(Command::Reset)
    }

    // ───────────────────────────────────────────────────────────────
    // Readback
    // ───────────────────────────────────────────────────────────────

    pub fn readback(&self) -> EngineReadback {
        let step = self.readback.current_step.load(Ordering::Relaxed);
        EngineReadback {
            sample_position: self.readback.sample_position.load(Ordering::Relaxed),
            current_step: (step != NO_STEP).then_some(step as usize),
            active_voices: self.readback.active_voices.load(Ordering::Relaxed) as usize,
            running: self.readback.running.load(Ordering::Relaxed),
        }
    }
}

fn check_cell(track: usize, step: usize) -> EngineResult<()> {
    if track >= NUM_TRACKS {
        return Err(EngineError::TrackOutOfRange(track));
    }
    if step >= MAX_STEPS {
        return Err(EngineError::StepOutOfRange(step));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════
// AudioHandle - Audio Thread API
// ═══════════════════════════════════════════════════════════════════

impl AudioHandle {
    /// Pick up parameters and commands, render, publish readback.
    ///
    /// Call once per audio callback. Never blocks or allocates.
    pub fn process(&mut self, outputs: &mut [&mut [f32]], num_samples: usize) {
        self.sync_params();
        self.process_commands();
        self.engine.process(outputs, num_samples);
        self.sync_readback();
    }

    /// Forward parameters whose bits changed since the last block.
    pub fn sync_params(&mut self) {
        for (index, slot) in self.params.values.iter().enumerate() {
            let bits = slot.load(Ordering::Relaxed);
            if bits == self.applied[index] {
                continue;
            }
            self.applied[index] = bits;
            if let Some(id) = ParamId::from_index(index) {
                self.engine.set_param(id, f32::from_bits(bits));
            }
        }
    }

    /// Apply every queued command.
    pub fn process_commands(&mut self) {
        while let Some(command) = self.commands.try_pop() {
            match command {
                Command::Trigger {
                    track,
                    velocity,
                    offset,
                } => {
                    self.engine.trigger_at(track, velocity, offset);
                }
                Command::SetStep { track, step, active } => {
                    self.engine.set_step(track, step, active);
                }
                Command::ToggleStep { track, step } => {
                    self.engine.toggle_step(track, step);
                }
                Command::ClearTrack { track } => self.engine.clear_track(track),
                Command::Reset => self.engine.reset(),
            }
        }
    }

    /// Publish engine state for the control thread.
    pub fn sync_readback(&self) {
        let rb = &self.readback;
        rb.sample_position
            .store(self.engine.sample_position(), Ordering::Relaxed);
        let step = self
            .engine
            .current_step()
            .map(|s| s as u32)
            .unwrap_or(NO_STEP);
        rb.current_step.store(step, Ordering::Relaxed);
        rb.active_voices
            .store(self.engine.active_voices() as u32, Ordering::Relaxed);
        rb.running.store(
            self.engine.state() == SequencerState::Running,
            Ordering::Relaxed,
        );
    }

    /// Prepare the engine (not real-time safe).
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        self.engine.prepare(sample_rate, max_block_size);
        self.sync_readback();
    }

    /// Load a custom sample (not real-time safe).
    pub fn load_sample(&mut self, track: usize, samples: &[f32], source_rate: f64) -> EngineResult<()> {
        self.engine.load_sample(track, samples, source_rate)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EngineConfig, Pattern};

    fn bridge(capacity: usize) -> (ControlHandle, AudioHandle) {
        let engine = Engine::with_config(EngineConfig::default()).expect("default config");
        create_bridge(engine, capacity)
    }

    fn run(audio: &mut AudioHandle, frames: usize) -> Vec<f32> {
        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];
        {
            let mut outputs: [&mut [f32]; 2] = [left.as_mut_slice(), right.as_mut_slice()];
            audio.process(&mut outputs, frames);
        }
        left
    }

    #[test]
    fn test_parameters_reach_engine_at_next_block() {
        let (mut control, mut audio) = bridge(16);
        control.set_parameter("tempo", 90.0);
        control.set_parameter("trackVolume_4", 2.0);
        assert_eq!(control.param(ParamId::TrackVolume(4)), 1.0);
        assert_eq!(audio.engine().param(ParamId::Tempo), 120.0);

        run(&mut audio, 64);
        assert_eq!(audio.engine().param(ParamId::Tempo), 90.0);
        assert_eq!(audio.engine().param(ParamId::TrackVolume(4)), 1.0);
    }

    #[test]
    fn test_strict_setter_reports_unknown_names() {
        let (mut control, _audio) = bridge(16);
        assert!(matches!(
            control.try_set_parameter("wobble", 1.0),
            Err(EngineError::UnknownParameter(_))
        ));
        control.set_parameter("wobble", 1.0);
    }

    #[test]
    fn test_commands_edit_pattern_and_trigger() {
        let (mut control, mut audio) = bridge(16);
        audio.engine_mut().set_pattern(Pattern::new());

        control.set_step(7, 2, true).expect("queued");
        assert_eq!(control.set_step(16, 2, true), Err(EngineError::TrackOutOfRange(16)));
        assert_eq!(control.toggle_step(0, 16), Err(EngineError::StepOutOfRange(16)));
        control.trigger(3, 1.0).expect("queued");

        let left = run(&mut audio, 256);
        assert!(audio.engine().pattern().is_active(7, 2));
        assert!(left.iter().any(|&s| s != 0.0));
        assert!(control.readback().active_voices >= 1);
    }

    #[test]
    fn test_track_trigger_parameter_becomes_command() {
        let (mut control, mut audio) = bridge(16);
        audio.engine_mut().set_pattern(Pattern::new());
        control.set_parameter("trackTrigger", 35.0); // 35 mod 16 = 3

        run(&mut audio, 128);
        assert_eq!(audio.engine().active_voices(), 1);
    }

    #[test]
    fn test_full_queue_is_reported() {
        let (mut control, mut audio) = bridge(1);
        control.trigger(0, 1.0).expect("first fits");
        assert_eq!(control.trigger(1, 1.0), Err(EngineError::CommandQueueFull));

        run(&mut audio, 64);
        control.trigger(1, 1.0).expect("drained");
    }

    #[test]
    fn test_readback_tracks_transport() {
        let (mut control, mut audio) = bridge(16);
        assert_eq!(control.readback(), EngineReadback::default());

        run(&mut audio, 512);
        let rb = control.readback();
        assert_eq!(rb.sample_position, 512);
        assert_eq!(rb.current_step, Some(0));
        assert!(rb.running);

        control.reset().expect("queued");
        run(&mut audio, 0);
        assert_eq!(control.readback().sample_position, 0);
        assert!(!control.readback().running);
    }

    #[test]
    fn test_preset_through_bridge() {
        let (mut control, mut audio) = bridge(16);
        let preset = Preset::by_name("Drum & Bass").expect("factory preset");
        control.apply_preset(preset);
        run(&mut audio, 64);
        assert_eq!(audio.engine().param(ParamId::Tempo), 174.0);
        assert_eq!(audio.engine().param(ParamId::StereoWidth), 0.8);
    }

    #[test]
    fn test_audio_handle_runs_on_another_thread() {
        let (mut control, mut audio) = bridge(64);
        let worker = std::thread::spawn(move || {
            for _ in 0..100 {
                run(&mut audio, 480);
            }
            audio
        });
        for i in 0..50 {
            control.set_parameter("swing", i as f32 / 50.0);
        }
        let audio = worker.join().expect("audio thread");
        assert_eq!(audio.engine().sample_position(), 48_000);
    }
}
