// src/engine.rs

use log::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::groove::GrooveModel;
use crate::mixer::{MixSettings, MixStage};
use crate::renderer::TrackRenderer;
use crate::sequencer::{SequencerState, StepSequencer};
use crate::state::{
    EngineConfig, EngineParams, ParamId, Pattern, Preset, TrackTable, NUM_TRACKS,
};
use crate::transport::Transport;

/// Velocity for live triggers that do not carry one.
pub const MANUAL_TRIGGER_VELOCITY: f32 = 1.0;

/// Real-time drum engine.
///
/// `process` runs on the audio thread: it is deterministic,
/// allocation-free and lock-free. Everything that allocates (`prepare`,
/// `load_sample`) or logs happens off the audio path.
pub struct Engine {
    config: EngineConfig,
    prepared: bool,

    table: TrackTable,
    params: EngineParams,
    pattern: Pattern,

    groove: GrooveModel,
    sequencer: StepSequencer,
    renderer: TrackRenderer,
    mixer: MixStage,
    mix_settings: MixSettings,
}

impl Engine {
    /// Build an unprepared engine. `process` outputs nothing until
    /// [`Engine::prepare`] is called.
    pub fn new(config: EngineConfig) -> Self {
        let params = EngineParams::default();
        let mut groove = GrooveModel::new(config.humanize_seed, config.swing_grid);
        for id in ParamId::stored() {
            groove.set_param(id, params.get(id));
        }
        let pattern = Pattern::basic_beat();
        groove.set_revision(pattern.revision());

        Self {
            config,
            prepared: false,
            table: TrackTable::standard(),
            mix_settings: MixSettings::from_params(&params),
            params,
            pattern,
            groove,
            sequencer: StepSequencer::new(config.sample_rate),
            renderer: TrackRenderer::new(),
            mixer: MixStage::new(),
        }
    }

    /// Validate `config` and prepare with its audio settings.
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let mut engine = Self::new(config);
        engine.prepare(config.sample_rate, config.max_block_size);
        Ok(engine)
    }

    // -------------------------------
    // MARK: Lifecycle (not real-time safe)
    // -------------------------------

    /// Size buffers and build the kit. Idempotent; rewinds the transport.
    ///
    /// # Panics
    ///
    /// If `sample_rate` is not a positive number or `max_block_size` is 0.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        assert!(
            sample_rate.is_finite() && sample_rate > 0.0,
            "sample rate must be positive, got {sample_rate}"
        );
        assert!(max_block_size > 0, "max block size must be at least 1");

        info!("prepare: {sample_rate} Hz, max block {max_block_size}");

        self.config.sample_rate = sample_rate;
        self.config.max_block_size = max_block_size;
        self.table = TrackTable::standard();

        self.renderer.prepare(&self.table, sample_rate, max_block_size);
        self.mixer.prepare(&self.table, max_block_size);
        self.sequencer.prepare(sample_rate);
        self.prepared = true;
    }

    /// Zero transport and voice state. Pattern and parameters are kept.
    pub fn reset(&mut self) {
        debug!("reset: transport rewound, voices cleared");
        self.sequencer.reset();
        self.renderer.reset();
    }

    /// Replace a track's one-shot with user audio.
    pub fn load_sample(&mut self, track: usize, samples: &[f32], source_rate: f64) -> EngineResult<()> {
        if !self.prepared {
            return Err(EngineError::NotPrepared);
        }
        self.renderer.load_sample(track, samples, source_rate)?;
        info!(
            "loaded {} frames @ {source_rate} Hz into track {track}",
            samples.len()
        );
        Ok(())
    }

    /// Flatten a preset into parameter writes.
    pub fn apply_preset(&mut self, preset: &Preset) {
        info!("applying preset '{}'", preset.name);
        preset.apply(|id, value| self.set_param(id, value));
    }

    // -------------------------------
    // MARK: Parameters (real-time safe)
    // -------------------------------

    /// Set a parameter by host-facing name. Unknown names are ignored.
    pub fn set_parameter(&mut self, name: &str, value: f32) {
        if let Some(id) = ParamId::from_name(name) {
            self.set_param(id, value);
        }
    }

    /// Set a typed parameter. Values are clamped; `TrackTrigger` fires
    /// `value mod 16` at the start of the next block.
    pub fn set_param(&mut self, id: ParamId, value: f32) {
        if id == ParamId::TrackTrigger {
            if value.is_finite() {
                let track = (value.trunc() as i64).rem_euclid(NUM_TRACKS as i64) as usize;
                self.trigger(track, MANUAL_TRIGGER_VELOCITY);
            }
            return;
        }

        let Some(stored) = self.params.set(id, value) else {
            return;
        };
        self.groove.set_param(id, stored);
        match id {
            ParamId::MasterVolume => self.mix_settings.master_volume = stored,
            ParamId::StereoWidth => self.mix_settings.stereo_width = stored,
            ParamId::RoomWidth => self.mix_settings.room_width = stored,
            ParamId::EffectsWidth => self.mix_settings.effects_width = stored,
            ParamId::TrackVolume(track) => {
                self.mix_settings.track_volumes[track as usize % NUM_TRACKS] = stored
            }
            _ => {}
        }
    }

    #[inline]
    pub fn param(&self, id: ParamId) -> f32 {
        self.params.get(id)
    }

    #[inline]
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    // -------------------------------
    // MARK: Live input (real-time safe)
    // -------------------------------

    /// Fire `track` at the start of the next block.
    pub fn trigger(&mut self, track: usize, velocity: f32) -> bool {
        self.trigger_at(track, velocity, 0)
    }

    /// Fire `track` `offset` frames into the next block. Invalid tracks
    /// are dropped.
    pub fn trigger_at(&mut self, track: usize, velocity: f32, offset: usize) -> bool {
        let velocity = if velocity.is_nan() { 0.0 } else { velocity.clamp(0.0, 1.0) };
        self.sequencer.trigger(track, velocity, offset)
    }

    // -------------------------------
    // MARK: Pattern editing (real-time safe)
    // -------------------------------

    /// Returns `false` when `track` or `step` is out of range.
    pub fn set_step(&mut self, track: usize, step: usize, active: bool) -> bool {
        let ok = self.pattern.set(track, step, active);
        self.groove.set_revision(self.pattern.revision());
        ok
    }

    pub fn toggle_step(&mut self, track: usize, step: usize) -> Option<bool> {
        let state = self.pattern.toggle(track, step);
        self.groove.set_revision(self.pattern.revision());
        state
    }

    pub fn clear_track(&mut self, track: usize) {
        self.pattern.clear_track(track);
        self.groove.set_revision(self.pattern.revision());
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = pattern;
        self.groove.set_revision(self.pattern.revision());
    }

    #[inline]
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    // -------------------------------
    // MARK: Audio
    // -------------------------------

    /// Render `num_samples` frames, adding into `outputs[0]` / `outputs[1]`.
    ///
    /// Never writes past the shortest of the first two buffers. Host blocks
    /// larger than the prepared size, or longer than the sequencer can
    /// schedule at once, are split. Does nothing before
    /// `prepare`.
    pub fn process(&mut self, outputs: &mut [&mut [f32]], num_samples: usize) {
        if !self.prepared {
            return;
        }
        let available = outputs
            .iter()
            .take(2)
            .map(|ch| ch.len())
            .min()
            .unwrap_or(num_samples);
        let total = num_samples.min(available);

        let mut done = 0;
        while done < total {
            let limit = self
                .config
                .max_block_size
                .min(self.sequencer.max_block_frames(&self.groove));
            let frames = (total - done).min(limit);
            self.process_block(outputs, done, frames);
            done += frames;
        }
    }

    /// One slice of at most `max_block_size` frames.
    #[inline]
    fn process_block(&mut self, outputs: &mut [&mut [f32]], at: usize, frames: usize) {
        self.sequencer
            .begin_block(frames, &self.pattern, &self.groove, &self.table);
        self.renderer.begin_block(frames);

        while let Some(event) = self.sequencer.pop_due() {
            self.renderer.trigger(event.track, event.velocity, event.offset);
        }
        self.renderer.finish_block();

        self.mixer
            .mix(self.renderer.tracks(), frames, &self.mix_settings, outputs, at);
        self.sequencer.end_block();
    }

    // -------------------------------
    // MARK: Readback
    // -------------------------------

    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn sample_position(&self) -> u64 {
        self.sequencer.sample_position()
    }

    /// Tempo, rate and position of the sequencer's clock.
    #[inline]
    pub fn transport(&self) -> &Transport {
        self.sequencer.transport()
    }

    #[inline]
    pub fn current_step(&self) -> Option<usize> {
        self.sequencer.current_step()
    }

    #[inline]
    pub fn state(&self) -> SequencerState {
        self.sequencer.state()
    }

    #[inline]
    pub fn active_voices(&self) -> usize {
        self.renderer.active_voices()
    }

    #[inline]
    pub fn dropped_triggers(&self) -> u32 {
        self.sequencer.dropped_triggers()
    }

    #[inline]
    pub fn track_table(&self) -> &TrackTable {
        &self.table
    }
}
