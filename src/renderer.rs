// src/renderer.rs
//
// Track renderer: turns trigger events into per-track mono audio.
//
// Rendering is sliced at trigger offsets. `trigger(track, velocity,
// offset)` first renders every ringing voice up to `offset`, then applies
// the choke policy and starts the new voice, so both the new hit and any
// choke land exactly on their sample.

use log::info;

use crate::audio_buffer::AudioBuffer;
use crate::error::EngineResult;
use crate::kit::DrumKit;
use crate::state::{ChokePolicy, TrackTable, NUM_TRACKS};
use crate::voice_allocator::VoiceAllocator;

/// Voice pool size.
pub const MAX_VOICES: usize = 64;

/// Ringing voices one `Layer` track may stack.
pub const MAX_LAYERED_VOICES: usize = 4;

pub struct TrackRenderer {
    kit: DrumKit,
    voices: VoiceAllocator,

    /// Per-track mono output for the current block (one channel per track)
    tracks: AudioBuffer,

    /// Bitmask of tracks to choke when each track fires
    choke_masks: [u16; NUM_TRACKS],
    layer_limits: [usize; NUM_TRACKS],

    block_frames: usize,
    rendered_to: usize,
}

impl TrackRenderer {
    pub fn new() -> Self {
        Self {
            kit: DrumKit::empty(),
            voices: VoiceAllocator::new(MAX_VOICES),
            tracks: AudioBuffer::default(),
            choke_masks: [0; NUM_TRACKS],
            layer_limits: [1; NUM_TRACKS],
            block_frames: 0,
            rendered_to: 0,
        }
    }

    /// Size buffers and (re)build the kit when the sample rate changed.
    /// Not real-time safe.
    pub fn prepare(&mut self, table: &TrackTable, sample_rate: f64, max_block: usize) {
        if self.kit.sample_rate() != sample_rate {
            info!("building drum kit for {sample_rate} Hz");
            self.kit.rebuild(table, sample_rate);
        }
        if self.tracks.frames() != max_block {
            self.tracks.resize(NUM_TRACKS, max_block);
        }

        for slot in table.slots() {
            let (mask, limit) = match slot.choke {
                ChokePolicy::Choke => (1u16 << slot.index, 1),
                ChokePolicy::Group(group) => (
                    table.group_members(group).fold(0u16, |m, t| m | (1 << t)),
                    1,
                ),
                ChokePolicy::Layer => (0, MAX_LAYERED_VOICES),
            };
            self.choke_masks[slot.index] = mask;
            self.layer_limits[slot.index] = limit;
        }

        self.reset();
    }

    pub fn reset(&mut self) {
        self.voices.reset();
        self.tracks.clear();
        self.block_frames = 0;
        self.rendered_to = 0;
    }

    /// Replace a track's one-shot. Not real-time safe.
    pub fn load_sample(&mut self, track: usize, samples: &[f32], source_rate: f64) -> EngineResult<()> {
        self.kit.replace(track, samples, source_rate)
    }

    // -------------------------------
    // MARK: Block processing
    // -------------------------------

    /// Start a block of `frames` (at most the prepared block size).
    pub fn begin_block(&mut self, frames: usize) {
        self.block_frames = frames.min(self.tracks.frames());
        self.tracks.clear_frames(self.block_frames);
        self.rendered_to = 0;
    }

    /// Start `track` at `offset` frames into the block.
    ///
    /// Offsets past the block end are pinned to its last frame; invalid
    /// tracks are dropped.
    pub fn trigger(&mut self, track: usize, velocity: f32, offset: usize) {
        if track >= NUM_TRACKS || self.block_frames == 0 {
            return;
        }
        let offset = offset.min(self.block_frames - 1);
        if offset > self.rendered_to {
            self.render_into(self.rendered_to, offset - self.rendered_to);
            self.rendered_to = offset;
        }
        self.voices.trigger(
            track,
            velocity,
            self.choke_masks[track],
            self.layer_limits[track],
        );
    }

    /// Render the rest of the block.
    pub fn finish_block(&mut self) {
        if self.block_frames > self.rendered_to {
            self.render_into(self.rendered_to, self.block_frames - self.rendered_to);
            self.rendered_to = self.block_frames;
        }
    }

    /// Render `count` frames of every active voice starting at `start`.
    pub fn render_into(&mut self, start: usize, count: usize) {
        let end = (start + count).min(self.tracks.frames());
        if start >= end {
            return;
        }
        for voice in self.voices.voices_mut() {
            let sample = self.kit.sample(voice.track);
            let out = &mut self.tracks.channel_mut(voice.track)[start..end];
            voice.render(sample, out);
        }
    }

    /// Finished per-track buffers (valid for the current block's frames).
    #[inline]
    pub fn tracks(&self) -> &AudioBuffer {
        &self.tracks
    }

    #[inline]
    pub fn active_voices(&self) -> usize {
        self.voices.active_count()
    }
}

impl Default for TrackRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared() -> TrackRenderer {
        let mut renderer = TrackRenderer::new();
        renderer.prepare(&TrackTable::standard(), 48_000.0, 256);
        renderer
    }

    #[test]
    fn test_audio_starts_exactly_at_offset() {
        let mut renderer = prepared();
        renderer.load_sample(0, &[1.0; 1000], 48_000.0).expect("load");

        renderer.begin_block(256);
        renderer.trigger(0, 1.0, 100);
        renderer.finish_block();

        let track = &renderer.tracks().channel(0)[..256];
        assert!(track[..100].iter().all(|&s| s == 0.0));
        assert!(track[100..].iter().all(|&s| s == 1.0));
        assert!(renderer.tracks().channel(1)[..256].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_loaded_sample_survives_rate_change() {
        let mut renderer = prepared();
        renderer.load_sample(0, &[1.0; 1000], 48_000.0).expect("load");
        renderer.prepare(&TrackTable::standard(), 44_100.0, 256);

        renderer.begin_block(256);
        renderer.trigger(0, 1.0, 0);
        renderer.finish_block();

        let track = &renderer.tracks().channel(0)[..256];
        assert!(track.iter().all(|&s| (s - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_voice_continues_into_next_block() {
        let mut renderer = prepared();
        renderer.load_sample(5, &[0.5; 300], 48_000.0).expect("load");

        renderer.begin_block(256);
        renderer.trigger(5, 1.0, 200);
        renderer.finish_block();
        renderer.begin_block(256);
        renderer.finish_block();

        let second = &renderer.tracks().channel(5)[..256];
        assert!(second[..244].iter().all(|&s| s == 0.5));
        assert!(second[244..].iter().all(|&s| s == 0.0));
        assert_eq!(renderer.active_voices(), 0);
    }

    #[test]
    fn test_closed_hat_chokes_open_hat_at_its_offset() {
        let mut renderer = prepared();
        renderer.load_sample(3, &[1.0; 10_000], 48_000.0).expect("load");
        renderer.load_sample(2, &[0.0; 10], 48_000.0).expect("load");

        renderer.begin_block(256);
        renderer.trigger(3, 1.0, 0);
        renderer.trigger(2, 1.0, 128);
        renderer.finish_block();

        let open = &renderer.tracks().channel(3)[..256];
        assert!(open[..128].iter().all(|&s| s == 1.0));
        assert!(open[128 + crate::voice::CHOKE_FADE_FRAMES..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_invalid_track_is_dropped() {
        let mut renderer = prepared();
        renderer.begin_block(64);
        renderer.trigger(16, 1.0, 0);
        renderer.finish_block();
        assert_eq!(renderer.active_voices(), 0);
    }
}
