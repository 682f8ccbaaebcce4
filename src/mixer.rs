// src/mixer.rs
//
// Mix & stereo image stage.
//
// tracks ──volume──pan──► Room bus ──roomWidth────┐
//                    └──► Effects bus ──effectsWidth──┴─► sum ──stereoWidth──master──► out

use std::f32::consts::FRAC_PI_4;

use crate::audio_buffer::AudioBuffer;
use crate::state::{EngineParams, MixBus, ParamId, TrackTable, NUM_TRACKS};

/// Largest width the stage accepts (2 = doubled side signal).
pub const MAX_WIDTH_FACTOR: f32 = 2.0;

const ROOM: usize = 0;
const EFFECTS: usize = 1;

/// Equal-power pan law. `pan` in [-1, 1]; centre gives -3 dB per side.
#[inline]
pub fn equal_power_pan(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

/// Mid/side width.
///
/// `0` collapses to mono, `1` leaves the image untouched, values up to
/// [`MAX_WIDTH_FACTOR`] widen it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoImage {
    width: f32,
}

impl StereoImage {
    pub fn new(width: f32) -> Self {
        let width = if width.is_nan() { 0.0 } else { width };
        Self {
            width: width.clamp(0.0, MAX_WIDTH_FACTOR),
        }
    }

    #[inline]
    pub fn process_sample(&self, left: f32, right: f32) -> (f32, f32) {
        let mid = (left + right) * 0.5;
        let side = (left - right) * 0.5 * self.width;
        (mid + side, mid - side)
    }

    pub fn process(&self, left: &mut [f32], right: &mut [f32]) {
        if self.width == 1.0 {
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (nl, nr) = self.process_sample(*l, *r);
            *l = nl;
            *r = nr;
        }
    }
}

/// Gains the stage reads for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixSettings {
    pub track_volumes: [f32; NUM_TRACKS],
    pub master_volume: f32,
    pub stereo_width: f32,
    pub room_width: f32,
    pub effects_width: f32,
}

impl MixSettings {
    pub fn from_params(params: &EngineParams) -> Self {
        Self {
            track_volumes: std::array::from_fn(|t| params.track_volume(t)),
            master_volume: params.master_volume(),
            stereo_width: params.get(ParamId::StereoWidth),
            room_width: params.get(ParamId::RoomWidth),
            effects_width: params.get(ParamId::EffectsWidth),
        }
    }
}

impl Default for MixSettings {
    fn default() -> Self {
        Self::from_params(&EngineParams::default())
    }
}

/// Sums per-track mono buffers into the caller's stereo output.
pub struct MixStage {
    /// Two stereo buses, planar: [room L, room R, effects L, effects R]
    buses: AudioBuffer,
    pan_gains: [(f32, f32); NUM_TRACKS],
    routing: [usize; NUM_TRACKS],
}

impl MixStage {
    pub fn new() -> Self {
        Self {
            buses: AudioBuffer::default(),
            pan_gains: [equal_power_pan(0.0); NUM_TRACKS],
            routing: [EFFECTS; NUM_TRACKS],
        }
    }

    /// Cache pan gains and routing; size the bus scratch. Not real-time safe.
    pub fn prepare(&mut self, table: &TrackTable, max_block: usize) {
        for slot in table.slots() {
            self.pan_gains[slot.index] = equal_power_pan(slot.pan);
            self.routing[slot.index] = match slot.bus {
                MixBus::Room => ROOM,
                MixBus::Effects => EFFECTS,
            };
        }
        if self.buses.frames() != max_block {
            self.buses.resize(4, max_block);
        }
    }

    /// Mix `frames` frames of `tracks` and add the result into
    /// `outputs[..][at..at + frames]`.
    ///
    /// Channels beyond the first two are untouched; a single output channel
    /// receives the mid signal.
    pub fn mix(
        &mut self,
        tracks: &AudioBuffer,
        frames: usize,
        settings: &MixSettings,
        outputs: &mut [&mut [f32]],
        at: usize,
    ) {
        let frames = frames.min(self.buses.frames()).min(tracks.frames());
        if frames == 0 {
            return;
        }
        self.buses.clear_frames(frames);

        for track in 0..NUM_TRACKS.min(tracks.channels()) {
            let volume = settings.track_volumes[track];
            if volume == 0.0 {
                continue;
            }
            let (pan_l, pan_r) = self.pan_gains[track];
            let (gain_l, gain_r) = (pan_l * volume, pan_r * volume);
            let bus = self.routing[track] * 2;
            let input = &tracks.channel(track)[..frames];

            let (left, right) = self.buses.channel_pair_mut(bus, bus + 1);
            for ((l, r), &s) in left.iter_mut().zip(right.iter_mut()).zip(input) {
                *l += s * gain_l;
                *r += s * gain_r;
            }
        }

        let room = StereoImage::new(settings.room_width);
        let effects = StereoImage::new(settings.effects_width);
        let master = StereoImage::new(settings.stereo_width);
        let gain = settings.master_volume;

        {
            let (l, r) = self.buses.channel_pair_mut(ROOM * 2, ROOM * 2 + 1);
            room.process(&mut l[..frames], &mut r[..frames]);
        }
        {
            let (l, r) = self.buses.channel_pair_mut(EFFECTS * 2, EFFECTS * 2 + 1);
            effects.process(&mut l[..frames], &mut r[..frames]);
        }

        let room_l = &self.buses.channel(ROOM * 2)[..frames];
        let room_r = &self.buses.channel(ROOM * 2 + 1)[..frames];
        let fx_l = &self.buses.channel(EFFECTS * 2)[..frames];
        let fx_r = &self.buses.channel(EFFECTS * 2 + 1)[..frames];

        match outputs {
            [] => {}
            [mono] => {
                let Some(out) = mono.get_mut(at..at + frames) else {
                    return;
                };
                for i in 0..frames {
                    let (l, r) = master.process_sample(room_l[i] + fx_l[i], room_r[i] + fx_r[i]);
                    out[i] += (l + r) * 0.5 * gain;
                }
            }
            [left, right, ..] => {
                let (Some(out_l), Some(out_r)) =
                    (left.get_mut(at..at + frames), right.get_mut(at..at + frames))
                else {
                    return;
                };
                for i in 0..frames {
                    let (l, r) = master.process_sample(room_l[i] + fx_l[i], room_r[i] + fx_r[i]);
                    out_l[i] += l * gain;
                    out_r[i] += r * gain;
                }
            }
        }
    }
}

impl Default for MixStage {
    fn default() -> Self {
        Self::new()
    }
}
