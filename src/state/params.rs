// src/state/params.rs
//
// Typed parameter identifiers and the validated parameter store.
//
// Host-facing names are resolved to a `ParamId` once, on the control side.
// The audio path only ever sees `ParamId` + clamped `f32`.

use crate::error::{EngineError, EngineResult};

use super::param_info::{ParamInfo, ParamUnit};
use super::track_table::NUM_TRACKS;

/// Number of parameters with a stored value (16 globals + 16 track volumes).
pub const STORED_PARAM_COUNT: usize = GLOBAL_PARAMS.len() + NUM_TRACKS;

/// Typed identifier for every host parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Tempo,
    Swing,
    MasterVolume,
    PatternLength,
    PocketOffset,
    PushOffset,
    PullOffset,
    DillaAmount,
    DillaHatBias,
    DillaSnareLate,
    DillaKickTight,
    DillaMaxDrift,
    Structure,
    StereoWidth,
    RoomWidth,
    EffectsWidth,
    /// Per-track gain, index 0..16
    TrackVolume(u8),
    /// One-shot trigger for `value mod 16`; has no stored value
    TrackTrigger,
}

// Order matches `ParamId::index` for the global parameters.
const GLOBAL_PARAMS: [ParamInfo; 16] = [
    ParamInfo::new("tempo", "Tempo")
        .range(60.0, 200.0)
        .default(120.0)
        .unit(ParamUnit::Bpm),
    ParamInfo::new("swing", "Swing").default(0.0),
    ParamInfo::new("masterVolume", "Master")
        .default(0.8)
        .unit(ParamUnit::Gain),
    ParamInfo::new("patternLength", "Pattern Length")
        .range(1.0, 16.0)
        .default(16.0)
        .unit(ParamUnit::Steps)
        .stepped(1.0),
    ParamInfo::new("pocketOffset", "Pocket Offset")
        .range(-0.1, 0.1)
        .default(0.0)
        .unit(ParamUnit::Seconds),
    ParamInfo::new("pushOffset", "Push Offset")
        .range(-0.1, 0.1)
        .default(-0.04)
        .unit(ParamUnit::Seconds),
    ParamInfo::new("pullOffset", "Pull Offset")
        .range(-0.1, 0.1)
        .default(0.06)
        .unit(ParamUnit::Seconds),
    ParamInfo::new("dillaAmount", "Dilla Amount").default(0.6),
    ParamInfo::new("dillaHatBias", "Dilla Hat Bias").default(0.55),
    ParamInfo::new("dillaSnareLate", "Dilla Snare Late").default(0.8),
    ParamInfo::new("dillaKickTight", "Dilla Kick Tight").default(0.7),
    ParamInfo::new("dillaMaxDrift", "Dilla Max Drift")
        .range(0.0, 0.3)
        .default(0.15)
        .unit(ParamUnit::Seconds),
    ParamInfo::new("structure", "Structure").default(0.5),
    ParamInfo::new("stereoWidth", "Stereo Width").default(0.5),
    ParamInfo::new("roomWidth", "Room Width").default(0.3),
    ParamInfo::new("effectsWidth", "Effects Width").default(0.7),
];

const TRACK_VOLUME_NAMES: [&str; NUM_TRACKS] = [
    "trackVolume_0",
    "trackVolume_1",
    "trackVolume_2",
    "trackVolume_3",
    "trackVolume_4",
    "trackVolume_5",
    "trackVolume_6",
    "trackVolume_7",
    "trackVolume_8",
    "trackVolume_9",
    "trackVolume_10",
    "trackVolume_11",
    "trackVolume_12",
    "trackVolume_13",
    "trackVolume_14",
    "trackVolume_15",
];

const TRACK_VOLUME_LABELS: [&str; NUM_TRACKS] = [
    "Track 1 Vol",
    "Track 2 Vol",
    "Track 3 Vol",
    "Track 4 Vol",
    "Track 5 Vol",
    "Track 6 Vol",
    "Track 7 Vol",
    "Track 8 Vol",
    "Track 9 Vol",
    "Track 10 Vol",
    "Track 11 Vol",
    "Track 12 Vol",
    "Track 13 Vol",
    "Track 14 Vol",
    "Track 15 Vol",
    "Track 16 Vol",
];

const TRACK_VOLUME_DEFAULT: f32 = 0.8;

const TRACK_TRIGGER: ParamInfo = ParamInfo::new("trackTrigger", "Track Trigger")
    .range(0.0, 127.0)
    .unit(ParamUnit::Track)
    .stepped(1.0);

impl ParamId {
    /// Resolve a host-facing name without allocating.
    ///
    /// Accepts the `master` alias for `masterVolume`.
    pub fn from_name(name: &str) -> Option<ParamId> {
        let id = match name {
            "tempo" => ParamId::Tempo,
            "swing" => ParamId::Swing,
            "masterVolume" | "master" => ParamId::MasterVolume,
            "patternLength" => ParamId::PatternLength,
            "pocketOffset" => ParamId::PocketOffset,
            "pushOffset" => ParamId::PushOffset,
            "pullOffset" => ParamId::PullOffset,
            "dillaAmount" => ParamId::DillaAmount,
            "dillaHatBias" => ParamId::DillaHatBias,
            "dillaSnareLate" => ParamId::DillaSnareLate,
            "dillaKickTight" => ParamId::DillaKickTight,
            "dillaMaxDrift" => ParamId::DillaMaxDrift,
            "structure" => ParamId::Structure,
            "stereoWidth" => ParamId::StereoWidth,
            "roomWidth" => ParamId::RoomWidth,
            "effectsWidth" => ParamId::EffectsWidth,
            "trackTrigger" => ParamId::TrackTrigger,
            other => {
                let index: usize = other.strip_prefix("trackVolume_")?.parse().ok()?;
                if index >= NUM_TRACKS {
                    return None;
                }
                ParamId::TrackVolume(index as u8)
            }
        };
        Some(id)
    }

    /// Strict form of [`ParamId::from_name`] for control-side callers.
    pub fn resolve(name: &str) -> EngineResult<ParamId> {
        Self::from_name(name).ok_or_else(|| EngineError::UnknownParameter(name.to_string()))
    }

    /// Slot in the stored-value table, `None` for one-shot parameters.
    #[inline]
    pub fn index(self) -> Option<usize> {
        let index = match self {
            ParamId::Tempo => 0,
            ParamId::Swing => 1,
            ParamId::MasterVolume => 2,
            ParamId::PatternLength => 3,
            ParamId::PocketOffset => 4,
            ParamId::PushOffset => 5,
            ParamId::PullOffset => 6,
            ParamId::DillaAmount => 7,
            ParamId::DillaHatBias => 8,
            ParamId::DillaSnareLate => 9,
            ParamId::DillaKickTight => 10,
            ParamId::DillaMaxDrift => 11,
            ParamId::Structure => 12,
            ParamId::StereoWidth => 13,
            ParamId::RoomWidth => 14,
            ParamId::EffectsWidth => 15,
            ParamId::TrackVolume(track) => GLOBAL_PARAMS.len() + (track as usize % NUM_TRACKS),
            ParamId::TrackTrigger => return None,
        };
        Some(index)
    }

    /// Inverse of [`ParamId::index`].
    pub fn from_index(index: usize) -> Option<ParamId> {
        const GLOBALS: [ParamId; 16] = [
            ParamId::Tempo,
            ParamId::Swing,
            ParamId::MasterVolume,
            ParamId::PatternLength,
            ParamId::PocketOffset,
            ParamId::PushOffset,
            ParamId::PullOffset,
            ParamId::DillaAmount,
            ParamId::DillaHatBias,
            ParamId::DillaSnareLate,
            ParamId::DillaKickTight,
            ParamId::DillaMaxDrift,
            ParamId::Structure,
            ParamId::StereoWidth,
            ParamId::RoomWidth,
            ParamId::EffectsWidth,
        ];
        match index {
            i if i < GLOBALS.len() => Some(GLOBALS[i]),
            i if i < STORED_PARAM_COUNT => Some(ParamId::TrackVolume((i - GLOBALS.len()) as u8)),
            _ => None,
        }
    }

    /// Metadata for this parameter.
    pub fn info(self) -> ParamInfo {
        match self {
            ParamId::TrackVolume(track) => {
                let track = track as usize % NUM_TRACKS;
                ParamInfo::new(TRACK_VOLUME_NAMES[track], TRACK_VOLUME_LABELS[track])
                    .default(TRACK_VOLUME_DEFAULT)
                    .unit(ParamUnit::Gain)
            }
            ParamId::TrackTrigger => TRACK_TRIGGER,
            other => GLOBAL_PARAMS[other.index().unwrap_or(0)],
        }
    }

    /// Every parameter with a stored value, in index order.
    pub fn stored() -> impl Iterator<Item = ParamId> {
        (0..STORED_PARAM_COUNT).filter_map(ParamId::from_index)
    }
}

/// Validated, strongly typed parameter values.
///
/// Every write goes through [`EngineParams::set`], which clamps to the
/// declared range. Reads are plain field access.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    values: [f32; STORED_PARAM_COUNT],
}

impl Default for EngineParams {
    fn default() -> Self {
        let mut values = [0.0; STORED_PARAM_COUNT];
        for id in ParamId::stored() {
            if let Some(index) = id.index() {
                values[index] = id.info().default;
            }
        }
        Self { values }
    }
}

impl EngineParams {
    /// Clamp and store a value. Returns the stored value, or `None` for
    /// one-shot parameters which have nothing to store.
    #[inline]
    pub fn set(&mut self, id: ParamId, value: f32) -> Option<f32> {
        let index = id.index()?;
        let clamped = id.info().clamp(value);
        self.values[index] = clamped;
        Some(clamped)
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        id.index().map(|i| self.values[i]).unwrap_or(0.0)
    }

    #[inline]
    pub fn tempo(&self) -> f32 {
        self.get(ParamId::Tempo)
    }

    #[inline]
    pub fn swing(&self) -> f32 {
        self.get(ParamId::Swing)
    }

    #[inline]
    pub fn master_volume(&self) -> f32 {
        self.get(ParamId::MasterVolume)
    }

    /// Pattern length as a step count, truncated and floored at 1.
    #[inline]
    pub fn pattern_length(&self) -> usize {
        pattern_length_from(self.get(ParamId::PatternLength))
    }

    #[inline]
    pub fn structure(&self) -> f32 {
        self.get(ParamId::Structure)
    }

    #[inline]
    pub fn track_volume(&self, track: usize) -> f32 {
        if track >= NUM_TRACKS {
            return 0.0;
        }
        self.get(ParamId::TrackVolume(track as u8))
    }

    /// Raw values in index order (for lock-free snapshots).
    pub fn values(&self) -> &[f32; STORED_PARAM_COUNT] {
        &self.values
    }
}

/// Convert a raw `patternLength` value into a usable step count.
#[inline]
pub fn pattern_length_from(value: f32) -> usize {
    if value.is_nan() {
        return 1;
    }
    (value.clamp(1.0, 16.0) as usize).max(1)
}
