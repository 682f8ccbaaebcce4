// src/state/track_table.rs
//
// Static per-track metadata: role, sub-mix routing, choke behavior,
// pan position and the drum sound used to build its one-shot.
//
// Built once at `prepare()`; the audio path only indexes into it.

/// Number of tracks (and pads) in the kit.
pub const NUM_TRACKS: usize = 16;

/// Percussive function of a track, used to select groove biases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Kick,
    Snare,
    Hat,
    Other,
}

/// Which stereo sub-mix a track feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixBus {
    /// Ambient / sustained elements
    Room,
    /// Processed / short transient elements
    Effects,
}

/// Retrigger behavior for a track's voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChokePolicy {
    /// A new hit restarts the track (drum-machine style)
    Choke,
    /// A new hit silences every track in the same group, including itself
    Group(ChokeGroup),
    /// New hits layer on top of ringing ones
    Layer,
}

/// Named choke groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChokeGroup {
    HiHat,
}

/// The sound a track's one-shot is synthesized from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrumSound {
    Kick { pitch: f32, decay: f32 },
    Snare { tone: f32, decay: f32 },
    Clap,
    Rim,
    ClosedHat,
    OpenHat,
    Cymbal { decay: f32 },
    Tom { pitch: f32 },
    Cowbell,
    Shaker,
}

/// Fully resolved description of one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSlot {
    pub index: usize,
    pub name: &'static str,
    pub role: Role,
    pub bus: MixBus,
    pub choke: ChokePolicy,
    /// -1 (left) .. +1 (right)
    pub pan: f32,
    pub sound: DrumSound,
}

/// Enum-keyed lookup table for all sixteen tracks.
#[derive(Debug, Clone)]
pub struct TrackTable {
    slots: [TrackSlot; NUM_TRACKS],
}

impl TrackTable {
    /// The standard sixteen-piece kit.
    pub fn standard() -> Self {
        use ChokePolicy::*;
        use DrumSound::*;
        use MixBus::*;

        let slot = |index, name, role, bus, choke, pan, sound| TrackSlot {
            index,
            name,
            role,
            bus,
            choke,
            pan,
            sound,
        };

        Self {
            slots: [
                slot(0, "Kick", Role::Kick, Effects, Choke, 0.0, Kick { pitch: 52.0, decay: 0.45 }),
                slot(1, "Snare", Role::Snare, Effects, Choke, 0.05, Snare { tone: 190.0, decay: 0.22 }),
                slot(2, "Closed Hat", Role::Hat, Effects, Group(ChokeGroup::HiHat), 0.3, ClosedHat),
                slot(3, "Open Hat", Role::Hat, Room, Group(ChokeGroup::HiHat), 0.3, OpenHat),
                slot(4, "Clap", Role::Snare, Room, Choke, -0.1, Clap),
                slot(5, "Low Tom", Role::Other, Room, Layer, -0.5, Tom { pitch: 90.0 }),
                slot(6, "Mid Tom", Role::Other, Room, Layer, -0.15, Tom { pitch: 130.0 }),
                slot(7, "High Tom", Role::Other, Room, Layer, 0.2, Tom { pitch: 180.0 }),
                slot(8, "Rim", Role::Snare, Effects, Choke, 0.15, Rim),
                slot(9, "Cowbell", Role::Other, Effects, Layer, -0.35, Cowbell),
                slot(10, "Crash", Role::Other, Room, Layer, -0.6, Cymbal { decay: 1.4 }),
                slot(11, "Ride", Role::Hat, Room, Layer, 0.6, Cymbal { decay: 0.9 }),
                slot(12, "Shaker", Role::Hat, Effects, Choke, 0.45, Shaker),
                slot(13, "Tambourine", Role::Hat, Effects, Choke, -0.45, Shaker),
                slot(14, "Conga", Role::Other, Room, Layer, 0.5, Tom { pitch: 240.0 }),
                slot(15, "Sub Kick", Role::Kick, Effects, Choke, 0.0, Kick { pitch: 40.0, decay: 0.8 }),
            ],
        }
    }

    #[inline]
    pub fn slot(&self, track: usize) -> Option<&TrackSlot> {
        self.slots.get(track)
    }

    #[inline]
    pub fn slots(&self) -> &[TrackSlot; NUM_TRACKS] {
        &self.slots
    }

    /// Tracks that belong to `group`.
    pub fn group_members(&self, group: ChokeGroup) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .filter(move |s| s.choke == ChokePolicy::Group(group))
            .map(|s| s.index)
    }
}

impl Default for TrackTable {
    fn default() -> Self {
        Self::standard()
    }
}
