// src/voice_allocator.rs

use crate::voice::{Voice, VoiceId};

/// Allocates and manages one-shot voices.
///
/// Responsibilities:
/// - apply choke masks before a new hit starts
/// - cap layered voices per track
/// - steal the oldest voice when the pool is exhausted
///
/// Does NOT:
/// - own sample data
/// - allocate during processing
#[derive(Debug, Clone)]
pub struct VoiceAllocator {
    voices: Vec<Voice>,
    counter: u64,
}

impl VoiceAllocator {
    pub fn new(max_voices: usize) -> Self {
        let voices = (0..max_voices.max(1)).map(Voice::new).collect();
        Self { voices, counter: 0 }
    }

    /// Start a voice for `track`.
    ///
    /// `choke_mask` has bit `t` set for every track whose ringing voices
    /// must be choked first. `max_layers` caps un-choked voices of the
    /// same track; the oldest is choked when the cap is reached.
    pub fn trigger(&mut self, track: usize, velocity: f32, choke_mask: u16, max_layers: usize) -> VoiceId {
        for v in self.voices.iter_mut().filter(|v| v.active) {
            if v.track < 16 && choke_mask & (1 << v.track) != 0 {
                v.choke();
            }
        }

        let ringing = self
            .voices
            .iter()
            .filter(|v| v.active && !v.is_choked() && v.track == track)
            .count();
        if ringing >= max_layers.max(1) {
            if let Some(oldest) = self
                .voices
                .iter_mut()
                .filter(|v| v.active && !v.is_choked() && v.track == track)
                .min_by_key(|v| v.started)
            {
                oldest.choke();
            }
        }

        self.counter += 1;
        let started = self.counter;

        // First, try to find an inactive voice
        if let Some(v) = self.voices.iter_mut().find(|v| !v.active) {
            v.start(track, velocity, started);
            return v.id;
        }

        // Steal the oldest, preferring voices that are already fading
        let stolen = self
            .voices
            .iter_mut()
            .min_by_key(|v| (!v.is_choked(), v.started))
            .map(|v| {
                v.start(track, velocity, started);
                v.id
            });
        stolen.unwrap_or(0)
    }

    /// Mutable access for rendering.
    #[inline]
    pub fn voices_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut().filter(|v| v.active)
    }

    /// Silence everything (transport reset).
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.deactivate();
        }
        self.counter = 0;
    }

    /// Number of currently active voices.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Active voices belonging to `track` (including fading ones).
    #[cfg(test)]
    pub fn track_count(&self, track: usize) -> usize {
        self.voices.iter().filter(|v| v.active && v.track == track).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ringing(alloc: &VoiceAllocator, track: usize) -> usize {
        alloc
            .voices
            .iter()
            .filter(|v| v.active && !v.is_choked() && v.track == track)
            .count()
    }

    #[test]
    fn test_choke_self() {
        let mut alloc = VoiceAllocator::new(8);
        alloc.trigger(0, 1.0, 1 << 0, usize::MAX);
        alloc.trigger(0, 1.0, 1 << 0, usize::MAX);
        assert_eq!(alloc.track_count(0), 2);
        assert_eq!(ringing(&alloc, 0), 1);
    }

    #[test]
    fn test_group_choke_hits_other_track() {
        let mut alloc = VoiceAllocator::new(8);
        let group = (1 << 2) | (1 << 3);
        alloc.trigger(3, 1.0, group, usize::MAX); // open hat
        alloc.trigger(2, 1.0, group, usize::MAX); // closed hat
        assert_eq!(ringing(&alloc, 3), 0);
        assert_eq!(ringing(&alloc, 2), 1);
    }

    #[test]
    fn test_layer_cap() {
        let mut alloc = VoiceAllocator::new(16);
        for _ in 0..6 {
            alloc.trigger(5, 1.0, 0, 4);
        }
        assert_eq!(ringing(&alloc, 5), 4);
    }

    #[test]
    fn test_steals_oldest_when_full() {
        let mut alloc = VoiceAllocator::new(2);
        let first = alloc.trigger(5, 1.0, 0, 8);
        alloc.trigger(6, 1.0, 0, 8);
        let third = alloc.trigger(7, 1.0, 0, 8);
        assert_eq!(third, first);
        assert_eq!(alloc.active_count(), 2);
        assert_eq!(alloc.track_count(5), 0);

        alloc.reset();
        assert_eq!(alloc.active_count(), 0);
    }
}
