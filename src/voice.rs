// src/voice.rs

pub type VoiceId = usize;

/// Frames a choked voice takes to fade out.
pub const CHOKE_FADE_FRAMES: usize = 32;

/// One playing one-shot.
///
/// Voices do NOT own sample data; the renderer passes the track's sample
/// in on every render call.
#[derive(Debug, Clone)]
pub struct Voice {
    pub id: VoiceId,
    pub active: bool,
    pub track: usize,
    pub velocity: f32,

    /// Read position in the track's sample
    position: usize,

    /// Remaining fade frames once choked
    fade: Option<usize>,

    /// Allocation order, for oldest-first stealing
    pub started: u64,
}

impl Voice {
    #[inline]
    pub fn new(id: VoiceId) -> Self {
        Self {
            id,
            active: false,
            track: 0,
            velocity: 0.0,
            position: 0,
            fade: None,
            started: 0,
        }
    }

    #[inline]
    pub fn start(&mut self, track: usize, velocity: f32, started: u64) {
        self.active = true;
        self.track = track;
        self.velocity = velocity;
        self.position = 0;
        self.fade = None;
        self.started = started;
    }

    /// Begin a short fade instead of cutting (avoids clicks).
    #[inline]
    pub fn choke(&mut self) {
        if self.active && self.fade.is_none() {
            self.fade = Some(CHOKE_FADE_FRAMES);
        }
    }

    #[inline]
    pub fn is_choked(&self) -> bool {
        self.fade.is_some()
    }

    #[inline]
    pub fn deactivate(&mut self) {
        self.active = false;
        self.fade = None;
    }

    /// Mix this voice into `out`. Deactivates at the end of the sample or
    /// of the choke fade.
    pub fn render(&mut self, sample: &[f32], out: &mut [f32]) {
        if !self.active {
            return;
        }
        for dst in out.iter_mut() {
            let Some(&src) = sample.get(self.position) else {
                self.deactivate();
                return;
            };
            let mut gain = self.velocity;
            if let Some(remaining) = self.fade {
                if remaining == 0 {
                    self.deactivate();
                    return;
                }
                gain *= remaining as f32 / CHOKE_FADE_FRAMES as f32;
                self.fade = Some(remaining - 1);
            }
            *dst += src * gain;
            self.position += 1;
        }
        if self.position >= sample.len() {
            self.deactivate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plays_sample_once_scaled_by_velocity() {
        let sample = [1.0, 0.5, 0.25];
        let mut voice = Voice::new(0);
        voice.start(3, 0.5, 1);

        let mut out = [0.0; 5];
        voice.render(&sample, &mut out);
        assert_eq!(out, [0.5, 0.25, 0.125, 0.0, 0.0]);
        assert!(!voice.active);
    }

    #[test]
    fn test_render_across_calls_continues() {
        let sample = [1.0, 2.0, 3.0, 4.0];
        let mut voice = Voice::new(0);
        voice.start(0, 1.0, 1);

        let mut a = [0.0; 2];
        let mut b = [0.0; 2];
        voice.render(&sample, &mut a);
        assert!(voice.active);
        voice.render(&sample, &mut b);
        assert_eq!(a, [1.0, 2.0]);
        assert_eq!(b, [3.0, 4.0]);
        assert!(!voice.active);
    }

    #[test]
    fn test_choke_fades_out() {
        let sample = [1.0; 1000];
        let mut voice = Voice::new(0);
        voice.start(0, 1.0, 1);
        voice.choke();

        let mut out = [0.0; 64];
        voice.render(&sample, &mut out);
        assert_eq!(out[0], 1.0);
        assert!(out[CHOKE_FADE_FRAMES - 1] > 0.0);
        assert!(out[CHOKE_FADE_FRAMES..].iter().all(|&s| s == 0.0));
        assert!(!voice.active);
    }
}
