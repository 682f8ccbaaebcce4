// src/audio_buffer.rs

/// Owned planar block buffer: channel `ch` occupies
/// `data[ch * frames .. (ch + 1) * frames]`.
///
/// Sized once at `prepare()`; the audio path only clears and indexes it.
#[derive(Debug, Clone, Default)]
pub struct AudioBuffer {
    channels: usize,
    frames: usize,
    data: Vec<f32>,
}

impl AudioBuffer {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels,
            frames,
            data: vec![0.0; channels * frames],
        }
    }

    /// Reallocate for a new block size. Not real-time safe.
    pub fn resize(&mut self, channels: usize, frames: usize) {
        self.channels = channels;
        self.frames = frames;
        self.data.clear();
        self.data.resize(channels * frames, 0.0);
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Zero the first `frames` frames of every channel.
    #[inline]
    pub fn clear_frames(&mut self, frames: usize) {
        let frames = frames.min(self.frames);
        for ch in 0..self.channels {
            self.channel_mut(ch)[..frames].fill(0.0);
        }
    }

    #[inline]
    pub fn channel(&self, ch: usize) -> &[f32] {
        let start = ch * self.frames;
        &self.data[start..start + self.frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let start = ch * self.frames;
        &mut self.data[start..start + self.frames]
    }

    /// Borrow two distinct channels mutably (`a < b`).
    #[inline]
    pub fn channel_pair_mut(&mut self, a: usize, b: usize) -> (&mut [f32], &mut [f32]) {
        debug_assert!(a < b && b < self.channels);
        let (head, tail) = self.data.split_at_mut(b * self.frames);
        let first = &mut head[a * self.frames..(a + 1) * self.frames];
        let second = &mut tail[..self.frames];
        (first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_are_planar() {
        let mut buf = AudioBuffer::new(3, 4);
        buf.channel_mut(1).fill(1.0);
        assert_eq!(buf.channel(0), &[0.0; 4]);
        assert_eq!(buf.channel(1), &[1.0; 4]);
        assert_eq!(buf.channel(2), &[0.0; 4]);

        let (a, b) = buf.channel_pair_mut(0, 2);
        a[0] = 2.0;
        b[3] = 3.0;
        assert_eq!(buf.channel(0)[0], 2.0);
        assert_eq!(buf.channel(2)[3], 3.0);

        buf.clear_frames(2);
        assert_eq!(buf.channel(1), &[0.0, 0.0, 1.0, 1.0]);
    }
}
