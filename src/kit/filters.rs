// src/kit/filters.rs
//
// State Variable Filter (SVF) used to shape noise and tone sources.
// Provides lowpass, highpass and bandpass outputs.

use std::f32::consts::PI;

/// Filter type for the SVF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
}

/// State Variable Filter implementation.
///
/// Coefficients are computed once at construction; kit sounds never
/// modulate the cutoff.
#[derive(Debug, Clone)]
pub struct SvfFilter {
    filter_type: FilterType,

    // Filter state
    ic1eq: f32,
    ic2eq: f32,

    // Cached coefficients
    k: f32,
    a1: f32,
    a2: f32,
    a3: f32,
}

impl SvfFilter {
    pub fn new(filter_type: FilterType, cutoff: f32, resonance: f32, sample_rate: f32) -> Self {
        // Clamp cutoff below Nyquist, resonance short of self-oscillation
        let cutoff = cutoff.clamp(20.0, (sample_rate * 0.49).max(20.0));
        let resonance = resonance.clamp(0.0, 0.99);

        let g = (PI * cutoff / sample_rate).tan();
        let k = 2.0 - 2.0 * resonance;
        let a1 = 1.0 / (1.0 + g * (g + k));
        let a2 = g * a1;
        let a3 = g * a2;

        Self {
            filter_type,
            ic1eq: 0.0,
            ic2eq: 0.0,
            k,
            a1,
            a2,
            a3,
        }
    }

    pub fn lowpass(cutoff: f32, resonance: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::Lowpass, cutoff, resonance, sample_rate)
    }

    pub fn highpass(cutoff: f32, resonance: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::Highpass, cutoff, resonance, sample_rate)
    }

    pub fn bandpass(cutoff: f32, resonance: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::Bandpass, cutoff, resonance, sample_rate)
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let v3 = input - self.ic2eq;
        let v1 = self.a1 * self.ic1eq + self.a2 * v3;
        let v2 = self.ic2eq + self.a2 * self.ic1eq + self.a3 * v3;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match self.filter_type {
            FilterType::Lowpass => v2,
            FilterType::Highpass => input - self.k * v1 - v2,
            FilterType::Bandpass => v1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowpass_passes_dc_highpass_blocks_it() {
        let mut lp = SvfFilter::lowpass(1000.0, 0.0, 48_000.0);
        let mut hp = SvfFilter::highpass(1000.0, 0.0, 48_000.0);
        let mut lp_out = 0.0;
        let mut hp_out = 1.0;
        for _ in 0..4800 {
            lp_out = lp.process_sample(1.0);
            hp_out = hp.process_sample(1.0);
        }
        assert!((lp_out - 1.0).abs() < 1.0e-3);
        assert!(hp_out.abs() < 1.0e-3);
    }
}
