// src/state/param_info.rs
//
// Parameter metadata for host registration and validation.

use std::fmt;

/// Unit type for parameter display.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParamUnit {
    #[default]
    None,
    /// Beats per minute
    Bpm,
    /// Seconds (role offsets, drift)
    Seconds,
    /// Normalized 0..1 amount
    Amount,
    /// Linear gain 0..1
    Gain,
    /// Step count
    Steps,
    /// Track index
    Track,
}

impl fmt::Display for ParamUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamUnit::None | ParamUnit::Amount | ParamUnit::Track => Ok(()),
            ParamUnit::Bpm => write!(f, "BPM"),
            ParamUnit::Seconds => write!(f, "s"),
            ParamUnit::Gain => write!(f, "gain"),
            ParamUnit::Steps => write!(f, "steps"),
        }
    }
}

/// Metadata describing a parameter.
///
/// Used by adapters to:
/// - Register host parameters with the right range and default
/// - Clamp incoming values
/// - Format values for display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamInfo {
    /// Canonical host-facing name
    pub name: &'static str,

    /// Human-readable label
    pub label: &'static str,

    /// Minimum value
    pub min: f32,

    /// Maximum value
    pub max: f32,

    /// Default value
    pub default: f32,

    /// Unit for display
    pub unit: ParamUnit,

    /// Step size for discrete parameters (0 = continuous)
    pub step: f32,
}

impl ParamInfo {
    pub const fn new(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            min: 0.0,
            max: 1.0,
            default: 0.0,
            unit: ParamUnit::Amount,
            step: 0.0,
        }
    }

    pub const fn range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub const fn default(mut self, value: f32) -> Self {
        self.default = value;
        self
    }

    pub const fn unit(mut self, unit: ParamUnit) -> Self {
        self.unit = unit;
        self
    }

    pub const fn stepped(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    /// Clamp a value to the valid range.
    ///
    /// NaN lands on `min`; infinities land on the matching bound.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    /// Normalize a value to 0..1 range.
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        (self.clamp(value) - self.min) / (self.max - self.min)
    }

    /// Denormalize a 0..1 value to the parameter range.
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        self.clamp(self.min + normalized * (self.max - self.min))
    }

    /// Format a value for display.
    pub fn format(&self, value: f32) -> String {
        let precision = if self.step > 0.0 { 0 } else { 2 };
        if matches!(self.unit, ParamUnit::None | ParamUnit::Amount | ParamUnit::Track) {
            format!("{:.prec$}", value, prec = precision)
        } else {
            format!("{:.prec$} {}", value, self.unit, prec = precision)
        }
    }
}
