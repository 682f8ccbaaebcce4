// src/state/preset.rs
//
// Factory presets.
//
// A preset is only a bundle of parameter values. Applying one flattens it
// into ordinary parameter writes; the engine never remembers which preset
// (if any) produced its current state.

use crate::error::{EngineError, EngineResult};

use super::params::ParamId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub name: &'static str,
    pub tempo: f32,
    pub swing: f32,
    pub master_volume: f32,
    pub pocket_offset: f32,
    pub push_offset: f32,
    pub pull_offset: f32,
    pub dilla_amount: f32,
    pub dilla_hat_bias: f32,
    pub dilla_snare_late: f32,
    pub dilla_kick_tight: f32,
    pub dilla_max_drift: f32,
    pub structure: f32,
    pub stereo_width: f32,
}

/// Number of values a preset writes.
pub const PRESET_PARAM_COUNT: usize = 13;

impl Preset {
    /// Flatten into `(parameter, value)` writes.
    pub fn parameters(&self) -> [(ParamId, f32); PRESET_PARAM_COUNT] {
        [
            (ParamId::Tempo, self.tempo),
            (ParamId::Swing, self.swing),
            (ParamId::MasterVolume, self.master_volume),
            (ParamId::PocketOffset, self.pocket_offset),
            (ParamId::PushOffset, self.push_offset),
            (ParamId::PullOffset, self.pull_offset),
            (ParamId::DillaAmount, self.dilla_amount),
            (ParamId::DillaHatBias, self.dilla_hat_bias),
            (ParamId::DillaSnareLate, self.dilla_snare_late),
            (ParamId::DillaKickTight, self.dilla_kick_tight),
            (ParamId::DillaMaxDrift, self.dilla_max_drift),
            (ParamId::Structure, self.structure),
            (ParamId::StereoWidth, self.stereo_width),
        ]
    }

    /// Feed every value through `write`, in parameter order.
    pub fn apply(&self, mut write: impl FnMut(ParamId, f32)) {
        for (id, value) in self.parameters() {
            write(id, value);
        }
    }

    /// All factory presets, in program order.
    pub fn factory() -> &'static [Preset] {
        &FACTORY_PRESETS
    }

    pub fn by_index(index: usize) -> EngineResult<&'static Preset> {
        FACTORY_PRESETS
            .get(index)
            .ok_or_else(|| EngineError::UnknownPreset(format!("#{index}")))
    }

    /// Case-insensitive lookup.
    pub fn by_name(name: &str) -> EngineResult<&'static Preset> {
        FACTORY_PRESETS
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownPreset(name.to_string()))
    }
}

#[allow(clippy::too_many_arguments)]
const fn preset(
    name: &'static str,
    tempo: f32,
    swing: f32,
    master_volume: f32,
    pocket_offset: f32,
    push_offset: f32,
    pull_offset: f32,
    dilla: [f32; 5],
    structure: f32,
    stereo_width: f32,
) -> Preset {
    Preset {
        name,
        tempo,
        swing,
        master_volume,
        pocket_offset,
        push_offset,
        pull_offset,
        dilla_amount: dilla[0],
        dilla_hat_bias: dilla[1],
        dilla_snare_late: dilla[2],
        dilla_kick_tight: dilla[3],
        dilla_max_drift: dilla[4],
        structure,
        stereo_width,
    }
}

// dilla = [amount, hat bias, snare late, kick tight, max drift]
static FACTORY_PRESETS: [Preset; 10] = [
    preset("Basic 808", 120.0, 0.0, 0.8, 0.0, -0.04, 0.06, [0.0, 0.5, 0.5, 0.9, 0.05], 0.3, 0.5),
    preset("J Dilla Style", 95.0, 0.6, 0.8, 0.0, -0.05, 0.08, [0.7, 0.6, 0.9, 0.6, 0.12], 0.6, 0.6),
    preset("Tight House", 128.0, 0.0, 0.85, 0.0, 0.0, 0.0, [0.0, 0.5, 0.5, 1.0, 0.01], 0.2, 0.4),
    preset("Loose Hip Hop", 92.0, 0.55, 0.8, 0.02, -0.03, 0.07, [0.5, 0.55, 0.7, 0.5, 0.1], 0.5, 0.7),
    preset("Drum & Bass", 174.0, 0.1, 0.8, 0.0, -0.02, 0.02, [0.3, 0.5, 0.6, 0.8, 0.05], 0.7, 0.8),
    preset("IDM Drill", 160.0, 0.4, 0.75, 0.0, -0.06, 0.1, [0.8, 0.6, 0.9, 0.4, 0.2], 0.9, 0.9),
    preset("Techno", 130.0, 0.0, 0.9, 0.0, 0.0, 0.0, [0.0, 0.5, 0.5, 1.0, 0.0], 0.4, 0.6),
    preset("Afrobeat", 110.0, 0.3, 0.8, 0.0, -0.01, 0.03, [0.2, 0.5, 0.5, 0.7, 0.08], 0.5, 0.7),
    preset("Breakbeat", 140.0, 0.5, 0.8, 0.01, -0.04, 0.08, [0.6, 0.55, 0.7, 0.5, 0.12], 0.7, 0.8),
    preset("Minimal", 125.0, 0.0, 0.7, 0.0, 0.0, 0.0, [0.0, 0.5, 0.5, 1.0, 0.0], 0.1, 0.3),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_has_ten_presets() {
        assert_eq!(Preset::factory().len(), 10);
        assert_eq!(Preset::factory()[0].name, "Basic 808");
        assert_eq!(Preset::factory()[9].name, "Minimal");
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Preset::by_name("techno").map(|p| p.tempo), Ok(130.0));
        assert_eq!(Preset::by_index(1).map(|p| p.name), Ok("J Dilla Style"));
        assert!(matches!(Preset::by_name("polka"), Err(EngineError::UnknownPreset(_))));
        assert!(Preset::by_index(10).is_err());
    }

    #[test]
    fn test_preset_values_are_in_range() {
        for preset in Preset::factory() {
            for (id, value) in preset.parameters() {
                assert_eq!(id.info().clamp(value), value, "{} {:?}", preset.name, id);
            }
        }
    }
}
