// Commands from the control thread to the engine.
//
// Parameter values travel through atomics (see `bridge`); commands carry
// everything that is an *action* rather than a level: one-shot triggers,
// step edits and transport resets.

/// A command from the control thread to the engine.
///
/// Commands are:
/// - `Copy`, so pushing and popping them never allocates
/// - Processed at the start of the next audio block
/// - Validated again on the audio side (bad indices are dropped)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    // ═══════════════════════════════════════════
    // Live input
    // ═══════════════════════════════════════════
    /// Fire a track immediately, `offset` frames into the next block.
    Trigger {
        track: usize,
        velocity: f32,
        offset: usize,
    },

    // ═══════════════════════════════════════════
    // Pattern edits
    // ═══════════════════════════════════════════
    /// Set one step on or off.
    SetStep {
        track: usize,
        step: usize,
        active: bool,
    },

    /// Flip one step.
    ToggleStep { track: usize, step: usize },

    /// Deactivate every step of a track.
    ClearTrack { track: usize },

    // ═══════════════════════════════════════════
    // Transport
    // ═══════════════════════════════════════════
    /// Zero transport and voice state.
    Reset,
}
