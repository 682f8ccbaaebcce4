// C-compatible FFI bindings for Swift/iOS and plugin hosts.
//
// Safety requirements:
// - All handles must be created by this module and not fabricated
// - String parameters must be valid null-terminated UTF-8
// - Caller must call the corresponding _destroy function for each _create
// - `drumgroove_control_*` calls belong to one thread, `drumgroove_audio_*`
//   calls to the audio thread

use std::ffi::{CStr, c_char};

use log::{debug, info, warn};

use crate::bridge::{AudioHandle, ControlHandle, EngineReadback, create_bridge};
use crate::engine::Engine;
use crate::groove::SwingGrid;
use crate::state::{
    DEFAULT_COMMAND_CAPACITY, DEFAULT_HUMANIZE_SEED, DEFAULT_MAX_BLOCK, DEFAULT_SAMPLE_RATE,
    EngineConfig, ParamId, Preset,
};

// Logger subsystem identifier
#[cfg(feature = "ios")]
const LOG_SUBSYSTEM: &str = "com.drumgroove.engine";

// ═══════════════════════════════════════════════════════════════════════════
// Logger Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the oslog logger.
///
/// Call once at application startup. Output appears in Console.app and
/// Xcode's debug console.
#[cfg(feature = "ios")]
#[unsafe(no_mangle)]
pub extern "C" fn drumgroove_init_logger() {
    use log::LevelFilter;
    use oslog::OsLogger;

    OsLogger::new(LOG_SUBSYSTEM)
        .level_filter(LevelFilter::Debug)
        .init()
        .ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// Opaque Handle Types
// ═══════════════════════════════════════════════════════════════════════════

/// Opaque handle to the control side.
pub struct DrumgrooveControl {
    inner: ControlHandle,
}

/// Opaque handle to the audio side (owns the engine).
pub struct DrumgrooveAudio {
    inner: AudioHandle,
}

// ═══════════════════════════════════════════════════════════════════════════
// FFI Data Types
// ═══════════════════════════════════════════════════════════════════════════

/// Readback data for UI playhead and meters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DrumgrooveReadback {
    pub sample_position: u64,
    /// Last step the playhead crossed, or -1 before the first step.
    pub current_step: i32,
    pub active_voices: u32,
    pub running: bool,
}

impl From<EngineReadback> for DrumgrooveReadback {
    fn from(r: EngineReadback) -> Self {
        Self {
            sample_position: r.sample_position,
            current_step: r.current_step.map(|s| s as i32).unwrap_or(-1),
            active_voices: r.active_voices as u32,
            running: r.running,
        }
    }
}

/// Configuration for creating an engine.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DrumgrooveConfig {
    /// Sample rate in Hz (e.g., 44100.0, 48000.0).
    pub sample_rate: f64,
    /// Maximum audio block size in frames (e.g., 512, 1024).
    pub max_block_size: u32,
    /// Control → audio command ring size.
    pub command_capacity: u32,
    /// Seed for the humanization hash.
    pub humanize_seed: u64,
    /// Swing on eighth notes instead of sixteenths.
    pub eighth_swing: bool,
}

impl Default for DrumgrooveConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: DEFAULT_MAX_BLOCK as u32,
            command_capacity: DEFAULT_COMMAND_CAPACITY as u32,
            humanize_seed: DEFAULT_HUMANIZE_SEED,
            eighth_swing: false,
        }
    }
}

impl From<DrumgrooveConfig> for EngineConfig {
    fn from(c: DrumgrooveConfig) -> Self {
        Self {
            sample_rate: c.sample_rate,
            max_block_size: c.max_block_size as usize,
            humanize_seed: c.humanize_seed,
            swing_grid: if c.eighth_swing {
                SwingGrid::Eighth
            } else {
                SwingGrid::Sixteenth
            },
            command_capacity: c.command_capacity as usize,
        }
    }
}

/// Get the default configuration values.
#[unsafe(no_mangle)]
pub extern "C" fn drumgroove_default_config() -> DrumgrooveConfig {
    DrumgrooveConfig::default()
}

// ═══════════════════════════════════════════════════════════════════════════
// Creation / Destruction
// ═══════════════════════════════════════════════════════════════════════════

/// Create a prepared engine and its control/audio handle pair.
///
/// Returns the control handle; the audio handle is written to `out_audio`.
/// Returns NULL (and writes nothing) if the configuration is invalid.
///
/// # Safety
/// - `config` must be a valid pointer or NULL (defaults)
/// - `out_audio` must be a valid pointer to store the audio handle
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_create(
    config: *const DrumgrooveConfig,
    out_audio: *mut *mut DrumgrooveAudio,
) -> *mut DrumgrooveControl {
    if out_audio.is_null() {
        return std::ptr::null_mut();
    }

    let cfg = if config.is_null() {
        DrumgrooveConfig::default()
    } else {
        unsafe { std::ptr::read(config) }
    };
    let engine_config = EngineConfig::from(cfg);

    let engine = match Engine::with_config(engine_config) {
        Ok(engine) => engine,
        Err(err) => {
            warn!("drumgroove_create: {err}");
            return std::ptr::null_mut();
        }
    };
    info!(
        "created engine: {} Hz, max block {}",
        engine_config.sample_rate, engine_config.max_block_size
    );

    let (control, audio) = create_bridge(engine, engine_config.command_capacity);
    unsafe {
        *out_audio = Box::into_raw(Box::new(DrumgrooveAudio { inner: audio }));
    }
    Box::into_raw(Box::new(DrumgrooveControl { inner: control }))
}

/// Destroy a control handle.
///
/// # Safety
/// `control` must be a valid pointer returned by `drumgroove_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_control_destroy(control: *mut DrumgrooveControl) {
    if !control.is_null() {
        unsafe { drop(Box::from_raw(control)) };
    }
}

/// Destroy an audio handle.
///
/// # Safety
/// `audio` must be a valid pointer returned via `drumgroove_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_audio_destroy(audio: *mut DrumgrooveAudio) {
    if !audio.is_null() {
        unsafe { drop(Box::from_raw(audio)) };
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Control Thread
// ═══════════════════════════════════════════════════════════════════════════

/// Set a parameter by name. Unknown names are ignored.
///
/// # Safety
/// `name` must be a valid null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_control_set_parameter(
    control: *mut DrumgrooveControl,
    name: *const c_char,
    value: f32,
) {
    if control.is_null() || name.is_null() {
        return;
    }
    let Ok(name) = (unsafe { CStr::from_ptr(name) }).to_str() else {
        debug!("set_parameter: name is not UTF-8");
        return;
    };
    unsafe { (*control).inner.set_parameter(name, value) };
}

/// Read back the last value written for a parameter (0 if unknown).
///
/// # Safety
/// `name` must be a valid null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_control_get_parameter(
    control: *const DrumgrooveControl,
    name: *const c_char,
) -> f32 {
    if control.is_null() || name.is_null() {
        return 0.0;
    }
    let Some(id) = (unsafe { CStr::from_ptr(name) })
        .to_str()
        .ok()
        .and_then(ParamId::from_name)
    else {
        return 0.0;
    };
    unsafe { (*control).inner.param(id) }
}

/// Fire a track at the start of the next block.
///
/// Returns `false` for an invalid track or a full command queue.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_control_trigger(
    control: *mut DrumgrooveControl,
    track: u32,
    velocity: f32,
) -> bool {
    if control.is_null() {
        return false;
    }
    unsafe { (*control).inner.trigger(track as usize, velocity).is_ok() }
}

/// Turn a pattern step on or off.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_control_set_step(
    control: *mut DrumgrooveControl,
    track: u32,
    step: u32,
    active: bool,
) -> bool {
    if control.is_null() {
        return false;
    }
    unsafe {
        (*control)
            .inner
            .set_step(track as usize, step as usize, active)
            .is_ok()
    }
}

/// Flip a pattern step.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_control_toggle_step(
    control: *mut DrumgrooveControl,
    track: u32,
    step: u32,
) -> bool {
    if control.is_null() {
        return false;
    }
    unsafe {
        (*control)
            .inner
            .toggle_step(track as usize, step as usize)
            .is_ok()
    }
}

/// Deactivate every step of a track.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_control_clear_track(
    control: *mut DrumgrooveControl,
    track: u32,
) -> bool {
    if control.is_null() {
        return false;
    }
    unsafe { (*control).inner.clear_track(track as usize).is_ok() }
}

/// Rewind the transport at the next block.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_control_reset(control: *mut DrumgrooveControl) -> bool {
    if control.is_null() {
        return false;
    }
    unsafe { (*control).inner.reset().is_ok() }
}

/// Get the current engine readback state.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_control_get_readback(
    control: *const DrumgrooveControl,
) -> DrumgrooveReadback {
    if control.is_null() {
        return DrumgrooveReadback {
            current_step: -1,
            ..Default::default()
        };
    }
    unsafe { (*control).inner.readback().into() }
}

// ═══════════════════════════════════════════════════════════════════════════
// Presets
// ═══════════════════════════════════════════════════════════════════════════

/// Number of factory presets.
#[unsafe(no_mangle)]
pub extern "C" fn drumgroove_preset_count() -> u32 {
    Preset::factory().len() as u32
}

/// Copy a preset name into `buffer` (null-terminated, truncated to fit).
///
/// Returns the full name length in bytes, or 0 for an unknown index.
///
/// # Safety
/// `buffer` must point to at least `buffer_len` writable bytes, or be NULL.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_preset_name(
    index: u32,
    buffer: *mut c_char,
    buffer_len: u32,
) -> u32 {
    let Ok(preset) = Preset::by_index(index as usize) else {
        return 0;
    };
    let name = preset.name.as_bytes();
    if !buffer.is_null() && buffer_len > 0 {
        let copied = name.len().min(buffer_len as usize - 1);
        unsafe {
            std::ptr::copy_nonoverlapping(name.as_ptr(), buffer.cast::<u8>(), copied);
            *buffer.add(copied) = 0;
        }
    }
    name.len() as u32
}

/// Apply a factory preset by index. Returns `false` for an unknown index.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_control_apply_preset(
    control: *mut DrumgrooveControl,
    index: u32,
) -> bool {
    if control.is_null() {
        return false;
    }
    match Preset::by_index(index as usize) {
        Ok(preset) => {
            unsafe { (*control).inner.apply_preset(preset) };
            true
        }
        Err(err) => {
            warn!("apply_preset: {err}");
            false
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Audio Thread
// ═══════════════════════════════════════════════════════════════════════════

/// Re-prepare for a new sample rate / block size.
///
/// Not real-time safe. Returns `false` for invalid values.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_audio_prepare(
    audio: *mut DrumgrooveAudio,
    sample_rate: f64,
    max_block_size: u32,
) -> bool {
    if audio.is_null() {
        return false;
    }
    let check = EngineConfig::default().with_audio(sample_rate, max_block_size as usize);
    if let Err(err) = check.validate() {
        warn!("drumgroove_audio_prepare: {err}");
        return false;
    }
    unsafe { (*audio).inner.prepare(sample_rate, max_block_size as usize) };
    true
}

/// Zero transport and voices immediately (audio thread only).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_audio_reset(audio: *mut DrumgrooveAudio) {
    if audio.is_null() {
        return;
    }
    let handle = unsafe { &mut (*audio).inner };
    handle.engine_mut().reset();
    handle.sync_readback();
}

/// Replace a track's sound with mono sample data. Not real-time safe.
///
/// # Safety
/// `samples` must point to `len` readable floats.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_audio_load_sample(
    audio: *mut DrumgrooveAudio,
    track: u32,
    samples: *const f32,
    len: u32,
    source_rate: f64,
) -> bool {
    if audio.is_null() || samples.is_null() {
        return false;
    }
    let data = unsafe { std::slice::from_raw_parts(samples, len as usize) };
    match unsafe { (*audio).inner.load_sample(track as usize, data, source_rate) } {
        Ok(()) => true,
        Err(err) => {
            warn!("load_sample: {err}");
            false
        }
    }
}

/// Render `frames` frames into planar output buffers.
///
/// `outputs` points to `num_channels` channel pointers. The first two
/// channels are cleared and rendered (one channel receives a mono fold).
/// Further channels are left untouched.
///
/// # Safety
/// - `outputs` must point to `num_channels` pointers
/// - Each of the first two channel pointers must be valid for `frames` floats
#[unsafe(no_mangle)]
pub unsafe extern "C" fn drumgroove_audio_process(
    audio: *mut DrumgrooveAudio,
    outputs: *const *mut f32,
    num_channels: u32,
    frames: u32,
) {
    if outputs.is_null() || num_channels == 0 {
        return;
    }
    let frames = frames as usize;
    let ptrs = unsafe { std::slice::from_raw_parts(outputs, num_channels as usize) };

    let left_ptr = ptrs[0];
    let right_ptr = ptrs.get(1).copied().filter(|p| !p.is_null() && *p != left_ptr);
    if left_ptr.is_null() {
        return;
    }

    let left = unsafe { std::slice::from_raw_parts_mut(left_ptr, frames) };
    left.fill(0.0);

    match right_ptr {
        Some(right_ptr) => {
            let right = unsafe { std::slice::from_raw_parts_mut(right_ptr, frames) };
            right.fill(0.0);
            if audio.is_null() {
                return;
            }
            let mut channels = [left, right];
            unsafe { (*audio).inner.process(&mut channels, frames) };
        }
        None => {
            if audio.is_null() {
                return;
            }
            let mut channels = [left];
            unsafe { (*audio).inner.process(&mut channels, frames) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create() -> (*mut DrumgrooveControl, *mut DrumgrooveAudio) {
        let mut audio = std::ptr::null_mut();
        let control = unsafe { drumgroove_create(std::ptr::null(), &mut audio) };
        assert!(!control.is_null());
        assert!(!audio.is_null());
        (control, audio)
    }

    fn destroy(control: *mut DrumgrooveControl, audio: *mut DrumgrooveAudio) {
        unsafe {
            drumgroove_control_destroy(control);
            drumgroove_audio_destroy(audio);
        }
    }

    #[test]
    fn test_invalid_config_returns_null() {
        let config = DrumgrooveConfig {
            sample_rate: 0.0,
            ..drumgroove_default_config()
        };
        let mut audio = std::ptr::null_mut();
        let control = unsafe { drumgroove_create(&config, &mut audio) };
        assert!(control.is_null());
        assert!(audio.is_null());
    }

    #[test]
    fn test_render_and_readback() {
        let (control, audio) = create();
        let mut left = vec![1.0f32; 480];
        let mut right = vec![1.0f32; 480];
        let ptrs = [left.as_mut_ptr(), right.as_mut_ptr()];

        unsafe {
            for track in 0..16 {
                assert!(drumgroove_control_clear_track(control, track));
            }
            drumgroove_control_set_parameter(control, c"tempo".as_ptr(), 100.0);
            assert_eq!(drumgroove_control_get_parameter(control, c"tempo".as_ptr()), 100.0);
            drumgroove_audio_process(audio, ptrs.as_ptr(), 2, 480);

            let rb = drumgroove_control_get_readback(control);
            assert_eq!(rb.sample_position, 480);
            assert_eq!(rb.current_step, 0);
            assert!(rb.running);
        }
        // Empty pattern: buffers are cleared, not accumulated onto
        assert!(left.iter().chain(&right).all(|&s| s == 0.0));
        destroy(control, audio);
    }

    #[test]
    fn test_control_validation() {
        let (control, audio) = create();
        unsafe {
            assert!(drumgroove_control_trigger(control, 2, 1.0));
            assert!(!drumgroove_control_trigger(control, 16, 1.0));
            assert!(drumgroove_control_set_step(control, 0, 3, true));
            assert!(!drumgroove_control_set_step(control, 0, 16, true));
            assert!(!drumgroove_control_apply_preset(control, 99));
            assert!(drumgroove_control_apply_preset(control, 6));
            assert_eq!(drumgroove_control_get_parameter(control, c"tempo".as_ptr()), 130.0);
            assert!(!drumgroove_audio_prepare(audio, -1.0, 256));
            assert!(drumgroove_audio_prepare(audio, 44_100.0, 256));
        }
        destroy(control, audio);
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(drumgroove_preset_count(), 10);
        let mut buffer = [0 as c_char; 8];
        let len = unsafe { drumgroove_preset_name(1, buffer.as_mut_ptr(), 8) };
        assert_eq!(len, "J Dilla Style".len() as u32);
        let truncated = unsafe { CStr::from_ptr(buffer.as_ptr()) };
        assert_eq!(truncated.to_str(), Ok("J Dilla"));
        assert_eq!(unsafe { drumgroove_preset_name(10, buffer.as_mut_ptr(), 8) }, 0);
    }
}
