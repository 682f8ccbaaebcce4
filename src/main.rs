// src/main.rs
//
// Offline demo: renders every factory preset through the control/audio
// bridge and prints playhead timing and output levels.

use drumgroove::{
    create_bridge, Engine, EngineConfig, EngineResult, Preset, DEFAULT_SAMPLE_RATE,
};
use log::info;

/// ===============================
/// Settings
/// ===============================

const BLOCK_FRAMES: usize = 256;
const BARS: usize = 2;
const STEPS_PER_BAR: usize = 16;

/// Levels for one rendered bar.
#[derive(Default)]
struct BarStats {
    peak_left: f32,
    peak_right: f32,
    sum_squares: f64,
    frames: usize,
}

impl BarStats {
    fn add(&mut self, left: &[f32], right: &[f32]) {
        for (&l, &r) in left.iter().zip(right) {
            self.peak_left = self.peak_left.max(l.abs());
            self.peak_right = self.peak_right.max(r.abs());
            self.sum_squares += f64::from(l * l + r * r) * 0.5;
        }
        self.frames += left.len();
    }

    fn rms(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        (self.sum_squares / self.frames as f64).sqrt()
    }
}

/// ===============================
/// Main
/// ===============================

fn main() -> EngineResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig::default();
    info!(
        "rendering {} presets, {BARS} bars each @ {DEFAULT_SAMPLE_RATE} Hz",
        Preset::factory().len()
    );

    for preset in Preset::factory() {
        render_preset(preset, config)?;
    }

    println!("Demo completed.");
    Ok(())
}

fn render_preset(preset: &Preset, config: EngineConfig) -> EngineResult<()> {
    let engine = Engine::with_config(config)?;
    let (mut control, mut audio) = create_bridge(engine, config.command_capacity);
    control.apply_preset(preset);

    let mut left = vec![0.0f32; BLOCK_FRAMES];
    let mut right = vec![0.0f32; BLOCK_FRAMES];

    let step_frames = config.sample_rate * 60.0 / f64::from(preset.tempo) / 4.0;
    let bar_frames = (step_frames * STEPS_PER_BAR as f64).round() as usize;

    println!("--- {} ({} BPM) ---", preset.name, preset.tempo);
    println!("step = {step_frames:.1} frames, bar = {bar_frames} frames");

    let mut last_step = None;
    let mut crossings = Vec::with_capacity(STEPS_PER_BAR * BARS);

    for bar in 0..BARS {
        let mut stats = BarStats::default();
        let mut rendered = 0;

        while rendered < bar_frames {
            let frames = (bar_frames - rendered).min(BLOCK_FRAMES);
            left[..frames].fill(0.0);
            right[..frames].fill(0.0);
            audio.process(&mut [&mut left[..frames], &mut right[..frames]], frames);
            stats.add(&left[..frames], &right[..frames]);
            rendered += frames;

            let readback = control.readback();
            if readback.current_step != last_step {
                last_step = readback.current_step;
                crossings.push((readback.sample_position, readback.current_step));
            }
        }

        println!(
            "bar {bar}: peak L {:.3} R {:.3}, rms {:.4}, voices {}",
            stats.peak_left,
            stats.peak_right,
            stats.rms(),
            control.readback().active_voices
        );
    }

    let timeline: Vec<String> = crossings
        .iter()
        .filter_map(|(pos, step)| step.map(|s| format!("{s}@{pos}")))
        .collect();
    println!("playhead: {}", timeline.join(" "));

    let engine = audio.engine();
    let params = engine.params();
    let transport = engine.transport();
    println!(
        "tempo {:.0} swing {:.2} structure {:.2}: cycle {:.1} frames, rendered {:.3} s = {:.2} beats",
        params.tempo(),
        params.swing(),
        params.structure(),
        transport.cycle_duration(params.pattern_length()),
        transport.seconds(),
        transport.beats()
    );

    Ok(())
}
