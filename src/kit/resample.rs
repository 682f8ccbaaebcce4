// Linear resampling for user-supplied one-shots.

/// Resample mono audio from `source_rate` to `target_rate`.
///
/// Linear interpolation is plenty for percussive one-shots; the last input
/// sample is held past the end.
pub fn resample_linear(input: &[f32], source_rate: f64, target_rate: f64) -> Vec<f32> {
    if input.is_empty() || (source_rate - target_rate).abs() < f64::EPSILON {
        return input.to_vec();
    }
    let ratio = target_rate / source_rate;
    let out_len = (input.len() as f64 * ratio).ceil() as usize;
    let last = input[input.len() - 1];

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            if idx + 1 >= input.len() {
                return last;
            }
            let frac = (src_pos - idx as f64) as f32;
            input[idx] * (1.0 - frac) + input[idx + 1] * frac
        })
        .collect()
}
