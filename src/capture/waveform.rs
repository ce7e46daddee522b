//! Helpers over analyser time-domain data (bytes centred on 128).

/// Peak deviation from silence in `0.0..=1.0`.
pub fn peak_level(data: &[u8]) -> f32 {
    data.iter()
        .map(|&b| (b as f32 - 128.0).abs() / 128.0)
        .fold(0.0f32, f32::max)
        .min(1.0)
}

/// Polyline points scaled into a `width` x `height` box.
pub fn waveform_points(data: &[u8], width: f32, height: f32) -> Vec<(f32, f32)> {
    if data.is_empty() {
        return Vec::new();
    }
    let step = width / data.len() as f32;
    data.iter()
        .enumerate()
        .map(|(i, &b)| (i as f32 * step, b as f32 / 255.0 * height))
        .collect()
}

/// Convert f32 PCM samples in `-1.0..=1.0` to analyser bytes.
pub fn samples_to_bytes(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .map(|s| (128.0 + s.clamp(-1.0, 1.0) * 127.0).round() as u8)
        .collect()
}
