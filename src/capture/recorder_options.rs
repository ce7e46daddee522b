//! Recorder option heuristics: container MIME selection and bitrates.

use super::media::RecorderOptions;
use crate::session::SessionConfig;

/// Preferred recorder MIME types, best first.
pub const MIME_PREFERENCE: [&str; 4] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm;codecs=h264,opus",
    "video/webm",
];

pub const FALLBACK_MIME: &str = "video/webm";

pub const AUDIO_BITS_PER_SECOND: u64 = 192_000;

pub fn select_mime_type(is_supported: impl Fn(&str) -> bool) -> &'static str {
    MIME_PREFERENCE
        .iter()
        .copied()
        .find(|mime| is_supported(mime))
        .unwrap_or(FALLBACK_MIME)
}

/// Video bitrate in bits per second for the given capture size and rate.
pub fn optimal_video_bitrate(width: u32, height: u32, fps: u32) -> u64 {
    let pixels = width as u64 * height as u64;
    let base: u64 = if pixels >= 3840 * 2160 {
        25_000_000
    } else if pixels >= 2560 * 1440 {
        12_000_000
    } else if pixels >= 1920 * 1080 {
        8_000_000
    } else if pixels >= 1280 * 720 {
        5_000_000
    } else {
        2_500_000
    };

    let boosted = |factor: f64, floor: u64| ((base as f64 * factor) as u64).max(floor);
    match fps {
        f if f >= 240 => boosted(1.8, 28_000_000),
        f if f >= 165 => boosted(1.6, 20_000_000),
        f if f >= 144 => boosted(1.4, 16_000_000),
        f if f >= 120 => boosted(1.2, 12_000_000),
        f if f >= 60 => boosted(1.1, base),
        _ => base,
    }
}

pub fn recorder_options(
    config: &SessionConfig,
    is_supported: impl Fn(&str) -> bool,
) -> RecorderOptions {
    let width = config.resolution.width;
    let height = config.resolution.height;
    RecorderOptions {
        mime_type: select_mime_type(is_supported).to_string(),
        video_bits_per_second: optimal_video_bitrate(width, height, config.frame_rate),
        audio_bits_per_second: AUDIO_BITS_PER_SECOND,
        frame_rate: config.frame_rate,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_prefers_vp9() {
        assert_eq!(select_mime_type(|_| true), "video/webm;codecs=vp9,opus");
    }

    #[test]
    fn test_select_skips_unsupported() {
        let mime = select_mime_type(|m| m.contains("vp8"));
        assert_eq!(mime, "video/webm;codecs=vp8,opus");
    }

    #[test]
    fn test_select_falls_back_when_nothing_supported() {
        assert_eq!(select_mime_type(|_| false), FALLBACK_MIME);
    }

    #[test]
    fn test_bitrate_by_resolution() {
        assert_eq!(optimal_video_bitrate(3840, 2160, 30), 25_000_000);
        assert_eq!(optimal_video_bitrate(2560, 1440, 30), 12_000_000);
        assert_eq!(optimal_video_bitrate(1920, 1080, 30), 8_000_000);
        assert_eq!(optimal_video_bitrate(1280, 720, 30), 5_000_000);
        assert_eq!(optimal_video_bitrate(640, 480, 30), 2_500_000);
    }

    #[test]
    fn test_bitrate_high_frame_rates() {
        assert_eq!(optimal_video_bitrate(1920, 1080, 60), 8_800_000);
        assert_eq!(optimal_video_bitrate(1920, 1080, 120), 12_000_000);
        assert_eq!(optimal_video_bitrate(1920, 1080, 144), 16_000_000);
        assert_eq!(optimal_video_bitrate(3840, 2160, 240), 45_000_000);
        assert_eq!(optimal_video_bitrate(640, 480, 165), 20_000_000);
    }
}
