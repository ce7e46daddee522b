//! Native capture provider: X11 screen grabbing and PulseAudio/PipeWire audio
//! through ffmpeg, with cpal for device discovery and level metering.

mod analyser;
mod devices;
mod recorder;
mod track;

pub use analyser::CpalAnalyser;
pub use devices::{default_microphone, find_monitor_device, AudioDevice};
pub use recorder::{codecs_for, recording_args, FfmpegRecorder};
pub use track::NativeTrack;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::media::{
    AudioAnalyser, AudioConstraints, CaptureDevice, CaptureError, CaptureProvider,
    DisplayConstraints, EventSink, MediaStream, MediaTrack, Recorder, RecorderOptions, TrackKind,
    TrackRef,
};
use crate::conversion::ffmpeg::locate_ffmpeg;

/// Recorder MIME types the ffmpeg build is expected to encode.
const SUPPORTED_MIME: [&str; 3] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
];

pub struct NativeCaptureProvider {
    ffmpeg_path: Option<PathBuf>,
    /// Tracks handed out by this provider, by id, so recorders can recover
    /// their ffmpeg inputs.
    tracks: Mutex<HashMap<String, Arc<NativeTrack>>>,
}

impl NativeCaptureProvider {
    pub fn new(ffmpeg_path: Option<PathBuf>) -> Self {
        Self {
            ffmpeg_path,
            tracks: Mutex::new(HashMap::new()),
        }
    }

    fn ffmpeg(&self) -> Option<PathBuf> {
        locate_ffmpeg(self.ffmpeg_path.as_deref())
    }

    fn register(&self, track: &Arc<NativeTrack>) -> TrackRef {
        let mut tracks = self.tracks.lock().unwrap_or_else(|e| e.into_inner());
        tracks.retain(|_, t| t.is_live());
        tracks.insert(track.id().to_string(), track.clone());
        track.clone()
    }

    fn resolve(&self, track: &TrackRef) -> Result<Arc<NativeTrack>, CaptureError> {
        let tracks = self.tracks.lock().unwrap_or_else(|e| e.into_inner());
        tracks.get(track.id()).cloned().ok_or_else(|| {
            CaptureError::Recorder(format!(
                "track '{}' was not created by the native provider",
                track.label()
            ))
        })
    }
}

/// Sound server source carrying the output mix.
const MONITOR_SOURCE: &str = "@DEFAULT_MONITOR@";
/// Sound server source for the default microphone.
const MICROPHONE_SOURCE: &str = "default";

fn pulse_input(source: &str) -> Vec<String> {
    ["-f", "pulse", "-i", source]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// ffmpeg opens the monitor by its pulse source name; the cpal name stays the
/// label so the analyser can find the same device.
fn system_audio_track(monitor: &AudioDevice) -> Arc<NativeTrack> {
    NativeTrack::new(TrackKind::Audio, &monitor.name, pulse_input(MONITOR_SOURCE))
}

fn microphone_track(device: &AudioDevice) -> Arc<NativeTrack> {
    NativeTrack::new(TrackKind::Audio, &device.name, pulse_input(MICROPHONE_SOURCE))
}

fn x11_input(display: &str, frame_rate: u32) -> Vec<String> {
    vec![
        "-f".to_string(),
        "x11grab".to_string(),
        "-framerate".to_string(),
        frame_rate.to_string(),
        "-draw_mouse".to_string(),
        "1".to_string(),
        "-i".to_string(),
        display.to_string(),
    ]
}

#[async_trait]
impl CaptureProvider for NativeCaptureProvider {
    async fn request_display_capture(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<MediaStream, CaptureError> {
        let display_name = std::env::var("DISPLAY").map_err(|_| {
            CaptureError::denied(CaptureDevice::Display, "no X display available ($DISPLAY unset)")
        })?;
        if self.ffmpeg().is_none() {
            return Err(CaptureError::Unsupported(
                "screen capture requires ffmpeg".to_string(),
            ));
        }

        let video = NativeTrack::new(
            TrackKind::Video,
            format!("screen {display_name}"),
            x11_input(&display_name, constraints.frame_rate),
        );
        let mut tracks = vec![self.register(&video)];
        info!(
            "Display capture on {} ({}x{} @ {}fps requested)",
            display_name, constraints.width, constraints.height, constraints.frame_rate
        );

        if constraints.audio {
            match find_monitor_device() {
                Some(monitor) => {
                    let audio = system_audio_track(&monitor);
                    tracks.push(self.register(&audio));
                }
                None => warn!(
                    "No system audio monitor source found, recording without system audio. \
                     Ensure PipeWire or PulseAudio is running."
                ),
            }
        }

        Ok(MediaStream::new(tracks))
    }

    async fn request_microphone_capture(
        &self,
        constraints: &AudioConstraints,
    ) -> Result<MediaStream, CaptureError> {
        let device = default_microphone()
            .map_err(|reason| CaptureError::denied(CaptureDevice::Microphone, reason))?;
        debug!(
            "Microphone processing (echo={}, noise={}, agc={}) is left to the sound server",
            constraints.echo_cancellation,
            constraints.noise_suppression,
            constraints.auto_gain_control
        );
        let track = microphone_track(&device);
        Ok(MediaStream::new(vec![self.register(&track)]))
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        SUPPORTED_MIME.contains(&mime_type)
    }

    fn create_recorder(
        &self,
        stream: &MediaStream,
        options: &RecorderOptions,
        events: EventSink,
    ) -> Result<Box<dyn Recorder>, CaptureError> {
        let binary = self
            .ffmpeg()
            .ok_or_else(|| CaptureError::Recorder("ffmpeg not found".to_string()))?;
        let video = stream
            .first_video()
            .ok_or_else(|| CaptureError::Recorder("stream has no video track".to_string()))?;
        let video = self.resolve(&video)?;
        let audio = stream
            .audio_tracks()
            .map(|t| self.resolve(t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Box::new(FfmpegRecorder::new(
            binary,
            options.clone(),
            video,
            audio,
            events,
        )))
    }

    fn open_analyser(&self, track: TrackRef) -> Result<Box<dyn AudioAnalyser>, CaptureError> {
        if track.kind() != TrackKind::Audio {
            return Err(CaptureError::Unsupported(
                "analysis of a video track".to_string(),
            ));
        }
        Ok(Box::new(CpalAnalyser::open(track.label())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_mime_types() {
        let provider = NativeCaptureProvider::new(None);
        assert!(provider.is_type_supported("video/webm;codecs=vp9,opus"));
        assert!(!provider.is_type_supported("video/webm;codecs=h264,opus"));
        assert!(!provider.is_type_supported("video/mp4"));
    }

    #[test]
    fn test_foreign_track_is_rejected() {
        let provider = NativeCaptureProvider::new(None);
        let foreign: TrackRef = NativeTrack::new(TrackKind::Video, "other", Vec::new());
        assert!(matches!(
            provider.resolve(&foreign),
            Err(CaptureError::Recorder(_))
        ));

        let own = NativeTrack::new(TrackKind::Video, "own", Vec::new());
        let registered = provider.register(&own);
        assert!(provider.resolve(&registered).is_ok());
    }

    #[test]
    fn test_audio_tracks_open_pulse_sources_not_device_names() {
        let monitor = AudioDevice {
            name: "Monitor of Built-in Audio Analog Stereo".to_string(),
        };
        let track = system_audio_track(&monitor);
        assert_eq!(track.label(), "Monitor of Built-in Audio Analog Stereo");
        assert_eq!(track.input_args(), ["-f", "pulse", "-i", "@DEFAULT_MONITOR@"]);

        let mic = microphone_track(&AudioDevice {
            name: "sysdefault:CARD=PCH".to_string(),
        });
        assert_eq!(mic.label(), "sysdefault:CARD=PCH");
        assert_eq!(mic.input_args(), ["-f", "pulse", "-i", "default"]);
    }

    #[test]
    fn test_x11_input_ends_with_display() {
        let args = x11_input(":1", 60);
        assert_eq!(&args[args.len() - 2..], ["-i", ":1"]);
        assert!(args.windows(2).any(|w| w == ["-framerate", "60"]));
    }
}
