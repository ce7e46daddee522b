//! Capture provider abstraction: tracks, streams, recorders and the events
//! they emit.
//!
//! The session core only talks to these traits. Native implementations live in
//! `capture::native`; tests plug in scripted fakes.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Which physical source a track (or a failed request) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureDevice {
    Display,
    Microphone,
}

impl fmt::Display for CaptureDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureDevice::Display => write!(f, "display"),
            CaptureDevice::Microphone => write!(f, "microphone"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Errors raised by a capture provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user (or the platform) declined access to the device.
    #[error("{device} access denied: {reason}")]
    PermissionDenied {
        device: CaptureDevice,
        reason: String,
    },

    /// The recorder could not be created or driven.
    #[error("recorder failure: {0}")]
    Recorder(String),

    /// The provider does not offer this capability.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl CaptureError {
    pub fn denied(device: CaptureDevice, reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            device,
            reason: reason.into(),
        }
    }
}

/// A live capture track.
///
/// `stop` must be idempotent. `ended` resolves once the track has terminated,
/// whether stopped locally or revoked from outside (e.g. the OS sharing UI).
#[async_trait]
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> TrackKind;
    fn label(&self) -> &str;
    fn stop(&self);
    fn is_live(&self) -> bool;
    async fn ended(&self);
}

pub type TrackRef = Arc<dyn MediaTrack>;

/// An ordered set of tracks handed to a recorder or a preview surface.
#[derive(Clone, Default)]
pub struct MediaStream {
    tracks: Vec<TrackRef>,
}

impl MediaStream {
    pub fn new(tracks: Vec<TrackRef>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[TrackRef] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &TrackRef> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &TrackRef> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn first_video(&self) -> Option<TrackRef> {
        self.video_tracks().next().cloned()
    }

    pub fn first_audio(&self) -> Option<TrackRef> {
        self.audio_tracks().next().cloned()
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tracks.iter().map(|t| (t.kind(), t.label().to_string())))
            .finish()
    }
}

/// Constraints for a display capture request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Ask for system audio alongside the display.
    pub audio: bool,
}

/// Constraints for an audio capture request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Options a recorder is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderOptions {
    pub mime_type: String,
    pub video_bits_per_second: u64,
    pub audio_bits_per_second: u64,
    pub frame_rate: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Recording,
    Paused,
}

/// Everything a recorder (or a source observer) can report to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Data(Bytes),
    Paused,
    Resumed,
    Stopped,
    Error(String),
    /// The display source terminated outside of this program's control.
    SourcesRevoked,
}

/// Sending half of a session's event channel.
///
/// Sends after the session has been torn down are dropped silently.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn data(&self, chunk: Bytes) {
        if !chunk.is_empty() {
            self.send(SessionEvent::Data(chunk));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Recording capability over a composed stream.
#[async_trait]
pub trait Recorder: Send + Sync {
    fn mime_type(&self) -> &str;
    fn state(&self) -> RecorderState;
    /// Begin recording. `timeslice` is the preferred interval between data
    /// events; a recorder may deliver less often, at the latest on stop.
    async fn start(&mut self, timeslice: Duration) -> Result<(), CaptureError>;
    async fn pause(&mut self) -> Result<(), CaptureError>;
    async fn resume(&mut self) -> Result<(), CaptureError>;
    /// Flush pending data and emit `Stopped`. No-op once inactive.
    async fn stop(&mut self) -> Result<(), CaptureError>;
}

/// Live audio analysis over one track, used for the level meter / waveform.
pub trait AudioAnalyser: Send + Sync {
    /// Time-domain samples as bytes, 128 meaning silence.
    fn time_domain_data(&self) -> Vec<u8>;
    /// Release the analysis context. Must be idempotent.
    fn close(&mut self);
}

/// Platform capture/record capabilities.
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    async fn request_display_capture(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<MediaStream, CaptureError>;

    async fn request_microphone_capture(
        &self,
        constraints: &AudioConstraints,
    ) -> Result<MediaStream, CaptureError>;

    fn is_type_supported(&self, mime_type: &str) -> bool;

    fn create_recorder(
        &self,
        stream: &MediaStream,
        options: &RecorderOptions,
        events: EventSink,
    ) -> Result<Box<dyn Recorder>, CaptureError>;

    fn open_analyser(&self, _track: TrackRef) -> Result<Box<dyn AudioAnalyser>, CaptureError> {
        Err(CaptureError::Unsupported("audio analysis".to_string()))
    }
}
