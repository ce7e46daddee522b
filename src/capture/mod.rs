//! Capture side of a session: provider traits, stream composition, time and
//! size accounting, and the native ffmpeg/cpal providers.

pub mod clock;
pub mod composer;
pub mod media;
pub mod native;
pub mod recorder_options;
pub mod waveform;

pub use clock::{format_elapsed, format_size, ClockAccumulator};
pub use composer::{CaptureSources, Composition, StreamComposer};
pub use media::{
    AudioAnalyser, AudioConstraints, CaptureDevice, CaptureError, CaptureProvider,
    DisplayConstraints, EventSink, MediaStream, MediaTrack, Recorder, RecorderOptions,
    RecorderState, SessionEvent, TrackKind, TrackRef,
};
