//! Finalization of captured chunks into the requested output format.

pub mod artifact;
pub mod ffmpeg;
pub mod format;
pub mod gateway;

pub use artifact::{ArtifactHandle, ArtifactSummary};
pub use ffmpeg::FfmpegTranscoder;
pub use format::OutputFormat;
pub use gateway::{assemble, ConversionFailed, ConversionGateway, TranscodeError, TranscodeProvider};
