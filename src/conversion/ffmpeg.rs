//! FFmpeg-backed transcode provider.
//!
//! The executable is located on first load; a private temp directory acts as
//! the provider's file system for inputs and outputs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use super::gateway::{TranscodeError, TranscodeProvider};

pub struct FfmpegTranscoder {
    configured_path: Option<PathBuf>,
    binary: Option<PathBuf>,
    workdir: Option<TempDir>,
}

impl FfmpegTranscoder {
    /// `ffmpeg_path` overrides the `$PATH` lookup.
    pub fn new(ffmpeg_path: Option<PathBuf>) -> Self {
        Self {
            configured_path: ffmpeg_path,
            binary: None,
            workdir: None,
        }
    }

    fn workdir(&self) -> Result<&Path, TranscodeError> {
        self.workdir
            .as_ref()
            .map(TempDir::path)
            .ok_or_else(|| TranscodeError::Unavailable("transcoder not loaded".to_string()))
    }

    /// Keep file names inside the work directory.
    fn resolve(&self, name: &str) -> Result<PathBuf, TranscodeError> {
        let file = Path::new(name);
        if file.components().count() != 1 || file.file_name().is_none() {
            return Err(TranscodeError::Io(format!("invalid file name '{name}'")));
        }
        Ok(self.workdir()?.join(file))
    }
}

/// Locate ffmpeg, honouring an explicit path first.
pub fn locate_ffmpeg(configured: Option<&Path>) -> Option<PathBuf> {
    match configured {
        Some(path) if path.is_file() => Some(path.to_path_buf()),
        Some(_) => None,
        None => which::which("ffmpeg").ok(),
    }
}

pub fn check_ffmpeg_available(configured: Option<&Path>) -> bool {
    locate_ffmpeg(configured).is_some()
}

#[async_trait]
impl TranscodeProvider for FfmpegTranscoder {
    fn is_loaded(&self) -> bool {
        self.binary.is_some() && self.workdir.is_some()
    }

    async fn load(&mut self) -> Result<(), TranscodeError> {
        let binary = locate_ffmpeg(self.configured_path.as_deref()).ok_or_else(|| {
            TranscodeError::Unavailable(
                "FFmpeg is required for mp4/gif/ogv output but was not found.\n\
                 Install FFmpeg:\n\
                 - macOS: brew install ffmpeg\n\
                 - Ubuntu/Debian: sudo apt install ffmpeg\n\
                 - Arch: sudo pacman -S ffmpeg"
                    .to_string(),
            )
        })?;

        let workdir = tempfile::Builder::new()
            .prefix("aro-transcode-")
            .tempdir()
            .map_err(|e| TranscodeError::Io(e.to_string()))?;

        info!("Transcoder ready: {:?} (workdir {:?})", binary, workdir.path());
        self.binary = Some(binary);
        self.workdir = Some(workdir);
        Ok(())
    }

    async fn write_input(&mut self, name: &str, bytes: &[u8]) -> Result<(), TranscodeError> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| TranscodeError::Io(format!("write {name}: {e}")))
    }

    async fn run(&mut self, args: &[String]) -> Result<(), TranscodeError> {
        let binary = self
            .binary
            .clone()
            .ok_or_else(|| TranscodeError::Unavailable("transcoder not loaded".to_string()))?;
        let workdir = self.workdir()?;

        debug!("Running ffmpeg {}", args.join(" "));
        let output = Command::new(&binary)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(args)
            .current_dir(workdir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscodeError::Run(format!("failed to run ffmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::Run(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn read_output(&mut self, name: &str) -> Result<Vec<u8>, TranscodeError> {
        let path = self.resolve(name)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| TranscodeError::Io(format!("read {name}: {e}")))?;
        let _ = tokio::fs::remove_file(&path).await;
        Ok(bytes)
    }
}
