//! ffmpeg-backed recorder.
//!
//! Each recording span (start to pause, resume to pause, resume to stop) is
//! its own ffmpeg process writing a WebM segment into a scratch directory.
//! Paused time therefore never reaches the output. On stop the segments are
//! joined with ffmpeg's concat demuxer, which rebases every segment onto the
//! end of the previous one, and the result is delivered as data events.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::track::NativeTrack;
use crate::capture::media::{
    CaptureError, EventSink, Recorder, RecorderOptions, RecorderState, SessionEvent,
};

/// How long ffmpeg gets to close a segment after `q` before it is killed.
const QUIT_TIMEOUT: Duration = Duration::from_secs(5);
/// Size of the data events the joined recording is delivered in.
const DELIVERY_CHUNK: usize = 1024 * 1024;
const JOINED_NAME: &str = "joined.webm";
const CONCAT_LIST: &str = "segments.txt";

pub struct FfmpegRecorder {
    binary: PathBuf,
    options: RecorderOptions,
    video: Arc<NativeTrack>,
    audio: Vec<Arc<NativeTrack>>,
    events: EventSink,
    state: RecorderState,
    scratch: Option<TempDir>,
    segments: Vec<Segment>,
    delivery: Option<JoinHandle<()>>,
}

/// One ffmpeg process and the file it writes.
struct Segment {
    path: PathBuf,
    quit: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<Result<(), SegmentFailure>>,
}

impl Segment {
    fn request_quit(&mut self) {
        if let Some(quit) = self.quit.take() {
            // The supervisor is gone if ffmpeg already exited.
            let _ = quit.send(());
        }
    }
}

#[derive(Debug)]
struct SegmentFailure {
    reason: String,
    /// Already sent to the session as an error event.
    reported: bool,
}

impl FfmpegRecorder {
    pub fn new(
        binary: PathBuf,
        options: RecorderOptions,
        video: Arc<NativeTrack>,
        audio: Vec<Arc<NativeTrack>>,
        events: EventSink,
    ) -> Self {
        Self {
            binary,
            options,
            video,
            audio,
            events,
            state: RecorderState::Inactive,
            scratch: None,
            segments: Vec::new(),
            delivery: None,
        }
    }

    fn spawn_segment(&mut self) -> Result<(), CaptureError> {
        let dir = self
            .scratch
            .as_ref()
            .ok_or_else(|| CaptureError::Recorder("recorder has no scratch directory".to_string()))?;
        let path = dir.path().join(segment_name(self.segments.len()));
        let args = recording_args(&self.options, &self.video, &self.audio, &path);
        debug!("Spawning {:?} {}", self.binary, args.join(" "));

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CaptureError::Recorder(format!("failed to spawn ffmpeg: {e}")))?;

        info!(
            "Recording segment {} started (pid {:?})",
            self.segments.len(),
            child.id()
        );
        let (quit_tx, quit_rx) = oneshot::channel();
        let supervisor = tokio::spawn(supervise(
            child,
            quit_rx,
            self.events.clone(),
            self.video.clone(),
        ));
        self.segments.push(Segment {
            path,
            quit: Some(quit_tx),
            supervisor,
        });
        Ok(())
    }

    fn close_current_segment(&mut self) {
        if let Some(segment) = self.segments.last_mut() {
            segment.request_quit();
        }
    }
}

/// File name of the `index`th segment.
fn segment_name(index: usize) -> String {
    format!("segment-{index:03}.webm")
}

/// Full ffmpeg argument list for one recording segment written to `output`.
pub fn recording_args(
    options: &RecorderOptions,
    video: &NativeTrack,
    audio: &[Arc<NativeTrack>],
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostats", "-y"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    args.extend(video.input_args().iter().cloned());
    for track in audio {
        args.extend(track.input_args().iter().cloned());
    }

    args.push("-map".into());
    args.push("0:v".into());
    match audio.len() {
        0 => {}
        1 => {
            args.push("-map".into());
            args.push("1:a".into());
        }
        n => {
            let inputs: String = (1..=n).map(|i| format!("[{i}:a]")).collect();
            args.push("-filter_complex".into());
            args.push(format!("{inputs}amix=inputs={n}:duration=longest[aout]"));
            args.push("-map".into());
            args.push("[aout]".into());
        }
    }

    args.push("-vf".into());
    args.push(format!(
        "scale={}:{}:force_original_aspect_ratio=decrease,pad=ceil(iw/2)*2:ceil(ih/2)*2",
        options.width, options.height
    ));
    args.push("-r".into());
    args.push(options.frame_rate.to_string());

    let (video_codec, audio_codec) = codecs_for(&options.mime_type);
    args.extend([
        "-c:v".to_string(),
        video_codec.to_string(),
        "-b:v".to_string(),
        options.video_bits_per_second.to_string(),
        "-deadline".to_string(),
        "realtime".to_string(),
        "-cpu-used".to_string(),
        "8".to_string(),
    ]);
    if !audio.is_empty() {
        args.extend([
            "-c:a".to_string(),
            audio_codec.to_string(),
            "-b:a".to_string(),
            options.audio_bits_per_second.to_string(),
        ]);
    }
    args.extend([
        "-f".to_string(),
        "webm".to_string(),
        output.to_string_lossy().into_owned(),
    ]);
    args
}

/// Concat demuxer list for `segments`, which must share one directory.
pub fn concat_list(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| format!("file '{}'\n", name.to_string_lossy()))
        .collect()
}

/// Arguments that stream-copy the segments listed in `list` into `output`.
pub fn join_args(list: &Path, output: &Path) -> Vec<String> {
    [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain([
        list.to_string_lossy().into_owned(),
        "-c".to_string(),
        "copy".to_string(),
        "-f".to_string(),
        "webm".to_string(),
        output.to_string_lossy().into_owned(),
    ])
    .collect()
}

/// Encoder names for a recorder MIME type.
pub fn codecs_for(mime_type: &str) -> (&'static str, &'static str) {
    let video = if mime_type.contains("vp9") {
        "libvpx-vp9"
    } else {
        "libvpx"
    };
    (video, "libopus")
}

#[async_trait]
impl Recorder for FfmpegRecorder {
    fn mime_type(&self) -> &str {
        &self.options.mime_type
    }

    fn state(&self) -> RecorderState {
        self.state
    }

    async fn start(&mut self, timeslice: Duration) -> Result<(), CaptureError> {
        if self.state != RecorderState::Inactive || self.scratch.is_some() {
            return Err(CaptureError::Recorder("recorder already started".to_string()));
        }
        let scratch = tempfile::Builder::new()
            .prefix("aro-record-")
            .tempdir()
            .map_err(|e| CaptureError::Recorder(format!("failed to create scratch dir: {e}")))?;
        self.scratch = Some(scratch);
        self.spawn_segment()?;
        self.state = RecorderState::Recording;

        debug!(
            "Segments are delivered when recording stops (timeslice {:?} not used)",
            timeslice
        );
        info!(
            "Recording started ({}, {} audio input(s))",
            self.options.mime_type,
            self.audio.len()
        );
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), CaptureError> {
        if self.state != RecorderState::Recording {
            return Ok(());
        }
        self.close_current_segment();
        self.state = RecorderState::Paused;
        self.events.send(SessionEvent::Paused);
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), CaptureError> {
        if self.state != RecorderState::Paused {
            return Ok(());
        }
        self.spawn_segment()?;
        self.state = RecorderState::Recording;
        self.events.send(SessionEvent::Resumed);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if self.state == RecorderState::Inactive {
            return Ok(());
        }
        self.close_current_segment();
        self.state = RecorderState::Inactive;

        let scratch = self
            .scratch
            .take()
            .ok_or_else(|| CaptureError::Recorder("recorder has no scratch directory".to_string()))?;
        let segments = std::mem::take(&mut self.segments);
        debug!("Stop requested, joining {} segment(s)", segments.len());
        self.delivery = Some(tokio::spawn(deliver(
            self.binary.clone(),
            segments,
            scratch,
            self.events.clone(),
        )));
        Ok(())
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        for segment in &self.segments {
            segment.supervisor.abort();
        }
        if let Some(delivery) = self.delivery.take() {
            if !delivery.is_finished() {
                debug!("Dropping FfmpegRecorder before delivery finished");
                delivery.abort();
            }
        }
    }
}

/// Own one ffmpeg child until it exits or is asked to quit.
async fn supervise(
    mut child: Child,
    quit: oneshot::Receiver<()>,
    events: EventSink,
    video: Arc<NativeTrack>,
) -> Result<(), SegmentFailure> {
    let stdin = child.stdin.take();
    let stderr = child.stderr.take();
    let stderr_reader = tokio::spawn(async move {
        let mut text = String::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_string(&mut text).await;
        }
        text
    });

    let mut requested = false;
    let status = tokio::select! {
        status = child.wait() => status,
        _ = quit => {
            requested = true;
            ask_to_quit(&mut child, stdin).await
        }
    };
    let stderr_text = stderr_reader.await.unwrap_or_default();

    let failure = match &status {
        Ok(status) if status.success() || requested => None,
        Ok(status) => Some(format!("ffmpeg exited with {}: {}", status, stderr_text.trim())),
        Err(e) => Some(format!("failed waiting for ffmpeg: {e}")),
    };

    match failure {
        None => {
            if !requested {
                // Capture source went away underneath ffmpeg.
                warn!("ffmpeg exited without a stop request");
                video.end();
            }
            Ok(())
        }
        Some(reason) if requested => Err(SegmentFailure {
            reason,
            reported: false,
        }),
        Some(reason) => {
            error!("Recorder failed: {}", reason);
            events.send(SessionEvent::Error(reason.clone()));
            Err(SegmentFailure {
                reason,
                reported: true,
            })
        }
    }
}

/// `q` on stdin closes the container cleanly; kill if ffmpeg ignores it.
async fn ask_to_quit(
    child: &mut Child,
    stdin: Option<ChildStdin>,
) -> std::io::Result<ExitStatus> {
    if let Some(mut stdin) = stdin {
        if let Err(e) = stdin.write_all(b"q").await {
            debug!("Could not write quit request to ffmpeg: {}", e);
        }
    }
    match tokio::time::timeout(QUIT_TIMEOUT, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!("ffmpeg did not quit within {:?}, killing it", QUIT_TIMEOUT);
            child.kill().await?;
            child.wait().await
        }
    }
}

/// Wait for every segment, join them and hand the bytes to the session.
async fn deliver(binary: PathBuf, segments: Vec<Segment>, scratch: TempDir, events: EventSink) {
    let mut finished = Vec::new();
    for segment in segments {
        match segment.supervisor.await {
            Ok(Ok(())) => finished.push(segment.path),
            Ok(Err(failure)) => {
                if !failure.reported {
                    error!("Recorder failed: {}", failure.reason);
                    events.send(SessionEvent::Error(failure.reason));
                }
                return;
            }
            Err(e) => {
                events.send(SessionEvent::Error(format!("segment supervisor failed: {e}")));
                return;
            }
        }
    }

    match join_segments(&binary, &finished, scratch.path()).await {
        Ok(mut joined) => {
            info!(
                "Recorder stopped: {} segment(s), {} bytes",
                finished.len(),
                joined.len()
            );
            while joined.len() > DELIVERY_CHUNK {
                events.data(joined.split_to(DELIVERY_CHUNK));
            }
            if !joined.is_empty() {
                events.data(joined);
            }
            events.send(SessionEvent::Stopped);
        }
        Err(reason) => {
            error!("Failed to join recording segments: {}", reason);
            events.send(SessionEvent::Error(reason));
        }
    }
}

async fn join_segments(binary: &Path, segments: &[PathBuf], dir: &Path) -> Result<Bytes, String> {
    let mut written = Vec::new();
    for path in segments {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.len() > 0 => written.push(path.clone()),
            _ => debug!("Skipping empty segment {:?}", path),
        }
    }

    let output = match written.as_slice() {
        [] => return Ok(Bytes::new()),
        [single] => single.clone(),
        _ => {
            let list = dir.join(CONCAT_LIST);
            tokio::fs::write(&list, concat_list(&written))
                .await
                .map_err(|e| format!("failed to write segment list: {e}"))?;
            let output = dir.join(JOINED_NAME);
            let result = Command::new(binary)
                .args(join_args(&list, &output))
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| format!("failed to run ffmpeg concat: {e}"))?;
            if !result.status.success() {
                return Err(format!(
                    "ffmpeg concat exited with {}: {}",
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ));
            }
            output
        }
    };

    tokio::fs::read(&output)
        .await
        .map(Bytes::from)
        .map_err(|e| format!("failed to read {output:?}: {e}"))
}
