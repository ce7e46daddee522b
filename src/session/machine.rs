//! Recording session lifecycle:
//! start → acquire → record (pause/resume) → stop/revoke → finalize → done
//!
//! All providers are injected. Every exit from Recording, Paused or Finalizing
//! goes through `release_resources`, which is safe to call any number of times.

use bytes::Bytes;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::error::SessionError;
use super::status::{SessionStatusHandle, Status, StatusMessage};
use crate::capture::recorder_options::recorder_options;
use crate::capture::waveform::peak_level;
use crate::capture::{
    AudioAnalyser, CaptureProvider, CaptureSources, ClockAccumulator, Composition, EventSink,
    Recorder, RecorderState, SessionEvent, StreamComposer,
};
use crate::conversion::{ArtifactHandle, ConversionGateway, OutputFormat};
use crate::history::HistoryLog;
use crate::i18n::keys;

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Interval at which the recorder emits data.
    pub timeslice: Duration,
    /// How long to wait for the recorder's final flush after stop.
    pub finalize_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeslice: Duration::from_millis(1000),
            finalize_timeout: Duration::from_secs(10),
        }
    }
}

enum RecorderOp {
    Pause,
    Resume,
    Stop,
}

pub struct RecordingSession {
    capture: Arc<dyn CaptureProvider>,
    composer: StreamComposer,
    gateway: ConversionGateway,
    history: HistoryLog,
    status_handle: SessionStatusHandle,
    options: SessionOptions,

    id: Option<Uuid>,
    status: Status,
    config: Option<SessionConfig>,
    sources: Option<CaptureSources>,
    recorder: Option<Box<dyn Recorder>>,
    analyser: Option<Box<dyn AudioAnalyser>>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    chunks: Vec<Bytes>,
    clock: ClockAccumulator,
    last_error: Option<SessionError>,
    artifact: Option<ArtifactHandle>,
}

impl RecordingSession {
    pub fn new(
        capture: Arc<dyn CaptureProvider>,
        gateway: ConversionGateway,
        history: HistoryLog,
        status_handle: SessionStatusHandle,
        options: SessionOptions,
    ) -> Self {
        Self {
            composer: StreamComposer::new(capture.clone()),
            capture,
            gateway,
            history,
            status_handle,
            options,
            id: None,
            status: Status::Idle,
            config: None,
            sources: None,
            recorder: None,
            analyser: None,
            events: None,
            chunks: Vec::new(),
            clock: ClockAccumulator::new(),
            last_error: None,
            artifact: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn sources(&self) -> Option<&CaptureSources> {
        self.sources.as_ref()
    }

    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    pub fn clock(&self) -> &ClockAccumulator {
        &self.clock
    }

    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        self.artifact.as_ref()
    }

    pub fn status_handle(&self) -> &SessionStatusHandle {
        &self.status_handle
    }

    /// Latest analyser samples for the waveform display.
    pub fn waveform(&self) -> Option<Vec<u8>> {
        self.analyser.as_ref().map(|a| a.time_domain_data())
    }

    /// Begin a new session, fully tearing down any previous one first.
    pub async fn start(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        if !self.status.is_settled() {
            info!(
                "Start requested while {}, tearing down previous session",
                self.status.as_str()
            );
        }
        self.teardown().await;
        self.reset();

        let id = Uuid::new_v4();
        self.id = Some(id);
        self.status_handle.begin_session(id).await;
        info!(
            "Session {} starting: {} @ {}fps -> {}, mic={}",
            id,
            config.resolution,
            config.frame_rate,
            config.output_format,
            config.microphone_enabled
        );
        self.config = Some(config.clone());
        self.set_status(
            Status::AwaitingPermission,
            Some(StatusMessage::new(keys::SELECT_SCREEN)),
        )
        .await;

        let (sink, rx) = EventSink::channel();
        let Composition {
            sources,
            stream,
            microphone_denied,
        } = match self.composer.acquire(&config, sink.clone()).await {
            Ok(composition) => composition,
            Err(e) => {
                let err = SessionError::from(e);
                warn!("Session {} acquisition failed: {}", id, err);
                self.abort_to(Status::Idle, err.clone()).await;
                return Err(err);
            }
        };
        self.sources = Some(sources);
        self.events = Some(rx);

        let options = recorder_options(&config, |mime| self.capture.is_type_supported(mime));
        debug!("Recorder options: {:?}", options);
        let recorder = match self.capture.create_recorder(&stream, &options, sink) {
            Ok(recorder) => recorder,
            Err(e) => {
                let err = SessionError::RecorderError(e.to_string());
                error!("Session {} could not create recorder: {}", id, err);
                self.fail(err.clone()).await;
                return Err(err);
            }
        };
        self.recorder = Some(recorder);

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.start(self.options.timeslice).await {
                let err = SessionError::RecorderError(e.to_string());
                error!("Session {} recorder failed to start: {}", id, err);
                self.fail(err.clone()).await;
                return Err(err);
            }
        }
        self.clock.start();

        if let Some(track) = stream.first_audio() {
            match self.capture.open_analyser(track) {
                Ok(analyser) => self.analyser = Some(analyser),
                Err(e) => debug!("No audio analyser for session {}: {}", id, e),
            }
        }

        let message = match microphone_denied {
            Some(denied) => StatusMessage::with_detail(keys::MIC_UNAVAILABLE, denied.to_string()),
            None => StatusMessage::new(keys::RECORDING),
        };
        self.set_status(Status::Recording, Some(message)).await;
        Ok(())
    }

    pub async fn pause(&mut self) -> Result<(), SessionError> {
        if self.status != Status::Recording {
            debug!("Pause ignored while {}", self.status.as_str());
            return Ok(());
        }
        if let Err(err) = self.drive_recorder(RecorderOp::Pause).await {
            self.fail(err.clone()).await;
            return Err(err);
        }
        self.clock.on_pause();
        self.set_status(Status::Paused, Some(StatusMessage::new(keys::PAUSED)))
            .await;
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<(), SessionError> {
        if self.status != Status::Paused {
            debug!("Resume ignored while {}", self.status.as_str());
            return Ok(());
        }
        if let Err(err) = self.drive_recorder(RecorderOp::Resume).await {
            self.fail(err.clone()).await;
            return Err(err);
        }
        self.clock.on_resume();
        self.set_status(Status::Recording, Some(StatusMessage::new(keys::RECORDING)))
            .await;
        Ok(())
    }

    /// Stop recording and wait for finalization.
    ///
    /// Returns the produced artifact (the native fallback if conversion failed),
    /// or `None` when there was nothing to stop.
    pub async fn stop(&mut self) -> Result<Option<ArtifactHandle>, SessionError> {
        match self.status {
            Status::Recording | Status::Paused => {
                self.begin_finalizing().await?;
                self.drain().await;
                match self.status {
                    Status::Failed => Err(self
                        .last_error
                        .clone()
                        .unwrap_or_else(|| SessionError::RecorderError("unknown".to_string()))),
                    _ => Ok(self.artifact.clone()),
                }
            }
            Status::Finalizing => {
                debug!("Stop ignored, already finalizing");
                Ok(None)
            }
            other => {
                debug!("Stop ignored while {}", other.as_str());
                Ok(None)
            }
        }
    }

    /// Next event from the recorder or the source observer.
    ///
    /// Never resolves while no session is active, so it is safe to poll from a
    /// `select!` loop at any time.
    pub async fn next_event(&mut self) -> SessionEvent {
        if let Some(rx) = self.events.as_mut() {
            if let Some(event) = rx.recv().await {
                return event;
            }
            self.events = None;
            match self.status {
                Status::Finalizing => return SessionEvent::Stopped,
                Status::Recording | Status::Paused => {
                    return SessionEvent::Error("recorder event stream closed".to_string())
                }
                _ => {}
            }
        }
        std::future::pending().await
    }

    /// Apply one event; if it moved the session into Finalizing, wait for
    /// the recorder to flush and finalize.
    pub async fn handle_event(&mut self, event: SessionEvent) {
        self.apply(event).await;
        if self.status == Status::Finalizing {
            self.drain().await;
        }
    }

    /// Push elapsed time, size, audio level and waveform to the status handle.
    pub async fn publish_progress(&self) {
        let waveform = self.waveform();
        let level = waveform.as_deref().map(peak_level);
        self.status_handle
            .set_progress(
                self.clock.elapsed().as_millis() as u64,
                self.clock.bytes(),
                level,
                waveform.unwrap_or_default(),
            )
            .await;
    }

    /// Release everything the session holds and return to Idle if it was
    /// still active. Safe to call repeatedly.
    pub async fn teardown(&mut self) {
        self.release_resources().await;
        if !self.status.is_settled() {
            self.chunks.clear();
            self.set_status(Status::Idle, None).await;
        }
    }

    async fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Data(chunk) => {
                if matches!(
                    self.status,
                    Status::Recording | Status::Paused | Status::Finalizing
                ) {
                    self.clock.add_bytes(chunk.len() as u64);
                    self.chunks.push(chunk);
                } else {
                    debug!(
                        "Dropping {} byte chunk delivered while {}",
                        chunk.len(),
                        self.status.as_str()
                    );
                }
            }
            SessionEvent::Paused => debug!("Recorder acknowledged pause"),
            SessionEvent::Resumed => debug!("Recorder acknowledged resume"),
            SessionEvent::Error(reason) => {
                if matches!(
                    self.status,
                    Status::Recording | Status::Paused | Status::Finalizing
                ) {
                    error!("Recorder error: {}", reason);
                    self.fail(SessionError::RecorderError(reason)).await;
                }
            }
            SessionEvent::SourcesRevoked => {
                if self.status.is_capturing() {
                    info!("{}, stopping recording", SessionError::DeviceLost);
                    let _ = self.begin_finalizing().await;
                }
            }
            SessionEvent::Stopped => match self.status {
                Status::Finalizing => self.finalize().await,
                Status::Recording | Status::Paused => {
                    warn!("Recorder stopped on its own, finalizing");
                    if self.begin_finalizing().await.is_ok() {
                        self.finalize().await;
                    }
                }
                _ => {}
            },
        }
    }

    async fn begin_finalizing(&mut self) -> Result<(), SessionError> {
        self.clock.freeze();
        self.set_status(Status::Finalizing, Some(StatusMessage::new(keys::STOPPING)))
            .await;
        if let Err(err) = self.drive_recorder(RecorderOp::Stop).await {
            self.fail(err.clone()).await;
            return Err(err);
        }
        Ok(())
    }

    async fn drain(&mut self) {
        while self.status == Status::Finalizing {
            let event =
                match tokio::time::timeout(self.options.finalize_timeout, self.next_event()).await {
                    Ok(event) => event,
                    Err(_) => {
                        warn!(
                            "Recorder did not report stop within {:?}, finalizing {} chunks",
                            self.options.finalize_timeout,
                            self.chunks.len()
                        );
                        SessionEvent::Stopped
                    }
                };
            self.apply(event).await;
        }
    }

    async fn finalize(&mut self) {
        let format = self
            .config
            .as_ref()
            .map(|c| c.output_format)
            .unwrap_or(OutputFormat::WebM);

        if !format.is_native() {
            self.set_status(Status::Finalizing, Some(StatusMessage::new(keys::CONVERTING)))
                .await;
        }
        if self.chunks.is_empty() {
            warn!("Finalizing a session without any captured data");
        }

        let (artifact, error) = match self.gateway.finalize(&self.chunks, format).await {
            Ok(artifact) => (artifact, None),
            Err(failed) => (failed.fallback.clone(), Some(SessionError::from(&failed))),
        };

        self.history
            .record_capture(artifact.clone(), Local::now())
            .await;
        self.status_handle
            .set_artifact(Some(artifact.summary()))
            .await;
        info!(
            "Session finalized: {} ({} bytes, {})",
            artifact.file_name(),
            artifact.len(),
            artifact.mime_type()
        );
        self.artifact = Some(artifact);

        self.release_resources().await;
        self.publish_progress().await;

        let message = match &error {
            Some(err) => StatusMessage::with_detail(keys::CONVERSION_FAILED, err.to_string()),
            None => StatusMessage::new(keys::DONE),
        };
        self.status_handle
            .set_error(error.as_ref().map(ToString::to_string))
            .await;
        self.last_error = error;
        self.set_status(Status::Done, Some(message)).await;
    }

    async fn fail(&mut self, err: SessionError) {
        self.abort_to(Status::Failed, err).await;
    }

    /// Discard captured data, release resources and land in `status`.
    async fn abort_to(&mut self, status: Status, err: SessionError) {
        self.release_resources().await;
        if !self.chunks.is_empty() {
            debug!("Discarding {} unflushed chunks", self.chunks.len());
        }
        self.chunks.clear();
        self.clock.freeze();
        let message = StatusMessage::with_detail(err.status_key(), err.to_string());
        self.status_handle.set_error(Some(err.to_string())).await;
        self.last_error = Some(err);
        self.set_status(status, Some(message)).await;
    }

    async fn drive_recorder(&mut self, op: RecorderOp) -> Result<(), SessionError> {
        let Some(recorder) = self.recorder.as_mut() else {
            return Err(SessionError::RecorderError("no active recorder".to_string()));
        };
        let result = match op {
            RecorderOp::Pause => recorder.pause().await,
            RecorderOp::Resume => recorder.resume().await,
            RecorderOp::Stop => recorder.stop().await,
        };
        result.map_err(|e| SessionError::RecorderError(e.to_string()))
    }

    async fn release_resources(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            if recorder.state() != RecorderState::Inactive {
                if let Err(e) = recorder.stop().await {
                    warn!("Failed to stop recorder during teardown: {}", e);
                }
            }
        }
        if let Some(mut analyser) = self.analyser.take() {
            analyser.close();
        }
        if let Some(mut sources) = self.sources.take() {
            sources.release();
        }
        self.events = None;
    }

    fn reset(&mut self) {
        self.chunks.clear();
        self.clock.reset();
        self.last_error = None;
        self.artifact = None;
        self.config = None;
    }

    async fn set_status(&mut self, status: Status, message: Option<StatusMessage>) {
        if self.status != status {
            debug!("Session status {} -> {}", self.status.as_str(), status.as_str());
        }
        self.status = status;
        self.status_handle.transition(status, message).await;
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(mut analyser) = self.analyser.take() {
            analyser.close();
        }
    }
}
