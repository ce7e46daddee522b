//! Scripted capture and transcode providers for driving sessions in tests.

#![allow(dead_code)]

use aro_recorder::capture::{
    AudioAnalyser, AudioConstraints, CaptureDevice, CaptureError, CaptureProvider,
    DisplayConstraints, EventSink, MediaStream, MediaTrack, Recorder, RecorderOptions,
    RecorderState, SessionEvent, TrackKind, TrackRef,
};
use aro_recorder::conversion::{ConversionGateway, TranscodeError, TranscodeProvider};
use aro_recorder::history::HistoryLog;
use aro_recorder::session::{RecordingSession, SessionOptions, SessionStatusHandle};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

pub struct FakeTrack {
    id: String,
    kind: TrackKind,
    label: String,
    stops: AtomicUsize,
    ended: watch::Sender<bool>,
}

impl FakeTrack {
    pub fn new(kind: TrackKind, label: &str) -> Arc<Self> {
        let (ended, _) = watch::channel(false);
        Arc::new(Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            label: label.to_string(),
            stops: AtomicUsize::new(0),
            ended,
        })
    }

    /// Times `stop` was called while the track was still live.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Terminate the track from outside, like the OS "stop sharing" button.
    pub fn revoke(&self) {
        self.ended.send_replace(true);
    }
}

#[async_trait]
impl MediaTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn stop(&self) {
        if !self.ended.send_replace(true) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        !*self.ended.borrow()
    }

    async fn ended(&self) {
        let mut rx = self.ended.subscribe();
        let _ = rx.wait_for(|ended| *ended).await;
    }
}

/// Behaviour knobs for `FakeCapture`.
#[derive(Clone, Default)]
pub struct CaptureScript {
    pub deny_display: Option<String>,
    pub deny_microphone: Option<String>,
    pub display_audio: bool,
    /// Return a display stream with no video track.
    pub display_without_video: bool,
    pub supported_mime: Vec<String>,
    pub fail_create_recorder: bool,
    pub fail_recorder_start: bool,
    /// Chunk the recorder flushes when stopped.
    pub flush_on_stop: Option<Bytes>,
    /// Recorder never acknowledges stop.
    pub silent_stop: bool,
}

#[derive(Default)]
pub struct FakeCapture {
    pub script: CaptureScript,
    tracks: Mutex<Vec<Arc<FakeTrack>>>,
    sink: Mutex<Option<EventSink>>,
    options: Mutex<Option<RecorderOptions>>,
    recorder_log: Arc<Mutex<Vec<&'static str>>>,
    stream_kinds: Mutex<Vec<(TrackKind, String)>>,
}

impl FakeCapture {
    pub fn new(script: CaptureScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            ..Default::default()
        })
    }

    pub fn tracks(&self) -> Vec<Arc<FakeTrack>> {
        self.tracks.lock().unwrap().clone()
    }

    pub fn display_video(&self) -> Arc<FakeTrack> {
        self.tracks()
            .into_iter()
            .find(|t| t.kind() == TrackKind::Video)
            .expect("no display video track was created")
    }

    /// The event sink handed to the last recorder.
    pub fn sink(&self) -> EventSink {
        self.sink
            .lock()
            .unwrap()
            .clone()
            .expect("no recorder was created")
    }

    pub fn recorder_options(&self) -> Option<RecorderOptions> {
        self.options.lock().unwrap().clone()
    }

    pub fn recorder_log(&self) -> Vec<&'static str> {
        self.recorder_log.lock().unwrap().clone()
    }

    /// `(kind, label)` of each track in the stream given to the recorder.
    pub fn recorded_stream(&self) -> Vec<(TrackKind, String)> {
        self.stream_kinds.lock().unwrap().clone()
    }

    fn track(&self, kind: TrackKind, label: &str) -> TrackRef {
        let track = FakeTrack::new(kind, label);
        self.tracks.lock().unwrap().push(track.clone());
        track
    }
}

#[async_trait]
impl CaptureProvider for FakeCapture {
    async fn request_display_capture(
        &self,
        _constraints: &DisplayConstraints,
    ) -> Result<MediaStream, CaptureError> {
        if let Some(reason) = &self.script.deny_display {
            return Err(CaptureError::denied(CaptureDevice::Display, reason.clone()));
        }
        let mut tracks = Vec::new();
        if self.script.display_without_video {
            tracks.push(self.track(TrackKind::Audio, "display-audio"));
            return Ok(MediaStream::new(tracks));
        }
        tracks.push(self.track(TrackKind::Video, "display"));
        if self.script.display_audio {
            tracks.push(self.track(TrackKind::Audio, "display-audio"));
        }
        Ok(MediaStream::new(tracks))
    }

    async fn request_microphone_capture(
        &self,
        _constraints: &AudioConstraints,
    ) -> Result<MediaStream, CaptureError> {
        if let Some(reason) = &self.script.deny_microphone {
            return Err(CaptureError::denied(CaptureDevice::Microphone, reason.clone()));
        }
        Ok(MediaStream::new(vec![self.track(TrackKind::Audio, "mic")]))
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.script.supported_mime.iter().any(|m| m == mime_type)
    }

    fn create_recorder(
        &self,
        stream: &MediaStream,
        options: &RecorderOptions,
        events: EventSink,
    ) -> Result<Box<dyn Recorder>, CaptureError> {
        if self.script.fail_create_recorder {
            return Err(CaptureError::Recorder("NotSupportedError".to_string()));
        }
        *self.sink.lock().unwrap() = Some(events.clone());
        *self.options.lock().unwrap() = Some(options.clone());
        *self.stream_kinds.lock().unwrap() = stream
            .tracks()
            .iter()
            .map(|t| (t.kind(), t.label().to_string()))
            .collect();
        Ok(Box::new(FakeRecorder {
            mime_type: options.mime_type.clone(),
            state: RecorderState::Inactive,
            events,
            log: self.recorder_log.clone(),
            fail_start: self.script.fail_recorder_start,
            flush_on_stop: self.script.flush_on_stop.clone(),
            silent_stop: self.script.silent_stop,
        }))
    }

    fn open_analyser(&self, _track: TrackRef) -> Result<Box<dyn AudioAnalyser>, CaptureError> {
        Ok(Box::new(FakeAnalyser { closed: false }))
    }
}

pub struct FakeRecorder {
    mime_type: String,
    state: RecorderState,
    events: EventSink,
    log: Arc<Mutex<Vec<&'static str>>>,
    fail_start: bool,
    flush_on_stop: Option<Bytes>,
    silent_stop: bool,
}

impl FakeRecorder {
    fn record(&self, op: &'static str) {
        self.log.lock().unwrap().push(op);
    }
}

#[async_trait]
impl Recorder for FakeRecorder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn state(&self) -> RecorderState {
        self.state
    }

    async fn start(&mut self, _timeslice: Duration) -> Result<(), CaptureError> {
        self.record("start");
        if self.fail_start {
            return Err(CaptureError::Recorder("encoder unavailable".to_string()));
        }
        self.state = RecorderState::Recording;
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), CaptureError> {
        self.record("pause");
        self.state = RecorderState::Paused;
        self.events.send(SessionEvent::Paused);
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), CaptureError> {
        self.record("resume");
        self.state = RecorderState::Recording;
        self.events.send(SessionEvent::Resumed);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if self.state == RecorderState::Inactive {
            return Ok(());
        }
        self.record("stop");
        self.state = RecorderState::Inactive;
        if let Some(chunk) = self.flush_on_stop.take() {
            self.events.data(chunk);
        }
        if !self.silent_stop {
            self.events.send(SessionEvent::Stopped);
        }
        Ok(())
    }
}

/// Constant 0.5 level waveform.
pub struct FakeAnalyser {
    closed: bool,
}

impl AudioAnalyser for FakeAnalyser {
    fn time_domain_data(&self) -> Vec<u8> {
        if self.closed {
            Vec::new()
        } else {
            vec![128, 192, 64, 128]
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Transcoder that "converts" by tagging the input with the output name.
#[derive(Clone, Default)]
pub struct FakeTranscoder {
    pub runs: Arc<Mutex<Vec<Vec<String>>>>,
    pub loads: Arc<AtomicUsize>,
    pub fail_run: bool,
    loaded: bool,
    input: Vec<u8>,
}

impl FakeTranscoder {
    pub fn failing() -> Self {
        Self {
            fail_run: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl TranscodeProvider for FakeTranscoder {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    async fn load(&mut self) -> Result<(), TranscodeError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded = true;
        Ok(())
    }

    async fn write_input(&mut self, _name: &str, bytes: &[u8]) -> Result<(), TranscodeError> {
        self.input = bytes.to_vec();
        Ok(())
    }

    async fn run(&mut self, args: &[String]) -> Result<(), TranscodeError> {
        self.runs.lock().unwrap().push(args.to_vec());
        if self.fail_run {
            return Err(TranscodeError::Run("exit code 1".to_string()));
        }
        Ok(())
    }

    async fn read_output(&mut self, name: &str) -> Result<Vec<u8>, TranscodeError> {
        let mut out = name.as_bytes().to_vec();
        out.extend_from_slice(&self.input);
        Ok(out)
    }
}

/// Transcoder whose load always fails.
pub struct UnavailableTranscoder;

#[async_trait]
impl TranscodeProvider for UnavailableTranscoder {
    fn is_loaded(&self) -> bool {
        false
    }

    async fn load(&mut self) -> Result<(), TranscodeError> {
        Err(TranscodeError::Unavailable("ffmpeg not found".to_string()))
    }

    async fn write_input(&mut self, _name: &str, _bytes: &[u8]) -> Result<(), TranscodeError> {
        unreachable!("write_input before load")
    }

    async fn run(&mut self, _args: &[String]) -> Result<(), TranscodeError> {
        unreachable!("run before load")
    }

    async fn read_output(&mut self, _name: &str) -> Result<Vec<u8>, TranscodeError> {
        unreachable!("read_output before load")
    }
}

pub struct Harness {
    pub capture: Arc<FakeCapture>,
    pub history: HistoryLog,
    pub status: SessionStatusHandle,
    pub session: RecordingSession,
}

pub fn harness(script: CaptureScript, transcoder: Box<dyn TranscodeProvider>) -> Harness {
    harness_with_options(script, transcoder, SessionOptions::default())
}

pub fn harness_with_options(
    script: CaptureScript,
    transcoder: Box<dyn TranscodeProvider>,
    options: SessionOptions,
) -> Harness {
    let capture = FakeCapture::new(script);
    let history = HistoryLog::new();
    let status = SessionStatusHandle::default();
    let session = RecordingSession::new(
        capture.clone(),
        ConversionGateway::new(transcoder),
        history.clone(),
        status.clone(),
        options,
    );
    Harness {
        capture,
        history,
        status,
        session,
    }
}

/// Feed the next `n` pending events to the session.
pub async fn pump(session: &mut RecordingSession, n: usize) {
    for _ in 0..n {
        let event = tokio::time::timeout(Duration::from_secs(1), session.next_event())
            .await
            .expect("expected a pending session event");
        session.handle_event(event).await;
    }
}

pub fn chunk(len: usize) -> Bytes {
    Bytes::from(vec![0xAB; len])
}
