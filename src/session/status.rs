//! Session status types and the shared status handle read by the API.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::conversion::ArtifactSummary;

/// Phase of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    AwaitingPermission,
    Recording,
    Paused,
    Finalizing,
    Done,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::AwaitingPermission => "awaiting_permission",
            Status::Recording => "recording",
            Status::Paused => "paused",
            Status::Finalizing => "finalizing",
            Status::Done => "done",
            Status::Failed => "failed",
        }
    }

    /// Recording or paused: a recorder is live and sources are held.
    pub fn is_capturing(&self) -> bool {
        matches!(self, Status::Recording | Status::Paused)
    }

    /// A fresh `start` is allowed without waiting.
    pub fn is_settled(&self) -> bool {
        matches!(self, Status::Idle | Status::Done | Status::Failed)
    }
}

/// A status line: a localization key plus an optional untranslated detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub key: String,
    pub detail: Option<String>,
}

impl StatusMessage {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            detail: None,
        }
    }

    pub fn with_detail(key: &str, detail: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            detail: Some(detail.into()),
        }
    }
}

/// Broadcast to subscribers on every transition or message change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: Status,
    pub message: Option<StatusMessage>,
}

/// Current session state, readable by API handlers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSnapshot {
    pub status: Status,
    pub session_id: Option<Uuid>,
    pub message: Option<StatusMessage>,
    pub last_error: Option<String>,
    pub elapsed_ms: u64,
    pub bytes: u64,
    pub audio_level: Option<f32>,
    /// Latest analyser samples, 128 meaning silence.
    #[serde(skip)]
    pub waveform: Vec<u8>,
    pub artifact: Option<ArtifactSummary>,
}

/// Thread-safe handle for sharing session state between the session and API handlers.
#[derive(Clone)]
pub struct SessionStatusHandle {
    inner: Arc<Mutex<SessionSnapshot>>,
    updates: broadcast::Sender<StatusUpdate>,
}

impl Default for SessionStatusHandle {
    fn default() -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Mutex::new(SessionSnapshot::default())),
            updates,
        }
    }
}

impl SessionStatusHandle {
    pub async fn get(&self) -> SessionSnapshot {
        self.inner.lock().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.updates.subscribe()
    }

    pub async fn transition(&self, status: Status, message: Option<StatusMessage>) {
        let mut state = self.inner.lock().await;
        state.status = status;
        state.message = message.clone();
        let _ = self.updates.send(StatusUpdate { status, message });
    }

    pub async fn begin_session(&self, session_id: Uuid) {
        let mut state = self.inner.lock().await;
        *state = SessionSnapshot {
            session_id: Some(session_id),
            ..SessionSnapshot::default()
        };
    }

    pub async fn set_error(&self, error: Option<String>) {
        self.inner.lock().await.last_error = error;
    }

    pub async fn set_progress(
        &self,
        elapsed_ms: u64,
        bytes: u64,
        audio_level: Option<f32>,
        waveform: Vec<u8>,
    ) {
        let mut state = self.inner.lock().await;
        state.elapsed_ms = elapsed_ms;
        state.bytes = bytes;
        state.audio_level = audio_level;
        state.waveform = waveform;
    }

    pub async fn set_artifact(&self, artifact: Option<ArtifactSummary>) {
        self.inner.lock().await.artifact = artifact;
    }
}
