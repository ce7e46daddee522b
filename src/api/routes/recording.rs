//! Session control endpoints.
//!
//! Commands go to the service loop over a channel and are answered through a
//! oneshot once the session has handled them.

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::capture::waveform::waveform_points;
use crate::capture::{format_elapsed, format_size};
use crate::controls::{Action, Controls, Shortcut};
use crate::conversion::ArtifactSummary;
use crate::session::{Resolution, SessionConfig, SessionError, SessionSnapshot};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

pub type CommandReply<T> = oneshot::Sender<Result<T, SessionError>>;

pub enum ApiCommand {
    Start {
        config: SessionConfig,
        reply: CommandReply<()>,
    },
    Pause {
        reply: CommandReply<()>,
    },
    Resume {
        reply: CommandReply<()>,
    },
    Stop {
        reply: CommandReply<Option<ArtifactSummary>>,
    },
    /// Dispatched against the live session status; `None` when the shortcut
    /// has no enabled action.
    Shortcut {
        shortcut: Shortcut,
        start_config: SessionConfig,
        reply: CommandReply<Option<Action>>,
    },
}

/// Optional per-session overrides for `POST /start`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    /// `WIDTHxHEIGHT`
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub microphone: Option<bool>,
}

impl StartRequest {
    pub fn apply(&self, base: &SessionConfig) -> Result<SessionConfig, SessionError> {
        let resolution = match &self.resolution {
            Some(s) => s.parse::<Resolution>()?,
            None => base.resolution,
        };
        let output_format = match &self.format {
            Some(s) => s.parse().map_err(SessionError::InvalidConfig)?,
            None => base.output_format,
        };
        SessionConfig::new(
            resolution,
            self.fps.unwrap_or(base.frame_rate),
            output_format,
            self.microphone.unwrap_or(base.microphone_enabled),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct ShortcutRequest {
    pub combo: String,
}

/// Size of the box waveform points are scaled into.
#[derive(Debug, Default, Deserialize)]
pub struct WaveformQuery {
    pub width: Option<f32>,
    pub height: Option<f32>,
}

const WAVEFORM_WIDTH: f32 = 512.0;
const WAVEFORM_HEIGHT: f32 = 64.0;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(session_status))
        .route("/start", post(start_recording))
        .route("/pause", post(pause_recording))
        .route("/resume", post(resume_recording))
        .route("/stop", post(stop_recording))
        .route("/shortcut", post(apply_shortcut))
        .route("/waveform", get(session_waveform))
        .with_state(state)
}

async fn send<T>(
    state: &ApiState,
    build: impl FnOnce(CommandReply<T>) -> ApiCommand,
) -> ApiResult<T> {
    let (reply, rx) = oneshot::channel();
    state.tx.send(build(reply)).await.map_err(|e| {
        error!("Failed to send session command: {}", e);
        ApiError::unavailable("session service is not running")
    })?;
    rx.await
        .map_err(|_| ApiError::internal("session command dropped"))?
        .map_err(ApiError::from)
}

/// Status body shared by every control endpoint.
pub async fn status_body(state: &ApiState) -> Value {
    let snapshot = state.status.get().await;
    let locale = state.locale().await;
    render_status(&snapshot, state, &locale)
}

fn render_status(snapshot: &SessionSnapshot, state: &ApiState, locale: &str) -> Value {
    let message = snapshot
        .message
        .as_ref()
        .map(|m| state.localizer.status_text(m, locale));
    json!({
        "status": snapshot.status.as_str(),
        "session_id": snapshot.session_id,
        "message": message,
        "elapsed": format_elapsed(Duration::from_millis(snapshot.elapsed_ms)),
        "elapsed_ms": snapshot.elapsed_ms,
        "size": format_size(snapshot.bytes),
        "bytes": snapshot.bytes,
        "audio_level": snapshot.audio_level,
        "last_error": snapshot.last_error,
        "artifact": snapshot.artifact,
        "controls": Controls::for_status(snapshot.status),
        "locale": locale,
    })
}

async fn session_status(State(state): State<ApiState>) -> Json<Value> {
    Json(status_body(&state).await)
}

/// Waveform polyline, empty unless a session is capturing audio.
pub fn render_waveform(snapshot: &SessionSnapshot, width: f32, height: f32) -> Value {
    let points = if snapshot.status.is_capturing() {
        waveform_points(&snapshot.waveform, width, height)
    } else {
        Vec::new()
    };
    json!({
        "status": snapshot.status.as_str(),
        "level": snapshot.audio_level,
        "width": width,
        "height": height,
        "points": points,
    })
}

async fn session_waveform(
    State(state): State<ApiState>,
    Query(query): Query<WaveformQuery>,
) -> Json<Value> {
    let snapshot = state.status.get().await;
    Json(render_waveform(
        &snapshot,
        query.width.unwrap_or(WAVEFORM_WIDTH),
        query.height.unwrap_or(WAVEFORM_HEIGHT),
    ))
}

async fn start_recording(
    State(state): State<ApiState>,
    body: Option<Json<StartRequest>>,
) -> ApiResult<Json<Value>> {
    let request = body.map(|Json(req)| req).unwrap_or_default();
    let config = request.apply(&state.defaults)?;
    info!("Start requested via API: {:?}", config);

    send(&state, |reply| ApiCommand::Start { config, reply }).await?;
    Ok(Json(status_body(&state).await))
}

async fn pause_recording(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    send(&state, |reply| ApiCommand::Pause { reply }).await?;
    Ok(Json(status_body(&state).await))
}

async fn resume_recording(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    send(&state, |reply| ApiCommand::Resume { reply }).await?;
    Ok(Json(status_body(&state).await))
}

async fn stop_recording(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let artifact = send(&state, |reply| ApiCommand::Stop { reply }).await?;
    let mut body = status_body(&state).await;
    body["stopped_artifact"] = json!(artifact);
    Ok(Json(body))
}

/// Applies a key combination as if pressed in the recorder window.
async fn apply_shortcut(
    State(state): State<ApiState>,
    Json(request): Json<ShortcutRequest>,
) -> ApiResult<Json<Value>> {
    let shortcut: Shortcut = request.combo.parse().map_err(ApiError::bad_request)?;
    let start_config = state.defaults.clone();
    let action = send(&state, |reply| ApiCommand::Shortcut {
        shortcut,
        start_config,
        reply,
    })
    .await?;

    if action == Some(Action::ToggleTheme) {
        let dark = state.prefs.lock().await.toggle_dark_mode()?;
        info!("Dark mode {}", if dark { "on" } else { "off" });
    }

    let mut body = status_body(&state).await;
    body["action"] = json!(action);
    body["dark"] = json!(state.dark_mode().await);
    Ok(Json(body))
}
