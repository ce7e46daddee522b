//! Local HTTP control API.
//!
//! Provides endpoints for:
//! - Session control (start, pause, resume, stop, shortcuts)
//! - Session status with localized text
//! - Capture/download history and exporting the newest capture
//! - Control enablement for the current status

pub mod error;
pub mod routes;

use crate::history::HistoryLog;
use crate::i18n::Localizer;
use crate::prefs::Preferences;
use crate::session::{SessionConfig, SessionStatusHandle};
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tower::ServiceBuilder;
use tracing::info;

pub use routes::recording::{ApiCommand, StartRequest};

/// Shared state for every route.
#[derive(Clone)]
pub struct ApiState {
    pub tx: mpsc::Sender<ApiCommand>,
    pub status: SessionStatusHandle,
    pub history: HistoryLog,
    pub prefs: Arc<Mutex<Preferences>>,
    pub localizer: Localizer,
    /// Locale used when no preference is saved.
    pub default_locale: String,
    /// Session settings `POST /start` overrides.
    pub defaults: SessionConfig,
    pub output_dir: PathBuf,
}

impl ApiState {
    pub async fn locale(&self) -> String {
        let prefs = self.prefs.lock().await;
        prefs
            .locale()
            .map(str::to_string)
            .unwrap_or_else(|| self.default_locale.clone())
    }

    pub async fn dark_mode(&self) -> bool {
        self.prefs.lock().await.dark_mode()
    }
}

pub struct ApiServer {
    port: u16,
    state: ApiState,
}

impl ApiServer {
    pub fn new(port: u16, state: ApiState) -> Self {
        Self { port, state }
    }

    pub fn router(state: ApiState) -> Router {
        Router::new()
            .route("/", get(service_info))
            .merge(routes::recording::router(state.clone()))
            .merge(routes::history::router(state.clone()))
            .merge(routes::controls::router(state))
            .layer(ServiceBuilder::new())
    }

    pub async fn start(self) -> Result<()> {
        let app = Self::router(self.state);

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /           - Service info");
        info!("  GET  /status     - Session status");
        info!("  POST /start      - Start recording (optional JSON overrides)");
        info!("  POST /pause      - Pause recording");
        info!("  POST /resume     - Resume recording");
        info!("  POST /stop       - Stop recording and finalize");
        info!("  POST /shortcut   - Apply a key combination, e.g. {{\"combo\":\"Ctrl+R\"}}");
        info!("  GET  /history    - Capture and download history");
        info!("  POST /download   - Export the newest capture");
        info!("  GET  /controls   - Control enablement and shortcuts");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "aro-recorder",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
