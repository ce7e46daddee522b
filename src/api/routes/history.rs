//! History API routes.

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::history::{EntryKind, HistoryEntry};
use crate::i18n::{keys, Localizer};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/history", get(list_history))
        .route("/download", post(download_capture))
        .with_state(state)
}

/// Localized label for a history row.
pub fn entry_label(localizer: &Localizer, locale: &str, entry: &HistoryEntry) -> String {
    let key = match entry.kind {
        EntryKind::Capture => keys::CAPTURE_ENTRY,
        EntryKind::Download => keys::DOWNLOAD_ENTRY,
    };
    let time = entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
    localizer.render(key, locale, &[("time", time.as_str())])
}

fn rows(localizer: &Localizer, locale: &str, entries: &[HistoryEntry]) -> Vec<Value> {
    entries
        .iter()
        .map(|entry| {
            let mut row = json!(entry.view());
            row["label"] = json!(entry_label(localizer, locale, entry));
            row["link"] = json!(localizer.render(
                keys::DOWNLOAD_LINK,
                locale,
                &[("type", entry.artifact.format().extension())]
            ));
            row
        })
        .collect()
}

/// GET /history - Capture and download logs, newest first.
async fn list_history(State(state): State<ApiState>) -> Json<Value> {
    let locale = state.locale().await;
    let captures = state.history.captures().await;
    let downloads = state.history.downloads().await;

    Json(json!({
        "captures": rows(&state.localizer, &locale, &captures),
        "downloads": rows(&state.localizer, &locale, &downloads),
        "empty_text": state.localizer.lookup(keys::HISTORY_NONE, &locale),
    }))
}

/// Body of `POST /download`; without an id the newest capture is exported.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
}

/// POST /download - Export a capture and record the download.
async fn download_capture(
    State(state): State<ApiState>,
    body: Option<Json<DownloadRequest>>,
) -> ApiResult<Json<Value>> {
    let request = body.map(|Json(req)| req).unwrap_or_default();
    let entry = match request.id {
        Some(id) => state
            .history
            .find_capture(id)
            .await
            .ok_or_else(|| ApiError::not_found(format!("No capture with id {id}")))?,
        None => state
            .history
            .latest_capture()
            .await
            .ok_or_else(|| ApiError::not_found("No capture to download"))?,
    };

    let path = entry.artifact.save_to(&state.output_dir).await?;
    state
        .history
        .record_download(entry.artifact.clone(), Local::now())
        .await;
    info!("Exported {} to {:?}", entry.artifact.file_name(), path);

    Ok(Json(json!({
        "success": true,
        "path": path,
        "artifact": entry.artifact.summary(),
    })))
}
