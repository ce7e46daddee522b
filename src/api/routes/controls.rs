//! Control enablement and shortcut bindings.

use crate::api::ApiState;
use crate::controls::{bindings, Controls};
use crate::i18n::SUPPORTED_LOCALES;
use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/controls", get(list_controls))
        .with_state(state)
}

/// GET /controls - What the user can do right now.
async fn list_controls(State(state): State<ApiState>) -> Json<Value> {
    let status = state.status.get().await.status;
    let shortcuts: Vec<Value> = bindings()
        .into_iter()
        .map(|(combo, action)| json!({ "combo": combo, "action": action }))
        .collect();

    Json(json!({
        "status": status.as_str(),
        "controls": Controls::for_status(status),
        "shortcuts": shortcuts,
        "dark": state.dark_mode().await,
        "locale": state.locale().await,
        "locales": SUPPORTED_LOCALES,
    }))
}
