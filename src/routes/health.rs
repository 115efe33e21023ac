use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{db::DocumentStore, AppState};

pub async fn health_check<S: DocumentStore>(
    State(state): State<AppState<S>>,
) -> (StatusCode, Json<Value>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": "connected" })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "db": e.to_string() })),
        ),
    }
}
