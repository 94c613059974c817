use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service version plus sync bookkeeping for each collection.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let candidates = state.candidates.summary().await;
    let applications = state.applications.summary().await;
    let emails = state.emails.summary().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "hireflow",
        "collections": {
            "candidates": candidates,
            "applications": applications,
            "emails": emails,
        }
    }))
}
