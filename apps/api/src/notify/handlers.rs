use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::notify::Notification;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub include_dismissed: bool,
}

/// GET /api/v1/notifications
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> Json<Vec<Notification>> {
    Json(state.notifier.recent(params.include_dismissed))
}

/// POST /api/v1/notifications/:id/dismiss
pub async fn handle_dismiss(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.notifier.dismiss(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Notification {id} not found")))
    }
}
