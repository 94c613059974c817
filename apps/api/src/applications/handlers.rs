use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::applications::actions;
use crate::errors::AppError;
use crate::models::application::{Application, ApplicationStatus};
use crate::routes::bulk_response;
use crate::state::AppState;
use crate::sync::collection::CollectionView;
use crate::sync::executor::{ActionReport, BulkReport};
use crate::sync::selection::SelectionUpdate;
use crate::sync::working_set::Reconciled;
use crate::view::{ViewParams, ViewQuery};

#[derive(Deserialize)]
pub struct BulkStatusRequest {
    pub ids: Option<Vec<String>>,
    pub status: ApplicationStatus,
}

#[derive(Serialize)]
pub struct SelectionResponse {
    pub ids: Vec<String>,
}

/// GET /api/v1/applications
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<CollectionView<Application>>, AppError> {
    let query = ViewQuery::try_from(params).map_err(AppError::Validation)?;
    if let Err(e) = state
        .applications
        .fetch_if_needed(state.backends.applications.as_ref())
        .await
    {
        warn!("serving cached applications: {e}");
    }
    Ok(Json(state.applications.view(&query).await))
}

/// POST /api/v1/applications/refresh
pub async fn handle_refresh(State(state): State<AppState>) -> Result<Json<Reconciled>, AppError> {
    let outcome = state
        .applications
        .refresh(state.backends.applications.as_ref())
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/applications/:id/approve
pub async fn handle_approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionReport>, AppError> {
    Ok(Json(actions::approve(state.application_ctx(), &id).await?))
}

/// POST /api/v1/applications/:id/reject
pub async fn handle_reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionReport>, AppError> {
    Ok(Json(actions::reject(state.application_ctx(), &id).await?))
}

/// GET /api/v1/applications/selection
pub async fn handle_get_selection(State(state): State<AppState>) -> Json<SelectionResponse> {
    Json(SelectionResponse {
        ids: state.applications.selection().await,
    })
}

/// PUT /api/v1/applications/selection
pub async fn handle_update_selection(
    State(state): State<AppState>,
    Json(req): Json<SelectionUpdate>,
) -> Json<SelectionResponse> {
    let ids = state.applications.update_selection(req.mode, req.ids).await;
    Json(SelectionResponse { ids })
}

/// DELETE /api/v1/applications/selection
pub async fn handle_clear_selection(State(state): State<AppState>) -> StatusCode {
    state.applications.clear_selection().await;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/applications/bulk/status
pub async fn handle_bulk_status(
    State(state): State<AppState>,
    Json(req): Json<BulkStatusRequest>,
) -> Result<(StatusCode, Json<BulkReport>), AppError> {
    if req.status == ApplicationStatus::Unknown {
        return Err(AppError::Validation("Unrecognised application status".into()));
    }
    let ids = match req.ids {
        Some(ids) => ids,
        None => state.applications.live_selection().await,
    };
    let report = actions::bulk_status(state.application_ctx(), ids, req.status).await?;
    Ok(bulk_response(report))
}
