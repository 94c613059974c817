use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::candidates::actions;
use crate::errors::AppError;
use crate::models::candidate::{Candidate, CandidateStatus};
use crate::routes::bulk_response;
use crate::state::AppState;
use crate::sync::collection::CollectionView;
use crate::sync::executor::{ActionReport, BulkReport};
use crate::sync::selection::SelectionUpdate;
use crate::sync::working_set::Reconciled;
use crate::view::{ViewParams, ViewQuery};

#[derive(Deserialize)]
pub struct RejectRequest {
    pub job_id: Option<String>,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub assignee_id: String,
    #[serde(default)]
    pub assignee_name: String,
}

#[derive(Deserialize)]
pub struct BulkStatusRequest {
    /// Defaults to the current selection.
    pub ids: Option<Vec<String>>,
    pub status: CandidateStatus,
}

#[derive(Serialize)]
pub struct SelectionResponse {
    pub ids: Vec<String>,
}

/// GET /api/v1/candidates
///
/// Serves the working set even when the background fetch fails; the cache
/// status in the response says so.
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Json<CollectionView<Candidate>>, AppError> {
    let query = ViewQuery::try_from(params).map_err(AppError::Validation)?;
    if let Err(e) = state
        .candidates
        .fetch_if_needed(state.backends.candidates.as_ref())
        .await
    {
        warn!("serving cached candidates: {e}");
    }
    Ok(Json(state.candidates.view(&query).await))
}

/// POST /api/v1/candidates/refresh
pub async fn handle_refresh(State(state): State<AppState>) -> Result<Json<Reconciled>, AppError> {
    let outcome = state
        .candidates
        .refresh(state.backends.candidates.as_ref())
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/candidates/:id/hire
pub async fn handle_hire(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionReport>, AppError> {
    Ok(Json(actions::hire(state.candidate_ctx(), &id).await?))
}

/// POST /api/v1/candidates/:id/reject
pub async fn handle_reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<ActionReport>, AppError> {
    let job_id = body.and_then(|Json(req)| req.job_id);
    let report = actions::reject(state.candidate_ctx(), &id, job_id.as_deref()).await?;
    Ok(Json(report))
}

/// POST /api/v1/candidates/:id/assign
pub async fn handle_assign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<ActionReport>, AppError> {
    let report = actions::assign(
        state.candidate_ctx(),
        &id,
        &req.assignee_id,
        &req.assignee_name,
    )
    .await?;
    Ok(Json(report))
}

/// DELETE /api/v1/candidates/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionReport>, AppError> {
    Ok(Json(actions::delete(state.candidate_ctx(), &id).await?))
}

/// GET /api/v1/candidates/selection
pub async fn handle_get_selection(State(state): State<AppState>) -> Json<SelectionResponse> {
    Json(SelectionResponse {
        ids: state.candidates.selection().await,
    })
}

/// PUT /api/v1/candidates/selection
pub async fn handle_update_selection(
    State(state): State<AppState>,
    Json(req): Json<SelectionUpdate>,
) -> Json<SelectionResponse> {
    let ids = state.candidates.update_selection(req.mode, req.ids).await;
    Json(SelectionResponse { ids })
}

/// DELETE /api/v1/candidates/selection
pub async fn handle_clear_selection(State(state): State<AppState>) -> StatusCode {
    state.candidates.clear_selection().await;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/candidates/bulk/status
pub async fn handle_bulk_status(
    State(state): State<AppState>,
    Json(req): Json<BulkStatusRequest>,
) -> Result<(StatusCode, Json<BulkReport>), AppError> {
    if req.status == CandidateStatus::Unknown {
        return Err(AppError::Validation("Unrecognised candidate status".into()));
    }
    let ids = match req.ids {
        Some(ids) => ids,
        None => state.candidates.live_selection().await,
    };
    let report = actions::bulk_status(state.candidate_ctx(), ids, req.status).await?;
    Ok(bulk_response(report))
}
