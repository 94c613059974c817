use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::warn;

use crate::emails::thread::{group_threads, Thread};
use crate::emails::{mailbox, mark_read, Mailbox, Scope};
use crate::errors::AppError;
use crate::state::AppState;
use crate::sync::executor::ActionReport;

async fn refresh_if_needed(state: &AppState) {
    if let Err(e) = state
        .emails
        .fetch_if_needed(state.backends.emails.as_ref())
        .await
    {
        warn!("serving cached emails: {e}");
    }
}

fn validate(scope: &Scope) -> Result<(), AppError> {
    if scope.candidate_id.trim().is_empty() {
        return Err(AppError::Validation("candidate_id is required".into()));
    }
    Ok(())
}

/// GET /api/v1/emails
pub async fn handle_list(
    State(state): State<AppState>,
    Query(scope): Query<Scope>,
) -> Result<Json<Mailbox>, AppError> {
    validate(&scope)?;
    refresh_if_needed(&state).await;
    let emails = state.emails.records().await;
    Ok(Json(mailbox(&emails, &scope)))
}

/// GET /api/v1/emails/threads
pub async fn handle_threads(
    State(state): State<AppState>,
    Query(scope): Query<Scope>,
) -> Result<Json<Vec<Thread>>, AppError> {
    validate(&scope)?;
    refresh_if_needed(&state).await;
    let emails = state.emails.records().await;
    let threads = group_threads(
        emails
            .iter()
            .filter(|e| scope.contains(e) && scope.tab.admits(e)),
    );
    Ok(Json(threads))
}

/// POST /api/v1/emails/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ActionReport>, AppError> {
    Ok(Json(mark_read(state.email_ctx(), &id).await?))
}
