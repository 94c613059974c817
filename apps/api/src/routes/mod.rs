pub mod health;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::state::AppState;
use crate::sync::executor::BulkReport;
use crate::{applications, candidates, emails, notify};

/// 200 when every item went through, 207 when any failed.
pub fn bulk_response(report: BulkReport) -> (StatusCode, Json<BulkReport>) {
    let status = if report.failed == 0 {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    (status, Json(report))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Candidates
        .route("/api/v1/candidates", get(candidates::handlers::handle_list))
        .route(
            "/api/v1/candidates/refresh",
            post(candidates::handlers::handle_refresh),
        )
        .route(
            "/api/v1/candidates/selection",
            get(candidates::handlers::handle_get_selection)
                .put(candidates::handlers::handle_update_selection)
                .delete(candidates::handlers::handle_clear_selection),
        )
        .route(
            "/api/v1/candidates/bulk/status",
            post(candidates::handlers::handle_bulk_status),
        )
        .route(
            "/api/v1/candidates/:id",
            axum::routing::delete(candidates::handlers::handle_delete),
        )
        .route(
            "/api/v1/candidates/:id/hire",
            post(candidates::handlers::handle_hire),
        )
        .route(
            "/api/v1/candidates/:id/reject",
            post(candidates::handlers::handle_reject),
        )
        .route(
            "/api/v1/candidates/:id/assign",
            post(candidates::handlers::handle_assign),
        )
        // Applications
        .route(
            "/api/v1/applications",
            get(applications::handlers::handle_list),
        )
        .route(
            "/api/v1/applications/refresh",
            post(applications::handlers::handle_refresh),
        )
        .route(
            "/api/v1/applications/selection",
            get(applications::handlers::handle_get_selection)
                .put(applications::handlers::handle_update_selection)
                .delete(applications::handlers::handle_clear_selection),
        )
        .route(
            "/api/v1/applications/bulk/status",
            post(applications::handlers::handle_bulk_status),
        )
        .route(
            "/api/v1/applications/:id/approve",
            post(applications::handlers::handle_approve),
        )
        .route(
            "/api/v1/applications/:id/reject",
            post(applications::handlers::handle_reject),
        )
        // Emails
        .route("/api/v1/emails", get(emails::handlers::handle_list))
        .route(
            "/api/v1/emails/threads",
            get(emails::handlers::handle_threads),
        )
        .route(
            "/api/v1/emails/:id/read",
            post(emails::handlers::handle_mark_read),
        )
        // Notifications
        .route(
            "/api/v1/notifications",
            get(notify::handlers::handle_list),
        )
        .route(
            "/api/v1/notifications/:id/dismiss",
            post(notify::handlers::handle_dismiss),
        )
        .with_state(state)
}
