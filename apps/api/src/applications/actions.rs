use crate::models::application::{Application, ApplicationPatch, ApplicationStatus};
use crate::sync::executor::{Action, ActionReport, BulkReport, SyncContext};
use crate::sync::{Change, SyncError};

/// Moves one application to `target`, skipping it when it is already there.
async fn decide(
    ctx: SyncContext<'_, Application>,
    id: &str,
    target: ApplicationStatus,
    label: &str,
) -> Result<ActionReport, SyncError> {
    if id.trim().is_empty() {
        return Err(ctx.precondition("No application selected"));
    }
    let Some(application) = ctx.collection.get(id).await else {
        return Err(ctx.precondition(format!("Application {id} not found")));
    };
    if application.status == target {
        return Ok(ctx.skip(
            label,
            id,
            format!(
                "Application from {} is already {}",
                application.candidate_name,
                target.as_str()
            ),
        ));
    }
    ctx.run(Action {
        label: label.to_string(),
        ids: vec![id.to_string()],
        change: Change::Update(ApplicationPatch { status: target }),
        on_success: None,
    })
    .await
}

pub async fn approve(
    ctx: SyncContext<'_, Application>,
    id: &str,
) -> Result<ActionReport, SyncError> {
    decide(ctx, id, ApplicationStatus::Approved, "Approve application").await
}

pub async fn reject(
    ctx: SyncContext<'_, Application>,
    id: &str,
) -> Result<ActionReport, SyncError> {
    decide(ctx, id, ApplicationStatus::Rejected, "Reject application").await
}

pub async fn bulk_status(
    ctx: SyncContext<'_, Application>,
    ids: Vec<String>,
    status: ApplicationStatus,
) -> Result<BulkReport, SyncError> {
    let label = format!("Mark applications {}", status.as_str());
    ctx.run_bulk(&label, ids, ApplicationPatch { status }).await
}
