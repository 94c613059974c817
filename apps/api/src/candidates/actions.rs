use crate::models::candidate::{Candidate, CandidatePatch, CandidateStatus};
use crate::sync::events::SyncEvent;
use crate::sync::executor::{Action, ActionReport, BulkReport, SyncContext};
use crate::sync::{Change, SyncError};

async fn existing(ctx: SyncContext<'_, Candidate>, id: &str) -> Result<Candidate, SyncError> {
    if id.trim().is_empty() {
        return Err(ctx.precondition("No candidate selected"));
    }
    ctx.collection
        .get(id)
        .await
        .ok_or_else(|| ctx.precondition(format!("Candidate {id} not found")))
}

fn status_patch(status: CandidateStatus) -> CandidatePatch {
    CandidatePatch {
        status: Some(status),
        ..Default::default()
    }
}

pub async fn hire(ctx: SyncContext<'_, Candidate>, id: &str) -> Result<ActionReport, SyncError> {
    const LABEL: &str = "Hire candidate";
    let candidate = existing(ctx, id).await?;
    if candidate.status.is_terminal() {
        return Ok(ctx.skip(
            LABEL,
            id,
            format!("{} is already {}", candidate.name, candidate.status.as_str()),
        ));
    }
    ctx.run(Action {
        label: LABEL.to_string(),
        ids: vec![id.to_string()],
        change: Change::Update(status_patch(CandidateStatus::Hired)),
        on_success: None,
    })
    .await
}

/// Rejects a candidate for `job_id`, or for the job they are filed under
/// when none is given.
pub async fn reject(
    ctx: SyncContext<'_, Candidate>,
    id: &str,
    job_id: Option<&str>,
) -> Result<ActionReport, SyncError> {
    const LABEL: &str = "Reject candidate";
    let candidate = existing(ctx, id).await?;
    let job_id = job_id
        .filter(|j| !j.trim().is_empty())
        .map(str::to_string)
        .or_else(|| candidate.job_id.clone())
        .ok_or_else(|| ctx.precondition("A job is required to reject a candidate"))?;
    if candidate.status.is_terminal() {
        return Ok(ctx.skip(
            LABEL,
            id,
            format!("{} is already {}", candidate.name, candidate.status.as_str()),
        ));
    }
    ctx.run(Action {
        label: LABEL.to_string(),
        ids: vec![id.to_string()],
        change: Change::Update(CandidatePatch {
            status: Some(CandidateStatus::Rejected),
            rejected_for_job_id: Some(job_id),
            ..Default::default()
        }),
        on_success: None,
    })
    .await
}

pub async fn assign(
    ctx: SyncContext<'_, Candidate>,
    id: &str,
    assignee_id: &str,
    assignee_name: &str,
) -> Result<ActionReport, SyncError> {
    const LABEL: &str = "Assign candidate";
    let candidate = existing(ctx, id).await?;
    if assignee_id.trim().is_empty() {
        return Err(ctx.precondition("No assignee selected"));
    }
    if candidate.assigned_to.as_deref() == Some(assignee_id) {
        return Ok(ctx.skip(
            LABEL,
            id,
            format!("{} is already assigned to {assignee_name}", candidate.name),
        ));
    }
    ctx.run(Action {
        label: LABEL.to_string(),
        ids: vec![id.to_string()],
        change: Change::Update(CandidatePatch {
            assigned_to: Some(assignee_id.to_string()),
            assignee_name: Some(assignee_name.to_string()),
            ..Default::default()
        }),
        on_success: Some(SyncEvent::AssignmentChanged {
            candidate_ids: vec![id.to_string()],
        }),
    })
    .await
}

pub async fn delete(ctx: SyncContext<'_, Candidate>, id: &str) -> Result<ActionReport, SyncError> {
    existing(ctx, id).await?;
    ctx.run(Action {
        label: "Delete candidate".to_string(),
        ids: vec![id.to_string()],
        change: Change::Delete,
        on_success: None,
    })
    .await
}

pub async fn bulk_status(
    ctx: SyncContext<'_, Candidate>,
    ids: Vec<String>,
    status: CandidateStatus,
) -> Result<BulkReport, SyncError> {
    let label = format!("Set status to {}", status.as_str());
    ctx.run_bulk(&label, ids, status_patch(status)).await
}
