use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::normalize;
use crate::sync::Record;
use crate::view::filter::Column;
use crate::view::{StatusBucket, Tabular};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    #[default]
    New,
    Active,
    Pending,
    Approved,
    Hired,
    Rejected,
    Withdrawn,
    #[serde(other)]
    Unknown,
}

impl CandidateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::New => "new",
            CandidateStatus::Active => "active",
            CandidateStatus::Pending => "pending",
            CandidateStatus::Approved => "approved",
            CandidateStatus::Hired => "hired",
            CandidateStatus::Rejected => "rejected",
            CandidateStatus::Withdrawn => "withdrawn",
            CandidateStatus::Unknown => "unknown",
        }
    }

    /// Hire and reject are disabled once a candidate reaches one of these.
    pub fn is_terminal(self) -> bool {
        matches!(self, CandidateStatus::Hired | CandidateStatus::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub status: CandidateStatus,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub assignee_name: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub languages: Vec<String>,
    #[serde(default)]
    pub rejected_for_job_id: Option<String>,
    #[serde(default, deserialize_with = "normalize::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "normalize::deserialize_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields a candidate action may change. Unset fields are left alone, both
/// locally and on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CandidateStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_for_job_id: Option<String>,
}

impl Record for Candidate {
    type Patch = CandidatePatch;
    const COLLECTION: &'static str = "candidates";
    const BULK_PATH: Option<&'static str> = Some("candidates/bulk-status");

    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn apply_patch(&mut self, patch: &CandidatePatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(assigned_to) = &patch.assigned_to {
            self.assigned_to = Some(assigned_to.clone());
        }
        if let Some(name) = &patch.assignee_name {
            self.assignee_name = Some(name.clone());
        }
        if let Some(job_id) = &patch.rejected_for_job_id {
            self.rejected_for_job_id = Some(job_id.clone());
        }
    }
}

impl Tabular for Candidate {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.email.as_str(), self.status.as_str()];
        fields.extend(
            [
                &self.phone,
                &self.assignee_name,
                &self.job_id,
                &self.job_title,
                &self.client_name,
                &self.stage,
            ]
            .into_iter()
            .filter_map(|f| f.as_deref()),
        );
        fields.extend(self.skills.iter().map(String::as_str));
        fields.extend(self.languages.iter().map(String::as_str));
        fields
    }

    fn column_value(&self, column: Column) -> Option<&str> {
        match column {
            Column::Status => Some(self.status.as_str()),
            Column::Assignee => self.assigned_to.as_deref(),
            Column::JobId => self.job_id.as_deref(),
            Column::Client => self.client_name.as_deref(),
        }
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn sort_date(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn status_label(&self) -> &str {
        self.status.as_str()
    }

    fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    fn status_bucket(&self) -> StatusBucket {
        match self.status {
            CandidateStatus::Approved | CandidateStatus::Hired => StatusBucket::Approved,
            CandidateStatus::Rejected => StatusBucket::Rejected,
            CandidateStatus::New | CandidateStatus::Active | CandidateStatus::Pending => {
                StatusBucket::Pending
            }
            CandidateStatus::Withdrawn | CandidateStatus::Unknown => StatusBucket::Other,
        }
    }
}

#[cfg(test)]
pub(crate) fn candidate(id: &str, name: &str, status: CandidateStatus) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{id}@example.com"),
        phone: None,
        status,
        assigned_to: None,
        assignee_name: None,
        job_id: Some("job-1".to_string()),
        job_title: None,
        client_name: None,
        stage: None,
        skills: Vec::new(),
        languages: Vec::new(),
        rejected_for_job_id: None,
        created_at: None,
        updated_at: None,
    }
}
