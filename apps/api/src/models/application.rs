use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::normalize;
use crate::sync::Record;
use crate::view::filter::Column;
use crate::view::{StatusBucket, Tabular};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Unknown => "unknown",
        }
    }
}

/// A candidate's application to one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    #[serde(default)]
    pub candidate_id: Option<String>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub candidate_name: String,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub status: ApplicationStatus,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub languages: Vec<String>,
    #[serde(default, deserialize_with = "normalize::deserialize_opt")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "normalize::deserialize_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationPatch {
    pub status: ApplicationStatus,
}

impl Record for Application {
    type Patch = ApplicationPatch;
    // No batched endpoint: bulk actions fan out one request per application.
    const COLLECTION: &'static str = "applications";

    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn apply_patch(&mut self, patch: &ApplicationPatch) {
        self.status = patch.status;
    }
}

impl Tabular for Application {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.candidate_name.as_str(),
            self.email.as_str(),
            self.status.as_str(),
        ];
        fields.extend(
            [&self.phone, &self.job_id, &self.job_title, &self.client_name]
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
            Column::Assignee => None,
            Column::JobId => self.job_id.as_deref(),
            Column::Client => self.client_name.as_deref(),
        }
    }

    fn display_name(&self) -> &str {
        &self.candidate_name
    }

    fn sort_date(&self) -> Option<DateTime<Utc>> {
        self.applied_at
    }

    fn status_label(&self) -> &str {
        self.status.as_str()
    }

    fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    fn status_bucket(&self) -> StatusBucket {
        match self.status {
            ApplicationStatus::Approved => StatusBucket::Approved,
            ApplicationStatus::Rejected => StatusBucket::Rejected,
            ApplicationStatus::Pending => StatusBucket::Pending,
            ApplicationStatus::Unknown => StatusBucket::Other,
        }
    }
}

#[cfg(test)]
pub(crate) fn application(id: &str, name: &str, status: ApplicationStatus) -> Application {
    Application {
        id: id.to_string(),
        candidate_id: None,
        candidate_name: name.to_string(),
        email: format!("{id}@example.com"),
        phone: None,
        job_id: Some("job-1".to_string()),
        job_title: Some("Data Engineer".to_string()),
        client_name: Some("Acme".to_string()),
        status,
        skills: Vec::new(),
        languages: Vec::new(),
        applied_at: None,
        updated_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_sparse_document() {
        let a: Application = serde_json::from_value(json!({"id": "a1", "status": null})).unwrap();
        assert_eq!(a.status, ApplicationStatus::Pending);
        assert!(a.candidate_name.is_empty());
        assert!(a.skills.is_empty());
    }

    #[test]
    fn test_buckets() {
        let a = application("a1", "Ada", ApplicationStatus::Approved);
        assert_eq!(a.status_bucket(), StatusBucket::Approved);
        assert_eq!(a.column_value(Column::Client), Some("Acme"));
        assert_eq!(a.column_value(Column::Assignee), None);
    }
}
