use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::normalize;
use crate::sync::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Sent,
    #[default]
    #[serde(other)]
    Received,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: String,
    #[serde(default)]
    pub candidate_id: Option<String>,
    /// Absent for correspondence that is not tied to a particular job.
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub direction: Direction,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub from: String,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub subject: String,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub body: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub read: bool,
    #[serde(default, deserialize_with = "normalize::deserialize_opt")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "normalize::deserialize_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailPatch {
    pub read: bool,
}

impl Record for Email {
    type Patch = EmailPatch;
    const COLLECTION: &'static str = "emails";

    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn apply_patch(&mut self, patch: &EmailPatch) {
        self.read = patch.read;
    }
}

#[cfg(test)]
pub(crate) fn email(id: &str, candidate: &str, job: Option<&str>, direction: Direction) -> Email {
    Email {
        id: id.to_string(),
        candidate_id: Some(candidate.to_string()),
        job_id: job.map(str::to_string),
        direction,
        from: "recruiter@example.com".to_string(),
        to: vec!["candidate@example.com".to_string()],
        subject: "Interview".to_string(),
        body: String::new(),
        thread_id: None,
        read: false,
        sent_at: None,
        updated_at: None,
    }
}
