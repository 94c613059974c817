//! Candidate correspondence: scoping, tabs and the read marker.
//!
//! The email view is derived from the collection on every request and never
//! writes back into it.

pub mod handlers;
pub mod thread;

use serde::{Deserialize, Serialize};

use crate::models::email::{Direction, Email, EmailPatch};
use crate::sync::executor::{Action, ActionReport, SyncContext};
use crate::sync::{Change, SyncError};
use self::thread::{split_reply, ParsedBody};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    All,
    Sent,
    Received,
}

impl Tab {
    pub fn admits(self, email: &Email) -> bool {
        match self {
            Tab::All => true,
            Tab::Sent => email.direction == Direction::Sent,
            Tab::Received => email.direction == Direction::Received,
        }
    }
}

/// Which candidate (and optionally which job) a mailbox view is about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scope {
    pub candidate_id: String,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub tab: Tab,
}

impl Scope {
    /// With a job selected, mail filed under another job is hidden, but mail
    /// not tied to any job still shows.
    pub fn contains(&self, email: &Email) -> bool {
        if email.candidate_id.as_deref() != Some(self.candidate_id.as_str()) {
            return false;
        }
        match (self.job_id.as_deref(), email.job_id.as_deref()) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    #[serde(flatten)]
    pub email: Email,
    #[serde(flatten)]
    pub parsed: ParsedBody,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TabCounts {
    pub all: usize,
    pub sent: usize,
    pub received: usize,
    pub unread: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Mailbox {
    pub tab: Tab,
    pub counts: TabCounts,
    pub messages: Vec<EmailMessage>,
}

/// Builds the mailbox for `scope`, newest message first. Counts cover the
/// whole scope regardless of the active tab.
pub fn mailbox(emails: &[Email], scope: &Scope) -> Mailbox {
    let scoped: Vec<&Email> = emails.iter().filter(|e| scope.contains(e)).collect();

    let counts = TabCounts {
        all: scoped.len(),
        sent: scoped.iter().filter(|e| Tab::Sent.admits(e)).count(),
        received: scoped.iter().filter(|e| Tab::Received.admits(e)).count(),
        unread: scoped.iter().filter(|e| !e.read).count(),
    };

    let mut messages: Vec<EmailMessage> = scoped
        .into_iter()
        .filter(|e| scope.tab.admits(e))
        .map(|e| EmailMessage {
            parsed: split_reply(&e.body),
            email: e.clone(),
        })
        .collect();
    messages.sort_by(|a, b| b.email.sent_at.cmp(&a.email.sent_at));

    Mailbox {
        tab: scope.tab,
        counts,
        messages,
    }
}

pub async fn mark_read(ctx: SyncContext<'_, Email>, id: &str) -> Result<ActionReport, SyncError> {
    const LABEL: &str = "Mark email read";
    if id.trim().is_empty() {
        return Err(ctx.precondition("No email selected"));
    }
    let Some(email) = ctx.collection.get(id).await else {
        return Err(ctx.precondition(format!("Email {id} not found")));
    };
    if email.read {
        return Ok(ctx.skip(LABEL, id, "Email is already marked read"));
    }
    ctx.run(Action {
        label: LABEL.to_string(),
        ids: vec![id.to_string()],
        change: Change::Update(EmailPatch { read: true }),
        on_success: None,
    })
    .await
}
