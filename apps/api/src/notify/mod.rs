//! Notification sink: the toast feed UI clients poll.
//!
//! Every notification is also written to the log. The feed is bounded; the
//! oldest entries fall off once capacity is reached.

pub mod handlers;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Success,
    Error,
    Info,
    Loading,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: Level,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub dismissed: bool,
}

#[derive(Clone)]
pub struct Notifier {
    feed: Arc<Mutex<VecDeque<Notification>>>,
    capacity: usize,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            feed: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    fn feed(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.feed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn notify(&self, level: Level, message: impl Into<String>) -> Uuid {
        let message = message.into();
        match level {
            Level::Error => error!(notification = %message),
            _ => info!(notification = %message, level = ?level),
        }
        let notification = Notification {
            id: Uuid::new_v4(),
            level,
            message,
            created_at: Utc::now(),
            dismissed: false,
        };
        let id = notification.id;
        let mut feed = self.feed();
        if feed.len() == self.capacity {
            feed.pop_front();
        }
        feed.push_back(notification);
        id
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.notify(Level::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.notify(Level::Error, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.notify(Level::Info, message)
    }

    /// Emits a loading notification that is dismissed when the guard is
    /// finished or dropped.
    pub fn loading(&self, message: impl Into<String>) -> Loading {
        Loading {
            id: self.notify(Level::Loading, message),
            notifier: self.clone(),
        }
    }

    /// Returns false when the id is unknown or has already fallen off the feed.
    pub fn dismiss(&self, id: Uuid) -> bool {
        match self.feed().iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.dismissed = true;
                true
            }
            None => false,
        }
    }

    /// Newest first. Dismissed entries are included only when asked for.
    pub fn recent(&self, include_dismissed: bool) -> Vec<Notification> {
        self.feed()
            .iter()
            .rev()
            .filter(|n| include_dismissed || !n.dismissed)
            .cloned()
            .collect()
    }
}

pub struct Loading {
    id: Uuid,
    notifier: Notifier,
}

impl Loading {
    pub fn finish(self) {}
}

impl Drop for Loading {
    fn drop(&mut self) {
        self.notifier.dismiss(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_is_newest_first_and_bounded() {
        let notifier = Notifier::new(2);
        notifier.info("one");
        notifier.success("two");
        notifier.error("three");
        let feed = notifier.recent(true);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].message, "three");
        assert_eq!(feed[0].level, Level::Error);
        assert_eq!(feed[1].message, "two");
    }

    #[test]
    fn test_loading_is_dismissed_on_finish() {
        let notifier = Notifier::new(10);
        let loading = notifier.loading("Saving...");
        assert_eq!(notifier.recent(false).len(), 1);
        loading.finish();
        assert!(notifier.recent(false).is_empty());
        assert!(notifier.recent(true)[0].dismissed);
    }

    #[test]
    fn test_dismiss_unknown_id() {
        let notifier = Notifier::new(10);
        assert!(!notifier.dismiss(Uuid::new_v4()));
    }
}
