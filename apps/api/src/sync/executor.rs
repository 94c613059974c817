//! Optimistic mutation executor.
//!
//! Each action runs the same cycle: apply locally, call the backend, then
//! commit or roll back. Failures never escape as errors past this point
//! except as [`SyncError`] values the handlers turn into responses; the user
//! sees them through the notification feed.

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::RecordApi;
use crate::notify::Notifier;
use crate::sync::collection::Collection;
use crate::sync::events::{EventBus, SyncEvent};
use crate::sync::{Change, Record, SyncError};

/// Everything an action needs, borrowed from `AppState`.
pub struct SyncContext<'a, R: Record> {
    pub collection: &'a Collection<R>,
    pub api: &'a dyn RecordApi<R>,
    pub notifier: &'a Notifier,
    pub events: &'a EventBus,
}

impl<'a, R: Record> Clone for SyncContext<'a, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, R: Record> Copy for SyncContext<'a, R> {}

/// A user-initiated change to one or more records.
pub struct Action<R: Record> {
    /// Shown in notifications, e.g. "Hire candidate".
    pub label: String,
    pub ids: Vec<String>,
    pub change: Change<R::Patch>,
    /// Published after the backend accepts the change.
    pub on_success: Option<SyncEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Committed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub action: String,
    pub ids: Vec<String>,
    pub outcome: Outcome,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Succeeded,
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub id: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub action: String,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<ItemResult>,
}

impl BulkReport {
    pub fn failed_ids(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Failed { .. }))
            .map(|r| r.id.clone())
            .collect()
    }
}

impl<'a, R: Record> SyncContext<'a, R> {
    /// Reports a failed precondition. Nothing is applied or sent.
    pub fn precondition(&self, message: impl Into<String>) -> SyncError {
        let message = message.into();
        self.notifier.error(message.clone());
        SyncError::Precondition(message)
    }

    /// Reports an action that is already in its target state.
    pub fn skip(&self, label: &str, id: &str, reason: impl Into<String>) -> ActionReport {
        let message = reason.into();
        self.notifier.info(message.clone());
        ActionReport {
            action: label.to_string(),
            ids: vec![id.to_string()],
            outcome: Outcome::Skipped,
            message,
        }
    }

    /// Runs one action through apply → call → commit/rollback. Every targeted
    /// record is sent in its own request; any failure rolls back the whole
    /// action.
    pub async fn run(&self, action: Action<R>) -> Result<ActionReport, SyncError> {
        let Action {
            label,
            ids,
            change,
            on_success,
        } = action;

        let rollback = match self.collection.begin(&ids, &change).await {
            Ok(rollback) => rollback,
            Err(SyncError::Precondition(message)) => return Err(self.precondition(message)),
            Err(e) => return Err(e),
        };
        let loading = self.notifier.loading(format!("{label}..."));

        let mut confirmed = Vec::new();
        let mut failure = None;
        for id in &ids {
            let result = match &change {
                Change::Update(patch) => self.api.update(id, patch).await,
                Change::Delete => self.api.delete(id).await.map(|_| None),
            };
            match result {
                Ok(record) => confirmed.extend(record),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        loading.finish();

        match failure {
            None => {
                self.collection.commit(&rollback, &ids, confirmed).await;
                let message = format!("{label} succeeded");
                self.notifier.success(message.clone());
                info!(seq = rollback.seq(), action = %label, "mutation committed");
                if let Some(event) = on_success {
                    self.events.publish(event);
                }
                Ok(ActionReport {
                    action: label,
                    ids,
                    outcome: Outcome::Committed,
                    message,
                })
            }
            Some(e) => {
                let restored = self.collection.rollback(&rollback, None).await;
                warn!(
                    seq = rollback.seq(),
                    action = %label,
                    restored,
                    "mutation rolled back: {e}"
                );
                let message = e.user_message();
                self.notifier.error(format!("{label} failed: {message}"));
                Err(SyncError::Backend {
                    action: label,
                    message,
                })
            }
        }
    }

    /// Runs a status change across many records. Uses the batched endpoint
    /// when there is one, otherwise one concurrent request per record, and
    /// rolls back only the records whose request failed. Succeeded ids leave
    /// the selection; failed ids stay selected for a retry.
    pub async fn run_bulk(
        &self,
        label: &str,
        ids: Vec<String>,
        patch: R::Patch,
    ) -> Result<BulkReport, SyncError> {
        if ids.is_empty() {
            return Err(self.precondition("Select at least one record first"));
        }
        let change = Change::Update(patch.clone());
        let rollback = match self.collection.begin(&ids, &change).await {
            Ok(rollback) => rollback,
            Err(SyncError::Precondition(message)) => return Err(self.precondition(message)),
            Err(e) => return Err(e),
        };
        let loading = self
            .notifier
            .loading(format!("{label} ({} records)...", ids.len()));

        let mut confirmed = Vec::new();
        let results: Vec<ItemResult> = if self.api.supports_bulk() {
            match self.api.bulk_update(&ids, &patch).await {
                Ok(records) => {
                    confirmed = records;
                    ids.iter()
                        .map(|id| ItemResult {
                            id: id.clone(),
                            outcome: ItemOutcome::Succeeded,
                        })
                        .collect()
                }
                Err(e) => {
                    let message = e.user_message();
                    ids.iter()
                        .map(|id| ItemResult {
                            id: id.clone(),
                            outcome: ItemOutcome::Failed {
                                message: message.clone(),
                            },
                        })
                        .collect()
                }
            }
        } else {
            let calls = ids.iter().map(|id| self.api.update(id, &patch));
            join_all(calls)
                .await
                .into_iter()
                .zip(&ids)
                .map(|(result, id)| match result {
                    Ok(record) => {
                        confirmed.extend(record);
                        ItemResult {
                            id: id.clone(),
                            outcome: ItemOutcome::Succeeded,
                        }
                    }
                    Err(e) => ItemResult {
                        id: id.clone(),
                        outcome: ItemOutcome::Failed {
                            message: e.user_message(),
                        },
                    },
                })
                .collect()
        };
        loading.finish();

        let succeeded: Vec<String> = results
            .iter()
            .filter(|r| r.outcome == ItemOutcome::Succeeded)
            .map(|r| r.id.clone())
            .collect();
        let report = BulkReport {
            action: label.to_string(),
            succeeded: succeeded.len(),
            failed: results.len() - succeeded.len(),
            results,
        };
        let failed = report.failed_ids();

        if !succeeded.is_empty() {
            self.collection.commit(&rollback, &succeeded, confirmed).await;
            self.collection.deselect(&succeeded).await;
        }
        if !failed.is_empty() {
            self.collection.rollback(&rollback, Some(&failed)).await;
        }

        match (report.succeeded, report.failed) {
            (n, 0) => {
                self.notifier.success(format!("{label}: {n} updated"));
            }
            (0, _) => {
                let message = report
                    .results
                    .iter()
                    .find_map(|r| match &r.outcome {
                        ItemOutcome::Failed { message } => Some(message.clone()),
                        ItemOutcome::Succeeded => None,
                    })
                    .unwrap_or_default();
                self.notifier.error(format!("{label} failed: {message}"));
            }
            (_, n) => {
                self.notifier.error(format!(
                    "{label}: {n} of {} failed ({})",
                    report.results.len(),
                    failed.join(", ")
                ));
            }
        }
        info!(
            seq = rollback.seq(),
            action = %label,
            succeeded = report.succeeded,
            failed = report.failed,
            "bulk mutation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::backend::testing::FakeApi;
    use crate::notify::Level;
    use crate::sync::testing::{ids, item, patch, Item};
    use crate::sync::working_set::Snapshot;

    struct Harness {
        collection: Collection<Item>,
        api: FakeApi<Item>,
        notifier: Notifier,
        events: EventBus,
    }

    impl Harness {
        async fn new(api: FakeApi<Item>) -> Self {
            let events = EventBus::default();
            let collection = Collection::new(Duration::from_secs(30), events.clone());
            collection
                .reconcile(Snapshot::fetched(
                    Utc::now(),
                    vec![
                        item("a", "pending"),
                        item("b", "pending"),
                        item("c", "approved"),
                    ],
                ))
                .await;
            Self {
                collection,
                api,
                notifier: Notifier::new(50),
                events,
            }
        }

        fn ctx(&self) -> SyncContext<'_, Item> {
            SyncContext {
                collection: &self.collection,
                api: &self.api,
                notifier: &self.notifier,
                events: &self.events,
            }
        }

        fn levels(&self) -> Vec<Level> {
            self.notifier
                .recent(false)
                .into_iter()
                .map(|n| n.level)
                .collect()
        }
    }

    fn reject(targets: &[&str]) -> Action<Item> {
        Action {
            label: "Reject".to_string(),
            ids: ids(targets),
            change: Change::Update(patch("rejected")),
            on_success: None,
        }
    }

    #[tokio::test]
    async fn test_success_keeps_optimistic_state() {
        let h = Harness::new(FakeApi::new(vec![])).await;
        let report = h.ctx().run(reject(&["a"])).await.unwrap();
        assert_eq!(report.outcome, Outcome::Committed);
        assert_eq!(h.collection.get("a").await.unwrap().status, "rejected");
        assert_eq!(h.levels(), vec![Level::Success]);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_and_names_action() {
        let api = FakeApi::new(vec![]);
        api.fail_ids(&["a"]);
        let h = Harness::new(api).await;
        let before = h.collection.records().await;

        let err = h.ctx().run(reject(&["a"])).await.unwrap_err();
        assert!(matches!(err, SyncError::Backend { .. }));
        assert_eq!(h.collection.records().await, before);

        let feed = h.notifier.recent(false);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].message, "Reject failed: cannot update a");
    }

    #[tokio::test]
    async fn test_precondition_sends_nothing() {
        let h = Harness::new(FakeApi::new(vec![])).await;
        let err = h.ctx().run(reject(&["missing"])).await.unwrap_err();
        assert!(matches!(err, SyncError::Precondition(_)));
        assert!(h.api.updated.lock().unwrap().is_empty());
        assert_eq!(h.levels(), vec![Level::Error]);
    }

    #[tokio::test]
    async fn test_success_publishes_event() {
        let h = Harness::new(FakeApi::new(vec![])).await;
        let mut sub = h.events.subscribe();
        let mut action = reject(&["a"]);
        action.on_success = Some(SyncEvent::AssignmentChanged {
            candidate_ids: ids(&["a"]),
        });
        h.ctx().run(action).await.unwrap();
        assert_eq!(
            sub.recv().await,
            Some(SyncEvent::AssignmentChanged {
                candidate_ids: ids(&["a"])
            })
        );
    }

    #[tokio::test]
    async fn test_delete_failure_restores_record() {
        let api = FakeApi::new(vec![]);
        api.fail_everything();
        let h = Harness::new(api).await;
        let before = h.collection.records().await;
        let action = Action {
            label: "Delete".to_string(),
            ids: ids(&["b"]),
            change: Change::Delete,
            on_success: None,
        };
        assert!(h.ctx().run(action).await.is_err());
        assert_eq!(h.collection.records().await, before);
    }

    #[tokio::test]
    async fn test_batched_failure_reverts_everything_with_one_error() {
        let api = FakeApi::new(vec![]).with_bulk();
        api.fail_everything();
        let h = Harness::new(api).await;
        h.collection
            .update_selection(crate::sync::selection::SelectionMode::Set, ids(&["a", "b"]))
            .await;
        let before = h.collection.records().await;

        let report = h
            .ctx()
            .run_bulk("Bulk reject", ids(&["a", "b"]), patch("rejected"))
            .await
            .unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(h.collection.records().await, before);
        assert_eq!(h.levels(), vec![Level::Error]);
        assert_eq!(h.collection.selection().await, ids(&["a", "b"]));
    }

    #[tokio::test]
    async fn test_per_item_bulk_rolls_back_only_failures() {
        let api = FakeApi::new(vec![]);
        api.fail_ids(&["b"]);
        let h = Harness::new(api).await;
        h.collection
            .update_selection(crate::sync::selection::SelectionMode::Set, ids(&["a", "b"]))
            .await;

        let report = h
            .ctx()
            .run_bulk("Bulk approve", ids(&["a", "b"]), patch("approved"))
            .await
            .unwrap();
        assert_eq!((report.succeeded, report.failed), (1, 1));
        assert_eq!(report.failed_ids(), ids(&["b"]));
        assert_eq!(h.collection.get("a").await.unwrap().status, "approved");
        assert_eq!(h.collection.get("b").await.unwrap().status, "pending");
        assert_eq!(h.collection.selection().await, ids(&["b"]));
        assert_eq!(h.api.bulk_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batched_success_clears_selection() {
        let h = Harness::new(FakeApi::new(vec![]).with_bulk()).await;
        h.collection
            .update_selection(crate::sync::selection::SelectionMode::Set, ids(&["a", "b"]))
            .await;
        let report = h
            .ctx()
            .run_bulk("Bulk reject", ids(&["a", "b"]), patch("rejected"))
            .await
            .unwrap();
        assert_eq!(report.succeeded, 2);
        assert!(h.collection.selection().await.is_empty());
        assert_eq!(h.api.bulk_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_bulk_is_precondition() {
        let h = Harness::new(FakeApi::new(vec![])).await;
        let err = h
            .ctx()
            .run_bulk("Bulk reject", vec![], patch("rejected"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Precondition(_)));
    }
}
