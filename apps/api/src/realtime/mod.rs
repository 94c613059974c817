//! Background sources of authoritative snapshots.

pub mod push;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::backend::RecordApi;
use crate::models::candidate::Candidate;
use crate::sync::collection::Collection;
use crate::sync::events::{EventBus, SyncEvent};
use crate::sync::Record;

/// Re-fetches `collection` every `every` whenever its cache has lapsed. The
/// first tick fires immediately, which primes the working set at startup.
pub fn spawn_poller<R: Record>(
    collection: Arc<Collection<R>>,
    api: Arc<dyn RecordApi<R>>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(collection = R::COLLECTION, every_secs = every.as_secs(), "poller started");
        loop {
            ticker.tick().await;
            match collection.fetch_if_needed(api.as_ref()).await {
                Ok(Some(outcome)) => debug!(collection = R::COLLECTION, ?outcome, "poll applied"),
                Ok(None) => {}
                Err(e) => warn!(collection = R::COLLECTION, "poll failed: {e}"),
            }
        }
    })
}

/// Refetches candidates after an assignment change so assignee names shown
/// elsewhere come from the backend's view of the team.
pub fn spawn_assignment_listener(
    events: &EventBus,
    candidates: Arc<Collection<Candidate>>,
    api: Arc<dyn RecordApi<Candidate>>,
) -> JoinHandle<()> {
    let mut subscription = events.subscribe();
    debug!(
        subscribers = events.subscriber_count(),
        "assignment listener subscribed"
    );
    tokio::spawn(async move {
        while let Some(event) = subscription.recv().await {
            if let SyncEvent::AssignmentChanged { candidate_ids } = event {
                debug!(?candidate_ids, "assignment changed; refreshing candidates");
                if let Err(e) = candidates.refresh(api.as_ref()).await {
                    warn!("candidate refresh after assignment failed: {e}");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::FakeApi;
    use crate::models::candidate::{candidate, CandidateStatus};
    use crate::sync::testing::{item, Item};

    #[tokio::test(start_paused = true)]
    async fn test_poller_primes_then_respects_cache() {
        let fake = Arc::new(FakeApi::new(vec![item("a", "pending")]));
        let api: Arc<dyn RecordApi<Item>> = fake.clone();
        let collection = Arc::new(Collection::new(
            Duration::from_secs(30),
            EventBus::default(),
        ));
        let handle = spawn_poller(collection.clone(), api, Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fake.list_calls(), 1);
        assert_eq!(collection.records().await.len(), 1);

        // Two more ticks land inside the cache window.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fake.list_calls(), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fake.list_calls(), 2);
        handle.abort();
    }

    #[tokio::test]
    async fn test_assignment_change_triggers_refresh() {
        let events = EventBus::default();
        let fake = Arc::new(FakeApi::new(vec![candidate(
            "c1",
            "Ada",
            CandidateStatus::Active,
        )]));
        let api: Arc<dyn RecordApi<Candidate>> = fake.clone();
        let candidates = Arc::new(Collection::new(Duration::from_secs(30), events.clone()));
        let handle = spawn_assignment_listener(&events, candidates.clone(), api);

        events.publish(SyncEvent::Reconciled {
            collection: "emails",
            generation: 3,
        });
        events.publish(SyncEvent::AssignmentChanged {
            candidate_ids: vec!["c1".to_string()],
        });

        for _ in 0..100 {
            if fake.list_calls() > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(fake.list_calls(), 1);
        handle.abort();
    }
}
