use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::RecordApi;
use crate::sync::cache::{CacheEvent, CacheStatus, CacheTracker};
use crate::sync::events::{EventBus, SyncEvent};
use crate::sync::selection::{SelectionMode, SelectionSet};
use crate::sync::working_set::{Reconciled, Rollback, Snapshot, WorkingSet};
use crate::sync::{Change, Record, SyncError};
use crate::view::{derive_view, Tabular, ViewPage, ViewQuery};

struct Inner<R: Record> {
    set: WorkingSet<R>,
    cache: CacheTracker,
    selection: SelectionSet,
}

/// A table view plus the sync metadata a client needs to render it.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionView<R> {
    #[serde(flatten)]
    pub page: ViewPage<R>,
    pub generation: u64,
    pub cache: CacheStatus,
    pub selected: Vec<String>,
}

/// Sync bookkeeping for one collection, as reported by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub records: usize,
    pub pending_writes: usize,
    pub selected: usize,
    pub generation: u64,
    pub cache: CacheStatus,
}

/// One backend collection as held by the service: working set, cache
/// tracker and selection behind a single lock. The lock is never held across
/// a network call.
pub struct Collection<R: Record> {
    inner: RwLock<Inner<R>>,
    events: EventBus,
}

impl<R: Record> Collection<R> {
    pub fn new(cache_duration: Duration, events: EventBus) -> Self {
        Self {
            inner: RwLock::new(Inner {
                set: WorkingSet::new(),
                cache: CacheTracker::new(cache_duration),
                selection: SelectionSet::default(),
            }),
            events,
        }
    }

    pub async fn get(&self, id: &str) -> Option<R> {
        self.inner.read().await.set.get(id).cloned()
    }

    pub async fn records(&self) -> Vec<R> {
        self.inner.read().await.set.records().to_vec()
    }

    pub async fn summary(&self) -> CollectionSummary {
        let mut inner = self.inner.write().await;
        let cache = inner.cache.status(Instant::now());
        CollectionSummary {
            records: inner.set.len(),
            pending_writes: inner.set.pending_count(),
            selected: inner.selection.len(),
            generation: inner.set.generation(),
            cache,
        }
    }

    /// Fetches the collection unless the cache is valid or a fetch is already
    /// in flight, in which case `None` is returned.
    pub async fn fetch_if_needed(
        &self,
        api: &dyn RecordApi<R>,
    ) -> Result<Option<Reconciled>, SyncError> {
        {
            let mut inner = self.inner.write().await;
            let non_empty = !inner.set.is_empty();
            if !inner.cache.should_fetch(Instant::now(), non_empty) {
                debug!(collection = R::COLLECTION, "cache hit; skipping fetch");
                return Ok(None);
            }
            inner.cache.apply(CacheEvent::FetchStarted, Instant::now());
        }
        self.fetch(api).await.map(Some)
    }

    /// Fetches unconditionally.
    pub async fn refresh(&self, api: &dyn RecordApi<R>) -> Result<Reconciled, SyncError> {
        self.inner
            .write()
            .await
            .cache
            .apply(CacheEvent::FetchStarted, Instant::now());
        self.fetch(api).await
    }

    async fn fetch(&self, api: &dyn RecordApi<R>) -> Result<Reconciled, SyncError> {
        let taken_at = Utc::now();
        match api.list().await {
            Ok(records) => {
                info!(
                    collection = R::COLLECTION,
                    count = records.len(),
                    "fetched collection"
                );
                Ok(self.reconcile(Snapshot::fetched(taken_at, records)).await)
            }
            Err(e) => {
                warn!(collection = R::COLLECTION, "fetch failed: {e}");
                self.inner
                    .write()
                    .await
                    .cache
                    .apply(CacheEvent::FetchFailed(e.to_string()), Instant::now());
                Err(SyncError::Fetch(e))
            }
        }
    }

    /// Merges an authoritative snapshot, from a fetch or the push channel.
    pub async fn reconcile(&self, snapshot: Snapshot<R>) -> Reconciled {
        let outcome = {
            let mut inner = self.inner.write().await;
            let outcome = inner.set.reconcile(snapshot);
            if matches!(outcome, Reconciled::Applied { .. }) {
                inner.cache.apply(CacheEvent::FetchSucceeded, Instant::now());
            }
            outcome
        };
        if let Reconciled::Applied { generation, .. } = outcome {
            self.events.publish(SyncEvent::Reconciled {
                collection: R::COLLECTION,
                generation,
            });
        }
        outcome
    }

    /// Optimistically applies `change` to `ids`.
    pub async fn begin(
        &self,
        ids: &[String],
        change: &Change<R::Patch>,
    ) -> Result<Rollback<R>, SyncError> {
        self.inner.write().await.set.apply(ids, change, Utc::now())
    }

    /// Records backend acceptance for `ids`. A fulfilled local write extends
    /// the cache window.
    pub async fn commit(&self, rollback: &Rollback<R>, ids: &[String], confirmed: Vec<R>) {
        let mut inner = self.inner.write().await;
        inner.set.confirm(rollback, ids, confirmed, Utc::now());
        inner.cache.apply(CacheEvent::LocalWrite, Instant::now());
    }

    pub async fn rollback(&self, rollback: &Rollback<R>, ids: Option<&[String]>) -> usize {
        self.inner.write().await.set.rollback(rollback, ids)
    }

    pub async fn selection(&self) -> Vec<String> {
        self.inner.read().await.selection.ids()
    }

    pub async fn update_selection(&self, mode: SelectionMode, ids: Vec<String>) -> Vec<String> {
        let mut inner = self.inner.write().await;
        inner.selection.update(mode, ids);
        inner.selection.ids()
    }

    pub async fn clear_selection(&self) {
        self.inner.write().await.selection.clear();
    }

    pub async fn deselect(&self, ids: &[String]) {
        self.inner.write().await.selection.remove_all(ids);
    }

    /// Selected ids that still exist in the working set.
    pub async fn live_selection(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .selection
            .ids()
            .into_iter()
            .filter(|id| inner.set.contains(id))
            .collect()
    }
}

impl<R: Record + Tabular> Collection<R> {
    pub async fn view(&self, query: &ViewQuery) -> CollectionView<R> {
        let mut inner = self.inner.write().await;
        let cache = inner.cache.status(Instant::now());
        CollectionView {
            page: derive_view(inner.set.records(), query),
            generation: inner.set.generation(),
            cache,
            selected: inner.selection.ids(),
        }
    }
}
