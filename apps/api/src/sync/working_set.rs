use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace};

use crate::sync::{Change, Record, SyncError};

/// Where a snapshot came from. Snapshots are only ordered against earlier
/// ones from the same source, since each source stamps them with its own clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Listed by this service; `taken_at` is the local fetch start.
    Fetch,
    /// Pushed with the publisher's own timestamp.
    Publisher,
    /// Pushed without a timestamp; `taken_at` is the local receipt time.
    Receipt,
}

/// An authoritative copy of a whole collection.
#[derive(Debug, Clone)]
pub struct Snapshot<R> {
    pub source: Source,
    pub taken_at: DateTime<Utc>,
    pub records: Vec<R>,
}

impl<R> Snapshot<R> {
    pub fn fetched(taken_at: DateTime<Utc>, records: Vec<R>) -> Self {
        Self {
            source: Source::Fetch,
            taken_at,
            records,
        }
    }

    /// When the server was read, on this service's clock. Only a fetch knows
    /// that; a pushed snapshot may have been read before a write we since
    /// confirmed.
    fn local_read_at(&self) -> Option<DateTime<Utc>> {
        match self.source {
            Source::Fetch => Some(self.taken_at),
            Source::Publisher | Source::Receipt => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    InFlight,
    Confirmed { at: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingWrite {
    seq: u64,
    written_at: DateTime<Utc>,
    state: WriteState,
    deleted: bool,
}

impl PendingWrite {
    /// Whether the server copy supersedes this local write. `read_at` is the
    /// local time the snapshot was read, when known.
    fn yields_to(
        &self,
        server_updated_at: Option<DateTime<Utc>>,
        read_at: Option<DateTime<Utc>>,
    ) -> bool {
        match self.state {
            WriteState::InFlight => server_updated_at.is_some_and(|u| u > self.written_at),
            WriteState::Confirmed { at } => {
                read_at.is_some_and(|r| r >= at)
                    || server_updated_at.is_some_and(|u| u >= self.written_at)
            }
        }
    }
}

/// How a write ended after a later write on the same record took it over.
/// Consulted when that later write rolls back and hands the record back.
#[derive(Debug, Clone)]
enum Settlement<R> {
    Confirmed { at: DateTime<Utc> },
    Failed {
        record: R,
        previous: Option<PendingWrite>,
    },
}

#[derive(Debug, Clone)]
struct RollbackEntry<R> {
    index: usize,
    record: R,
    previous: Option<PendingWrite>,
}

/// Pre-mutation state captured by [`WorkingSet::apply`].
#[derive(Debug, Clone)]
pub struct Rollback<R> {
    seq: u64,
    entries: Vec<RollbackEntry<R>>,
}

impl<R: Record> Rollback<R> {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Reconciled {
    Applied { generation: u64, kept_local: usize },
    /// Older than a snapshot already applied from the same source.
    Discarded,
}

/// Ordered, client-held copy of a backend collection plus the bookkeeping
/// needed to roll back or reconcile local writes.
#[derive(Debug)]
pub struct WorkingSet<R: Record> {
    records: Vec<R>,
    pending: HashMap<String, PendingWrite>,
    settled: HashMap<(String, u64), Settlement<R>>,
    next_seq: u64,
    last_taken: HashMap<Source, DateTime<Utc>>,
    generation: u64,
}

impl<R: Record> Default for WorkingSet<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            pending: HashMap::new(),
            settled: HashMap::new(),
            next_seq: 1,
            last_taken: HashMap::new(),
            generation: 0,
        }
    }
}

impl<R: Record> WorkingSet<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    /// Applies a change optimistically to every id in `ids`.
    ///
    /// Fails without touching anything if `ids` is empty or any id is unknown.
    pub fn apply(
        &mut self,
        ids: &[String],
        change: &Change<R::Patch>,
        now: DateTime<Utc>,
    ) -> Result<Rollback<R>, SyncError> {
        if ids.is_empty() {
            return Err(SyncError::Precondition("No records selected".to_string()));
        }
        let mut targets = Vec::with_capacity(ids.len());
        for id in ids {
            let index = self
                .position(id)
                .ok_or_else(|| SyncError::Precondition(format!("Record {id} not found")))?;
            if !targets.contains(&index) {
                targets.push(index);
            }
        }
        targets.sort_unstable();

        let seq = self.next_seq;
        self.next_seq += 1;

        let entries: Vec<RollbackEntry<R>> = targets
            .iter()
            .map(|&index| {
                let record = self.records[index].clone();
                let previous = self.pending.get(record.id()).copied();
                RollbackEntry {
                    index,
                    record,
                    previous,
                }
            })
            .collect();

        let deleted = matches!(change, Change::Delete);
        match change {
            Change::Update(patch) => {
                for &index in &targets {
                    self.records[index].apply_patch(patch);
                }
            }
            Change::Delete => {
                for &index in targets.iter().rev() {
                    self.records.remove(index);
                }
            }
        }

        for entry in &entries {
            self.pending.insert(
                entry.record.id().to_string(),
                PendingWrite {
                    seq,
                    written_at: now,
                    state: WriteState::InFlight,
                    deleted,
                },
            );
        }

        trace!(seq, count = entries.len(), deleted, "optimistic write applied");
        Ok(Rollback { seq, entries })
    }

    /// Marks the writes in `ids` as accepted by the backend. Records returned by
    /// the backend replace the optimistic copies when no later local write has
    /// touched them.
    pub fn confirm(
        &mut self,
        rollback: &Rollback<R>,
        ids: &[String],
        confirmed: Vec<R>,
        now: DateTime<Utc>,
    ) {
        for id in ids {
            let Some(p) = self.pending.get_mut(id.as_str()) else {
                continue;
            };
            if p.seq == rollback.seq {
                p.state = WriteState::Confirmed { at: now };
                self.forget_settled(id);
            } else if p.seq > rollback.seq {
                self.settled
                    .insert((id.clone(), rollback.seq), Settlement::Confirmed { at: now });
            }
        }
        for record in confirmed {
            let owned = self
                .pending
                .get(record.id())
                .is_some_and(|p| p.seq == rollback.seq && !p.deleted);
            if !owned {
                continue;
            }
            if let Some(index) = self.position(record.id()) {
                self.records[index] = record;
            }
        }
    }

    /// Restores the pre-mutation records for `ids` (all targeted ids when
    /// `None`). A record that a later mutation has since written is left alone;
    /// the failure is remembered so that mutation's own rollback restores past
    /// it instead of resurrecting a refused value.
    pub fn rollback(&mut self, rollback: &Rollback<R>, ids: Option<&[String]>) -> usize {
        let mut restored = 0;
        for entry in &rollback.entries {
            let id = entry.record.id();
            if let Some(only) = ids {
                if !only.iter().any(|i| i == id) {
                    continue;
                }
            }
            let owner = self.pending.get(id).map(|p| p.seq);
            if owner != Some(rollback.seq) {
                debug!(id, seq = rollback.seq, "skipping rollback; superseded");
                if owner.is_some_and(|seq| seq > rollback.seq) {
                    self.settled.insert(
                        (id.to_string(), rollback.seq),
                        Settlement::Failed {
                            record: entry.record.clone(),
                            previous: entry.previous,
                        },
                    );
                }
                continue;
            }

            let (record, marker) = self.resolve(id, entry.record.clone(), entry.previous);
            match self.position(id) {
                Some(index) => self.records[index] = record,
                None => {
                    let index = entry.index.min(self.records.len());
                    self.records.insert(index, record);
                }
            }
            match marker {
                Some(previous) => {
                    self.pending.insert(id.to_string(), previous);
                }
                None => {
                    self.pending.remove(id);
                    self.forget_settled(id);
                }
            }
            restored += 1;
        }
        restored
    }

    /// Walks back through earlier writes that already ended while superseded.
    /// A failed one is unwound to its own pre-image; a confirmed one stays
    /// until a snapshot catches up with it.
    fn resolve(
        &mut self,
        id: &str,
        mut record: R,
        mut marker: Option<PendingWrite>,
    ) -> (R, Option<PendingWrite>) {
        while let Some(previous) = marker {
            match self.settled.remove(&(id.to_string(), previous.seq)) {
                None => break,
                Some(Settlement::Confirmed { at }) => {
                    marker = Some(PendingWrite {
                        state: WriteState::Confirmed { at },
                        ..previous
                    });
                    break;
                }
                Some(Settlement::Failed {
                    record: earlier,
                    previous: older,
                }) => {
                    record = earlier;
                    marker = older;
                }
            }
        }
        (record, marker)
    }

    fn forget_settled(&mut self, id: &str) {
        self.settled.retain(|(settled_id, _), _| settled_id != id);
    }

    /// Merges an authoritative snapshot into the working set.
    ///
    /// Records without a pending local write take the server copy. Records with
    /// one keep the local copy until the server has caught up with it.
    pub fn reconcile(&mut self, snapshot: Snapshot<R>) -> Reconciled {
        if let Some(&last) = self.last_taken.get(&snapshot.source) {
            if snapshot.taken_at < last {
                debug!(
                    collection = R::COLLECTION,
                    source = ?snapshot.source,
                    taken_at = %snapshot.taken_at,
                    last = %last,
                    "discarding stale snapshot"
                );
                return Reconciled::Discarded;
            }
        }

        let source = snapshot.source;
        let taken_at = snapshot.taken_at;
        let read_at = snapshot.local_read_at();
        let mut next = Vec::with_capacity(snapshot.records.len());
        let mut seen = HashSet::with_capacity(snapshot.records.len());
        let mut kept_local = 0;

        for server in snapshot.records {
            let id = server.id().to_string();
            if !seen.insert(id.clone()) {
                continue;
            }
            match self.pending.get(&id).copied() {
                None => next.push(server),
                Some(p) if p.yields_to(server.updated_at(), read_at) => {
                    self.pending.remove(&id);
                    next.push(server);
                }
                Some(p) => {
                    kept_local += 1;
                    if p.deleted {
                        continue;
                    }
                    match self.get(&id) {
                        Some(local) => next.push(local.clone()),
                        None => next.push(server),
                    }
                }
            }
        }

        // Pending records the snapshot no longer carries.
        let mut dropped = Vec::new();
        for local in &self.records {
            let id = local.id();
            if seen.contains(id) {
                continue;
            }
            if let Some(p) = self.pending.get(id) {
                if p.yields_to(None, read_at) {
                    dropped.push(id.to_string());
                } else {
                    kept_local += 1;
                    next.push(local.clone());
                }
            }
        }
        for id in dropped {
            self.pending.remove(&id);
        }
        // Confirmed deletions the server agrees with.
        self.pending.retain(|id, p| {
            !(p.deleted && !seen.contains(id.as_str()) && p.yields_to(None, read_at))
        });

        let pending = &self.pending;
        self.settled.retain(|(id, _), _| pending.contains_key(id));

        self.records = next;
        self.last_taken.insert(source, taken_at);
        self.generation += 1;

        debug!(
            collection = R::COLLECTION,
            generation = self.generation,
            records = self.records.len(),
            kept_local,
            "snapshot reconciled"
        );
        Reconciled::Applied {
            generation: self.generation,
            kept_local,
        }
    }
}
