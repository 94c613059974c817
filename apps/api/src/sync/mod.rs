//! Local working sets and the optimistic mutation protocol.
//!
//! A [`collection::Collection`] owns the client-held copy of one backend
//! collection. Mutations are applied to it immediately, sent to the backend,
//! and then either confirmed or rolled back. Authoritative snapshots arriving
//! from the poller or the push channel are merged per record rather than
//! overwriting in-flight local writes.

pub mod cache;
pub mod collection;
pub mod events;
pub mod executor;
pub mod selection;
pub mod working_set;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::backend::BackendError;

/// An entity the backend owns and the service caches.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Partial update sent to the backend and applied locally.
    type Patch: Clone + Serialize + Send + Sync + 'static;

    /// Backend collection path, e.g. `candidates`.
    const COLLECTION: &'static str;

    /// Batched status endpoint, if the backend exposes one for this collection.
    const BULK_PATH: Option<&'static str> = None;

    fn id(&self) -> &str;

    /// Server write time, when the backend reports one.
    fn updated_at(&self) -> Option<DateTime<Utc>>;

    fn apply_patch(&mut self, patch: &Self::Patch);
}

/// What a mutation does to each targeted record.
#[derive(Debug, Clone)]
pub enum Change<P> {
    Update(P),
    Delete,
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// Rejected before any local change or network call.
    #[error("{0}")]
    Precondition(String),

    #[error("{action} failed: {message}")]
    Backend { action: String, message: String },

    #[error("Fetch failed: {0}")]
    Fetch(#[from] BackendError),
}
