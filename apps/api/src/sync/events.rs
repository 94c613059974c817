//! Typed, in-process event bus.
//!
//! Publishers send a [`SyncEvent`]; subscribers hold a [`Subscription`] and are
//! unregistered when it is dropped.

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Candidate assignees changed; views showing assignee names must re-derive.
    AssignmentChanged { candidate_ids: Vec<String> },
    /// A snapshot was merged into a collection.
    Reconciled {
        collection: &'static str,
        generation: u64,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fire-and-forget. Returns the number of subscribers that will see the event.
    pub fn publish(&self, event: SyncEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(e) => {
                trace!(event = ?e.0, "no subscribers for sync event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<SyncEvent>,
}

impl Subscription {
    /// Next event, or `None` once every publisher is gone. A subscriber that
    /// falls behind skips the overwritten events.
    pub async fn recv(&mut self) -> Option<SyncEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
