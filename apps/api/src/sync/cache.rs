//! Cache validity as an explicit state machine.
//!
//! ```text
//!            FetchStarted            FetchSucceeded
//!   Empty ───────────────▶ Fetching ───────────────▶ Fresh ◀──┐ LocalWrite
//!     ▲                      │  ▲                     │  ▲    │
//!     │          FetchFailed │  │ FetchStarted Expired│  └────┘
//!     │                      ▼  │                     ▼
//!     └──────────────────── Error                   Stale ──▶ Fresh (LocalWrite)
//! ```
//!
//! Expiry is evaluated lazily whenever the tracker is consulted, so the
//! tracker never needs its own timer task.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fetching { since: Instant },
    Fresh { at: Instant },
    Stale { at: Instant },
    Error { message: String },
}

impl CacheState {
    pub fn name(&self) -> &'static str {
        match self {
            CacheState::Empty => "empty",
            CacheState::Fetching { .. } => "fetching",
            CacheState::Fresh { .. } => "fresh",
            CacheState::Stale { .. } => "stale",
            CacheState::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    FetchStarted,
    FetchSucceeded,
    FetchFailed(String),
    LocalWrite,
    Expired,
}

/// Serializable summary returned alongside views.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub state: &'static str,
    pub age_ms: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CacheTracker {
    state: CacheState,
    duration: Duration,
}

impl CacheTracker {
    pub fn new(duration: Duration) -> Self {
        Self {
            state: CacheState::Empty,
            duration,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> &CacheState {
        &self.state
    }

    pub fn apply(&mut self, event: CacheEvent, now: Instant) {
        let next = match (&self.state, event) {
            (_, CacheEvent::FetchStarted) => CacheState::Fetching { since: now },
            (_, CacheEvent::FetchSucceeded) => CacheState::Fresh { at: now },
            (_, CacheEvent::FetchFailed(message)) => CacheState::Error { message },
            (CacheState::Fresh { .. } | CacheState::Stale { .. }, CacheEvent::LocalWrite) => {
                CacheState::Fresh { at: now }
            }
            (CacheState::Fresh { at }, CacheEvent::Expired) => CacheState::Stale { at: *at },
            (current, _) => current.clone(),
        };
        if next.name() != self.state.name() {
            debug!(from = self.state.name(), to = next.name(), "cache transition");
        }
        self.state = next;
    }

    /// Moves `Fresh` to `Stale` once the validity window has passed.
    pub fn expire_if_due(&mut self, now: Instant) {
        if let CacheState::Fresh { at } = self.state {
            if now.saturating_duration_since(at) >= self.duration {
                self.apply(CacheEvent::Expired, now);
            }
        }
    }

    /// True only for a fresh cache inside its window with a non-empty working set.
    pub fn is_valid(&self, now: Instant, non_empty: bool) -> bool {
        match self.state {
            CacheState::Fresh { at } => {
                non_empty && now.saturating_duration_since(at) < self.duration
            }
            _ => false,
        }
    }

    /// Whether a fetch should be issued now. A fetch already in flight counts
    /// as satisfying the request unless it has outlived the validity window,
    /// which happens when the task driving it was dropped.
    pub fn should_fetch(&mut self, now: Instant, non_empty: bool) -> bool {
        self.expire_if_due(now);
        match self.state {
            CacheState::Fetching { since } => now.saturating_duration_since(since) >= self.duration,
            CacheState::Fresh { .. } => !self.is_valid(now, non_empty),
            _ => true,
        }
    }

    pub fn status(&mut self, now: Instant) -> CacheStatus {
        self.expire_if_due(now);
        let (age_ms, error) = match &self.state {
            CacheState::Fresh { at } | CacheState::Stale { at } => (
                Some(now.saturating_duration_since(*at).as_millis() as u64),
                None,
            ),
            CacheState::Error { message } => (None, Some(message.clone())),
            _ => (None, None),
        };
        CacheStatus {
            state: self.state.name(),
            age_ms,
            error,
        }
    }
}
