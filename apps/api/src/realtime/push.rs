//! Redis pub/sub feed of authoritative snapshots.
//!
//! Each collection has its own channel, `<prefix>:<collection>`. A message is
//! either `{"taken_at": ts, "records": [...]}` or a bare array of records.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::application::Application;
use crate::models::candidate::Candidate;
use crate::models::email::Email;
use crate::models::normalize;
use crate::sync::collection::Collection;
use crate::sync::working_set::{Reconciled, Snapshot, Source};
use crate::sync::Record;

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<R> {
    Bare(Vec<R>),
    Envelope {
        #[serde(default, deserialize_with = "normalize::deserialize_opt")]
        taken_at: Option<DateTime<Utc>>,
        records: Vec<R>,
    },
}

/// Parses a pushed message. A publisher timestamp is only ever compared with
/// earlier publisher timestamps; without one the snapshot is dated at receipt.
pub fn decode_snapshot<R: Record>(
    payload: &str,
    received_at: DateTime<Utc>,
) -> Result<Snapshot<R>, serde_json::Error> {
    Ok(match serde_json::from_str::<Payload<R>>(payload)? {
        Payload::Envelope {
            taken_at: Some(taken_at),
            records,
        } => Snapshot {
            source: Source::Publisher,
            taken_at,
            records,
        },
        Payload::Envelope {
            taken_at: None,
            records,
        }
        | Payload::Bare(records) => Snapshot {
            source: Source::Receipt,
            taken_at: received_at,
            records,
        },
    })
}

/// Routes channel messages to the collection they describe.
#[derive(Clone)]
pub struct PushRouter {
    prefix: String,
    candidates: Arc<Collection<Candidate>>,
    applications: Arc<Collection<Application>>,
    emails: Arc<Collection<Email>>,
}

impl PushRouter {
    pub fn new(
        prefix: &str,
        candidates: Arc<Collection<Candidate>>,
        applications: Arc<Collection<Application>>,
        emails: Arc<Collection<Email>>,
    ) -> Self {
        Self {
            prefix: prefix.trim_end_matches(':').to_string(),
            candidates,
            applications,
            emails,
        }
    }

    pub fn channels(&self) -> Vec<String> {
        [Candidate::COLLECTION, Application::COLLECTION, Email::COLLECTION]
            .iter()
            .map(|c| format!("{}:{c}", self.prefix))
            .collect()
    }

    pub async fn dispatch(&self, channel: &str, payload: &str) -> Result<Reconciled> {
        let now = Utc::now();
        let Some(collection) = channel
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
        else {
            bail!("unexpected channel {channel}");
        };
        let outcome = if collection == Candidate::COLLECTION {
            self.candidates
                .reconcile(decode_snapshot(payload, now)?)
                .await
        } else if collection == Application::COLLECTION {
            self.applications
                .reconcile(decode_snapshot(payload, now)?)
                .await
        } else if collection == Email::COLLECTION {
            self.emails.reconcile(decode_snapshot(payload, now)?).await
        } else {
            bail!("no collection named {collection}");
        };
        Ok(outcome)
    }
}

/// Listens until the task is aborted, reconnecting with exponential backoff.
pub fn spawn_push_listener(client: redis::Client, router: PushRouter) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match listen(&client, &router, &mut backoff).await {
                Ok(()) => warn!("push feed closed by server"),
                Err(e) => warn!("push feed error: {e}"),
            }
            debug!(delay_ms = backoff.as_millis() as u64, "reconnecting push feed");
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    })
}

async fn listen(client: &redis::Client, router: &PushRouter, backoff: &mut Duration) -> Result<()> {
    let mut pubsub = client.get_async_pubsub().await?;
    let channels = router.channels();
    pubsub.subscribe(channels.clone()).await?;
    info!(?channels, "subscribed to push feed");
    *backoff = INITIAL_BACKOFF;

    let mut messages = pubsub.on_message();
    while let Some(msg) = messages.next().await {
        let channel = msg.get_channel_name().to_string();
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%channel, "unreadable push payload: {e}");
                continue;
            }
        };
        match router.dispatch(&channel, &payload).await {
            Ok(Reconciled::Applied {
                generation,
                kept_local,
            }) => debug!(%channel, generation, kept_local, "push snapshot applied"),
            Ok(Reconciled::Discarded) => debug!(%channel, "stale push snapshot discarded"),
            Err(e) => warn!(%channel, "rejected push message: {e}"),
        }
    }
    Ok(())
}
