/// Backend client: the single point of entry for calls to the ATS REST backend.
///
/// Reads (collection listings) are retried on 429 and 5xx with exponential
/// backoff. Mutations are sent exactly once; the caller decides what a failure
/// means for its optimistic state.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::sync::Record;

const MAX_RETRIES: u32 = 3;

/// Shown when the backend gives no usable error message.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error (status {status})")]
    Api {
        status: u16,
        message: Option<String>,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("No batched endpoint for this collection")]
    Unsupported,
}

impl BackendError {
    /// The backend's own message when it sent one, otherwise a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Api {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

/// The mutation and listing surface the sync layer needs from a backend.
#[async_trait]
pub trait RecordApi<R: Record>: Send + Sync {
    async fn list(&self) -> Result<Vec<R>, BackendError>;

    /// Returns the updated record when the backend echoes it back.
    async fn update(&self, id: &str, patch: &R::Patch) -> Result<Option<R>, BackendError>;

    async fn delete(&self, id: &str) -> Result<(), BackendError>;

    fn supports_bulk(&self) -> bool {
        false
    }

    /// One request for many records. All-or-nothing on the wire.
    async fn bulk_update(&self, ids: &[String], patch: &R::Patch) -> Result<Vec<R>, BackendError> {
        let _ = (ids, patch);
        Err(BackendError::Unsupported)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<R> {
    Bare(Vec<R>),
    Wrapped { data: Vec<R> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordBody<R> {
    Wrapped { data: R },
    Bare(R),
}

#[derive(Serialize)]
struct BulkRequest<'a, P> {
    ids: &'a [String],
    #[serde(flatten)]
    patch: &'a P,
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("content-type", "application/json")
    }

    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Api {
            status: status.as_u16(),
            message: extract_message(&body),
        })
    }

    /// GET with retry on 429 and 5xx. Returns the raw body.
    async fn get_with_retry(&self, path: &str) -> Result<String, BackendError> {
        let url = self.url(path);
        let mut last_error: Option<BackendError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 500ms, 1s, 2s
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "GET {} attempt {} failed, retrying after {}ms...",
                    path,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.authed(self.client.get(&url)).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(BackendError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = Some(BackendError::Api {
                    status: status.as_u16(),
                    message: extract_message(&body),
                });
                continue;
            }

            let body = Self::check(response).await?.text().await?;
            debug!("GET {} succeeded ({} bytes)", path, body.len());
            return Ok(body);
        }

        Err(last_error.unwrap_or(BackendError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl<R: Record> RecordApi<R> for HttpBackend {
    async fn list(&self) -> Result<Vec<R>, BackendError> {
        let body = self.get_with_retry(R::COLLECTION).await?;
        decode_list(&body)
    }

    async fn update(&self, id: &str, patch: &R::Patch) -> Result<Option<R>, BackendError> {
        let url = self.url(&format!("{}/{}", R::COLLECTION, id));
        let response = self.authed(self.client.patch(url)).json(patch).send().await?;
        let body = Self::check(response).await?.text().await?;
        Ok(decode_record(&body))
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        let url = self.url(&format!("{}/{}", R::COLLECTION, id));
        let response = self.authed(self.client.delete(url)).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    fn supports_bulk(&self) -> bool {
        R::BULK_PATH.is_some()
    }

    async fn bulk_update(&self, ids: &[String], patch: &R::Patch) -> Result<Vec<R>, BackendError> {
        let path = R::BULK_PATH.ok_or(BackendError::Unsupported)?;
        let response = self
            .authed(self.client.post(self.url(path)))
            .json(&BulkRequest { ids, patch })
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;
        Ok(if body.trim().is_empty() {
            Vec::new()
        } else {
            decode_list(&body).unwrap_or_default()
        })
    }
}

fn decode_list<R: Record>(body: &str) -> Result<Vec<R>, BackendError> {
    Ok(match serde_json::from_str::<ListBody<R>>(body)? {
        ListBody::Bare(records) | ListBody::Wrapped { data: records } => records,
    })
}

fn decode_record<R: Record>(body: &str) -> Option<R> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<RecordBody<R>>(body) {
        Ok(RecordBody::Bare(record)) | Ok(RecordBody::Wrapped { data: record }) => Some(record),
        Err(e) => {
            debug!("mutation response is not a {} record: {e}", R::COLLECTION);
            None
        }
    }
}

/// Pulls a human-readable message out of an error body:
/// `{"error": "..."}`, `{"error": {"message": "..."}}` or `{"message": "..."}`,
/// falling back to a short plain-text body.
pub fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .get("error")
            .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(|m| m.as_str())))
            .or_else(|| value.get("message").and_then(|m| m.as_str()));
        return message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
    }
    if body.len() <= 200 && !body.starts_with('<') {
        return Some(body.to_string());
    }
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{BackendError, RecordApi};
    use crate::sync::Record;

    /// In-memory backend with switchable failures.
    pub struct FakeApi<R> {
        pub records: Mutex<Vec<R>>,
        pub list_calls: AtomicUsize,
        pub bulk_calls: AtomicUsize,
        pub updated: Mutex<Vec<String>>,
        failing: Mutex<HashSet<String>>,
        fail_all: AtomicBool,
        bulk: bool,
    }

    impl<R: Record> FakeApi<R> {
        pub fn new(records: Vec<R>) -> Self {
            Self {
                records: Mutex::new(records),
                list_calls: AtomicUsize::new(0),
                bulk_calls: AtomicUsize::new(0),
                updated: Mutex::new(Vec::new()),
                failing: Mutex::new(HashSet::new()),
                fail_all: AtomicBool::new(false),
                bulk: false,
            }
        }

        pub fn with_bulk(mut self) -> Self {
            self.bulk = true;
            self
        }

        pub fn fail_ids(&self, ids: &[&str]) {
            let mut failing = self.failing.lock().unwrap();
            failing.extend(ids.iter().map(|s| s.to_string()));
        }

        pub fn fail_everything(&self) {
            self.fail_all.store(true, Ordering::SeqCst);
        }

        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        fn fails(&self, id: &str) -> bool {
            self.fail_all.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(id)
        }
    }

    #[async_trait]
    impl<R: Record> RecordApi<R> for FakeApi<R> {
        async fn list(&self) -> Result<Vec<R>, BackendError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_all.load(Ordering::SeqCst) {
                return Err(BackendError::Api {
                    status: 503,
                    message: None,
                });
            }
            Ok(self.records.lock().unwrap().clone())
        }

        async fn update(&self, id: &str, _patch: &R::Patch) -> Result<Option<R>, BackendError> {
            self.updated.lock().unwrap().push(id.to_string());
            if self.fails(id) {
                return Err(BackendError::Api {
                    status: 500,
                    message: Some(format!("cannot update {id}")),
                });
            }
            Ok(None)
        }

        async fn delete(&self, id: &str) -> Result<(), BackendError> {
            if self.fails(id) {
                return Err(BackendError::Api {
                    status: 500,
                    message: None,
                });
            }
            Ok(())
        }

        fn supports_bulk(&self) -> bool {
            self.bulk
        }

        async fn bulk_update(
            &self,
            ids: &[String],
            _patch: &R::Patch,
        ) -> Result<Vec<R>, BackendError> {
            self.bulk_calls.fetch_add(1, Ordering::SeqCst);
            if ids.iter().any(|id| self.fails(id)) {
                return Err(BackendError::Api {
                    status: 500,
                    message: None,
                });
            }
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_shapes() {
        assert_eq!(
            extract_message(r#"{"error": "Job is closed"}"#).as_deref(),
            Some("Job is closed")
        );
        assert_eq!(
            extract_message(r#"{"error": {"message": "Nope"}}"#).as_deref(),
            Some("Nope")
        );
        assert_eq!(
            extract_message(r#"{"message": "Bad id"}"#).as_deref(),
            Some("Bad id")
        );
        assert_eq!(extract_message("upstream timeout").as_deref(), Some("upstream timeout"));
    }

    #[test]
    fn test_extract_message_rejects_noise() {
        assert_eq!(extract_message(""), None);
        assert_eq!(extract_message(r#"{"ok": false}"#), None);
        assert_eq!(extract_message("<html><body>502</body></html>"), None);
    }

    #[test]
    fn test_user_message_falls_back_to_generic() {
        let err = BackendError::Api {
            status: 500,
            message: None,
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE);
        let err = BackendError::Api {
            status: 409,
            message: Some("Already hired".into()),
        };
        assert_eq!(err.user_message(), "Already hired");
    }

    #[test]
    fn test_decode_list_bare_and_wrapped() {
        use crate::sync::testing::Item;
        let bare: Vec<Item> =
            decode_list(r#"[{"id":"a","status":"pending","updated_at":null}]"#).unwrap();
        let wrapped: Vec<Item> =
            decode_list(r#"{"data":[{"id":"a","status":"pending","updated_at":null}]}"#).unwrap();
        assert_eq!(bare, wrapped);
    }

    #[test]
    fn test_decode_record_tolerates_empty_and_foreign_bodies() {
        use crate::sync::testing::Item;
        assert!(decode_record::<Item>("").is_none());
        assert!(decode_record::<Item>(r#"{"ok":true}"#).is_none());
        let item = decode_record::<Item>(r#"{"data":{"id":"a","status":"x","updated_at":null}}"#);
        assert_eq!(item.map(|i| i.id), Some("a".to_string()));
    }
}
