use std::sync::Arc;

use crate::backend::RecordApi;
use crate::config::Config;
use crate::models::application::Application;
use crate::models::candidate::Candidate;
use crate::models::email::Email;
use crate::notify::Notifier;
use crate::sync::collection::Collection;
use crate::sync::events::EventBus;
use crate::sync::executor::SyncContext;
use crate::sync::Record;

/// The backend surface for each collection. In production all three are the
/// same `HttpBackend`; tests swap in fakes.
#[derive(Clone)]
pub struct Backends {
    pub candidates: Arc<dyn RecordApi<Candidate>>,
    pub applications: Arc<dyn RecordApi<Application>>,
    pub emails: Arc<dyn RecordApi<Email>>,
}

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub candidates: Arc<Collection<Candidate>>,
    pub applications: Arc<Collection<Application>>,
    pub emails: Arc<Collection<Email>>,
    pub backends: Backends,
    pub notifier: Notifier,
    pub events: EventBus,
}

impl AppState {
    pub fn new(config: Config, backends: Backends) -> Self {
        let events = EventBus::default();
        let window = config.cache_duration();
        Self {
            candidates: Arc::new(Collection::new(window, events.clone())),
            applications: Arc::new(Collection::new(window, events.clone())),
            emails: Arc::new(Collection::new(window, events.clone())),
            notifier: Notifier::new(config.notification_capacity),
            backends,
            events,
            config,
        }
    }

    fn context<'a, R: Record>(
        &'a self,
        collection: &'a Collection<R>,
        api: &'a dyn RecordApi<R>,
    ) -> SyncContext<'a, R> {
        SyncContext {
            collection,
            api,
            notifier: &self.notifier,
            events: &self.events,
        }
    }

    pub fn candidate_ctx(&self) -> SyncContext<'_, Candidate> {
        self.context(self.candidates.as_ref(), self.backends.candidates.as_ref())
    }

    pub fn application_ctx(&self) -> SyncContext<'_, Application> {
        self.context(self.applications.as_ref(), self.backends.applications.as_ref())
    }

    pub fn email_ctx(&self) -> SyncContext<'_, Email> {
        self.context(self.emails.as_ref(), self.backends.emails.as_ref())
    }
}
