mod applications;
mod backend;
mod candidates;
mod config;
mod emails;
mod errors;
mod models;
mod notify;
mod realtime;
mod routes;
mod state;
mod sync;
mod view;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend::HttpBackend;
use crate::config::Config;
use crate::realtime::push::{spawn_push_listener, PushRouter};
use crate::realtime::{spawn_assignment_listener, spawn_poller};
use crate::routes::build_router;
use crate::state::{AppState, Backends};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Hireflow v{}", env!("CARGO_PKG_VERSION"));

    // One HTTP client shared by every collection
    let http = Arc::new(HttpBackend::new(
        &config.backend_url,
        config.backend_token.clone(),
        config.request_timeout(),
    )?);
    info!("Backend client initialized ({})", config.backend_url);

    let backends = Backends {
        candidates: http.clone(),
        applications: http.clone(),
        emails: http,
    };
    let state = AppState::new(config, backends);

    // Snapshot sources
    let every = state.config.poll_interval();
    spawn_poller(state.candidates.clone(), state.backends.candidates.clone(), every);
    spawn_poller(
        state.applications.clone(),
        state.backends.applications.clone(),
        every,
    );
    spawn_poller(state.emails.clone(), state.backends.emails.clone(), every);
    spawn_assignment_listener(
        &state.events,
        state.candidates.clone(),
        state.backends.candidates.clone(),
    );

    match &state.config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            let router = PushRouter::new(
                &state.config.channel_prefix,
                state.candidates.clone(),
                state.applications.clone(),
                state.emails.clone(),
            );
            spawn_push_listener(client, router);
            info!("Push feed enabled");
        }
        None => info!("REDIS_URL not set; relying on polling only"),
    }

    let addr: SocketAddr = format!("0.0.0.0:{}", state.config.port).parse()?;

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
