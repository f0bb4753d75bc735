//! Application setup and initialization
//!
//! Everything main.rs needs to turn a validated [`Config`] into a running server, split out
//! so integration tests can build the same router.

pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::Result;
use gouvre_core::Config;
use gouvre_services::LinkCleanupService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A fully wired application, ready to serve.
pub struct App {
    pub state: Arc<AppState>,
    pub router: axum::Router,
    /// Cancelled when the server shuts down; stops background tasks.
    pub shutdown: CancellationToken,
    pub cleanup_task: Option<JoinHandle<()>>,
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<App> {
    // Initialize state: storage, token codec, link store
    let state = services::initialize_services(&config).await?;

    // Setup routes
    let router = routes::setup_routes(&config, state.clone())?;

    let shutdown = CancellationToken::new();
    let cleanup_task = LinkCleanupService::new(
        state.access.links().clone(),
        Duration::from_secs(config.cleanup_interval_secs),
    )
    .start(shutdown.clone());

    Ok(App {
        state,
        router,
        shutdown,
        cleanup_task,
    })
}
