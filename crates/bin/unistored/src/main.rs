//! # unistored — unistore daemon
//!
//! Composition root that wires the storage adapter to the application layer
//! and runs the background tasks.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the resource service, injecting the backend via port traits
//! - Start the history poller and the folder-index rebuilder
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;
use unistore_adapter_storage_sqlite_sqlx::Config as StorageConfig;
use unistore_app::event_bus::InProcessEventBus;
use unistore_app::folder_rebuilder::{self, FolderIndexRebuilder};
use unistore_app::poller::{HistoryPoller, PollerConfig};
use unistore_app::ports::StaticIdentity;
use unistore_app::services::resource_service::ResourceService;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = StorageConfig {
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        isolation: config.isolation()?,
    }
    .build()
    .await?;

    // Watch bus and folder events
    let bus = Arc::new(InProcessEventBus::new(config.watch.buffer_size));
    let (folder_tx, folder_rx) = folder_rebuilder::channel();

    // Service
    let mut service = ResourceService::new(db.backend(), StaticIdentity::anonymous(), bus.clone())
        .with_folder_events(folder_tx);
    if let Some(timeout) = config.request_timeout() {
        service = service.with_request_timeout(timeout);
    }
    tracing::info!(health = ?service.is_healthy().await, "storage backend checked");

    // Background tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = HistoryPoller::new(
        db.history_feed(),
        bus.clone(),
        PollerConfig {
            interval: config.poll_interval(),
            batch_size: config.watch.batch_size,
        },
    );
    let poller = tokio::spawn(poller.run(shutdown_rx));

    let rebuilder = tokio::spawn(FolderIndexRebuilder::new(db.folder_index(), folder_rx).run());

    let mut events = Box::pin(service.watch());
    let logger = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            tracing::debug!(
                key = %event.key,
                action = ?event.action,
                version = event.version,
                "watch event"
            );
        }
    });

    tracing::info!(url = %config.database.url, "unistored running");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    let _ = shutdown_tx.send(true);
    poller.await??;

    // Dropping the service closes the folder channel and ends the rebuilder.
    drop(service);
    rebuilder.await?;
    logger.abort();

    tracing::info!("unistored stopped");
    Ok(())
}
