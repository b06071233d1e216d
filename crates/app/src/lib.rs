//! # unistore-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ResourceBackend` — versioned CRUD, history, references, health
//!   - `HistoryFeed` — read-only scan of the history ledger for the poller
//!   - `FolderIndex` — rebuild the folder hierarchy of a namespace
//!   - `IdentityProvider` — who is performing the current write
//!   - `EventPublisher` — deliver watch events to subscribers
//! - Define **driving/inbound ports** as use-case structs:
//!   - `ResourceService` — create, update, delete, read, list, history, watch
//!   - `HistoryPoller` — background task republishing history as watch events
//!   - `FolderIndexRebuilder` — background task reacting to folder writes
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `unistore-domain` only (plus `tokio::sync`/`tokio::time`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod folder_rebuilder;
pub mod poller;
pub mod ports;
pub mod services;
