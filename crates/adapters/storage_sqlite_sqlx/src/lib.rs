//! # unistore-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the port traits defined in `unistore-app::ports`:
//!   `ResourceBackend`, `HistoryFeed` and `FolderIndex`
//! - Manage the `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Render SQL for the supported dialects and allocate per-kind versions
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `unistore-app` (for port traits) and `unistore-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod backend;
pub mod dialect;
pub mod error;
pub mod feed;
pub mod folder_index;
pub mod pool;
mod row;
pub mod tx;
mod version;

pub use backend::SqlResourceBackend;
pub use dialect::{Dialect, IsolationLevel};
pub use error::StorageError;
pub use feed::SqlHistoryFeed;
pub use folder_index::{FolderNode, SqlFolderIndex};
pub use pool::{Config, Database};
pub use tx::TxExecutor;
