//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod event_bus;
pub mod folder_index;
pub mod history_feed;
pub mod identity;
pub mod storage;

pub use event_bus::EventPublisher;
pub use folder_index::FolderIndex;
pub use history_feed::HistoryFeed;
pub use identity::{IdentityProvider, StaticIdentity};
pub use storage::ResourceBackend;
