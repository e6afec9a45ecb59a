//! Server directory store.
//!
//! Holds the server list and the global settings in memory, mirrors them to a
//! pluggable [`StorageBackend`], and tells subscribers whenever either changes.

pub mod backend;
pub mod card;
pub mod defaults;
pub mod error;
pub mod listing;
pub mod status;
pub mod store;
pub mod subscription;
pub mod validation;

pub use backend::{MemoryBackend, NullBackend, SqliteBackend, StorageBackend};
pub use defaults::{SERVERS_STORAGE_KEY, SETTINGS_STORAGE_KEY, Seed};
pub use error::StoreError;
pub use status::LoadStatus;
pub use store::Store;
pub use subscription::{Subscription, SubscriptionId};
pub use validation::{ServerDraft, ValidationError};
