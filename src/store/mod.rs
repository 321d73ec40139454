//! Key-value persistence.
//!
//! # Data Flow
//! ```text
//! admin API / startup bootstrap
//!     → SubscriptionStore::set_token / set_sources
//!     → KvStore::put ("TOKEN", "SUBS")
//!
//! GET /subs/{token}
//!     → SubscriptionStore::verify_token / sources
//!     → KvStore::get
//! ```
//!
//! # Design Decisions
//! - Values are plain strings; the source list is stored as JSON
//! - The merge core never talks to the store; the HTTP layer decodes
//!   sources and hands them over
//! - Store calls are synchronous and never held across an await

pub mod file;
pub mod memory;
pub mod subscriptions;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use subscriptions::{SubscriptionStore, SUBS_KEY, TOKEN_KEY};

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is not valid JSON: {0}")]
    Format(#[source] serde_json::Error),

    #[error("value under '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },

    #[error("failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// String key-value store.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
