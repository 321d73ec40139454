//! Startup helpers.
//!
//! # Responsibilities
//! - Open the configured key-value backend
//! - Seed it from bootstrap settings
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Bootstrap never overwrites values already in the store

use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::store::{FileStore, KvStore, MemoryStore, StoreError, SubscriptionStore};

/// Open the backend named in `config` and apply its bootstrap values.
pub fn open_store(config: &StoreConfig) -> Result<SubscriptionStore, StoreError> {
    let kv: Arc<dyn KvStore> = match (config.backend, &config.path) {
        (StoreBackend::File, Some(path)) => Arc::new(FileStore::open(path)?),
        (StoreBackend::File, None) => {
            // validation rejects this; fall back rather than panic
            tracing::warn!("File store configured without a path; using memory store");
            Arc::new(MemoryStore::new())
        }
        (StoreBackend::Memory, _) => Arc::new(MemoryStore::new()),
    };
    tracing::info!(backend = ?config.backend, "Store opened");

    let store = SubscriptionStore::new(kv);
    store.bootstrap(config)?;
    Ok(store)
}
