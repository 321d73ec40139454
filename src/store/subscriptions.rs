//! Typed access to the token and source list.

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::store::{KvStore, StoreError};
use crate::subscription::Source;

/// Key holding the access token for `/subs/{token}`.
pub const TOKEN_KEY: &str = "TOKEN";
/// Key holding the JSON array of sources.
pub const SUBS_KEY: &str = "SUBS";

#[derive(Clone)]
pub struct SubscriptionStore {
    kv: Arc<dyn KvStore>,
}

impl SubscriptionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn token(&self) -> Result<Option<String>, StoreError> {
        self.kv.get(TOKEN_KEY)
    }

    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.kv.put(TOKEN_KEY, token)
    }

    /// True only when a non-empty token is stored and equals `candidate`.
    pub fn verify_token(&self, candidate: &str) -> Result<bool, StoreError> {
        Ok(matches!(self.token()?, Some(expected) if !expected.is_empty() && expected == candidate))
    }

    /// The stored sources; an absent key is an empty list.
    pub fn sources(&self) -> Result<Vec<Source>, StoreError> {
        match self.kv.get(SUBS_KEY)? {
            None => Ok(Vec::new()),
            Some(json) => serde_json::from_str(&json).map_err(|source| StoreError::Corrupt {
                key: SUBS_KEY.to_string(),
                source,
            }),
        }
    }

    pub fn set_sources(&self, sources: &[Source]) -> Result<(), StoreError> {
        let json = serde_json::to_string(sources).map_err(|source| StoreError::Encode {
            key: SUBS_KEY.to_string(),
            source,
        })?;
        self.kv.put(SUBS_KEY, &json)
    }

    /// Seed token and sources from configuration where the store has none.
    pub fn bootstrap(&self, config: &StoreConfig) -> Result<(), StoreError> {
        if let Some(token) = &config.bootstrap_token {
            if self.token()?.is_none() {
                self.set_token(token)?;
                tracing::info!("Seeded access token from configuration");
            }
        }
        if !config.bootstrap_sources.is_empty() && self.kv.get(SUBS_KEY)?.is_none() {
            self.set_sources(&config.bootstrap_sources)?;
            tracing::info!(
                count = config.bootstrap_sources.len(),
                "Seeded subscription sources from configuration"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> SubscriptionStore {
        SubscriptionStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_token_verification() {
        let store = store();
        assert!(!store.verify_token("anything").unwrap());

        store.set_token("").unwrap();
        assert!(!store.verify_token("").unwrap());

        store.set_token("secret").unwrap();
        assert!(store.verify_token("secret").unwrap());
        assert!(!store.verify_token("Secret").unwrap());
    }

    #[test]
    fn test_sources_round_trip() {
        let store = store();
        assert!(store.sources().unwrap().is_empty());

        let sources = vec![
            Source::new("A", "https://a.example/sub"),
            Source::new("B", "https://b.example/sub"),
        ];
        store.set_sources(&sources).unwrap();
        assert_eq!(store.sources().unwrap(), sources);
    }

    #[test]
    fn test_corrupt_sources() {
        let kv = Arc::new(MemoryStore::new());
        kv.put(SUBS_KEY, "{not json").unwrap();
        let store = SubscriptionStore::new(kv);
        assert!(matches!(store.sources(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_bootstrap_does_not_overwrite() {
        let store = store();
        store.set_token("existing").unwrap();

        let config = StoreConfig {
            bootstrap_token: Some("seeded".into()),
            bootstrap_sources: vec![Source::new("A", "https://a.example/sub")],
            ..StoreConfig::default()
        };
        store.bootstrap(&config).unwrap();

        assert_eq!(store.token().unwrap().as_deref(), Some("existing"));
        assert_eq!(store.sources().unwrap().len(), 1);
    }
}
