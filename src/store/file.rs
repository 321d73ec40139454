//! JSON-file-backed store.
//!
//! The whole map lives in memory and is rewritten to disk on every `put`.
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous file intact. The in-memory map only
//! changes once the new file is in place.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::store::{KvStore, StoreError};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: DashMap<String, String>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, loading it if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let inner = DashMap::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let map: BTreeMap<String, String> =
                serde_json::from_reader(reader).map_err(StoreError::Format)?;
            for (k, v) in map {
                inner.insert(k, v);
            }
            tracing::info!(path = ?path, keys = inner.len(), "Loaded store file");
        }

        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, map).map_err(StoreError::Format)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = ?self.path, keys = map.len(), "Saved store file");
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // poisoning only means another writer panicked; the map is still consistent
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut map = self.snapshot();
        map.insert(key.to_string(), value.to_string());
        self.save(&map)?;

        self.inner.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        assert!(store.get("SUBS").unwrap().is_none());
        store.put("SUBS", "[]").unwrap();
        store.put("TOKEN", "t0k3n").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("SUBS").unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.get("TOKEN").unwrap().as_deref(), Some("t0k3n"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_failed_write_leaves_value_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("store.json");

        let store = FileStore::open(&path).unwrap();
        assert!(matches!(store.put("TOKEN", "new"), Err(StoreError::Io(_))));
        assert!(store.get("TOKEN").unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(FileStore::open(&path), Err(StoreError::Format(_))));
    }
}
