//! A filesystem-backed [`KeyValueStore`] implementation, used when no
//! richer host key/value store is available (e.g. the `cli` binary, or
//! integration tests).

use std::collections::BTreeMap;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    capabilities::KeyValueStore,
    errors::{RegistryError, RegistryResult},
};

/// Stores every key/value pair in a single JSON file, guarded by an
/// in-process mutex (single-writer discipline, per §5).
pub struct FileKeyValueStore {
    path: Utf8PathBuf,
    cache: Mutex<Option<BTreeMap<String, Value>>>,
}

impl FileKeyValueStore {
    /// Back this store with the given JSON file path.
    pub fn new(path: Utf8PathBuf) -> Self {
        Self {
            path,
            cache: Mutex::new(None),
        }
    }

    async fn load(&self) -> RegistryResult<BTreeMap<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| RegistryError::ParseFailure {
                format: "json",
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, map: &BTreeMap<String, Value>) -> RegistryResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(map).map_err(|e| RegistryError::ParseFailure {
            format: "json",
            message: e.to_string(),
        })?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> RegistryResult<Option<Value>> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        Ok(cache.as_ref().unwrap().get(key).cloned())
    }

    async fn update(&self, key: &str, value: Value) -> RegistryResult<()> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        let map = cache.as_mut().unwrap();
        map.insert(key.to_string(), value);
        self.persist(map).await
    }

    async fn keys(&self) -> RegistryResult<Vec<String>> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        Ok(cache.as_ref().unwrap().keys().cloned().collect())
    }
}
