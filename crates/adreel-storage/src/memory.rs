//! In-memory object store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::keys::validate_key;
use crate::store::ObjectStore;

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Process-local object store.
///
/// URLs are `{base_url}/{key}`; nothing is served from them.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://adreel")
    }
}

impl InMemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .read()
            .map(|o| o.contains_key(key))
            .unwrap_or(false)
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .ok()
            .and_then(|o| o.get(key).map(|obj| obj.content_type.clone()))
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<String> {
        validate_key(key)?;
        let mut objects = self
            .objects
            .write()
            .map_err(|_| StorageError::upload_failed("store lock poisoned"))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.url_for(key))
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::DownloadFailed("store lock poisoned".to_string()))?;
        objects
            .get(key)
            .map(|obj| obj.bytes.clone())
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn fetch_url(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        Ok(self.url_for(key))
    }
}
