//! The object store seam.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Byte storage addressed by key.
///
/// Keys are partitioned as `{user_id}/{project_id}/...` (see [`crate::keys`]).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return a fetch URL for it.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StorageResult<String>;

    /// Read back the bytes stored under `key`.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// URL the render container can fetch `key` from.
    async fn fetch_url(&self, key: &str) -> StorageResult<String>;
}
