use super::error::BlobStoreError;
use super::{BlobKey, BlobStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const OBJECT_URL_PREFIX: &str = "blob:filesync/";

/// In-memory blob store.
///
/// Object URLs pin a snapshot of the bytes they were minted for, like a browser
/// `blob:` URL, and keep it alive until revoked.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<BlobKey, Arc<Vec<u8>>>>,
    object_urls: Mutex<HashMap<String, Arc<Vec<u8>>>>,
    next_url: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of minted URLs that were not revoked yet.
    pub fn live_object_urls(&self) -> usize {
        lock(&self.object_urls).len()
    }

    /// Bytes behind a live object URL.
    pub fn read_object_url(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        lock(&self.object_urls).get(url).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.blobs).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.blobs).is_empty()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, BlobStoreError> {
        Ok(lock(&self.blobs).get(key).map(|bytes| bytes.as_ref().clone()))
    }

    async fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<(), BlobStoreError> {
        lock(&self.blobs).insert(key.clone(), Arc::new(bytes.to_vec()));
        Ok(())
    }

    async fn has(&self, key: &BlobKey) -> Result<bool, BlobStoreError> {
        Ok(lock(&self.blobs).contains_key(key))
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError> {
        lock(&self.blobs).remove(key);
        Ok(())
    }

    async fn object_url(&self, key: &BlobKey) -> Result<Option<String>, BlobStoreError> {
        let Some(bytes) = lock(&self.blobs).get(key).cloned() else {
            return Ok(None);
        };
        let n = self.next_url.fetch_add(1, Ordering::Relaxed);
        let url = format!("{OBJECT_URL_PREFIX}{n}");
        lock(&self.object_urls).insert(url.clone(), bytes);
        Ok(Some(url))
    }

    fn revoke_object_url(&self, url: &str) {
        lock(&self.object_urls).remove(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str) -> BlobKey {
        BlobKey::Original {
            path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryBlobStore::new();
        store.put(&key("a"), b"bytes").await.unwrap();

        assert!(store.has(&key("a")).await.unwrap());
        assert_eq!(store.get(&key("a")).await.unwrap().unwrap(), b"bytes");

        store.delete(&key("a")).await.unwrap();
        assert!(store.is_empty());
        assert!(store.get(&key("a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_object_urls_are_unique_until_revoked() {
        let store = MemoryBlobStore::new();
        store.put(&key("a"), b"bytes").await.unwrap();

        let first = store.object_url(&key("a")).await.unwrap().unwrap();
        let second = store.object_url(&key("a")).await.unwrap().unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with(OBJECT_URL_PREFIX));
        assert_eq!(store.live_object_urls(), 2);

        store.revoke_object_url(&first);
        store.revoke_object_url(&first);
        assert_eq!(store.live_object_urls(), 1);
        assert!(store.read_object_url(&first).is_none());
    }

    #[tokio::test]
    async fn test_object_url_outlives_blob_until_revoked() {
        let store = MemoryBlobStore::new();
        store.put(&key("a"), b"v1").await.unwrap();
        let url = store.object_url(&key("a")).await.unwrap().unwrap();

        store.put(&key("a"), b"v2").await.unwrap();
        store.delete(&key("a")).await.unwrap();

        assert_eq!(store.read_object_url(&url).unwrap().as_slice(), b"v1");
    }

    #[tokio::test]
    async fn test_missing_blob_mints_nothing() {
        let store = MemoryBlobStore::new();
        assert!(store.object_url(&key("a")).await.unwrap().is_none());
        assert_eq!(store.live_object_urls(), 0);
    }
}
