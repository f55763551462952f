#![allow(dead_code)]

use async_trait::async_trait;
use filesync_core::blob_store::error::BlobStoreError;
use filesync_core::blob_store::{BlobKey, BlobStore, MemoryBlobStore};
use filesync_core::remote::RemoteFileService;
use filesync_core::remote::error::RemoteError;
use filesync_core::state::{FileEvent, MemoryState};
use filesync_core::types::{ContentHash, FileId, LocalFileEntry};
use filesync_core::FileRecords;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn id(s: &str) -> FileId {
    FileId::try_from(s).unwrap()
}

pub fn at(ms: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms)
}

pub fn create(state: &MemoryState, name: &str, hash: &ContentHash, ms: u64) {
    state
        .commit(FileEvent::Created {
            id: id(name),
            path: format!("photos/{name}.jpg"),
            content_hash: hash.clone(),
            at: at(ms),
        })
        .unwrap();
}

/// Creates `name` and stores its bytes locally with a matching tracking entry.
pub async fn create_local(state: &MemoryState, blobs: &dyn BlobStore, name: &str, bytes: &[u8]) {
    let hash = ContentHash::of(bytes);
    create(state, name, &hash, 10);
    let file = state.file(&id(name)).unwrap();
    blobs.put(&BlobKey::original(&file), bytes).await.unwrap();
    state.set_local_entry(
        id(name),
        LocalFileEntry {
            local_hash: Some(hash),
            ..Default::default()
        },
    );
}

/// Memory blob store counting `object_url` calls, holding them while the gate is closed.
pub struct CountingBlobStore {
    pub inner: MemoryBlobStore,
    calls: AtomicUsize,
    gate: watch::Sender<bool>,
}

impl CountingBlobStore {
    pub fn new(open: bool) -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            calls: AtomicUsize::new(0),
            gate: watch::Sender::new(open),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub async fn entered(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl BlobStore for CountingBlobStore {
    async fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, BlobStoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<(), BlobStoreError> {
        self.inner.put(key, bytes).await
    }

    async fn has(&self, key: &BlobKey) -> Result<bool, BlobStoreError> {
        self.inner.has(key).await
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError> {
        self.inner.delete(key).await
    }

    async fn object_url(&self, key: &BlobKey) -> Result<Option<String>, BlobStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.gate.subscribe().wait_for(|open| *open).await;
        self.inner.object_url(key).await
    }

    fn revoke_object_url(&self, url: &str) {
        self.inner.revoke_object_url(url)
    }
}

/// Remote service backed by a map of file id to bytes.
#[derive(Default)]
pub struct MapRemote {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fetches: AtomicUsize,
}

impl MapRemote {
    pub fn insert(&self, id: &FileId, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(id.to_string(), bytes.to_vec());
    }
}

#[async_trait]
impl RemoteFileService for MapRemote {
    async fn sign_download(&self, file_id: &FileId) -> Result<String, RemoteError> {
        Ok(format!("https://files.test/{file_id}?token=t"))
    }

    async fn sign_upload(&self, file_id: &FileId) -> Result<String, RemoteError> {
        Ok(format!("https://files.test/{file_id}?token=u"))
    }

    async fn fetch(&self, signed_url: &str) -> Result<Vec<u8>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let id = signed_url
            .trim_start_matches("https://files.test/")
            .split('?')
            .next()
            .unwrap_or_default();
        self.objects
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }
}
