//! In-memory reactive stand-in for the sync engine.
//!
//! [`MemoryState`] materializes [`FileEvent`]s into file records, holds the two
//! local-only documents, and notifies listeners after every mutation. Listeners run after
//! all internal locks are released, so they may read the state back.

use crate::display::DisplayState;
use crate::source::{FileRecords, LocalDocuments, SyncSource};
use crate::types::{
    ContentHash, FileId, FileRecord, LocalFileEntry, LocalFileState, ThumbnailState,
    ThumbnailStatus, TierName,
};
use error::StateError;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, SystemTime};

pub mod error {
    use crate::types::FileId;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum StateError {
        #[error("File not found: {0}")]
        NotFound(FileId),

        #[error("File already exists: {0}")]
        AlreadyExists(FileId),

        #[error("File is deleted: {0}")]
        Deleted(FileId),
    }
}

/// Logical events recorded against synced file records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Created {
        id: FileId,
        path: String,
        content_hash: ContentHash,
        at: SystemTime,
    },
    /// A new version of the bytes was committed; any remote copy belongs to the old one.
    ContentReplaced {
        id: FileId,
        content_hash: ContentHash,
        at: SystemTime,
    },
    RemotePersisted {
        id: FileId,
        remote_key: String,
        at: SystemTime,
    },
    Deleted {
        id: FileId,
        at: SystemTime,
    },
}

impl FileEvent {
    pub fn file_id(&self) -> &FileId {
        match self {
            FileEvent::Created { id, .. }
            | FileEvent::ContentReplaced { id, .. }
            | FileEvent::RemotePersisted { id, .. }
            | FileEvent::Deleted { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&FileId) + Send + Sync>;

#[derive(Default)]
struct Documents {
    files: BTreeMap<FileId, FileRecord>,
    local: LocalFileState,
    thumbnails: ThumbnailState,
}

#[derive(Default)]
pub struct MemoryState {
    documents: RwLock<Documents>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
}

/// Event application.
impl MemoryState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn commit(&self, event: FileEvent) -> Result<(), StateError> {
        let id = event.file_id().clone();
        {
            let mut docs = self.write();
            apply_event(&mut docs.files, event)?;
        }
        self.notify(&id);
        Ok(())
    }

    /// Raw record access, including deleted ones.
    pub fn record(&self, id: &FileId) -> Option<FileRecord> {
        self.read().files.get(id).cloned()
    }
}

fn apply_event(
    files: &mut BTreeMap<FileId, FileRecord>,
    event: FileEvent,
) -> Result<(), StateError> {
    match event {
        FileEvent::Created {
            id,
            path,
            content_hash,
            at,
        } => {
            if files.contains_key(&id) {
                return Err(StateError::AlreadyExists(id));
            }
            files.insert(
                id.clone(),
                FileRecord {
                    id,
                    path,
                    remote_key: None,
                    content_hash,
                    updated_at: at,
                    deleted_at: None,
                },
            );
        }
        FileEvent::ContentReplaced {
            id,
            content_hash,
            at,
        } => {
            let record = live_record(files, &id)?;
            record.content_hash = content_hash;
            record.remote_key = None;
            record.updated_at = next_version(record.updated_at, at);
        }
        FileEvent::RemotePersisted { id, remote_key, at } => {
            let record = live_record(files, &id)?;
            record.remote_key = Some(remote_key);
            record.updated_at = next_version(record.updated_at, at);
        }
        FileEvent::Deleted { id, at } => {
            let record = live_record(files, &id)?;
            record.updated_at = next_version(record.updated_at, at);
            record.deleted_at = Some(record.updated_at);
        }
    }
    Ok(())
}

fn live_record<'a>(
    files: &'a mut BTreeMap<FileId, FileRecord>,
    id: &FileId,
) -> Result<&'a mut FileRecord, StateError> {
    let record = files
        .get_mut(id)
        .ok_or_else(|| StateError::NotFound(id.clone()))?;
    if record.is_deleted() {
        return Err(StateError::Deleted(id.clone()));
    }
    Ok(record)
}

/// Version markers only move forward, even if the event clock does not.
fn next_version(previous: SystemTime, at: SystemTime) -> SystemTime {
    if at > previous {
        at
    } else {
        previous + Duration::from_micros(1)
    }
}

/// Local-only document operations.
impl MemoryState {
    pub fn set_local_entry(&self, id: FileId, entry: LocalFileEntry) {
        let notify_id = id.clone();
        self.write().local.insert(id, entry);
        self.notify(&notify_id);
    }

    pub fn update_local_entry(&self, id: &FileId, update: impl FnOnce(&mut LocalFileEntry)) {
        {
            let mut docs = self.write();
            let entry = docs.local.files.entry(id.clone()).or_default();
            update(entry);
        }
        self.notify(id);
    }

    pub fn remove_local_entry(&self, id: &FileId) -> Option<LocalFileEntry> {
        let removed = self.write().local.remove(id);
        self.notify(id);
        removed
    }

    pub fn set_thumbnail_status(&self, id: FileId, tier: TierName, status: ThumbnailStatus) {
        let notify_id = id.clone();
        self.write().thumbnails.set(id, tier, status);
        self.notify(&notify_id);
    }

    pub fn local_file_state(&self) -> LocalFileState {
        self.read().local.clone()
    }

    pub fn thumbnail_state(&self) -> ThumbnailState {
        self.read().thumbnails.clone()
    }
}

/// Change notification.
impl MemoryState {
    pub fn subscribe(&self, listener: impl Fn(&FileId) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Recomputes the display state of `file_id` from scratch on every change to it and
    /// passes it to `callback`, starting with the current state.
    pub fn watch_display(
        self: &Arc<Self>,
        file_id: FileId,
        callback: impl Fn(Option<DisplayState>) + Send + Sync + 'static,
    ) -> ListenerId {
        callback(self.display_state(&file_id));

        let state: Weak<Self> = Arc::downgrade(self);
        self.subscribe(move |changed| {
            if *changed != file_id {
                return;
            }
            if let Some(state) = state.upgrade() {
                callback(state.display_state(&file_id));
            }
        })
    }

    fn notify(&self, id: &FileId) {
        let listeners: Vec<Listener> = self
            .lock_listeners()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(id);
        }
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Documents> {
        self.documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Documents> {
        self.documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileRecords for MemoryState {
    fn file(&self, id: &FileId) -> Option<FileRecord> {
        self.read()
            .files
            .get(id)
            .filter(|record| !record.is_deleted())
            .cloned()
    }
}

impl LocalDocuments for MemoryState {
    fn local_entry(&self, id: &FileId) -> Option<LocalFileEntry> {
        self.read().local.get(id).cloned()
    }

    fn thumbnail_status(&self, id: &FileId, tier: &TierName) -> Option<ThumbnailStatus> {
        self.read().thumbnails.get(id, tier)
    }
}
