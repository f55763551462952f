//! Read side of the sync engine, as seen by the resolvers.

use crate::display::{DisplayState, resolve_display_state};
use crate::types::{FileId, FileRecord, LocalFileEntry, ThumbnailStatus, TierName};
use std::sync::Arc;

/// Synced file records.
pub trait FileRecords: Send + Sync {
    /// Current record, or `None` when it has not synced yet or was deleted.
    fn file(&self, id: &FileId) -> Option<FileRecord>;
}

/// Local-only documents of this device.
pub trait LocalDocuments: Send + Sync {
    fn local_entry(&self, id: &FileId) -> Option<LocalFileEntry>;

    /// Recorded status of a thumbnail tier; `None` when generation never started.
    fn thumbnail_status(&self, id: &FileId, tier: &TierName) -> Option<ThumbnailStatus>;
}

/// Everything the resolvers read.
pub trait SyncSource: FileRecords + LocalDocuments {
    /// Display state of a file, `None` when its record is not found.
    fn display_state(&self, id: &FileId) -> Option<DisplayState> {
        let file = self.file(id)?;
        let local_entry = self.local_entry(id);
        Some(resolve_display_state(&file, local_entry.as_ref()))
    }
}

impl<T: FileRecords + LocalDocuments> SyncSource for T {}

impl<T: FileRecords + ?Sized> FileRecords for Arc<T> {
    fn file(&self, id: &FileId) -> Option<FileRecord> {
        (**self).file(id)
    }
}

impl<T: LocalDocuments + ?Sized> LocalDocuments for Arc<T> {
    fn local_entry(&self, id: &FileId) -> Option<LocalFileEntry> {
        (**self).local_entry(id)
    }

    fn thumbnail_status(&self, id: &FileId, tier: &TierName) -> Option<ThumbnailStatus> {
        (**self).thumbnail_status(id, tier)
    }
}

/// Combines synced records from one source with local documents from another,
/// e.g. engine-provided records with a [`crate::tracking::TrackingDb`].
pub struct Split<F, L> {
    pub files: F,
    pub local: L,
}

impl<F: FileRecords, L: Send + Sync> FileRecords for Split<F, L> {
    fn file(&self, id: &FileId) -> Option<FileRecord> {
        self.files.file(id)
    }
}

impl<F: Send + Sync, L: LocalDocuments> LocalDocuments for Split<F, L> {
    fn local_entry(&self, id: &FileId) -> Option<LocalFileEntry> {
        self.local.local_entry(id)
    }

    fn thumbnail_status(&self, id: &FileId, tier: &TierName) -> Option<ThumbnailStatus> {
        self.local.thumbnail_status(id, tier)
    }
}
