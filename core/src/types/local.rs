use crate::types::{ContentHash, FileId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Progress of a local upload or download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferStatus {
    #[default]
    Idle,
    Pending,
    InProgress,
    Failed,
}

impl TransferStatus {
    /// Pending or in progress.
    pub fn is_active(self) -> bool {
        matches!(self, TransferStatus::Pending | TransferStatus::InProgress)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStatus::Idle => write!(f, "idle"),
            TransferStatus::Pending => write!(f, "pending"),
            TransferStatus::InProgress => write!(f, "in-progress"),
            TransferStatus::Failed => write!(f, "failed"),
        }
    }
}

/// This device's tracking record for one file. Never synced to other devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFileEntry {
    /// Hash of the bytes held in the local blob store, if any.
    pub local_hash: Option<ContentHash>,
    pub upload_status: TransferStatus,
    pub download_status: TransferStatus,
    pub last_sync_error: Option<String>,
}

impl LocalFileEntry {
    /// True iff the local blob is present and holds exactly `content_hash`.
    pub fn holds(&self, content_hash: &ContentHash) -> bool {
        self.local_hash.as_ref() == Some(content_hash)
    }
}

/// The local-only document mapping file ids to their tracking entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalFileState {
    pub files: BTreeMap<FileId, LocalFileEntry>,
}

impl LocalFileState {
    pub fn get(&self, id: &FileId) -> Option<&LocalFileEntry> {
        self.files.get(id)
    }

    pub fn insert(&mut self, id: FileId, entry: LocalFileEntry) -> Option<LocalFileEntry> {
        self.files.insert(id, entry)
    }

    pub fn remove(&mut self, id: &FileId) -> Option<LocalFileEntry> {
        self.files.remove(id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
