use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::EntryVariant;
use crate::types::{ContentHash, LocalFileEntry, ThumbnailStatus, TransferStatus};

#[cfg_attr(test, derive(Eq, PartialEq))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub local_hash: Option<String>,
    pub upload_status: Transfer,
    pub download_status: Transfer,
    pub last_sync_error: Option<String>,
}

impl EntryVariant for Entry {
    const VERSION: u8 = 1;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Transfer {
    Idle,
    Pending,
    InProgress,
    Failed,
}

/// Tier name -> status, for one file.
#[cfg_attr(test, derive(Eq, PartialEq))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thumbnails {
    pub sizes: BTreeMap<String, Thumbnail>,
}

impl EntryVariant for Thumbnails {
    const VERSION: u8 = 1;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Thumbnail {
    Pending,
    InProgress,
    Done,
    Failed,
}

impl From<&LocalFileEntry> for Entry {
    fn from(entry: &LocalFileEntry) -> Self {
        Self {
            local_hash: entry.local_hash.as_ref().map(|h| h.as_str().to_string()),
            upload_status: entry.upload_status.into(),
            download_status: entry.download_status.into(),
            last_sync_error: entry.last_sync_error.clone(),
        }
    }
}

impl From<Entry> for LocalFileEntry {
    fn from(entry: Entry) -> Self {
        Self {
            local_hash: entry.local_hash.map(ContentHash::from),
            upload_status: entry.upload_status.into(),
            download_status: entry.download_status.into(),
            last_sync_error: entry.last_sync_error,
        }
    }
}

impl From<TransferStatus> for Transfer {
    fn from(status: TransferStatus) -> Self {
        match status {
            TransferStatus::Idle => Transfer::Idle,
            TransferStatus::Pending => Transfer::Pending,
            TransferStatus::InProgress => Transfer::InProgress,
            TransferStatus::Failed => Transfer::Failed,
        }
    }
}

impl From<Transfer> for TransferStatus {
    fn from(status: Transfer) -> Self {
        match status {
            Transfer::Idle => TransferStatus::Idle,
            Transfer::Pending => TransferStatus::Pending,
            Transfer::InProgress => TransferStatus::InProgress,
            Transfer::Failed => TransferStatus::Failed,
        }
    }
}

impl From<ThumbnailStatus> for Thumbnail {
    fn from(status: ThumbnailStatus) -> Self {
        match status {
            ThumbnailStatus::Pending => Thumbnail::Pending,
            ThumbnailStatus::InProgress => Thumbnail::InProgress,
            ThumbnailStatus::Done => Thumbnail::Done,
            ThumbnailStatus::Failed => Thumbnail::Failed,
        }
    }
}

impl From<Thumbnail> for ThumbnailStatus {
    fn from(status: Thumbnail) -> Self {
        match status {
            Thumbnail::Pending => ThumbnailStatus::Pending,
            Thumbnail::InProgress => ThumbnailStatus::InProgress,
            Thumbnail::Done => ThumbnailStatus::Done,
            Thumbnail::Failed => ThumbnailStatus::Failed,
        }
    }
}
