use crate::types::{ContentHash, FileId};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Synced metadata describing a logical file, replicated to every device of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    /// Logical storage path within the user's file namespace.
    pub path: String,
    /// Set once the bytes are durably stored remotely.
    pub remote_key: Option<String>,
    pub content_hash: ContentHash,
    pub updated_at: SystemTime,
    #[serde(default)]
    pub deleted_at: Option<SystemTime>,
}

/// Content-version marker of a record, captured when a resolution starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileVersion {
    pub updated_at: SystemTime,
    pub content_hash: ContentHash,
}

impl FileRecord {
    pub fn version(&self) -> FileVersion {
        FileVersion {
            updated_at: self.updated_at,
            content_hash: self.content_hash.clone(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
