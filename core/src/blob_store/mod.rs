//! Local blob storage, addressed per file and size tier.
//!
//! Backends differ only in where bytes live: [`FsBlobStore`] on the device filesystem,
//! [`MemoryBlobStore`] in process memory with revocable `blob:` URLs in the manner of
//! browser origin-private storage.

use crate::types::{FileId, FileRecord, TierName};
use async_trait::async_trait;
use error::BlobStoreError;
use std::fmt;

mod fs;
mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum BlobStoreError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Invalid blob path: {0}")]
        InvalidPath(String),
    }
}

/// Storage key of one blob. Thumbnails are stored apart from the original, per tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlobKey {
    Original { path: String },
    Thumbnail { file_id: FileId, tier: TierName },
}

impl BlobKey {
    pub fn original(file: &FileRecord) -> Self {
        BlobKey::Original {
            path: file.path.clone(),
        }
    }

    pub fn thumbnail(file_id: &FileId, tier: &TierName) -> Self {
        BlobKey::Thumbnail {
            file_id: file_id.clone(),
            tier: tier.clone(),
        }
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobKey::Original { path } => write!(f, "original:{path}"),
            BlobKey::Thumbnail { file_id, tier } => write!(f, "thumbnail:{file_id}/{tier}"),
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, BlobStoreError>;

    async fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<(), BlobStoreError>;

    async fn has(&self, key: &BlobKey) -> Result<bool, BlobStoreError>;

    /// Deleting a missing blob succeeds.
    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError>;

    /// Displayable URL for a stored blob, `None` when the blob is absent.
    ///
    /// The URL stays valid until passed to [`BlobStore::revoke_object_url`].
    async fn object_url(&self, key: &BlobKey) -> Result<Option<String>, BlobStoreError>;

    /// Releases a URL minted by [`BlobStore::object_url`]. Unknown URLs are ignored.
    fn revoke_object_url(&self, url: &str);
}
