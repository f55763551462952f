//! Remote file service: signed URLs for blob storage.

use crate::types::FileId;
use async_trait::async_trait;
use error::RemoteError;

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum RemoteError {
        #[error("Unauthorized")]
        Unauthorized,

        #[error("Remote object not found: {0}")]
        NotFound(String),

        #[error("Network error: {0}")]
        Network(String),
    }
}

/// Authenticated access to remote blob storage. Credentials are the implementor's
/// concern.
#[async_trait]
pub trait RemoteFileService: Send + Sync {
    /// Short-lived URL from which the file's bytes can be fetched.
    async fn sign_download(&self, file_id: &FileId) -> Result<String, RemoteError>;

    /// Short-lived URL to which the file's bytes can be uploaded.
    async fn sign_upload(&self, file_id: &FileId) -> Result<String, RemoteError>;

    /// Fetches the bytes behind a signed download URL.
    async fn fetch(&self, signed_url: &str) -> Result<Vec<u8>, RemoteError>;
}
