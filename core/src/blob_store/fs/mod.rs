use super::error::BlobStoreError;
use super::{BlobKey, BlobStore};
use crate::types::{Config, FileId};
use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Characters escaped in the path of a `file://` URL.
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Blob store on the device filesystem.
///
/// Originals live at `blobs_path/<logical path>`, thumbnails at
/// `thumbnails_path/<file dir>/<tier>.thumb` where the file dir is derived from the id.
pub struct FsBlobStore {
    pub blobs_path: PathBuf,
    pub thumbnails_path: PathBuf,
}

impl FsBlobStore {
    pub fn new(config: &Config) -> Self {
        Self {
            blobs_path: config.blobs_path(),
            thumbnails_path: config.thumbnails_path(),
        }
    }

    pub fn blob_path(&self, key: &BlobKey) -> Result<PathBuf, BlobStoreError> {
        match key {
            BlobKey::Original { path } => Ok(self.blobs_path.join(relative_path(path)?)),
            BlobKey::Thumbnail { file_id, tier } => Ok(self
                .thumbnails_path
                .join(file_dir(file_id))
                .join(format!("{tier}.thumb"))),
        }
    }
}

fn file_dir(id: &FileId) -> PathBuf {
    let hash = blake3::hash(id.as_str().as_bytes());
    PathBuf::from(hash.to_hex().as_str())
}

/// Logical paths must stay below the blobs directory.
fn relative_path(path: &str) -> Result<PathBuf, BlobStoreError> {
    let candidate = Path::new(path);
    let mut relative = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return Err(BlobStoreError::InvalidPath(path.to_string())),
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(BlobStoreError::InvalidPath(path.to_string()));
    }
    Ok(relative)
}

fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    let prefix = if path.starts_with('/') { "" } else { "/" };
    format!(
        "file://{prefix}{}",
        utf8_percent_encode(&path, PATH_ESCAPES)
    )
}

async fn remove_dir_if_empty(path: &Path) -> Result<(), BlobStoreError> {
    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if entries.next_entry().await?.is_none() {
        tokio::fs::remove_dir(path).await?;
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, BlobStoreError> {
        let path = self.blob_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &BlobKey, bytes: &[u8]) -> Result<(), BlobStoreError> {
        let path = self.blob_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers never observe a half-written blob.
        let mut partial = path.clone().into_os_string();
        partial.push(".partial");
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;
        Ok(())
    }

    async fn has(&self, key: &BlobKey) -> Result<bool, BlobStoreError> {
        let path = self.blob_path(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn delete(&self, key: &BlobKey) -> Result<(), BlobStoreError> {
        let path = self.blob_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // Clean up empty per-file thumbnail directory
        if let BlobKey::Thumbnail { file_id, .. } = key {
            remove_dir_if_empty(&self.thumbnails_path.join(file_dir(file_id))).await?;
        }
        Ok(())
    }

    async fn object_url(&self, key: &BlobKey) -> Result<Option<String>, BlobStoreError> {
        let path = self.blob_path(key)?;
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        let absolute = match tokio::fs::canonicalize(&path).await {
            Ok(absolute) => absolute,
            Err(_) => path,
        };
        Ok(Some(file_url(&absolute)))
    }

    fn revoke_object_url(&self, _url: &str) {}
}
