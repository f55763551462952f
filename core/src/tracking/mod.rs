//! Durable store of this device's local-only documents.
//!
//! Holds the per-file [`LocalFileEntry`] tracking records and the per-tier thumbnail
//! statuses in a redb database. Nothing here is ever synced to other devices.

use crate::source::LocalDocuments;
use crate::tracking::error::TrackingError;
use crate::tracking::versioned_entry::latest;
use crate::tracking::versioned_entry::{VersionedEntry, VersionedThumbnails};
use crate::types::{Config, FileId, LocalFileEntry, LocalFileState, ThumbnailStatus, TierName};
use redb::{ReadableDatabase, ReadableTable, TableDefinition};

pub mod error {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum TrackingError {
        #[error("Database error: {0}")]
        Redb(#[from] redb::DatabaseError),

        #[error("Table error: {0}")]
        TableError(#[from] redb::TableError),

        #[error("Storage error: {0}")]
        StorageError(#[from] redb::StorageError),

        #[error("Transaction error: {0}")]
        TransactionError(#[from] redb::TransactionError),

        #[error("Commit error: {0}")]
        CommitError(#[from] redb::CommitError),

        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Encoding error: {0}")]
        Encoding(#[from] postcard::Error),

        #[error("Empty stored value")]
        EmptyValue,

        #[error("Unsupported value version: {0}")]
        UnsupportedVersion(u8),
    }
}

pub(crate) mod versioned_entry;

/// File id -> versioned LocalFileEntry
const LOCAL_FILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("local_files");

/// File id -> versioned per-tier thumbnail statuses
const THUMBNAILS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("thumbnails");

pub struct TrackingDb {
    db: redb::Database,
}

impl TrackingDb {
    /// Creates or opens the tracking database at [`Config::tracking_db_path`].
    pub fn open(config: &Config) -> Result<Self, TrackingError> {
        std::fs::create_dir_all(&config.base_path)?;

        let db = redb::Database::create(config.tracking_db_path())?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LOCAL_FILES_TABLE)?;
            let _ = write_txn.open_table(THUMBNAILS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

/// Local file entry operations.
impl TrackingDb {
    pub fn local_entry(&self, id: &FileId) -> Result<Option<LocalFileEntry>, TrackingError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCAL_FILES_TABLE)?;

        match table.get(id.as_str())? {
            None => Ok(None),
            Some(guard) => Ok(Some(decode_entry(guard.value())?)),
        }
    }

    pub fn set_local_entry(&self, id: &FileId, entry: &LocalFileEntry) -> Result<(), TrackingError> {
        let bytes = VersionedEntry::V1(latest::Entry::from(entry)).encode()?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LOCAL_FILES_TABLE)?;
            table.insert(id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Applies `update` to the entry of `id`, starting from an idle entry if none exists.
    pub fn update_local_entry(
        &self,
        id: &FileId,
        update: impl FnOnce(&mut LocalFileEntry),
    ) -> Result<LocalFileEntry, TrackingError> {
        let write_txn = self.db.begin_write()?;
        let entry;
        {
            let mut table = write_txn.open_table(LOCAL_FILES_TABLE)?;

            let mut current = match table.get(id.as_str())? {
                Some(guard) => decode_entry(guard.value())?,
                None => LocalFileEntry::default(),
            };
            update(&mut current);

            let bytes = VersionedEntry::V1(latest::Entry::from(&current)).encode()?;
            table.insert(id.as_str(), bytes.as_slice())?;
            entry = current;
        }
        write_txn.commit()?;
        Ok(entry)
    }

    pub fn remove_local_entry(&self, id: &FileId) -> Result<Option<LocalFileEntry>, TrackingError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(LOCAL_FILES_TABLE)?;
            let removed = table.remove(id.as_str())?;
            match removed {
                Some(guard) => Some(decode_entry(guard.value())?),
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// The whole local-only tracking document.
    ///
    /// Rows whose key is no longer a valid file id are skipped.
    pub fn local_file_state(&self) -> Result<LocalFileState, TrackingError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCAL_FILES_TABLE)?;

        let mut state = LocalFileState::default();
        for row in table.iter()? {
            let (key, value) = row?;
            let Ok(id) = FileId::try_from(key.value()) else {
                log::warn!("Skipping tracking row with invalid file id `{}`", key.value());
                continue;
            };
            state.insert(id, decode_entry(value.value())?);
        }
        Ok(state)
    }
}

/// Thumbnail status operations.
impl TrackingDb {
    pub fn thumbnail_status(
        &self,
        id: &FileId,
        tier: &TierName,
    ) -> Result<Option<ThumbnailStatus>, TrackingError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(THUMBNAILS_TABLE)?;

        let Some(guard) = table.get(id.as_str())? else {
            return Ok(None);
        };
        let thumbnails = decode_thumbnails(guard.value())?;
        Ok(thumbnails.sizes.get(tier.as_str()).map(|s| (*s).into()))
    }

    pub fn set_thumbnail_status(
        &self,
        id: &FileId,
        tier: &TierName,
        status: ThumbnailStatus,
    ) -> Result<(), TrackingError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(THUMBNAILS_TABLE)?;

            let mut thumbnails = match table.get(id.as_str())? {
                Some(guard) => decode_thumbnails(guard.value())?,
                None => latest::Thumbnails::default(),
            };
            thumbnails.sizes.insert(tier.to_string(), status.into());

            let bytes = VersionedThumbnails::V1(thumbnails).encode()?;
            table.insert(id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Cleanup operations.
impl TrackingDb {
    /// Drops the tracking entry and every thumbnail status of a file.
    pub fn remove_file(&self, id: &FileId) -> Result<(), TrackingError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut local_files = write_txn.open_table(LOCAL_FILES_TABLE)?;
            local_files.remove(id.as_str())?;

            let mut thumbnails = write_txn.open_table(THUMBNAILS_TABLE)?;
            thumbnails.remove(id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

fn decode_entry(bytes: &[u8]) -> Result<LocalFileEntry, TrackingError> {
    Ok(VersionedEntry::decode(bytes)?.into_latest().into())
}

fn decode_thumbnails(bytes: &[u8]) -> Result<latest::Thumbnails, TrackingError> {
    Ok(VersionedThumbnails::decode(bytes)?.into_latest())
}

impl LocalDocuments for TrackingDb {
    fn local_entry(&self, id: &FileId) -> Option<LocalFileEntry> {
        TrackingDb::local_entry(self, id)
            .inspect_err(|e| log::warn!("Failed to read tracking entry for {id}: {e:?}"))
            .ok()
            .flatten()
    }

    fn thumbnail_status(&self, id: &FileId, tier: &TierName) -> Option<ThumbnailStatus> {
        TrackingDb::thumbnail_status(self, id, tier)
            .inspect_err(|e| log::warn!("Failed to read thumbnail status for {id}/{tier}: {e:?}"))
            .ok()
            .flatten()
    }
}
