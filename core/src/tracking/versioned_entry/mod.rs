//! On-disk encoding of tracking documents: one version byte, then a postcard body.

use super::error::TrackingError;
pub use v1 as latest;

pub mod v1;

pub trait EntryVariant {
    const VERSION: u8;
}

#[derive(Debug, Clone)]
pub enum VersionedEntry {
    V1(v1::Entry),
}

#[derive(Debug, Clone)]
pub enum VersionedThumbnails {
    V1(v1::Thumbnails),
}

impl VersionedEntry {
    pub fn encode(&self) -> Result<Vec<u8>, TrackingError> {
        match self {
            VersionedEntry::V1(v1) => Ok(postcard::to_extend(v1, vec![v1::Entry::VERSION])?),
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, TrackingError> {
        let (version, body) = data.split_first().ok_or(TrackingError::EmptyValue)?;
        match *version {
            v1::Entry::VERSION => Ok(VersionedEntry::V1(postcard::from_bytes(body)?)),
            version => Err(TrackingError::UnsupportedVersion(version)),
        }
    }

    pub fn into_latest(self) -> latest::Entry {
        match self {
            VersionedEntry::V1(v1) => v1,
        }
    }
}

impl VersionedThumbnails {
    pub fn encode(&self) -> Result<Vec<u8>, TrackingError> {
        match self {
            VersionedThumbnails::V1(v1) => {
                Ok(postcard::to_extend(v1, vec![v1::Thumbnails::VERSION])?)
            }
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, TrackingError> {
        let (version, body) = data.split_first().ok_or(TrackingError::EmptyValue)?;
        match *version {
            v1::Thumbnails::VERSION => Ok(VersionedThumbnails::V1(postcard::from_bytes(body)?)),
            version => Err(TrackingError::UnsupportedVersion(version)),
        }
    }

    pub fn into_latest(self) -> latest::Thumbnails {
        match self {
            VersionedThumbnails::V1(v1) => v1,
        }
    }
}
