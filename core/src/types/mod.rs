pub(crate) mod config;
pub use config::{
    Config, ConfigError, FileSyncConfig, ImageFormat, PreprocessConfig, RemoteConfig,
    ThumbnailConfig,
};

pub(crate) mod file_id;
pub use file_id::{FileId, FileIdError, MAX_FILE_ID_LENGTH};

pub(crate) mod hash;
pub use hash::ContentHash;

pub(crate) mod file;
pub use file::{FileRecord, FileVersion};

pub(crate) mod local;
pub use local::{LocalFileEntry, LocalFileState, TransferStatus};

pub(crate) mod tier;
pub use tier::{FULL_TIER, SizeTier, TierName, TierNameError};

pub(crate) mod thumbnail;
pub use thumbnail::{ThumbnailState, ThumbnailStatus};
