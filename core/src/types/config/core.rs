use std::path::PathBuf;

/// Runtime paths of one user's local file sync data.
#[derive(Clone, Debug)]
pub struct Config {
    pub base_path: PathBuf,
}

impl Config {
    pub fn blobs_path(&self) -> PathBuf {
        self.base_path.join("blobs")
    }

    pub fn thumbnails_path(&self) -> PathBuf {
        self.base_path.join("thumbnails")
    }

    pub fn tracking_db_path(&self) -> PathBuf {
        self.base_path.join("tracking.redb")
    }
}
