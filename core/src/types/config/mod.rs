mod core;
mod filesync;

pub use self::core::Config;
pub use filesync::{
    ConfigError, FileSyncConfig, ImageFormat, PreprocessConfig, RemoteConfig, ThumbnailConfig,
};
