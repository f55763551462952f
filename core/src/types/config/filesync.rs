use crate::types::{FULL_TIER, TierName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// User-facing file sync configuration, persisted as filesync.toml.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSyncConfig {
    #[serde(default)]
    pub thumbnails: ThumbnailConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

impl FileSyncConfig {
    /// Returns the config file path within the given data directory.
    pub fn path(data_dir: &Path) -> std::path::PathBuf {
        data_dir.join("filesync.toml")
    }

    /// Loads config from a TOML file. Returns default config if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates config values and returns list of validation errors.
    /// Returns empty vec if config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.thumbnails.sizes.is_empty() {
            errors.push("thumbnails.sizes must name at least one tier".to_string());
        }

        for (name, dimension) in &self.thumbnails.sizes {
            if TierName::try_from(name.as_str()).is_err() {
                errors.push(format!("thumbnail tier name `{name}` is not valid"));
            }
            if *dimension == 0 {
                errors.push(format!("thumbnail tier `{name}` must be at least 1 pixel"));
            }
        }

        if self.preprocess.max_dimension == 0 {
            errors.push("preprocess.max_dimension must be at least 1".to_string());
        }

        if !(1..=100).contains(&self.preprocess.quality) {
            errors.push("preprocess.quality must be between 1 and 100".to_string());
        }

        errors
    }

    /// Returns a validated config, replacing invalid values with defaults.
    pub fn with_defaults_for_invalid(&self) -> Self {
        let defaults = Self::default();

        let sizes: BTreeMap<String, u32> = self
            .thumbnails
            .sizes
            .iter()
            .filter(|(name, dimension)| {
                **dimension > 0 && TierName::try_from(name.as_str()).is_ok()
            })
            .map(|(name, dimension)| (name.clone(), *dimension))
            .collect();

        Self {
            thumbnails: ThumbnailConfig {
                sizes: if sizes.is_empty() {
                    defaults.thumbnails.sizes
                } else {
                    sizes
                },
                format: self.thumbnails.format,
            },
            preprocess: PreprocessConfig {
                max_dimension: if self.preprocess.max_dimension == 0 {
                    defaults.preprocess.max_dimension
                } else {
                    self.preprocess.max_dimension
                },
                quality: if (1..=100).contains(&self.preprocess.quality) {
                    self.preprocess.quality
                } else {
                    defaults.preprocess.quality
                },
                format: self.preprocess.format,
            },
            remote: self.remote.clone(),
        }
    }

    /// Configured thumbnail tiers, skipping invalid names.
    pub fn tiers(&self) -> Vec<TierName> {
        self.thumbnails
            .sizes
            .keys()
            .filter(|name| name.as_str() != FULL_TIER)
            .filter_map(|name| TierName::try_from(name.as_str()).ok())
            .collect()
    }
}

/// Thumbnail tiers and their output format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Tier name -> maximum dimension in pixels.
    #[serde(default = "default_thumbnail_sizes")]
    pub sizes: BTreeMap<String, u32>,
    /// Read by the thumbnail generator, which writes the tier blobs this crate serves.
    #[serde(default = "default_thumbnail_format")]
    pub format: ImageFormat,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            sizes: default_thumbnail_sizes(),
            format: default_thumbnail_format(),
        }
    }
}

/// Options handed to the preprocessing pipeline before a file is saved.
///
/// Carried for the upload side; nothing in this crate transforms image bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_quality")]
    pub quality: u8,
    #[serde(default = "default_preprocess_format")]
    pub format: ImageFormat,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            quality: default_quality(),
            format: default_preprocess_format(),
        }
    }
}

/// Remote file service settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the signing endpoints, for [`crate::remote::RemoteFileService`]
    /// implementations.
    #[serde(default = "default_signer_base_url")]
    pub signer_base_url: String,
    /// Whether signing requests carry the session cookie. Read by the same implementations.
    #[serde(default = "default_true")]
    pub include_credentials: bool,
    /// Store fetched remote bytes in the local blob store for offline access.
    #[serde(default = "default_true")]
    pub cache_downloads: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            signer_base_url: default_signer_base_url(),
            include_credentials: true,
            cache_downloads: true,
        }
    }
}

/// Encoded image format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Webp,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
            ImageFormat::Png => "png",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Jpeg => write!(f, "jpeg"),
            ImageFormat::Webp => write!(f, "webp"),
            ImageFormat::Png => write!(f, "png"),
        }
    }
}

fn default_thumbnail_sizes() -> BTreeMap<String, u32> {
    BTreeMap::from([
        ("small".to_string(), 400),
        ("medium".to_string(), 600),
        ("large".to_string(), 1200),
    ])
}

fn default_thumbnail_format() -> ImageFormat {
    ImageFormat::Webp
}

fn default_max_dimension() -> u32 {
    1500
}

fn default_quality() -> u8 {
    85
}

fn default_preprocess_format() -> ImageFormat {
    ImageFormat::Jpeg
}

fn default_signer_base_url() -> String {
    "/api".to_string()
}

fn default_true() -> bool {
    true
}

/// Errors that can occur when loading or saving config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
