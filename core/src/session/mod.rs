//! Per-user session context.
//!
//! A [`FileSync`] owns the asset resolver of one signed-in user. Consumers get it from a
//! [`SessionSlot`] and hold the `Arc` they were handed; when the user changes, the slot
//! disposes the old session before the new one is built, so no URL minted for one user's
//! blobs survives into the next session.

use crate::blob_store::BlobStore;
use crate::display::DisplayState;
use crate::remote::RemoteFileService;
use crate::resolver::{AssetResolver, ResolverOptions};
use crate::source::SyncSource;
use crate::types::{FileId, FileSyncConfig, SizeTier};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct FileSync {
    user_id: String,
    config: FileSyncConfig,
    resolver: AssetResolver,
}

impl FileSync {
    pub fn start(
        user_id: impl Into<String>,
        config: FileSyncConfig,
        source: Arc<dyn SyncSource>,
        blobs: Arc<dyn BlobStore>,
        remote: Arc<dyn RemoteFileService>,
    ) -> Self {
        let user_id = user_id.into();
        let config = config.with_defaults_for_invalid();
        let resolver =
            AssetResolver::new(source, blobs, remote, ResolverOptions::from(&config.remote));
        log::info!("File sync session started for user {user_id}");

        Self {
            user_id,
            config,
            resolver,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn config(&self) -> &FileSyncConfig {
        &self.config
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    pub fn display_state(&self, file_id: &FileId) -> Option<DisplayState> {
        self.resolver.source().display_state(file_id)
    }

    /// Parses a tier name, accepting `full` and the configured thumbnail tiers only.
    pub fn tier(&self, name: &str) -> Option<SizeTier> {
        let tier: SizeTier = name.parse().ok()?;
        match tier.tier_name() {
            None => Some(tier),
            Some(name) => self.config.tiers().contains(name).then_some(tier),
        }
    }

    pub fn image_view(&self) -> ImageView {
        ImageView {
            resolver: self.resolver.clone(),
        }
    }

    pub fn dispose(&self) {
        self.resolver.dispose();
        log::info!("File sync session of user {} disposed", self.user_id);
    }

    pub fn is_disposed(&self) -> bool {
        self.resolver.is_disposed()
    }
}

/// Holds the session of the signed-in user, if any.
#[derive(Default)]
pub struct SessionSlot {
    current: Mutex<Option<Arc<FileSync>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session of `user_id`, building it with `build` unless it is already
    /// active. Another user's session is disposed first.
    pub fn activate(&self, user_id: &str, build: impl FnOnce() -> FileSync) -> Arc<FileSync> {
        match self.try_activate(user_id, || Ok::<_, std::convert::Infallible>(build())) {
            Ok(session) => session,
            Err(never) => match never {},
        }
    }

    /// Like [`SessionSlot::activate`] for fallible builders. On error the slot is left
    /// empty.
    pub fn try_activate<E>(
        &self,
        user_id: &str,
        build: impl FnOnce() -> Result<FileSync, E>,
    ) -> Result<Arc<FileSync>, E> {
        let mut current = self.lock();
        if let Some(session) = current.as_ref() {
            if session.user_id() == user_id && !session.is_disposed() {
                return Ok(Arc::clone(session));
            }
        }

        if let Some(previous) = current.take() {
            log::info!(
                "Switching file sync session from {} to {user_id}",
                previous.user_id()
            );
            previous.dispose();
        }

        let session = Arc::new(build()?);
        *current = Some(Arc::clone(&session));
        Ok(session)
    }

    pub fn current(&self) -> Option<Arc<FileSync>> {
        self.lock().clone()
    }

    /// Disposes and clears the active session. Returns false when none was active.
    pub fn logout(&self) -> bool {
        let previous = self.lock().take();
        match previous {
            Some(session) => {
                session.dispose();
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<FileSync>>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// What an image view renders for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSyncImageState {
    pub is_uploading: bool,
    pub is_downloading: bool,
    pub can_display: bool,
    pub is_using_thumbnail: bool,
    pub src: Option<String>,
}

impl FileSyncImageState {
    /// Whether the view shows the image rather than a placeholder.
    pub fn shows_image(&self) -> bool {
        self.can_display && self.src.is_some()
    }
}

/// Combines display state with URL resolution for image views.
#[derive(Clone)]
pub struct ImageView {
    resolver: AssetResolver,
}

impl ImageView {
    pub fn new(resolver: AssetResolver) -> Self {
        Self { resolver }
    }

    /// `None` when the file record is not found.
    pub async fn state(&self, file_id: &FileId, tier: &SizeTier) -> Option<FileSyncImageState> {
        let display = self.resolver.source().display_state(file_id)?;
        let asset = self.resolver.resolve_asset(file_id, tier).await;

        Some(FileSyncImageState {
            is_uploading: display.is_uploading,
            is_downloading: display.is_downloading,
            can_display: display.can_display,
            is_using_thumbnail: asset.as_ref().is_some_and(|asset| asset.is_thumbnail()),
            src: asset.map(|asset| asset.url),
        })
    }

    pub async fn original_state(&self, file_id: &FileId) -> Option<FileSyncImageState> {
        self.state(file_id, &SizeTier::Full).await
    }
}

impl std::fmt::Debug for FileSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSync")
            .field("user_id", &self.user_id)
            .field("tiers", &self.config.tiers())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
