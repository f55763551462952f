//! Asset URL resolution with per-(file, tier) caching.
//!
//! Every resolution is keyed by file id and [`SizeTier`] and tagged with the version of
//! the record it started from. Concurrent callers for the same key and version share one
//! in-flight future. A resolution only reaches the cache if its key still maps to the
//! same version when it completes; otherwise its URL is released and callers get `None`.
//! Signed remote URLs are short-lived and handed out without being cached.
//! Resolutions for one key run one after another; different keys never wait on each
//! other.

use crate::blob_store::error::BlobStoreError;
use crate::blob_store::{BlobKey, BlobStore};
use crate::remote::RemoteFileService;
use crate::remote::error::RemoteError;
use crate::source::{FileRecords, LocalDocuments, SyncSource};
use crate::types::{
    ContentHash, FileId, FileRecord, FileVersion, RemoteConfig, SizeTier, ThumbnailStatus,
    TierName,
};
use error::ResolveError;
use futures::FutureExt;
use futures::future::{AbortHandle, Abortable, BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

pub mod error {
    use super::*;
    use thiserror::Error;

    /// Failure inside a resolution. Never returned to callers.
    #[derive(Debug, Error)]
    pub enum ResolveError {
        #[error("Blob store error: {0}")]
        BlobStore(#[from] BlobStoreError),

        #[error("Remote error: {0}")]
        Remote(#[from] RemoteError),

        #[error("Fetched bytes hash to {actual}, expected {expected}")]
        HashMismatch {
            expected: ContentHash,
            actual: ContentHash,
        },
    }
}

/// Where a resolved URL points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetSource {
    LocalOriginal,
    LocalThumbnail,
    /// A signed URL of the remote object.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub url: String,
    pub source: AssetSource,
}

impl ResolvedAsset {
    pub fn is_thumbnail(&self) -> bool {
        self.source == AssetSource::LocalThumbnail
    }

    /// Local URLs were minted by the blob store and must be revoked when dropped.
    pub fn is_local(&self) -> bool {
        matches!(
            self.source,
            AssetSource::LocalOriginal | AssetSource::LocalThumbnail
        )
    }
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Store fetched remote bytes locally and serve them from there.
    pub cache_downloads: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            cache_downloads: true,
        }
    }
}

impl From<&RemoteConfig> for ResolverOptions {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            cache_downloads: config.cache_downloads,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    file_id: FileId,
    tier: SizeTier,
}

/// What a cached URL was resolved from. Thumbnail tiers also depend on the tier status,
/// so a thumbnail turning `done` replaces the original shown in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheVersion {
    file: FileVersion,
    thumbnail: Option<ThumbnailStatus>,
}

type SharedResolution = Shared<BoxFuture<'static, Option<ResolvedAsset>>>;

struct CacheEntry {
    version: CacheVersion,
    asset: ResolvedAsset,
}

struct InFlight {
    ticket: u64,
    version: CacheVersion,
    future: SharedResolution,
    abort: AbortHandle,
}

#[derive(Default)]
struct ResolverState {
    disposed: bool,
    cache: HashMap<CacheKey, CacheEntry>,
    in_flight: HashMap<CacheKey, InFlight>,
    /// Invalidated resolutions still running. They never reach the cache, but the next
    /// resolution of their key waits for them.
    detached: HashMap<CacheKey, InFlight>,
    next_ticket: u64,
}

impl ResolverState {
    fn detach(&mut self, key: &CacheKey) {
        if let Some(in_flight) = self.in_flight.remove(key) {
            self.detached.insert(key.clone(), in_flight);
        }
    }

    fn detached_future(&self, key: &CacheKey) -> Option<SharedResolution> {
        self.detached
            .get(key)
            .map(|in_flight| in_flight.future.clone())
    }
}

struct Inner {
    source: Arc<dyn SyncSource>,
    blobs: Arc<dyn BlobStore>,
    remote: Arc<dyn RemoteFileService>,
    options: ResolverOptions,
    state: Mutex<ResolverState>,
}

/// Resolves displayable URLs for files. Cheap to clone; clones share one cache.
#[derive(Clone)]
pub struct AssetResolver {
    inner: Arc<Inner>,
}

impl AssetResolver {
    pub fn new(
        source: Arc<dyn SyncSource>,
        blobs: Arc<dyn BlobStore>,
        remote: Arc<dyn RemoteFileService>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                blobs,
                remote,
                options,
                state: Mutex::new(ResolverState::default()),
            }),
        }
    }

    pub async fn resolve_url(&self, file_id: &FileId, tier: &SizeTier) -> Option<String> {
        self.resolve_asset(file_id, tier).await.map(|asset| asset.url)
    }

    pub async fn resolve_original_url(&self, file_id: &FileId) -> Option<String> {
        self.resolve_url(file_id, &SizeTier::Full).await
    }

    /// Resolves a URL together with where it points. `None` when the record is not
    /// found, nothing is fetchable yet, an I/O step failed, or the result went stale.
    pub async fn resolve_asset(&self, file_id: &FileId, tier: &SizeTier) -> Option<ResolvedAsset> {
        let key = CacheKey {
            file_id: file_id.clone(),
            tier: tier.clone(),
        };
        let Some((file, version)) = self.inner.current(&key) else {
            self.inner.forget(&key);
            return None;
        };

        let mut released = Vec::new();
        let future = {
            let mut state = self.inner.lock();
            if state.disposed {
                return None;
            }

            if let Some(entry) = state.cache.get(&key) {
                if entry.version == version {
                    log::debug!("Resolved {file_id}/{tier} from cache");
                    return Some(entry.asset.clone());
                }
            }
            if let Some(stale) = state.cache.remove(&key) {
                released.push(stale.asset);
            }

            let running = state
                .in_flight
                .get(&key)
                .map(|in_flight| (in_flight.version == version, in_flight.future.clone()));
            match running {
                Some((true, future)) => {
                    log::debug!("Joining in-flight resolution of {file_id}/{tier}");
                    future
                }
                superseded => {
                    let previous = superseded
                        .map(|(_, future)| future)
                        .or_else(|| state.detached_future(&key));
                    self.inner.start(&mut state, key, file, version, previous)
                }
            }
        };

        for asset in released {
            self.inner.release(&asset);
        }
        future.await
    }

    /// Drops and releases every cached URL of a file. Running resolutions for it finish
    /// without reaching the cache; later resolutions of the same key wait for them.
    pub fn invalidate(&self, file_id: &FileId) {
        let released: Vec<ResolvedAsset> = {
            let mut state = self.inner.lock();
            let running: Vec<CacheKey> = state
                .in_flight
                .keys()
                .filter(|key| key.file_id == *file_id)
                .cloned()
                .collect();
            for key in &running {
                state.detach(key);
            }

            let stale: Vec<CacheKey> = state
                .cache
                .keys()
                .filter(|key| key.file_id == *file_id)
                .cloned()
                .collect();
            stale
                .iter()
                .filter_map(|key| state.cache.remove(key))
                .map(|entry| entry.asset)
                .collect()
        };

        for asset in &released {
            self.inner.release(asset);
        }
    }

    /// Releases every cached URL and aborts running resolutions; waiting callers get
    /// `None`. Every later call returns `None`.
    pub fn dispose(&self) {
        let (cached, in_flight, detached) = {
            let mut state = self.inner.lock();
            state.disposed = true;
            (
                std::mem::take(&mut state.cache),
                std::mem::take(&mut state.in_flight),
                std::mem::take(&mut state.detached),
            )
        };

        for in_flight in in_flight.into_values().chain(detached.into_values()) {
            in_flight.abort.abort();
        }
        let released = cached.len();
        for entry in cached.into_values() {
            self.inner.release(&entry.asset);
        }
        log::info!("Asset resolver disposed, released {released} cached URLs");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().disposed
    }

    /// Number of cached (file, tier) entries.
    pub fn cached_len(&self) -> usize {
        self.inner.lock().cache.len()
    }

    pub fn source(&self) -> &Arc<dyn SyncSource> {
        &self.inner.source
    }
}

/// Bookkeeping.
impl Inner {
    fn lock(&self) -> MutexGuard<'_, ResolverState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current(&self, key: &CacheKey) -> Option<(FileRecord, CacheVersion)> {
        let file = self.source.file(&key.file_id)?;
        let thumbnail = key.tier.tier_name().map(|tier| {
            self.source
                .thumbnail_status(&key.file_id, tier)
                .unwrap_or_default()
        });
        let version = CacheVersion {
            file: file.version(),
            thumbnail,
        };
        Some((file, version))
    }

    /// Drops everything held for a key whose record is gone.
    fn forget(&self, key: &CacheKey) {
        let stale = {
            let mut state = self.lock();
            state.detach(key);
            state.cache.remove(key)
        };
        if let Some(stale) = stale {
            log::debug!("Releasing {}/{} of a missing record", key.file_id, key.tier);
            self.release(&stale.asset);
        }
    }

    fn start(
        self: &Arc<Self>,
        state: &mut ResolverState,
        key: CacheKey,
        file: FileRecord,
        version: CacheVersion,
        previous: Option<SharedResolution>,
    ) -> SharedResolution {
        let ticket = state.next_ticket;
        state.next_ticket += 1;

        let inner = Arc::clone(self);
        let task_key = key.clone();
        let task_version = version.clone();
        let task = async move {
            // Serialize with the superseded resolution of this key.
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let resolved = inner.resolve_uncached(&file, &task_key.tier).await;
            inner.commit(task_key, task_version, ticket, resolved)
        };

        let (abort, registration) = AbortHandle::new_pair();
        let future = Abortable::new(task, registration)
            .map(|result| result.unwrap_or(None))
            .boxed()
            .shared();

        state.in_flight.insert(
            key,
            InFlight {
                ticket,
                version,
                future: future.clone(),
                abort,
            },
        );
        future
    }

    /// Writes a finished resolution to the cache if it is still current.
    fn commit(
        &self,
        key: CacheKey,
        version: CacheVersion,
        ticket: u64,
        resolved: Option<ResolvedAsset>,
    ) -> Option<ResolvedAsset> {
        let current = self.current(&key).map(|(_, version)| version);

        let mut state = self.lock();
        let ours = state
            .in_flight
            .get(&key)
            .is_some_and(|in_flight| in_flight.ticket == ticket);
        if ours {
            state.in_flight.remove(&key);
        }
        if state
            .detached
            .get(&key)
            .is_some_and(|in_flight| in_flight.ticket == ticket)
        {
            state.detached.remove(&key);
        }

        let asset = resolved?;
        if !ours || state.disposed || current.as_ref() != Some(&version) {
            drop(state);
            log::debug!(
                "Discarding stale resolution of {}/{}",
                key.file_id,
                key.tier
            );
            self.release(&asset);
            return None;
        }

        // Signed URLs expire, so only local URLs are cached.
        if !asset.is_local() {
            return Some(asset);
        }

        let previous = state.cache.insert(
            key,
            CacheEntry {
                version,
                asset: asset.clone(),
            },
        );
        drop(state);

        if let Some(previous) = previous {
            if previous.asset.url != asset.url {
                self.release(&previous.asset);
            }
        }
        Some(asset)
    }

    fn release(&self, asset: &ResolvedAsset) {
        if asset.is_local() {
            self.blobs.revoke_object_url(&asset.url);
        }
    }
}

/// Resolution proper. Suspends only at blob store and remote calls.
impl Inner {
    async fn resolve_uncached(&self, file: &FileRecord, tier: &SizeTier) -> Option<ResolvedAsset> {
        let result = match tier {
            SizeTier::Full => self.resolve_original(file).await,
            SizeTier::Thumbnail(name) => self.resolve_thumbnail(file, name).await,
        };
        result
            .inspect_err(|e| log::warn!("Failed to resolve {}/{tier}: {e}", file.id))
            .ok()
            .flatten()
    }

    /// A thumbnail is only looked up once generated; anything else degrades to the
    /// original.
    async fn resolve_thumbnail(
        &self,
        file: &FileRecord,
        tier: &TierName,
    ) -> Result<Option<ResolvedAsset>, ResolveError> {
        if self.source.thumbnail_status(&file.id, tier) == Some(ThumbnailStatus::Done) {
            match self.blobs.object_url(&BlobKey::thumbnail(&file.id, tier)).await {
                Ok(Some(url)) => {
                    return Ok(Some(ResolvedAsset {
                        url,
                        source: AssetSource::LocalThumbnail,
                    }));
                }
                Ok(None) => {
                    log::debug!("Thumbnail {}/{tier} is done but missing locally", file.id)
                }
                Err(e) => log::warn!("Failed to read thumbnail {}/{tier}: {e}", file.id),
            }
        }
        self.resolve_original(file).await
    }

    async fn resolve_original(
        &self,
        file: &FileRecord,
    ) -> Result<Option<ResolvedAsset>, ResolveError> {
        let key = BlobKey::original(file);

        match self.local_original_url(file, &key).await {
            Ok(Some(url)) => {
                return Ok(Some(ResolvedAsset {
                    url,
                    source: AssetSource::LocalOriginal,
                }));
            }
            Ok(None) => {}
            Err(e) => log::warn!("Local lookup of {} failed, trying remote: {e}", file.id),
        }

        if file.remote_key.is_none() {
            return Ok(None);
        }
        let signed_url = self.remote.sign_download(&file.id).await?;

        if self.options.cache_downloads {
            match self.cache_remote_bytes(file, &key, &signed_url).await {
                Ok(Some(url)) => {
                    return Ok(Some(ResolvedAsset {
                        url,
                        source: AssetSource::LocalOriginal,
                    }));
                }
                Ok(None) => {}
                Err(e) => log::warn!("Failed to cache remote bytes of {}: {e}", file.id),
            }
        }

        Ok(Some(ResolvedAsset {
            url: signed_url,
            source: AssetSource::Remote,
        }))
    }

    /// URL of the local original if it holds the record's content.
    ///
    /// A tracking entry with a known local hash is trusted; without one the bytes are
    /// hashed, since blobs cached by the resolver are not tracked.
    async fn local_original_url(
        &self,
        file: &FileRecord,
        key: &BlobKey,
    ) -> Result<Option<String>, ResolveError> {
        let tracked_hash = self
            .source
            .local_entry(&file.id)
            .and_then(|entry| entry.local_hash);

        let valid = match tracked_hash {
            Some(hash) => hash == file.content_hash && self.blobs.has(key).await?,
            None => match self.blobs.get(key).await? {
                Some(bytes) => ContentHash::of(&bytes) == file.content_hash,
                None => false,
            },
        };
        if !valid {
            return Ok(None);
        }
        Ok(self.blobs.object_url(key).await?)
    }

    async fn cache_remote_bytes(
        &self,
        file: &FileRecord,
        key: &BlobKey,
        signed_url: &str,
    ) -> Result<Option<String>, ResolveError> {
        let bytes = self.remote.fetch(signed_url).await?;

        let actual = ContentHash::of(&bytes);
        if actual != file.content_hash {
            return Err(ResolveError::HashMismatch {
                expected: file.content_hash.clone(),
                actual,
            });
        }

        self.blobs.put(key, &bytes).await?;
        Ok(self.blobs.object_url(key).await?)
    }
}
