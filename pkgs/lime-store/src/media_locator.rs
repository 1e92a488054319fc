//! Two-speed media lookup
//!
//! The locator keeps a hot map of materialized blobs (each with a live object
//! URL) on top of the persistent [`BlobStore`]. Lookups are either
//! synchronous and cache-only ([`MediaLocator::url_for`]) or asynchronous
//! ([`MediaLocator::url_for_async`]).
//!
//! Every key moves through `Unknown -> Known -> Loading -> Loaded`. A loading
//! key holds one shared future that every caller joins, so a blob is fetched
//! and registered once. [`MediaLocator::clear`] bumps an epoch; loads that
//! finish under an older epoch are dropped instead of registered.

use crate::attachment::MediaUrls;
use crate::blob_store::{BlobStore, Progress};
use crate::error::Result;
use crate::media_key::MediaKey;
use crate::object_urls::ObjectUrls;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

type LoadFuture = Shared<BoxFuture<'static, Option<String>>>;

/// A materialized blob and the object URL issued for it
#[derive(Debug)]
pub struct MediaFile {
    pub bytes: Bytes,
    pub url: String,
    pub content_type: String,
}

/// Where a key currently sits in the locator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Unknown,
    Known,
    Loading,
    Loaded,
}

enum Slot {
    Loading(LoadFuture),
    Loaded(Arc<MediaFile>),
}

#[derive(Default)]
struct LocatorState {
    epoch: u64,
    known: HashSet<MediaKey>,
    slots: HashMap<MediaKey, Slot>,
    storage_backed: bool,
    initialized: bool,
}

impl LocatorState {
    fn loaded_url(&self, key: &MediaKey) -> Option<String> {
        match self.slots.get(key) {
            Some(Slot::Loaded(file)) => Some(file.url.clone()),
            _ => None,
        }
    }

    fn loaded_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Loaded(_)))
            .count()
    }
}

struct Inner {
    store: Arc<dyn BlobStore>,
    urls: ObjectUrls,
    state: Mutex<LocatorState>,
}

impl Inner {
    /// Register a fetched blob unless the epoch moved or another load won
    fn materialize(&self, key: MediaKey, data: Bytes, epoch: u64) -> Option<String> {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            debug!("Dropping media {} loaded before clear", key);
            return None;
        }
        if let Some(url) = state.loaded_url(&key) {
            return Some(url);
        }

        let file = Arc::new(MediaFile {
            content_type: mime_guess::from_path(key.filename())
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            url: self.urls.issue(data.clone()),
            bytes: data,
        });
        let url = file.url.clone();
        state.known.insert(key.clone());
        state.slots.insert(key, Slot::Loaded(file));
        Some(url)
    }

    /// Drop the loading slot; `forget` also drops the key so it is not refetched
    fn abandon(&self, key: &MediaKey, epoch: u64, forget: bool) {
        let mut state = self.state.lock();
        if state.epoch != epoch || !matches!(state.slots.get(key), Some(Slot::Loading(_))) {
            return;
        }
        state.slots.remove(key);
        if forget {
            state.known.remove(key);
        }
    }

    async fn fetch(self: Arc<Self>, key: MediaKey, epoch: u64) -> Option<String> {
        match self.store.get(&key).await {
            Ok(Some(data)) => self.materialize(key, data, epoch),
            Ok(None) => {
                debug!("Media {} is known but missing from the store", key);
                self.abandon(&key, epoch, true);
                None
            }
            Err(e) => {
                warn!("Failed to lazy load media {}: {}", key, e);
                self.abandon(&key, epoch, false);
                None
            }
        }
    }
}

/// Media cache shared by the row mapper and the session
///
/// Cloning is cheap and every clone sees the same cache.
#[derive(Clone)]
pub struct MediaLocator {
    inner: Arc<Inner>,
}

impl MediaLocator {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                urls: ObjectUrls::new(),
                state: Mutex::new(LocatorState::default()),
            }),
        }
    }

    /// The object URL registry backing the issued URLs
    pub fn urls(&self) -> &ObjectUrls {
        &self.inner.urls
    }

    fn start_load(&self, state: &mut LocatorState, key: MediaKey) -> LoadFuture {
        let inner = Arc::clone(&self.inner);
        let epoch = state.epoch;
        let load = inner.fetch(key.clone(), epoch).boxed().shared();
        state.slots.insert(key, Slot::Loading(load.clone()));
        load
    }

    /// Cache-only lookup
    ///
    /// A key that is known to the persistent tier but not loaded yet starts
    /// a background load and returns `None`; callers re-query later. Without
    /// a Tokio runtime nothing is started and the key stays `Known`.
    pub fn url_for(&self, conversation_id: &str, filename: &str) -> Option<String> {
        let key = MediaKey::new(conversation_id, filename);
        let mut state = self.inner.state.lock();

        match state.slots.get(&key) {
            Some(Slot::Loaded(file)) => return Some(file.url.clone()),
            Some(Slot::Loading(_)) => return None,
            None => {}
        }
        if !state.known.contains(&key) {
            return None;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime for background load of {}", key);
            return None;
        };
        let load = self.start_load(&mut state, key);
        drop(state);

        handle.spawn(load);
        None
    }

    /// Lookup that waits for the persistent tier when needed
    pub async fn url_for_async(&self, conversation_id: &str, filename: &str) -> Option<String> {
        let key = MediaKey::new(conversation_id, filename);
        let load = {
            let mut state = self.inner.state.lock();
            match state.slots.get(&key) {
                Some(Slot::Loaded(file)) => return Some(file.url.clone()),
                Some(Slot::Loading(load)) => load.clone(),
                None if state.known.contains(&key) => self.start_load(&mut state, key),
                None => return None,
            }
        };

        load.await
    }

    /// Whether the key is loaded or known to the persistent tier
    pub fn has(&self, conversation_id: &str, filename: &str) -> bool {
        let key = MediaKey::new(conversation_id, filename);
        let state = self.inner.state.lock();
        state.slots.contains_key(&key) || state.known.contains(&key)
    }

    /// Bytes of a loaded blob; never touches the persistent tier
    pub fn blob_for(&self, conversation_id: &str, filename: &str) -> Option<Bytes> {
        self.media_file(conversation_id, filename)
            .map(|file| file.bytes.clone())
    }

    pub fn media_file(&self, conversation_id: &str, filename: &str) -> Option<Arc<MediaFile>> {
        let key = MediaKey::new(conversation_id, filename);
        match self.inner.state.lock().slots.get(&key) {
            Some(Slot::Loaded(file)) => Some(Arc::clone(file)),
            _ => None,
        }
    }

    pub fn state(&self, conversation_id: &str, filename: &str) -> MediaState {
        let key = MediaKey::new(conversation_id, filename);
        let state = self.inner.state.lock();
        match state.slots.get(&key) {
            Some(Slot::Loaded(_)) => MediaState::Loaded,
            Some(Slot::Loading(_)) => MediaState::Loading,
            None if state.known.contains(&key) => MediaState::Known,
            None => MediaState::Unknown,
        }
    }

    /// Materialize every known, not yet loaded key of one conversation
    pub async fn preload_conversation(&self, conversation_id: &str) -> Result<()> {
        let epoch = {
            let state = self.inner.state.lock();
            if !state.storage_backed {
                return Ok(());
            }
            let pending = state.known.iter().any(|key| {
                key.belongs_to(conversation_id)
                    && !matches!(state.slots.get(key), Some(Slot::Loaded(_)))
            });
            if !pending {
                return Ok(());
            }
            state.epoch
        };

        let blobs = self.inner.store.get_by_conversation(conversation_id).await?;
        let count = blobs.len();
        for (key, data) in blobs {
            self.inner.materialize(key, data, epoch);
        }

        debug!(
            "Preloaded {} media blobs for conversation {}",
            count, conversation_id
        );
        Ok(())
    }

    /// Replace the cache with a freshly ingested batch
    ///
    /// Every blob is registered in the hot map right away. With `persist`
    /// the batch is also written to the store; progress covers the upper
    /// half of the range (reading the batch is the lower half).
    pub async fn load_batch(
        &self,
        batch: BTreeMap<MediaKey, Bytes>,
        persist: bool,
        batch_size: usize,
        progress: Progress<'_>,
    ) -> Result<usize> {
        self.clear();

        let count = batch.len();
        {
            let mut state = self.inner.state.lock();
            for (key, data) in &batch {
                let file = Arc::new(MediaFile {
                    content_type: mime_guess::from_path(key.filename())
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string(),
                    url: self.inner.urls.issue(data.clone()),
                    bytes: data.clone(),
                });
                state.known.insert(key.clone());
                state.slots.insert(key.clone(), Slot::Loaded(file));
            }
            state.initialized = true;
            state.storage_backed = persist;
        }

        if persist && count > 0 {
            let items = batch.into_iter().collect::<Vec<_>>();
            let mut scaled = |percent: u8| progress(50 + percent / 2);
            self.inner
                .store
                .put_many(items, batch_size, &mut scaled)
                .await?;
        } else {
            progress(100);
        }

        info!("Loaded {} media files", count);
        Ok(count)
    }

    /// Load the key set of the persistent tier without materializing blobs
    ///
    /// Returns `false` and leaves the cache untouched when the store is empty.
    pub async fn load_from_storage(&self) -> Result<bool> {
        let keys = self.inner.store.keys().await?;
        if keys.is_empty() {
            return Ok(false);
        }

        self.clear();
        let count = keys.len();
        {
            let mut state = self.inner.state.lock();
            state.known = keys;
            state.storage_backed = true;
            state.initialized = true;
        }

        info!("Found {} stored media keys", count);
        Ok(true)
    }

    /// Revoke every issued URL and forget all keys
    ///
    /// In-flight loads still run to completion but their results are dropped.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock();
        let mut revoked = 0;
        for slot in state.slots.values() {
            if let Slot::Loaded(file) = slot {
                if self.inner.urls.revoke(&file.url) {
                    revoked += 1;
                }
            }
        }

        let epoch = state.epoch + 1;
        *state = LocatorState {
            epoch,
            ..LocatorState::default()
        };

        if revoked > 0 {
            debug!("Revoked {} media URLs", revoked);
        }
    }

    /// Number of media files, loaded or known
    pub fn media_count(&self) -> usize {
        let state = self.inner.state.lock();
        state.loaded_count().max(state.known.len())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().initialized
    }
}

impl MediaUrls for MediaLocator {
    fn url_for(&self, conversation_id: &str, filename: &str) -> Option<String> {
        MediaLocator::url_for(self, conversation_id, filename)
    }
}
