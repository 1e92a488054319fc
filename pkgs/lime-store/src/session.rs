//! Viewer session: owns every long-lived piece of one backup being viewed

use crate::blob_store::{BlobStore, Progress, SnapshotKind, SqliteBlobStore};
use crate::chat_database::ChatDatabase;
use crate::contact_directory::ContactDirectory;
use crate::error::{LimeError, Result};
use crate::ingest::{self, MediaBatch};
use crate::media_locator::MediaLocator;
use crate::ViewerConfig;
use bytes::Bytes;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Explicit context passed to the row mapper and the exporter
///
/// Holds the blob store handle, the contact directory, the media locator and
/// the currently open snapshot. [`ViewerSession::reset`] tears all of it down.
pub struct ViewerSession {
    config: ViewerConfig,
    store: Arc<dyn BlobStore>,
    contacts: Arc<ContactDirectory>,
    media: MediaLocator,
    database: RwLock<Option<Arc<ChatDatabase>>>,
}

impl ViewerSession {
    /// Open a session backed by the SQLite store at `config.store_path`
    pub async fn new(config: ViewerConfig) -> Result<Self> {
        let store = SqliteBlobStore::new(&config.store_path).await?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn with_store(config: ViewerConfig, store: Arc<dyn BlobStore>) -> Self {
        Self {
            config,
            media: MediaLocator::new(Arc::clone(&store)),
            store,
            contacts: Arc::new(ContactDirectory::new()),
            database: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub fn contacts(&self) -> &Arc<ContactDirectory> {
        &self.contacts
    }

    pub fn media(&self) -> &MediaLocator {
        &self.media
    }

    /// Open a snapshot from raw bytes, replacing any open one
    pub async fn open_database_bytes(&self, bytes: Bytes, persist: bool) -> Result<Arc<ChatDatabase>> {
        let database = Arc::new(ChatDatabase::from_bytes(
            &bytes,
            Arc::clone(&self.contacts),
            self.media.clone(),
        )?);

        if persist {
            self.store.save_snapshot(SnapshotKind::Database, bytes).await?;
        }

        *self.database.write() = Some(Arc::clone(&database));
        Ok(database)
    }

    /// Open a snapshot file, replacing any open one
    pub async fn open_database_file(&self, path: &Path, persist: bool) -> Result<Arc<ChatDatabase>> {
        if persist {
            let bytes = tokio::fs::read(path).await?;
            return self.open_database_bytes(Bytes::from(bytes), true).await;
        }

        let database = Arc::new(ChatDatabase::open(
            path,
            Arc::clone(&self.contacts),
            self.media.clone(),
        )?);
        *self.database.write() = Some(Arc::clone(&database));
        Ok(database)
    }

    /// Replace the contact directory with a CSV export
    pub async fn load_contacts(&self, csv: &str, persist: bool) -> Result<usize> {
        let count = self.contacts.load_csv(csv);
        if persist {
            self.store
                .save_snapshot(SnapshotKind::Contacts, Bytes::copy_from_slice(csv.as_bytes()))
                .await?;
        }
        Ok(count)
    }

    /// Import the media of an extracted backup folder
    pub async fn import_media_folder(
        &self,
        root: &Path,
        persist: bool,
        progress: Progress<'_>,
    ) -> Result<usize> {
        let batch = ingest::read_media_folder(root).await?;
        self.load_media(batch, persist, progress).await
    }

    /// Import the media of a ZIP archive
    pub async fn import_media_zip(
        &self,
        archive: &Path,
        persist: bool,
        progress: Progress<'_>,
    ) -> Result<usize> {
        let batch = ingest::read_media_zip(archive).await?;
        self.load_media(batch, persist, progress).await
    }

    async fn load_media(
        &self,
        batch: MediaBatch,
        persist: bool,
        progress: Progress<'_>,
    ) -> Result<usize> {
        progress(50);
        self.media
            .load_batch(batch, persist, self.config.media_batch_size, progress)
            .await
    }

    /// Reopen the snapshot, contacts and media keys saved by an earlier import
    ///
    /// Returns `false` when nothing was saved.
    pub async fn restore(&self) -> Result<bool> {
        let Some(bytes) = self.store.load_snapshot(SnapshotKind::Database).await? else {
            return Ok(false);
        };
        self.open_database_bytes(bytes, false).await?;

        if let Some(csv) = self.store.load_snapshot(SnapshotKind::Contacts).await? {
            self.contacts.load_csv(&String::from_utf8_lossy(&csv));
        }

        if !self.media.load_from_storage().await? {
            warn!("Restored session has no stored media");
        }

        info!("Restored session from {}", self.config.store_path.display());
        Ok(true)
    }

    /// The open snapshot
    pub fn database(&self) -> Result<Arc<ChatDatabase>> {
        self.database
            .read()
            .clone()
            .ok_or(LimeError::NotInitialized("database"))
    }

    pub fn is_open(&self) -> bool {
        self.database.read().is_some()
    }

    pub async fn has_stored_data(&self) -> Result<bool> {
        self.store.has_snapshot(SnapshotKind::Database).await
    }

    /// Drop the open snapshot; the stored copy is kept
    pub fn close(&self) {
        if self.database.write().take().is_some() {
            info!("Closed chat snapshot");
        }
    }

    /// Close everything and wipe the persistent store
    pub async fn reset(&self) -> Result<()> {
        self.close();
        self.contacts.clear();
        self.media.clear();
        self.store.clear().await?;

        info!("Viewer session reset");
        Ok(())
    }
}
