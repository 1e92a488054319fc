//! Persistent media tier
//!
//! [`BlobStore`] is the async key→blob capability the media locator sits on.
//! [`SqliteBlobStore`] keeps everything in a Sea-ORM managed SQLite file so a
//! viewer session survives restarts; [`MemoryBlobStore`] is process-local.

use crate::entities::{media, snapshots};
use crate::error::{LimeError, Result};
use crate::media_key::MediaKey;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{debug, error, info};

/// Progress sink for bulk writes, called with a percentage in `0..=100`
pub type Progress<'a> = &'a mut (dyn FnMut(u8) + Send);

/// Import artifacts kept next to the media so a session can be restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    Database,
    Contacts,
}

impl SnapshotKind {
    fn name(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Contacts => "contacts",
        }
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &MediaKey, data: Bytes) -> Result<()>;

    /// Write `items` in batches of `batch_size`
    ///
    /// Each batch commits on its own. A failing batch aborts the call but
    /// leaves earlier batches in place. Returns the number of blobs written.
    async fn put_many(
        &self,
        items: Vec<(MediaKey, Bytes)>,
        batch_size: usize,
        progress: Progress<'_>,
    ) -> Result<usize>;

    async fn get(&self, key: &MediaKey) -> Result<Option<Bytes>>;

    async fn get_by_conversation(&self, conversation_id: &str) -> Result<Vec<(MediaKey, Bytes)>>;

    /// Every stored key, without materializing blobs
    async fn keys(&self) -> Result<HashSet<MediaKey>>;

    async fn save_snapshot(&self, kind: SnapshotKind, data: Bytes) -> Result<()>;

    async fn load_snapshot(&self, kind: SnapshotKind) -> Result<Option<Bytes>>;

    async fn has_snapshot(&self, kind: SnapshotKind) -> Result<bool>;

    async fn clear(&self) -> Result<()>;
}

fn batch_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100 + total / 2) / total).min(100) as u8
}

/// SQLite-backed blob store
pub struct SqliteBlobStore {
    db: DatabaseConnection,
}

impl SqliteBlobStore {
    /// Open (or create) the store file and run migrations
    pub async fn new(db_path: &Path) -> Result<Self> {
        let db_path_str = db_path
            .to_str()
            .ok_or_else(|| LimeError::LoadFailed(format!("store path {}", db_path.display())))?
            .replace('\\', "/");

        let db_url = format!("sqlite:{}?mode=rwc", db_path_str);
        let db = Database::connect(db_url.as_str()).await?;
        let store = Self::with_connection(db).await?;

        info!("Blob store initialized at {}", db_path.display());
        Ok(store)
    }

    /// Use an existing connection; migrations are applied if needed
    pub async fn with_connection(db: DatabaseConnection) -> Result<Self> {
        crate::migration::Migrator::up(&db, None).await?;
        Ok(Self { db })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn media_upsert() -> OnConflict {
        OnConflict::column(media::Column::Key)
            .update_columns([media::Column::ChatId, media::Column::Data])
            .to_owned()
    }

    fn media_model(key: &MediaKey, data: &Bytes) -> media::ActiveModel {
        media::ActiveModel {
            key: Set(key.as_str().to_string()),
            chat_id: Set(key.conversation_id().to_string()),
            data: Set(data.to_vec()),
        }
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn put(&self, key: &MediaKey, data: Bytes) -> Result<()> {
        media::Entity::insert(Self::media_model(key, &data))
            .on_conflict(Self::media_upsert())
            .exec_without_returning(&self.db)
            .await?;

        debug!("Stored media {}", key);
        Ok(())
    }

    async fn put_many(
        &self,
        items: Vec<(MediaKey, Bytes)>,
        batch_size: usize,
        progress: Progress<'_>,
    ) -> Result<usize> {
        let total = items.len();
        let mut written = 0;

        for batch in items.chunks(batch_size.max(1)) {
            let models = batch
                .iter()
                .map(|(key, data)| Self::media_model(key, data))
                .collect::<Vec<_>>();

            let txn = self.db.begin().await?;
            let result = media::Entity::insert_many(models)
                .on_conflict(Self::media_upsert())
                .exec_without_returning(&txn)
                .await;

            if let Err(e) = result {
                error!(
                    "Media batch failed after {} of {} blobs: {}",
                    written, total, e
                );
                txn.rollback().await?;
                return Err(e.into());
            }
            txn.commit().await?;

            written += batch.len();
            progress(batch_percent(written, total));
            tokio::task::yield_now().await;
        }

        info!("Persisted {} media blobs", written);
        Ok(written)
    }

    async fn get(&self, key: &MediaKey) -> Result<Option<Bytes>> {
        let found = media::Entity::find_by_id(key.as_str().to_string())
            .one(&self.db)
            .await?;

        Ok(found.map(|m| Bytes::from(m.data)))
    }

    async fn get_by_conversation(&self, conversation_id: &str) -> Result<Vec<(MediaKey, Bytes)>> {
        let rows = media::Entity::find()
            .filter(media::Column::ChatId.eq(conversation_id))
            .all(&self.db)
            .await?;

        debug!(
            "Loaded {} media blobs for conversation {}",
            rows.len(),
            conversation_id
        );
        Ok(rows
            .into_iter()
            .map(|m| (MediaKey::from_raw(m.key), Bytes::from(m.data)))
            .collect())
    }

    async fn keys(&self) -> Result<HashSet<MediaKey>> {
        let keys: Vec<String> = media::Entity::find()
            .select_only()
            .column(media::Column::Key)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(keys.into_iter().map(MediaKey::from_raw).collect())
    }

    async fn save_snapshot(&self, kind: SnapshotKind, data: Bytes) -> Result<()> {
        let model = snapshots::ActiveModel {
            name: Set(kind.name().to_string()),
            data: Set(data.to_vec()),
            saved_at: Set(chrono::Utc::now().timestamp_millis()),
        };

        snapshots::Entity::insert(model)
            .on_conflict(
                OnConflict::column(snapshots::Column::Name)
                    .update_columns([snapshots::Column::Data, snapshots::Column::SavedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        info!("Saved {} snapshot ({} bytes)", kind.name(), data.len());
        Ok(())
    }

    async fn load_snapshot(&self, kind: SnapshotKind) -> Result<Option<Bytes>> {
        let found = snapshots::Entity::find_by_id(kind.name().to_string())
            .one(&self.db)
            .await?;

        Ok(found.map(|m| Bytes::from(m.data)))
    }

    async fn has_snapshot(&self, kind: SnapshotKind) -> Result<bool> {
        let count = snapshots::Entity::find()
            .filter(snapshots::Column::Name.eq(kind.name()))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    async fn clear(&self) -> Result<()> {
        let media = media::Entity::delete_many().exec(&self.db).await?;
        let snapshots = snapshots::Entity::delete_many().exec(&self.db).await?;

        info!(
            "Cleared blob store ({} media, {} snapshots)",
            media.rows_affected, snapshots.rows_affected
        );
        Ok(())
    }
}

/// Process-local blob store
///
/// An optional capacity makes writes past the limit fail, which is how a
/// quota-limited backend behaves.
#[derive(Default)]
pub struct MemoryBlobStore {
    media: Mutex<BTreeMap<MediaKey, Bytes>>,
    snapshots: Mutex<HashMap<SnapshotKind, Bytes>>,
    capacity: Option<usize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.media.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.lock().is_empty()
    }

    fn insert_all(&self, items: &[(MediaKey, Bytes)]) -> Result<()> {
        let mut media = self.media.lock();
        if let Some(capacity) = self.capacity {
            let new_keys = items.iter().filter(|(k, _)| !media.contains_key(k)).count();
            if media.len() + new_keys > capacity {
                return Err(LimeError::StorageFailed(DbErr::Custom(format!(
                    "blob store capacity of {} exceeded",
                    capacity
                ))));
            }
        }
        for (key, data) in items {
            media.insert(key.clone(), data.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &MediaKey, data: Bytes) -> Result<()> {
        self.insert_all(&[(key.clone(), data)])
    }

    async fn put_many(
        &self,
        items: Vec<(MediaKey, Bytes)>,
        batch_size: usize,
        progress: Progress<'_>,
    ) -> Result<usize> {
        let total = items.len();
        let mut written = 0;

        for batch in items.chunks(batch_size.max(1)) {
            if let Err(e) = self.insert_all(batch) {
                error!(
                    "Media batch failed after {} of {} blobs: {}",
                    written, total, e
                );
                return Err(e);
            }
            written += batch.len();
            progress(batch_percent(written, total));
            tokio::task::yield_now().await;
        }

        Ok(written)
    }

    async fn get(&self, key: &MediaKey) -> Result<Option<Bytes>> {
        Ok(self.media.lock().get(key).cloned())
    }

    async fn get_by_conversation(&self, conversation_id: &str) -> Result<Vec<(MediaKey, Bytes)>> {
        Ok(self
            .media
            .lock()
            .iter()
            .filter(|(key, _)| key.belongs_to(conversation_id))
            .map(|(key, data)| (key.clone(), data.clone()))
            .collect())
    }

    async fn keys(&self) -> Result<HashSet<MediaKey>> {
        Ok(self.media.lock().keys().cloned().collect())
    }

    async fn save_snapshot(&self, kind: SnapshotKind, data: Bytes) -> Result<()> {
        self.snapshots.lock().insert(kind, data);
        Ok(())
    }

    async fn load_snapshot(&self, kind: SnapshotKind) -> Result<Option<Bytes>> {
        Ok(self.snapshots.lock().get(&kind).cloned())
    }

    async fn has_snapshot(&self, kind: SnapshotKind) -> Result<bool> {
        Ok(self.snapshots.lock().contains_key(&kind))
    }

    async fn clear(&self) -> Result<()> {
        self.media.lock().clear();
        self.snapshots.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_percent() {
        assert_eq!(batch_percent(50, 120), 42);
        assert_eq!(batch_percent(120, 120), 100);
        assert_eq!(batch_percent(0, 0), 100);
    }

    #[tokio::test]
    async fn test_memory_store_capacity_keeps_committed_batches() {
        let store = MemoryBlobStore::with_capacity_limit(3);
        let items = (0..5)
            .map(|i| (MediaKey::new("c1", &i.to_string()), Bytes::from(vec![i as u8])))
            .collect::<Vec<_>>();

        let mut seen = Vec::new();
        let result = store.put_many(items, 2, &mut |p: u8| seen.push(p)).await;

        assert!(matches!(result, Err(LimeError::StorageFailed(_))));
        assert_eq!(store.len(), 2);
        assert_eq!(seen, vec![40]);
    }
}
