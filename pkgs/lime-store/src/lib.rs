//! Lime Store - message normalization and media storage for LINE backups
//!
//! This crate turns a LINE chat backup (a SQLite snapshot, a contacts CSV and
//! a folder or ZIP of media blobs) into typed conversations and messages.
//!
//! # Architecture
//!
//! - **parameter**: decoder for the tab-delimited `parameter` column
//! - **AttachmentResolver**: ordered rule table deciding each row's attachment
//! - **MediaLocator**: hot cache of object URLs over a persistent blob store
//! - **BlobStore**: async media/snapshot storage (`SqliteBlobStore`, `MemoryBlobStore`)
//! - **ChatDatabase**: read-only row mapper over the snapshot
//! - **ContactDirectory**: member id → display name
//! - **ingest**: folder and ZIP media ingestion
//! - **ViewerSession**: owns all of the above for one backup
//!
//! # Database Schema
//!
//! The persistent store uses Sea-ORM with SQLite:
//!
//! - `media`: blob per `<chatId>/<filename>` key, indexed by chat id
//! - `snapshots`: raw database bytes and contacts CSV of the last import
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use lime_store::{ViewerConfig, ViewerSession};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = ViewerSession::new(ViewerConfig::default()).await?;
//! session
//!     .open_database_file(Path::new("naver_line.db"), true)
//!     .await?;
//!
//! let database = session.database()?;
//! for room in database.list_conversations().await? {
//!     let messages = database.list_messages(&room.id, 100, 0).await?;
//!     println!("{}: {} messages", room.name, messages.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod attachment;
pub mod blob_store;
pub mod chat_database;
pub mod coerce;
pub mod contact_directory;
pub mod entities;
pub mod error;
pub mod ingest;
pub mod media_key;
pub mod media_locator;
pub mod migration;
pub mod models;
pub mod object_urls;
pub mod parameter;
pub mod session;

pub use attachment::{AttachmentResolver, MediaUrls, RawMessage};
pub use blob_store::{BlobStore, MemoryBlobStore, Progress, SnapshotKind, SqliteBlobStore};
pub use chat_database::ChatDatabase;
pub use contact_directory::{ContactDirectory, ContactLookup};
pub use error::{LimeError, Result};
pub use media_key::{voice_filename, MediaKey};
pub use media_locator::{MediaFile, MediaLocator, MediaState};
pub use models::{
    Attachment, AttachmentType, CallInfo, CallKind, CallResult, ChatRoom, ContactInfo, FileInfo,
    FlexInfo, GroupEventInfo, LinkPreview, LocationInfo, Message, MessageStatus, MessageType,
    MusicInfo, PostInfo, PostKind, SearchResult, StickerInfo, VoiceInfo,
};
pub use session::ViewerSession;

/// Configuration for a viewer session
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Path to the SQLite file holding media and snapshots
    pub store_path: std::path::PathBuf,

    /// Blobs per transaction when persisting media (default: 50)
    pub media_batch_size: usize,

    /// Messages per page when browsing (default: 100)
    pub page_size: usize,

    /// Maximum search hits (default: 50)
    pub search_limit: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            store_path: std::path::PathBuf::from("lime-viewer.db"),
            media_batch_size: 50,
            page_size: 100,
            search_limit: 50,
        }
    }
}
