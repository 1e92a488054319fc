//! Error types for backup loading, querying and media storage

use thiserror::Error;

/// Errors that can occur while loading or querying a backup
///
/// Parsing anomalies inside message rows never show up here; they degrade to
/// default values instead.
#[derive(Error, Debug)]
pub enum LimeError {
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),
    #[error("Failed to load {0}")]
    LoadFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),
    #[error("Storage error: {0}")]
    StorageFailed(#[from] sea_orm::DbErr),
    #[error("Failed to extract archive: {0}")]
    ExtractFailed(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LimeError>;
