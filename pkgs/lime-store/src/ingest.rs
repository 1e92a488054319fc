//! Media ingestion from a backup folder or ZIP archive
//!
//! Backups lay media out as `chats_backup/<chatId>/messages/<file>`. Only the
//! conversation id and the final path component matter for the key.

use crate::error::{LimeError, Result};
use crate::media_key::MediaKey;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const BACKUP_DIR: &str = "chats_backup";

/// Key → blob map produced by one ingestion
pub type MediaBatch = BTreeMap<MediaKey, Bytes>;

/// Derive the media key for a path inside a backup
///
/// The path must contain a `chats_backup` component followed by at least
/// three more. With `allow_bare`, `<chatId>/messages/<file>` is accepted
/// without the prefix.
pub fn media_key_for_path(path: &str, allow_bare: bool) -> Option<MediaKey> {
    let parts = path.split(['/', '\\']).collect::<Vec<_>>();

    let (chat_id, filename) = match parts.iter().position(|p| *p == BACKUP_DIR) {
        Some(idx) if parts.len() >= idx + 4 => (parts[idx + 1], parts[parts.len() - 1]),
        _ if allow_bare && parts.len() >= 3 && parts[1] == "messages" => {
            (parts[0], parts[parts.len() - 1])
        }
        _ => return None,
    };

    if chat_id.is_empty() || filename.is_empty() {
        return None;
    }
    Some(MediaKey::new(chat_id, filename))
}

/// Read every media file below `root`
pub async fn read_media_folder(root: &Path) -> Result<MediaBatch> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || collect_folder(&root))
        .await
        .map_err(|e| LimeError::LoadFailed(format!("media folder task: {}", e)))?
}

/// Read every media entry of a ZIP archive
pub async fn read_media_zip(archive: &Path) -> Result<MediaBatch> {
    let archive = archive.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = fs::File::open(&archive)?;
        collect_zip(file)
    })
    .await
    .map_err(|e| LimeError::LoadFailed(format!("media archive task: {}", e)))?
}

/// Read ZIP entries from any seekable source
pub fn collect_zip<R: std::io::Read + std::io::Seek>(reader: R) -> Result<MediaBatch> {
    let mut zip = zip::ZipArchive::new(reader)?;
    let mut batch = MediaBatch::new();

    for idx in 0..zip.len() {
        let mut entry = zip.by_index(idx)?;
        if entry.is_dir() || entry.size() == 0 {
            continue;
        }

        let Some(key) = media_key_for_path(entry.name(), true) else {
            debug!("Skipping archive entry {}", entry.name());
            continue;
        };

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| LimeError::ExtractFailed(e.into()))?;
        batch.insert(key, Bytes::from(data));
    }

    info!("Extracted {} media files from archive", batch.len());
    Ok(batch)
}

fn collect_folder(root: &Path) -> Result<MediaBatch> {
    // Paths are matched relative to the folder's parent so a selected
    // `chats_backup` folder keeps its own name in the path
    let base = root.parent().unwrap_or(root);
    let mut batch = MediaBatch::new();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                pending.push(path);
                continue;
            }
            if !file_type.is_file() || entry.metadata()?.len() == 0 {
                continue;
            }

            let relative = path.strip_prefix(base).unwrap_or(&path);
            let Some(key) = media_key_for_path(&relative.to_string_lossy(), false) else {
                continue;
            };

            batch.insert(key, Bytes::from(fs::read(&path)?));
        }
    }

    info!(
        "Read {} media files from {}",
        batch.len(),
        root.display()
    );
    Ok(batch)
}
