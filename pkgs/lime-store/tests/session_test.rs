// Copyright 2024 Gigi Team.
//
// Comprehensive tests for ViewerSession

mod common;

use common::{ALICE, CONTACTS_CSV, FAMILY};
use lime_store::{
    Attachment, LimeError, MemoryBlobStore, SnapshotKind, ViewerConfig, ViewerSession,
};
use std::fs;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn sample_media_folder(root: &std::path::Path) -> std::path::PathBuf {
    let backup = root.join("chats_backup");
    let messages = backup.join(FAMILY).join("messages");
    fs::create_dir_all(&messages).unwrap();
    fs::write(messages.join("10"), b"jpeg").unwrap();
    backup
}

async fn sqlite_session(store_file: &NamedTempFile) -> ViewerSession {
    ViewerSession::new(ViewerConfig {
        store_path: store_file.path().to_path_buf(),
        ..Default::default()
    })
    .await
    .expect("Failed to create session")
}

#[tokio::test]
async fn test_database_requires_open_snapshot() {
    let session = ViewerSession::with_store(
        ViewerConfig::default(),
        Arc::new(MemoryBlobStore::new()),
    );

    assert!(!session.is_open());
    assert!(matches!(
        session.database(),
        Err(LimeError::NotInitialized("database"))
    ));
}

#[tokio::test]
async fn test_open_file_and_browse() {
    let snapshot = NamedTempFile::new().unwrap();
    common::build_sample_snapshot(snapshot.path());

    let session = ViewerSession::with_store(
        ViewerConfig::default(),
        Arc::new(MemoryBlobStore::new()),
    );
    session.load_contacts(CONTACTS_CSV, false).await.unwrap();
    session
        .open_database_file(snapshot.path(), false)
        .await
        .expect("Failed to open snapshot");

    let database = session.database().unwrap();
    let rooms = database.list_conversations().await.unwrap();
    assert_eq!(rooms[1].name, "Alice");
    assert!(!session.has_stored_data().await.unwrap());
}

#[tokio::test]
async fn test_import_and_restore() {
    let store_file = NamedTempFile::new().unwrap();
    let snapshot = NamedTempFile::new().unwrap();
    common::build_sample_snapshot(snapshot.path());
    let media_dir = tempfile::tempdir().unwrap();
    let backup = sample_media_folder(media_dir.path());

    {
        let session = sqlite_session(&store_file).await;
        session
            .open_database_file(snapshot.path(), true)
            .await
            .unwrap();
        assert_eq!(session.load_contacts(CONTACTS_CSV, true).await.unwrap(), 2);

        let mut seen = Vec::new();
        let imported = session
            .import_media_folder(&backup, true, &mut |p: u8| seen.push(p))
            .await
            .expect("Failed to import media");
        assert_eq!(imported, 1);
        assert_eq!(seen.first(), Some(&50));
        assert_eq!(seen.last(), Some(&100));
        assert!(session.has_stored_data().await.unwrap());
    }

    let session = sqlite_session(&store_file).await;
    assert!(session.restore().await.expect("Failed to restore"));
    assert!(session.is_open());
    assert_eq!(session.contacts().len(), 2);
    assert_eq!(session.media().media_count(), 1);

    let database = session.database().unwrap();
    let rooms = database.list_conversations().await.unwrap();
    assert_eq!(rooms[1].name, "Alice");

    session.media().preload_conversation(FAMILY).await.unwrap();
    let messages = database.list_all_messages(FAMILY).await.unwrap();
    let Some(Attachment::Image { url: Some(url) }) = &messages[0].attachment else {
        panic!("expected image with URL");
    };
    assert!(url.starts_with("blob:lime/"));

    let alice = database.list_messages(ALICE, 100, 0).await.unwrap();
    assert_eq!(alice.len(), 3);
}

#[tokio::test]
async fn test_restore_without_data() {
    let session = ViewerSession::with_store(
        ViewerConfig::default(),
        Arc::new(MemoryBlobStore::new()),
    );
    assert!(!session.restore().await.unwrap());
    assert!(!session.is_open());
}

#[tokio::test]
async fn test_close_keeps_stored_copy() {
    let snapshot = NamedTempFile::new().unwrap();
    common::build_sample_snapshot(snapshot.path());

    let session = ViewerSession::with_store(
        ViewerConfig::default(),
        Arc::new(MemoryBlobStore::new()),
    );
    session
        .open_database_file(snapshot.path(), true)
        .await
        .unwrap();

    session.close();
    assert!(!session.is_open());
    assert!(session.has_stored_data().await.unwrap());
}

#[tokio::test]
async fn test_reset_wipes_everything() {
    let snapshot = NamedTempFile::new().unwrap();
    common::build_sample_snapshot(snapshot.path());
    let media_dir = tempfile::tempdir().unwrap();
    let backup = sample_media_folder(media_dir.path());

    let session = ViewerSession::with_store(
        ViewerConfig::default(),
        Arc::new(MemoryBlobStore::new()),
    );
    session
        .open_database_file(snapshot.path(), true)
        .await
        .unwrap();
    session.load_contacts(CONTACTS_CSV, true).await.unwrap();
    session
        .import_media_folder(&backup, true, &mut |_: u8| {})
        .await
        .unwrap();

    session.reset().await.expect("Failed to reset session");

    assert!(!session.is_open());
    assert!(session.contacts().is_empty());
    assert_eq!(session.media().media_count(), 0);
    assert_eq!(session.media().urls().live_count(), 0);
    assert!(!session.has_stored_data().await.unwrap());
    assert!(!session
        .store()
        .has_snapshot(SnapshotKind::Contacts)
        .await
        .unwrap());
}
