// Copyright 2024 Gigi Team.
//
// Snapshot fixtures shared by the integration tests

#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::path::Path;

pub const ALICE: &str = "u1111";
pub const BOB: &str = "u2222";
pub const FAMILY: &str = "g1";
pub const NAMELESS: &str = "c9999";

pub const CONTACTS_CSV: &str = "mid,profile_name\n\"u1111\",\"Alice\"\n\"u2222\",\"Bob\"\n";

/// One `chat_history` row
#[derive(Debug, Clone, Default)]
pub struct HistoryRow {
    pub id: i64,
    pub chat_id: &'static str,
    pub from_mid: Option<&'static str>,
    pub kind: i64,
    pub attachment_type: i64,
    pub content: Option<&'static str>,
    pub parameter: Option<&'static str>,
    pub status: i64,
    pub created_time: i64,
}

pub fn create_schema(conn: &Connection, with_groups: bool) {
    conn.execute_batch(
        r#"
        CREATE TABLE chat (
            chat_id TEXT PRIMARY KEY,
            chat_name TEXT,
            last_message TEXT,
            input_text TEXT,
            last_created_time INTEGER,
            unread_count INTEGER
        );
        CREATE TABLE chat_history (
            id INTEGER PRIMARY KEY,
            server_id TEXT,
            type INTEGER,
            attachement_type INTEGER,
            chat_id TEXT,
            from_mid TEXT,
            content TEXT,
            parameter TEXT,
            location_name TEXT,
            location_address TEXT,
            location_latitude INTEGER,
            location_longitude INTEGER,
            status INTEGER,
            created_time TEXT
        );
        "#,
    )
    .unwrap();

    if with_groups {
        conn.execute("CREATE TABLE groups (id TEXT PRIMARY KEY, name TEXT)", [])
            .unwrap();
    }
}

pub fn insert_chat(
    conn: &Connection,
    chat_id: &str,
    chat_name: Option<&str>,
    last_message: Option<&str>,
    last_created_time: i64,
) {
    conn.execute(
        "INSERT INTO chat (chat_id, chat_name, last_message, input_text, last_created_time, unread_count)
         VALUES (?1, ?2, ?3, NULL, ?4, 0)",
        params![chat_id, chat_name, last_message, last_created_time],
    )
    .unwrap();
}

pub fn insert_group(conn: &Connection, id: &str, name: &str) {
    conn.execute(
        "INSERT INTO groups (id, name) VALUES (?1, ?2)",
        params![id, name],
    )
    .unwrap();
}

pub fn insert_message(conn: &Connection, row: &HistoryRow) {
    conn.execute(
        "INSERT INTO chat_history (id, server_id, type, attachement_type, chat_id, from_mid, content, parameter, status, created_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            row.id,
            format!("s{}", row.id),
            row.kind,
            row.attachment_type,
            row.chat_id,
            row.from_mid,
            row.content,
            row.parameter,
            row.status,
            // Backups store timestamps as text
            row.created_time.to_string(),
        ],
    )
    .unwrap();
}

/// Three conversations: a group, a contact-named 1:1 chat and a nameless chat
pub fn build_sample_snapshot(path: &Path) {
    let conn = Connection::open(path).unwrap();
    create_schema(&conn, true);

    insert_chat(&conn, NAMELESS, Some(""), None, 1_000);
    insert_chat(&conn, ALICE, None, Some("See you"), 3_000);
    insert_chat(&conn, FAMILY, None, Some("Dinner?"), 5_000);
    insert_group(&conn, FAMILY, "Family");

    let rows = [
        HistoryRow {
            id: 3,
            chat_id: ALICE,
            from_mid: Some(ALICE),
            kind: 1,
            content: Some("See you"),
            created_time: 3_000,
            ..Default::default()
        },
        HistoryRow {
            id: 1,
            chat_id: ALICE,
            from_mid: None,
            kind: 1,
            content: Some("Hello Alice"),
            status: 3,
            created_time: 1_000,
            ..Default::default()
        },
        HistoryRow {
            id: 2,
            chat_id: ALICE,
            from_mid: Some(ALICE),
            kind: 5,
            attachment_type: 7,
            parameter: Some("STKPKGID\t123\tSTKID\t456"),
            created_time: 2_000,
            ..Default::default()
        },
        HistoryRow {
            id: 10,
            chat_id: FAMILY,
            from_mid: Some(BOB),
            kind: 2,
            attachment_type: 1,
            created_time: 4_000,
            ..Default::default()
        },
        HistoryRow {
            id: 11,
            chat_id: FAMILY,
            from_mid: Some(BOB),
            kind: 4,
            attachment_type: 6,
            parameter: Some("TYPE\tV\tRESULT\tcanceled\tDURATION\t0"),
            created_time: 4_500,
            ..Default::default()
        },
        HistoryRow {
            id: 12,
            chat_id: FAMILY,
            from_mid: None,
            kind: 1,
            content: Some("Dinner? hello"),
            created_time: 5_000,
            ..Default::default()
        },
    ];
    for row in &rows {
        insert_message(&conn, row);
    }
}
