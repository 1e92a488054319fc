//! Read-only access to a backup snapshot
//!
//! Rows are pulled as loosely-typed values and mapped into [`ChatRoom`],
//! [`Message`] and [`SearchResult`]. Attachments are resolved while mapping;
//! media URLs come from the shared [`MediaLocator`].

use crate::attachment::{AttachmentResolver, RawMessage};
use crate::coerce::RawRow;
use crate::contact_directory::{ContactDirectory, ContactLookup};
use crate::error::{LimeError, Result};
use crate::media_locator::MediaLocator;
use crate::models::{AttachmentType, ChatRoom, Message, MessageStatus, MessageType, SearchResult};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, Params};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::task;
use tracing::{debug, info};

/// Chat snapshot opened for reading
pub struct ChatDatabase {
    conn: Arc<Mutex<Connection>>,
    // Keeps the spilled snapshot alive for as long as the connection
    _backing: Option<NamedTempFile>,
    contacts: Arc<ContactDirectory>,
    media: MediaLocator,
}

impl ChatDatabase {
    /// Open a snapshot file read-only
    pub fn open(path: &Path, contacts: Arc<ContactDirectory>, media: MediaLocator) -> Result<Self> {
        let conn = Self::open_connection(path)?;
        info!("Opened chat snapshot {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            _backing: None,
            contacts,
            media,
        })
    }

    /// Open a snapshot held in memory
    pub fn from_bytes(
        bytes: &[u8],
        contacts: Arc<ContactDirectory>,
        media: MediaLocator,
    ) -> Result<Self> {
        let mut backing = NamedTempFile::new()?;
        backing.write_all(bytes)?;
        backing.flush()?;

        let conn = Self::open_connection(backing.path())?;
        info!("Opened chat snapshot from {} bytes", bytes.len());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            _backing: Some(backing),
            contacts,
            media,
        })
    }

    fn open_connection(path: &Path) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| LimeError::LoadFailed(format!("{}: {}", path.display(), e)))?;

        // SQLite opens anything lazily; the first read tells whether it is a database
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| LimeError::LoadFailed(format!("{}: {}", path.display(), e)))?;

        Ok(conn)
    }

    pub fn contacts(&self) -> &Arc<ContactDirectory> {
        &self.contacts
    }

    pub fn media(&self) -> &MediaLocator {
        &self.media
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| LimeError::LoadFailed(format!("Query task failed: {}", e)))?
    }

    /// All conversations, most recently active first
    pub async fn list_conversations(&self) -> Result<Vec<ChatRoom>> {
        let (rows, groups) = self
            .with_conn(|conn| {
                let rows = query_rows(
                    conn,
                    "SELECT * FROM chat ORDER BY last_created_time DESC",
                    [],
                )?;
                Ok((rows, group_names(conn)?))
            })
            .await?;

        let rooms = rows
            .iter()
            .map(|row| self.map_room(row, &groups))
            .collect::<Vec<_>>();

        debug!("Listed {} conversations", rooms.len());
        Ok(rooms)
    }

    /// A window of one conversation, newest first in storage, returned ascending
    pub async fn list_messages(
        &self,
        conversation_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>> {
        let chat_id = conversation_id.to_string();
        let rows = self
            .with_conn(move |conn| {
                query_rows(
                    conn,
                    "SELECT * FROM chat_history WHERE chat_id = ?1 ORDER BY created_time DESC LIMIT ?2 OFFSET ?3",
                    params![chat_id, limit as i64, offset as i64],
                )
            })
            .await?;

        let mut messages = self.map_messages(&rows, conversation_id);
        messages.reverse();

        debug!(
            "Loaded {} messages for {} (offset {})",
            messages.len(),
            conversation_id,
            offset
        );
        Ok(messages)
    }

    /// The whole history of one conversation, oldest first
    pub async fn list_all_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let chat_id = conversation_id.to_string();
        let rows = self
            .with_conn(move |conn| {
                query_rows(
                    conn,
                    "SELECT * FROM chat_history WHERE chat_id = ?1 ORDER BY created_time ASC",
                    params![chat_id],
                )
            })
            .await?;

        Ok(self.map_messages(&rows, conversation_id))
    }

    /// Case-sensitive substring search over message content, newest first
    pub async fn search_global(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let needle = query.to_string();
        let rows = self
            .with_conn(move |conn| {
                query_rows(
                    conn,
                    "SELECT id, chat_id, content, created_time, from_mid FROM chat_history \
                     WHERE content IS NOT NULL AND instr(content, ?1) > 0 \
                     ORDER BY created_time DESC LIMIT ?2",
                    params![needle, limit as i64],
                )
            })
            .await?;

        let results = rows
            .iter()
            .map(|row| {
                let from_id = row.string_or("from_mid", "");
                let from_name = self.sender_name(&from_id);
                SearchResult {
                    id: row.int_or("id", 0),
                    chat_id: row.string_or("chat_id", ""),
                    content: row.string_or("content", ""),
                    timestamp: row.int_or("created_time", 0),
                    from_id,
                    from_name,
                }
            })
            .collect::<Vec<_>>();

        debug!("Search for {:?} matched {} messages", query, results.len());
        Ok(results)
    }

    fn sender_name(&self, from_id: &str) -> Option<String> {
        if from_id.is_empty() {
            None
        } else {
            self.contacts.lookup(from_id)
        }
    }

    fn map_room(&self, row: &RawRow, groups: &HashMap<String, String>) -> ChatRoom {
        let id = row.string_or("chat_id", "");
        let is_group = groups.contains_key(&id);

        let name = if is_group {
            groups.get(&id).cloned()
        } else {
            row.opt_string("chat_name")
                .filter(|s| !s.is_empty())
                .or_else(|| self.contacts.lookup(&id))
        };

        let last_message = ["input_text", "last_message"]
            .iter()
            .find_map(|column| row.opt_string(column).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "No message".to_string());

        ChatRoom {
            name: name
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            id,
            member_count: 0,
            last_message,
            last_message_time: row.int_or("last_created_time", 0),
            unread_count: row.int_or("unread_count", 0),
            is_group,
        }
    }

    fn map_messages(&self, rows: &[RawRow], conversation_id: &str) -> Vec<Message> {
        let resolver = AttachmentResolver::new(&self.media, self.contacts.as_ref());
        rows.iter()
            .map(|row| self.map_message(&resolver, row, conversation_id))
            .collect()
    }

    fn map_message(
        &self,
        resolver: &AttachmentResolver<'_>,
        row: &RawRow,
        conversation_id: &str,
    ) -> Message {
        let raw = RawMessage {
            id: row.int_or("id", 0),
            message_type: MessageType::from(row.int_or("type", 0)),
            attachment_type: AttachmentType::from(row.int_or("attachement_type", 0)),
            content: row.opt_string("content"),
            parameter: row.opt_string("parameter"),
            location_name: row.opt_string("location_name"),
            location_address: row.opt_string("location_address"),
            location_latitude: row.opt_number("location_latitude"),
            location_longitude: row.opt_number("location_longitude"),
        };
        let attachment = resolver.resolve(&raw, conversation_id);

        let from_id = row.string_or("from_mid", "");
        let is_me = from_id.is_empty();

        Message {
            id: raw.id,
            server_id: row.opt_string("server_id"),
            message_type: raw.message_type,
            attachment_type: raw.attachment_type,
            chat_id: row.string_or("chat_id", conversation_id),
            from_name: self.sender_name(&from_id),
            from_id,
            content: raw.content,
            timestamp: row.int_or("created_time", 0),
            is_me,
            status: MessageStatus::from_code(row.int_or("status", 0)),
            attachment,
        }
    }
}

fn query_rows<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<RawRow>> {
    let mut stmt = conn.prepare(sql)?;
    let names = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();

    let rows = stmt
        .query_map(params, |row| RawRow::from_row(&names, row))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Group id → display name; an absent `groups` table reads as empty
fn group_names(conn: &Connection) -> Result<HashMap<String, String>> {
    let exists: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'groups'",
        [],
        |row| row.get(0),
    )?;
    if exists == 0 {
        debug!("Snapshot has no groups table");
        return Ok(HashMap::new());
    }

    let rows = query_rows(conn, "SELECT id, name FROM groups", [])?;
    Ok(rows
        .iter()
        .filter_map(|row| Some((row.opt_string("id")?, row.string_or("name", ""))))
        .collect())
}
