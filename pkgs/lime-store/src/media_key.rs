//! Composite identity of a media blob: `<conversation id>/<filename>`

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaKey(String);

impl MediaKey {
    pub fn new(conversation_id: &str, filename: &str) -> Self {
        Self(format!("{conversation_id}/{filename}"))
    }

    /// Wrap a key read back from storage
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Prefix shared by every key of one conversation
    pub fn conversation_prefix(conversation_id: &str) -> String {
        format!("{conversation_id}/")
    }

    pub fn conversation_id(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(chat, _)| chat)
    }

    pub fn filename(&self) -> &str {
        self.0.split_once('/').map_or("", |(_, file)| file)
    }

    pub fn belongs_to(&self, conversation_id: &str) -> bool {
        self.conversation_id() == conversation_id && self.0.len() > conversation_id.len()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Blob name of a voice message; other media is stored under the row id
pub fn voice_filename(message_id: i64) -> String {
    format!("voice_{message_id}.aac")
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
