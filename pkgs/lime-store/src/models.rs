//! Domain types produced by the row mapper and consumed by the viewer and exporter

use crate::media_key::voice_filename;
use serde::{Deserialize, Serialize};

/// Message kind stored in `chat_history.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum MessageType {
    Text,
    Image,
    Video,
    Call,
    Sticker,
    /// Album and note notifications
    PostNotification,
    /// Group member join/leave/add
    GroupEvent,
    System,
    LinkPreview,
    /// Any code this viewer does not interpret; the raw code is kept
    Unknown(i64),
}

impl From<i64> for MessageType {
    fn from(code: i64) -> Self {
        match code {
            1 => Self::Text,
            2 => Self::Image,
            3 => Self::Video,
            4 => Self::Call,
            5 => Self::Sticker,
            8 => Self::PostNotification,
            13 => Self::GroupEvent,
            17 => Self::System,
            27 => Self::LinkPreview,
            other => Self::Unknown(other),
        }
    }
}

impl From<MessageType> for i64 {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Text => 1,
            MessageType::Image => 2,
            MessageType::Video => 3,
            MessageType::Call => 4,
            MessageType::Sticker => 5,
            MessageType::PostNotification => 8,
            MessageType::GroupEvent => 13,
            MessageType::System => 17,
            MessageType::LinkPreview => 27,
            MessageType::Unknown(code) => code,
        }
    }
}

/// Second classification axis stored in `chat_history.attachement_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum AttachmentType {
    None,
    /// SID=emi
    Image,
    /// SID=ema
    Audio,
    Call,
    Sticker,
    Contact,
    File,
    Location,
    Post,
    GroupEvent,
    LineMusic,
    /// LINE Gift and other flex layouts
    Flex,
    Other(i64),
}

impl From<i64> for AttachmentType {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Image,
            3 => Self::Audio,
            6 => Self::Call,
            7 => Self::Sticker,
            13 => Self::Contact,
            14 => Self::File,
            15 => Self::Location,
            16 => Self::Post,
            18 => Self::GroupEvent,
            19 => Self::LineMusic,
            22 => Self::Flex,
            other => Self::Other(other),
        }
    }
}

impl From<AttachmentType> for i64 {
    fn from(kind: AttachmentType) -> Self {
        match kind {
            AttachmentType::None => 0,
            AttachmentType::Image => 1,
            AttachmentType::Audio => 3,
            AttachmentType::Call => 6,
            AttachmentType::Sticker => 7,
            AttachmentType::Contact => 13,
            AttachmentType::File => 14,
            AttachmentType::Location => 15,
            AttachmentType::Post => 16,
            AttachmentType::GroupEvent => 18,
            AttachmentType::LineMusic => 19,
            AttachmentType::Flex => 22,
            AttachmentType::Other(code) => code,
        }
    }
}

/// Delivery status as far as a backup can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Read,
}

impl MessageStatus {
    /// Raw status code 3 is the only one that means "read"
    pub fn from_code(code: i64) -> Self {
        if code == 3 {
            Self::Read
        } else {
            Self::Sent
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Audio,
    Video,
}

/// Outcome of a call; unrecognised vendor values are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallResult {
    Normal,
    Canceled,
    Rejected,
    Other(String),
}

impl From<String> for CallResult {
    fn from(value: String) -> Self {
        match value.as_str() {
            "normal" => Self::Normal,
            "canceled" => Self::Canceled,
            "rejected" => Self::Rejected,
            _ => Self::Other(value),
        }
    }
}

impl From<CallResult> for String {
    fn from(result: CallResult) -> Self {
        match result {
            CallResult::Normal => "normal".to_string(),
            CallResult::Canceled => "canceled".to_string(),
            CallResult::Rejected => "rejected".to_string(),
            CallResult::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    #[serde(rename = "type")]
    pub kind: CallKind,
    pub result: CallResult,
    /// Milliseconds
    pub duration: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub size: i64,
    pub expire_timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub mid: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicInfo {
    pub title: String,
    pub artist: Option<String>,
    pub preview_url: Option<String>,
    /// Milliseconds
    pub duration: Option<i64>,
    /// LINE Music track id for the embed player
    pub track_id: Option<String>,
    pub link_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInfo {
    /// Milliseconds
    pub duration: i64,
    pub file_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPreview {
    pub url: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexInfo {
    pub json: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Album,
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInfo {
    #[serde(rename = "type")]
    pub kind: PostKind,
    pub album_name: Option<String>,
    pub text: Option<String>,
    pub post_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEventInfo {
    /// A_MC, C_MI, C_MA, C_ME, C_MK ...
    pub loc_key: String,
    pub mids: Vec<String>,
    pub actor_name: Option<String>,
    pub target_name: Option<String>,
}

/// Non-text content carried by a message. At most one per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Attachment {
    Sticker {
        metadata: StickerInfo,
    },
    Image {
        url: Option<String>,
    },
    Video {
        url: Option<String>,
    },
    Call {
        call: CallInfo,
    },
    Location {
        location: LocationInfo,
    },
    File {
        file: FileInfo,
    },
    Contact {
        contact: ContactInfo,
    },
    Music {
        music: MusicInfo,
    },
    Flex {
        flex: FlexInfo,
    },
    Post {
        post: PostInfo,
    },
    Voice {
        url: Option<String>,
        voice: VoiceInfo,
    },
    Link {
        link: LinkPreview,
    },
    GroupEvent {
        #[serde(rename = "groupEvent")]
        group_event: GroupEventInfo,
    },
    Other {
        url: Option<String>,
    },
}

impl Attachment {
    /// Tag name as it appears in serialized output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sticker { .. } => "sticker",
            Self::Image { .. } => "image",
            Self::Video { .. } => "video",
            Self::Call { .. } => "call",
            Self::Location { .. } => "location",
            Self::File { .. } => "file",
            Self::Contact { .. } => "contact",
            Self::Music { .. } => "music",
            Self::Flex { .. } => "flex",
            Self::Post { .. } => "post",
            Self::Voice { .. } => "voice",
            Self::Link { .. } => "link",
            Self::GroupEvent { .. } => "groupEvent",
            Self::Other { .. } => "other",
        }
    }

    /// Local media URL, for the variants backed by a media blob
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Image { url } | Self::Video { url } | Self::Other { url } => url.as_deref(),
            Self::Voice { url, .. } => url.as_deref(),
            _ => None,
        }
    }
}

/// One normalized chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub server_id: Option<String>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub attachment_type: AttachmentType,
    pub chat_id: String,
    /// Empty when authored by the viewing user
    pub from_id: String,
    pub from_name: Option<String>,
    pub content: Option<String>,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub is_me: bool,
    pub status: MessageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Message {
    /// Name of the blob that holds this message's media in its conversation
    pub fn media_filename(&self) -> String {
        match self.attachment {
            Some(Attachment::Voice { .. }) => voice_filename(self.id),
            _ => self.id.to_string(),
        }
    }
}

/// Conversation summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: String,
    pub name: String,
    pub member_count: u32,
    pub last_message: String,
    pub last_message_time: i64,
    pub unread_count: i64,
    pub is_group: bool,
}

/// Hit returned by the global content search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: i64,
    pub chat_id: String,
    pub content: String,
    pub timestamp: i64,
    pub from_id: String,
    pub from_name: Option<String>,
}
