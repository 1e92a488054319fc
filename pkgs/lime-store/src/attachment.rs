//! Attachment resolution
//!
//! A backup row encodes its content kind through two overloaded integer
//! columns plus the parameter blob. The resolver walks a fixed, ordered rule
//! table and the first rule whose predicate holds decides the variant. The
//! predicates overlap (a sticker row may carry an attachment type that an
//! earlier rule claims), so the order is part of the contract.

use crate::contact_directory::ContactLookup;
use crate::media_key::voice_filename;
use crate::models::{
    Attachment, AttachmentType, CallInfo, CallKind, CallResult, ContactInfo, FileInfo, FlexInfo,
    GroupEventInfo, LinkPreview, LocationInfo, MessageType, MusicInfo, PostInfo, PostKind,
    StickerInfo, VoiceInfo,
};
use crate::parameter::{self, int_param, non_empty, Parameters};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static LINK_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s]+").expect("link pattern is valid"));
static MUSIC_TRACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)subitem=(mt[a-f0-9]+)").expect("track pattern is valid"));
static MEMBER_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"u[a-f0-9]{32}").expect("member id pattern is valid"));
static STICKER_PACKAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)STKPKGID["']?[:=\t]?\s*["']?(\d+)"#).expect("package pattern is valid")
});
static STICKER_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)STKID["']?[:=\t]?\s*["']?(\d+)"#).expect("sticker pattern is valid")
});

/// Coordinates are stored as integers scaled by this factor
pub const COORDINATE_SCALE: f64 = 1_000_000.0;

/// Synchronous media URL lookup used while building attachments
pub trait MediaUrls {
    fn url_for(&self, conversation_id: &str, filename: &str) -> Option<String>;
}

/// The columns of a `chat_history` row the resolver looks at, already coerced
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: i64,
    pub message_type: MessageType,
    pub attachment_type: AttachmentType,
    pub content: Option<String>,
    pub parameter: Option<String>,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub location_latitude: Option<f64>,
    pub location_longitude: Option<f64>,
}

impl RawMessage {
    pub fn new(id: i64, message_type: MessageType, attachment_type: AttachmentType) -> Self {
        Self {
            id,
            message_type,
            attachment_type,
            content: None,
            parameter: None,
            location_name: None,
            location_address: None,
            location_latitude: None,
            location_longitude: None,
        }
    }
}

struct Context<'a> {
    raw: &'a RawMessage,
    chat_id: &'a str,
    params: Parameters,
}

impl Context<'_> {
    fn att(&self) -> AttachmentType {
        self.raw.attachment_type
    }

    fn kind(&self) -> MessageType {
        self.raw.message_type
    }

    fn param(&self, key: &str) -> Option<&str> {
        non_empty(&self.params, key)
    }

    fn owned_param(&self, key: &str) -> Option<String> {
        self.param(key).map(str::to_string)
    }
}

struct Rule {
    name: &'static str,
    applies: fn(&Context<'_>) -> bool,
    build: fn(&AttachmentResolver<'_>, &Context<'_>) -> Option<Attachment>,
}

const RULES: [Rule; 13] = [
    Rule {
        name: "voice",
        applies: |c| c.att() == AttachmentType::Audio || c.param("SID") == Some("ema"),
        build: voice,
    },
    Rule {
        name: "image",
        applies: |c| c.att() == AttachmentType::Image,
        build: image,
    },
    Rule {
        name: "link",
        applies: |c| {
            c.att() == AttachmentType::None
                && c.param("web_page_preview_type").is_some()
                && c.raw.content.is_some()
        },
        build: link,
    },
    Rule {
        name: "location",
        applies: |c| c.att() == AttachmentType::Location,
        build: location,
    },
    Rule {
        name: "file",
        applies: |c| c.att() == AttachmentType::File,
        build: file,
    },
    Rule {
        name: "contact",
        applies: |c| c.att() == AttachmentType::Contact,
        build: contact,
    },
    Rule {
        name: "music",
        applies: |c| c.att() == AttachmentType::LineMusic,
        build: music,
    },
    Rule {
        name: "flex",
        applies: |c| c.att() == AttachmentType::Flex,
        build: flex,
    },
    Rule {
        name: "post",
        applies: |c| {
            c.kind() == MessageType::PostNotification || c.att() == AttachmentType::Post
        },
        build: post,
    },
    Rule {
        name: "sticker",
        applies: |c| c.kind() == MessageType::Sticker,
        build: sticker,
    },
    Rule {
        name: "call",
        applies: |c| c.kind() == MessageType::Call,
        build: call,
    },
    Rule {
        name: "image",
        applies: |c| c.kind() == MessageType::Image,
        build: image,
    },
    Rule {
        name: "group_event",
        applies: |c| {
            c.att() == AttachmentType::GroupEvent
                && matches!(c.kind(), MessageType::GroupEvent | MessageType::System)
        },
        build: group_event,
    },
];

/// Builds typed attachments from raw rows
pub struct AttachmentResolver<'a> {
    media: &'a dyn MediaUrls,
    contacts: &'a dyn ContactLookup,
}

impl<'a> AttachmentResolver<'a> {
    pub fn new(media: &'a dyn MediaUrls, contacts: &'a dyn ContactLookup) -> Self {
        Self { media, contacts }
    }

    /// Resolve the attachment of one row, if it has one
    ///
    /// Never fails: unparseable parameters fall back to defaults. Only URL
    /// fields depend on the media cache; the variant does not.
    pub fn resolve(&self, raw: &RawMessage, chat_id: &str) -> Option<Attachment> {
        let ctx = Context {
            raw,
            chat_id,
            params: parameter::decode(raw.parameter.as_deref()),
        };

        let rule = RULES.iter().find(|rule| (rule.applies)(&ctx))?;
        let attachment = (rule.build)(self, &ctx);
        debug!(
            "Row {} matched {} rule (attachment: {})",
            raw.id,
            rule.name,
            attachment.as_ref().map_or("none", Attachment::kind)
        );
        attachment
    }
}

fn voice(res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    let filename = voice_filename(c.raw.id);
    Some(Attachment::Voice {
        url: res.media.url_for(c.chat_id, &filename),
        voice: VoiceInfo {
            duration: int_param(&c.params, "DURATION").unwrap_or(0),
            file_size: int_param(&c.params, "FILE_SIZE"),
        },
    })
}

fn image(res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    Some(Attachment::Image {
        url: res.media.url_for(c.chat_id, &c.raw.id.to_string()),
    })
}

fn link(_res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    let content = c.raw.content.as_deref()?;
    let url = LINK_URL.find(content)?;
    Some(Attachment::Link {
        link: LinkPreview {
            url: url.as_str().to_string(),
            title: None,
        },
    })
}

fn location(_res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    let scaled = |v: Option<f64>| v.filter(|v| *v != 0.0).map(|v| v / COORDINATE_SCALE);
    Some(Attachment::Location {
        location: LocationInfo {
            name: c.raw.location_name.clone().filter(|s| !s.is_empty()),
            address: c.raw.location_address.clone().filter(|s| !s.is_empty()),
            latitude: scaled(c.raw.location_latitude),
            longitude: scaled(c.raw.location_longitude),
        },
    })
}

fn file(_res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    Some(Attachment::File {
        file: FileInfo {
            name: c
                .owned_param("FILE_NAME")
                .unwrap_or_else(|| "Unknown file".to_string()),
            size: int_param(&c.params, "FILE_SIZE").unwrap_or(0),
            expire_timestamp: int_param(&c.params, "FILE_EXPIRE_TIMESTAMP"),
        },
    })
}

fn contact(_res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    Some(Attachment::Contact {
        contact: ContactInfo {
            mid: c.owned_param("mid").unwrap_or_default(),
            display_name: c
                .owned_param("displayName")
                .unwrap_or_else(|| "Unknown".to_string()),
        },
    })
}

fn music(_res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    let link_uri = ["linkUri", "a-linkUri", "i-linkUri"]
        .iter()
        .find_map(|key| c.param(key));
    let track_id = c.owned_param("id").or_else(|| {
        link_uri
            .and_then(|uri| MUSIC_TRACK.captures(uri))
            .map(|caps| caps[1].to_string())
    });

    let title = c
        .raw
        .content
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| c.owned_param("text"))
        .or_else(|| c.owned_param("title"))
        .unwrap_or_else(|| "Unknown".to_string());

    Some(Attachment::Music {
        music: MusicInfo {
            title,
            artist: c.owned_param("subText"),
            preview_url: c.owned_param("previewUrl"),
            duration: int_param(&c.params, "duration"),
            track_id,
            link_url: c.owned_param("linkUri"),
        },
    })
}

fn flex(_res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    let json = c.owned_param("FLEX_JSON");
    let image_url = json.as_deref().and_then(|raw| {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => find_flex_image_url(&value).map(str::to_string),
            Err(e) => {
                debug!("Row {} has unparseable flex JSON: {}", c.raw.id, e);
                None
            }
        }
    });

    Some(Attachment::Flex {
        flex: FlexInfo { json, image_url },
    })
}

fn post(_res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    let kind = if c.param("serviceType") == Some("AB") {
        PostKind::Album
    } else {
        PostKind::Note
    };

    Some(Attachment::Post {
        post: PostInfo {
            kind,
            album_name: c.owned_param("albumName"),
            text: c.owned_param("text"),
            post_url: c.owned_param("postEndUrl"),
        },
    })
}

fn sticker(_res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    let from_blob = c.raw.parameter.as_deref().and_then(|raw| {
        let package = STICKER_PACKAGE.captures(raw)?;
        let sticker = STICKER_ID.captures(raw)?;
        Some((package[1].to_string(), sticker[1].to_string()))
    });
    let from_params = || Some((c.owned_param("STKPKGID")?, c.owned_param("STKID")?));

    let metadata = match from_blob.or_else(from_params) {
        Some((package_id, sticker_id)) => StickerInfo {
            package_id: Some(package_id),
            sticker_id: Some(sticker_id),
        },
        None => StickerInfo::default(),
    };

    Some(Attachment::Sticker { metadata })
}

fn call(_res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    let kind = if c.param("TYPE") == Some("V") {
        CallKind::Video
    } else {
        CallKind::Audio
    };
    let result = c
        .param("RESULT")
        .map(str::to_lowercase)
        .unwrap_or_else(|| "normal".to_string());

    Some(Attachment::Call {
        call: CallInfo {
            kind,
            result: CallResult::from(result),
            duration: int_param(&c.params, "DURATION").unwrap_or(0),
        },
    })
}

fn group_event(res: &AttachmentResolver<'_>, c: &Context<'_>) -> Option<Attachment> {
    let mids = c
        .param("LOC_ARGS")
        .map(|args| {
            MEMBER_ID
                .find_iter(args)
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let name_of = |idx: usize| mids.get(idx).and_then(|mid| res.contacts.lookup(mid));
    let actor_name = name_of(0);
    let target_name = name_of(1);

    Some(Attachment::GroupEvent {
        group_event: GroupEventInfo {
            loc_key: c.owned_param("LOC_KEY").unwrap_or_default(),
            mids,
            actor_name,
            target_name,
        },
    })
}

/// First `url` string containing "http", searched depth-first in document order
///
/// This is a blind scan; for nested layouts it may pick a URL that is not the
/// hero image.
pub fn find_flex_image_url(value: &serde_json::Value) -> Option<&str> {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            if let Some(Value::String(url)) = map.get("url") {
                if url.contains("http") {
                    return Some(url);
                }
            }
            map.values().find_map(find_flex_image_url)
        }
        Value::Array(items) => items.iter().find_map(find_flex_image_url),
        _ => None,
    }
}
