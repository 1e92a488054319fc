//! Display text of a message as LINE writes it into exported transcripts

use lime_store::{Attachment, CallInfo, CallKind, CallResult, Message, MessageType, PostKind};

const STICKER_TEXT: &str = "[スタンプ]";
const IMAGE_TEXT: &str = "[写真]";
const VOICE_TEXT: &str = "[ボイスメッセージ]";
const FLEX_TEXT: &str = "[Flexメッセージ]";
const VIDEO_TEXT: &str = "[動画]";

/// Text of one message; empty when the message has nothing to show
pub fn message_text(message: &Message) -> String {
    let attachment = message.attachment.as_ref();
    let content = || message.content.clone().unwrap_or_default();

    if let Some(Attachment::GroupEvent { group_event }) = attachment {
        return group_event_text(
            &group_event.loc_key,
            group_event.actor_name.as_deref(),
            group_event.target_name.as_deref(),
        );
    }

    if message.message_type == MessageType::System {
        return content();
    }

    if message.message_type == MessageType::Sticker
        || matches!(attachment, Some(Attachment::Sticker { .. }))
    {
        return STICKER_TEXT.to_string();
    }

    match attachment {
        Some(Attachment::Image { .. }) => return IMAGE_TEXT.to_string(),
        Some(Attachment::Voice { .. }) => return VOICE_TEXT.to_string(),
        Some(Attachment::Flex { .. }) => return FLEX_TEXT.to_string(),
        _ => {}
    }

    if message.message_type == MessageType::Video {
        return VIDEO_TEXT.to_string();
    }

    if let (MessageType::Call, Some(Attachment::Call { call })) = (message.message_type, attachment)
    {
        return call_text(call);
    }

    attachment
        .and_then(|a| attachment_text(a, message.content.as_deref()))
        .unwrap_or_else(content)
}

fn attachment_text(attachment: &Attachment, content: Option<&str>) -> Option<String> {
    let text = match attachment {
        Attachment::File { file } => format!("[ファイル: {}]", file.name),
        Attachment::Location { location } => match &location.name {
            Some(name) => format!("[位置情報: {}]", name),
            None => "[位置情報]".to_string(),
        },
        Attachment::Contact { contact } => format!("[連絡先: {}]", contact.display_name),
        Attachment::Music { music } => match &music.artist {
            Some(artist) => format!("♪ {} - {}", music.title, artist),
            None => format!("♪ {}", music.title),
        },
        Attachment::Post { post } => match (post.kind, &post.album_name) {
            (PostKind::Album, Some(name)) => format!("[アルバム: {}]", name),
            (PostKind::Album, None) => "[アルバム]".to_string(),
            (PostKind::Note, _) => "[ノート]".to_string(),
        },
        Attachment::Link { link } if !link.url.is_empty() => link.url.clone(),
        Attachment::Link { .. } => content.unwrap_or_default().to_string(),
        _ => return None,
    };
    Some(text)
}

/// `☎ ビデオ通話 01:05`, `☎ キャンセルされた音声通話`, `☎ 応答なし`
pub fn call_text(call: &CallInfo) -> String {
    let kind = match call.kind {
        CallKind::Video => "ビデオ通話",
        CallKind::Audio => "音声通話",
    };

    match call.result {
        CallResult::Normal if call.duration != 0 => {
            format!("☎ {} {}", kind, call_duration(call.duration))
        }
        CallResult::Canceled => format!("☎ キャンセルされた{}", kind),
        CallResult::Rejected => "☎ 応答なし".to_string(),
        _ => format!("☎ {}", kind),
    }
}

/// Milliseconds as zero-padded `MM:SS`
pub fn call_duration(duration_ms: i64) -> String {
    let minutes = duration_ms.div_euclid(60_000);
    let seconds = duration_ms.rem_euclid(60_000) / 1000;
    format!("{:02}:{:02}", minutes, seconds)
}

/// Sentence for a group membership event
pub fn group_event_text(loc_key: &str, actor: Option<&str>, target: Option<&str>) -> String {
    let actor = actor.filter(|s| !s.is_empty()).unwrap_or("誰か");
    let target = target.filter(|s| !s.is_empty()).unwrap_or("メンバー");

    match loc_key {
        "A_MC" => format!("{}が{}をグループに追加しました。", actor, target),
        "C_MI" => format!("{}が{}を招待しました。", actor, target),
        "C_MA" => format!("{}がグループに参加しました。", actor),
        "C_ME" => format!("{}がグループを退出しました。", actor),
        "C_MK" => format!("{}が{}をグループから削除しました。", actor, target),
        other => format!("グループイベント: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lime_store::{
        AttachmentType, FileInfo, GroupEventInfo, LinkPreview, LocationInfo, MessageStatus,
        MusicInfo, PostInfo, StickerInfo, VoiceInfo,
    };

    fn message(kind: MessageType, content: Option<&str>, attachment: Option<Attachment>) -> Message {
        Message {
            id: 1,
            server_id: None,
            message_type: kind,
            attachment_type: AttachmentType::None,
            chat_id: "c1".to_string(),
            from_id: String::new(),
            from_name: None,
            content: content.map(str::to_string),
            timestamp: 0,
            is_me: true,
            status: MessageStatus::Sent,
            attachment,
        }
    }

    fn call(kind: CallKind, result: CallResult, duration: i64) -> Attachment {
        Attachment::Call {
            call: CallInfo {
                kind,
                result,
                duration,
            },
        }
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(message_text(&message(MessageType::Text, Some("hi"), None)), "hi");
        assert_eq!(message_text(&message(MessageType::Text, None, None)), "");
    }

    #[test]
    fn test_simple_templates() {
        let sticker = Attachment::Sticker {
            metadata: StickerInfo::default(),
        };
        assert_eq!(
            message_text(&message(MessageType::Text, None, Some(sticker))),
            "[スタンプ]"
        );
        assert_eq!(
            message_text(&message(MessageType::Sticker, Some("ignored"), None)),
            "[スタンプ]"
        );
        assert_eq!(
            message_text(&message(
                MessageType::Image,
                None,
                Some(Attachment::Image { url: None })
            )),
            "[写真]"
        );
        let voice = Attachment::Voice {
            url: None,
            voice: VoiceInfo {
                duration: 0,
                file_size: None,
            },
        };
        assert_eq!(
            message_text(&message(MessageType::Text, None, Some(voice))),
            "[ボイスメッセージ]"
        );
        assert_eq!(
            message_text(&message(MessageType::Video, Some("x"), None)),
            "[動画]"
        );
    }

    #[test]
    fn test_call_texts() {
        let text = |attachment| message_text(&message(MessageType::Call, None, Some(attachment)));

        assert_eq!(
            text(call(CallKind::Video, CallResult::Canceled, 0)),
            "☎ キャンセルされたビデオ通話"
        );
        assert_eq!(
            text(call(CallKind::Audio, CallResult::Normal, 65_000)),
            "☎ 音声通話 01:05"
        );
        assert_eq!(text(call(CallKind::Audio, CallResult::Normal, 0)), "☎ 音声通話");
        assert_eq!(text(call(CallKind::Video, CallResult::Rejected, 0)), "☎ 応答なし");
        assert_eq!(
            text(call(
                CallKind::Video,
                CallResult::Other("busy".to_string()),
                0
            )),
            "☎ ビデオ通話"
        );
    }

    #[test]
    fn test_call_attachment_needs_call_type() {
        let msg = message(
            MessageType::Text,
            Some("fallback"),
            Some(call(CallKind::Audio, CallResult::Normal, 1000)),
        );
        assert_eq!(message_text(&msg), "fallback");
    }

    #[test]
    fn test_complex_templates() {
        let cases = [
            (
                Attachment::File {
                    file: FileInfo {
                        name: "a.pdf".to_string(),
                        size: 1,
                        expire_timestamp: None,
                    },
                },
                "[ファイル: a.pdf]",
            ),
            (
                Attachment::Location {
                    location: LocationInfo::default(),
                },
                "[位置情報]",
            ),
            (
                Attachment::Music {
                    music: MusicInfo {
                        title: "Song".to_string(),
                        artist: Some("Band".to_string()),
                        preview_url: None,
                        duration: None,
                        track_id: None,
                        link_url: None,
                    },
                },
                "♪ Song - Band",
            ),
            (
                Attachment::Post {
                    post: PostInfo {
                        kind: PostKind::Album,
                        album_name: None,
                        text: None,
                        post_url: None,
                    },
                },
                "[アルバム]",
            ),
            (
                Attachment::Post {
                    post: PostInfo {
                        kind: PostKind::Note,
                        album_name: Some("ignored".to_string()),
                        text: None,
                        post_url: None,
                    },
                },
                "[ノート]",
            ),
            (
                Attachment::Link {
                    link: LinkPreview {
                        url: "https://example.com".to_string(),
                        title: None,
                    },
                },
                "https://example.com",
            ),
        ];

        for (attachment, expected) in cases {
            assert_eq!(
                message_text(&message(MessageType::Text, Some("body"), Some(attachment))),
                expected
            );
        }
    }

    #[test]
    fn test_group_event_texts() {
        let event = |loc_key: &str, actor: Option<&str>| Attachment::GroupEvent {
            group_event: GroupEventInfo {
                loc_key: loc_key.to_string(),
                mids: Vec::new(),
                actor_name: actor.map(str::to_string),
                target_name: None,
            },
        };

        assert_eq!(
            message_text(&message(
                MessageType::GroupEvent,
                None,
                Some(event("A_MC", Some("Alice")))
            )),
            "Aliceがメンバーをグループに追加しました。"
        );
        assert_eq!(
            message_text(&message(MessageType::GroupEvent, None, Some(event("C_ME", None)))),
            "誰かがグループを退出しました。"
        );
        assert_eq!(
            message_text(&message(MessageType::System, None, Some(event("X_YZ", None)))),
            "グループイベント: X_YZ"
        );
    }

    #[test]
    fn test_system_message_uses_content() {
        assert_eq!(
            message_text(&message(MessageType::System, Some("joined"), None)),
            "joined"
        );
    }

    #[test]
    fn test_call_duration() {
        assert_eq!(call_duration(0), "00:00");
        assert_eq!(call_duration(59_999), "00:59");
        assert_eq!(call_duration(3_600_000), "60:00");
    }
}
