//! Plain-text and CSV transcripts in LINE's export layout

use crate::content::message_text;
use crate::datetime::{csv_date, date_header, local_time, message_time, saved_at, ExportZone};
use crate::filename::{all_export_filename, export_filename, ExportFormat};
use chrono::{DateTime, FixedOffset, Utc};
use lime_store::{ChatRoom, Message};
use tracing::debug;

const SEPARATOR: &str = "══════════════════════════════════════════════════";
const CSV_HEADER: &str = "日付,時刻,送信者,メッセージ";
const ALL_CSV_HEADER: &str = "トーク名,グループ,日付,時刻,送信者,メッセージ";

/// Options for an export run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Sender name used for the viewer's own messages (default: 自分)
    pub self_name: String,

    /// Timezone the calendar fields are rendered in (default: local)
    pub zone: ExportZone,

    /// Timestamp for the 保存日時 line and file names (default: now)
    pub saved_at: Option<DateTime<FixedOffset>>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            self_name: "自分".to_string(),
            zone: ExportZone::Local,
            saved_at: None,
        }
    }
}

/// Renders conversations into transcripts
#[derive(Debug, Clone, Default)]
pub struct TranscriptExporter {
    options: ExportOptions,
}

impl TranscriptExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    fn saved_at(&self) -> DateTime<FixedOffset> {
        self.options
            .saved_at
            .unwrap_or_else(|| self.options.zone.localize(Utc::now()))
    }

    fn sender<'a>(&'a self, message: &'a Message) -> &'a str {
        if message.is_me {
            &self.options.self_name
        } else {
            message
                .from_name
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or("相手")
        }
    }

    /// Date-grouped `H:MM<TAB>sender<TAB>text` lines
    ///
    /// A date header is written whenever the calendar date changes, even if
    /// the message that changed it has no text.
    fn push_text_lines(&self, messages: &[Message], lines: &mut Vec<String>) {
        let mut current_date = String::new();

        for message in messages {
            let at = local_time(message.timestamp, &self.options.zone);
            let date = date_header(&at);
            if date != current_date {
                lines.push(date.clone());
                current_date = date;
            }

            let text = message_text(message);
            if text.is_empty() {
                continue;
            }
            lines.push(format!(
                "{}\t{}\t{}",
                message_time(&at),
                self.sender(message),
                text
            ));
        }
    }

    fn csv_row(&self, message: &Message, room: Option<&ChatRoom>) -> Option<String> {
        let text = message_text(message);
        if text.is_empty() {
            return None;
        }

        let at = local_time(message.timestamp, &self.options.zone);
        let mut fields = Vec::with_capacity(6);
        if let Some(room) = room {
            fields.push(escape_csv_field(&room.name));
            fields.push(escape_csv_field(if room.is_group { "はい" } else { "いいえ" }));
        }
        fields.push(escape_csv_field(&csv_date(&at)));
        fields.push(escape_csv_field(&message_time(&at)));
        fields.push(escape_csv_field(self.sender(message)));
        fields.push(escape_csv_field(&text));

        Some(fields.join(","))
    }

    /// Single conversation as LINE's text transcript
    pub fn to_plain_text(&self, room: &ChatRoom, messages: &[Message]) -> String {
        let mut lines = vec![
            format!("[LINE] {}とのトーク履歴", room.name),
            format!("保存日時：{}", saved_at(&self.saved_at())),
            String::new(),
        ];
        self.push_text_lines(messages, &mut lines);

        debug!("Exported {} as text ({} lines)", room.id, lines.len());
        lines.join("\n")
    }

    /// Single conversation as CSV
    pub fn to_csv(&self, room: &ChatRoom, messages: &[Message]) -> String {
        let mut lines = vec![CSV_HEADER.to_string()];
        lines.extend(messages.iter().filter_map(|m| self.csv_row(m, None)));

        debug!("Exported {} as CSV ({} rows)", room.id, lines.len() - 1);
        lines.join("\n")
    }

    /// Every conversation in one text file; rooms without messages are skipped
    pub fn all_to_plain_text(&self, rooms: &[(ChatRoom, Vec<Message>)]) -> String {
        let mut lines = vec![
            "[LINE] 全トーク履歴".to_string(),
            format!("保存日時：{}", saved_at(&self.saved_at())),
            format!("トーク数：{}件", rooms.len()),
            String::new(),
        ];

        for (room, messages) in rooms {
            if messages.is_empty() {
                continue;
            }

            let group_suffix = if room.is_group { " (グループ)" } else { "" };
            lines.push(SEPARATOR.to_string());
            lines.push(format!("■ {}{}", room.name, group_suffix));
            lines.push(SEPARATOR.to_string());
            lines.push(String::new());

            self.push_text_lines(messages, &mut lines);
            lines.push(String::new());
        }

        lines.join("\n")
    }

    /// Every conversation in one CSV file
    pub fn all_to_csv(&self, rooms: &[(ChatRoom, Vec<Message>)]) -> String {
        let mut lines = vec![ALL_CSV_HEADER.to_string()];
        for (room, messages) in rooms {
            lines.extend(messages.iter().filter_map(|m| self.csv_row(m, Some(room))));
        }
        lines.join("\n")
    }

    /// File name for a single conversation export
    pub fn filename(&self, room: &ChatRoom, format: ExportFormat) -> String {
        export_filename(&room.name, format, &self.saved_at())
    }

    /// File name for an all-conversations export
    pub fn all_filename(&self, format: ExportFormat) -> String {
        all_export_filename(format, &self.saved_at())
    }
}

/// Quote a field iff it contains a comma, quote, CR or LF
pub fn escape_csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_csv_field() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_csv_field("cr\r"), "\"cr\r\"");
    }

    #[test]
    fn test_separator_width() {
        assert_eq!(SEPARATOR.chars().count(), 50);
        assert!(SEPARATOR.chars().all(|c| c == '═'));
    }
}
