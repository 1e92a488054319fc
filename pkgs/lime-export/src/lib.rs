//! Lime Export - LINE-compatible transcripts
//!
//! Renders conversations loaded by `lime-store` into the plain-text and CSV
//! layouts LINE itself produces, so exported files open the same way in tools
//! that already understand LINE's own export.
//!
//! # Formats
//!
//! - **Text**: `[LINE] <name>とのトーク履歴` header, date lines such as
//!   `2024/3/5(火)`, then `H:MM<TAB>sender<TAB>text` per message
//! - **CSV**: `日付,時刻,送信者,メッセージ`, plus `トーク名,グループ` columns
//!   when every conversation goes into a single file
//!
//! Files are written as UTF-8 with a BOM (see [`with_utf8_bom`]).

pub mod content;
pub mod datetime;
pub mod filename;
pub mod transcript;

pub use content::{call_duration, call_text, group_event_text, message_text};
pub use datetime::ExportZone;
pub use filename::{all_export_filename, export_filename, sanitize, with_utf8_bom, ExportFormat};
pub use transcript::{escape_csv_field, ExportOptions, TranscriptExporter};
