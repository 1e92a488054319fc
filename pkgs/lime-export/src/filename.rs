//! Export file naming and encoding

use crate::datetime::filename_stamp;
use chrono::{DateTime, FixedOffset};

const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// Output format of a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Csv => "csv",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Csv => "text/csv",
        }
    }
}

/// Replace characters that are not allowed in file names
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

/// `[LINE] <name>_<YYYYMMDD_HHMM>.<ext>`
pub fn export_filename(chat_name: &str, format: ExportFormat, at: &DateTime<FixedOffset>) -> String {
    format!(
        "[LINE] {}_{}.{}",
        sanitize(chat_name),
        filename_stamp(at),
        format.extension()
    )
}

/// `[LINE] 全トーク履歴_<YYYYMMDD_HHMM>.<ext>`
pub fn all_export_filename(format: ExportFormat, at: &DateTime<FixedOffset>) -> String {
    format!(
        "[LINE] 全トーク履歴_{}.{}",
        filename_stamp(at),
        format.extension()
    )
}

/// Transcript bytes the way LINE writes them: UTF-8 with a BOM
pub fn with_utf8_bom(content: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + content.len());
    bytes.extend_from_slice(&UTF8_BOM);
    bytes.extend_from_slice(content.as_bytes());
    bytes
}
