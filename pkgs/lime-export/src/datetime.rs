//! Calendar formatting used by the transcripts

use chrono::{DateTime, Datelike, FixedOffset, Local, Timelike, Utc};
use chrono_tz::Tz;

const WEEKDAYS: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

/// Timezone the calendar fields are rendered in
///
/// `Local` and `Named` resolve the UTC offset per timestamp, so daylight
/// saving applies to each message on its own date.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ExportZone {
    #[default]
    Local,
    Fixed(FixedOffset),
    Named(Tz),
}

impl ExportZone {
    pub fn localize(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Local => at.with_timezone(&Local).fixed_offset(),
            Self::Fixed(offset) => at.with_timezone(offset),
            Self::Named(tz) => at.with_timezone(tz).fixed_offset(),
        }
    }
}

/// Epoch milliseconds in the export timezone
pub fn local_time(timestamp_ms: i64, zone: &ExportZone) -> DateTime<FixedOffset> {
    zone.localize(
        DateTime::<Utc>::from_timestamp_millis(timestamp_ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
    )
}

/// `2024/3/5(火)`
pub fn date_header(at: &DateTime<FixedOffset>) -> String {
    format!(
        "{}/{}/{}({})",
        at.year(),
        at.month(),
        at.day(),
        WEEKDAYS[at.weekday().num_days_from_sunday() as usize]
    )
}

/// `9:05`; the hour is not padded
pub fn message_time(at: &DateTime<FixedOffset>) -> String {
    format!("{}:{:02}", at.hour(), at.minute())
}

/// `2024/03/05`
pub fn csv_date(at: &DateTime<FixedOffset>) -> String {
    format!("{}/{:02}/{:02}", at.year(), at.month(), at.day())
}

/// `2024/3/5 午後1:07`
pub fn saved_at(at: &DateTime<FixedOffset>) -> String {
    let (pm, hour) = at.hour12();
    format!(
        "{}/{}/{} {}{}:{:02}",
        at.year(),
        at.month(),
        at.day(),
        if pm { "午後" } else { "午前" },
        hour,
        at.minute()
    )
}

/// `20240305_1307`
pub fn filename_stamp(at: &DateTime<FixedOffset>) -> String {
    format!(
        "{}{:02}{:02}_{:02}{:02}",
        at.year(),
        at.month(),
        at.day(),
        at.hour(),
        at.minute()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Offset, TimeZone};

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn test_formats() {
        let at = jst().with_ymd_and_hms(2024, 3, 5, 13, 7, 0).unwrap();
        assert_eq!(date_header(&at), "2024/3/5(火)");
        assert_eq!(message_time(&at), "13:07");
        assert_eq!(csv_date(&at), "2024/03/05");
        assert_eq!(saved_at(&at), "2024/3/5 午後1:07");
        assert_eq!(filename_stamp(&at), "20240305_1307");
    }

    #[test]
    fn test_midnight_and_noon() {
        let midnight = jst().with_ymd_and_hms(2024, 1, 7, 0, 5, 0).unwrap();
        assert_eq!(saved_at(&midnight), "2024/1/7 午前12:05");
        assert_eq!(message_time(&midnight), "0:05");
        assert_eq!(date_header(&midnight), "2024/1/7(日)");

        let noon = jst().with_ymd_and_hms(2024, 1, 7, 12, 0, 0).unwrap();
        assert_eq!(saved_at(&noon), "2024/1/7 午後12:00");
    }

    #[test]
    fn test_local_time_applies_offset() {
        // 2024-03-04T23:30:00Z is already the 5th in Tokyo
        let at = local_time(1_709_595_000_000, &ExportZone::Fixed(jst()));
        assert_eq!(csv_date(&at), "2024/03/05");
        assert_eq!(message_time(&at), "8:30");
    }

    #[test]
    fn test_named_zone_follows_daylight_saving() {
        let zone = ExportZone::Named(chrono_tz::America::New_York);

        let winter = zone.localize(Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap());
        assert_eq!(message_time(&winter), "7:00");

        let summer = zone.localize(Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap());
        assert_eq!(message_time(&summer), "8:00");
    }

    #[test]
    fn test_local_zone_resolves_each_timestamp() {
        for at in [
            Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap(),
        ] {
            let expected = at.with_timezone(&Local);
            assert_eq!(ExportZone::Local.localize(at).offset(), &expected.offset().fix());
        }
    }
}
