//! Decoder for the tab-delimited `parameter` column
//!
//! The blob is `key\tvalue\tkey\tvalue...`. Its layout is undocumented and
//! drifts between app versions, so decoding never fails: malformed input
//! just yields fewer entries.

use std::collections::HashMap;

/// Decoded key/value pairs of one message row
pub type Parameters = HashMap<String, String>;

/// Decode a parameter blob
///
/// Pairs with an empty key are skipped, a trailing key without a value maps
/// to an empty string and a repeated key keeps the last value.
pub fn decode(raw: Option<&str>) -> Parameters {
    let mut params = Parameters::new();
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return params;
    };

    let mut fields = raw.split('\t');
    while let Some(key) = fields.next() {
        let value = fields.next().unwrap_or("");
        if key.is_empty() {
            continue;
        }
        params.insert(key.to_string(), value.to_string());
    }

    params
}

/// Best-effort integer parse: leading whitespace, optional sign, then the
/// longest run of ASCII digits. `"120ms"` gives 120, `"abc"` gives `None`.
pub fn parse_int(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Look up a parameter and parse it as an integer
pub fn int_param(params: &Parameters, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| parse_int(v))
}

/// Look up a parameter, treating an empty value as absent
pub fn non_empty<'a>(params: &'a Parameters, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_pairs() {
        let params = decode(Some("STKPKGID\t123\tSTKID\t456"));
        assert_eq!(params.len(), 2);
        assert_eq!(params["STKPKGID"], "123");
        assert_eq!(params["STKID"], "456");
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(decode(None).is_empty());
        assert!(decode(Some("")).is_empty());
    }

    #[test]
    fn test_decode_skips_empty_key() {
        let params = decode(Some("\torphan\tTYPE\tV"));
        assert_eq!(params.len(), 1);
        assert_eq!(params["TYPE"], "V");
    }

    #[test]
    fn test_decode_trailing_key_defaults_to_empty() {
        let params = decode(Some("A\t1\tB"));
        assert_eq!(params["A"], "1");
        assert_eq!(params["B"], "");
    }

    #[test]
    fn test_decode_last_write_wins() {
        let params = decode(Some("K\tfirst\tK\tsecond"));
        assert_eq!(params.len(), 1);
        assert_eq!(params["K"], "second");
    }

    #[test]
    fn test_decode_counts_well_formed_pairs() {
        let raw = (0..10)
            .map(|i| format!("key{i}\tvalue{i}"))
            .collect::<Vec<_>>()
            .join("\t");
        assert_eq!(decode(Some(&raw)).len(), 10);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("  -7"), Some(-7));
        assert_eq!(parse_int("120ms"), Some(120));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
    }
}
