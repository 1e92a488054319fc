//! Total coercions from loosely-typed SQLite values
//!
//! Backup columns are not reliably typed (timestamps show up as text,
//! ids as integers), so every read goes through these helpers.

use rusqlite::types::Value;
use std::collections::HashMap;

/// One result row keyed by column name
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    columns: HashMap<String, Value>,
}

impl RawRow {
    pub fn new(columns: HashMap<String, Value>) -> Self {
        Self { columns }
    }

    /// Read a row from a statement whose column names are already known
    pub fn from_row(names: &[String], row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let mut columns = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            columns.insert(name.clone(), Value::from(row.get_ref(idx)?));
        }
        Ok(Self { columns })
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn string_or(&self, column: &str, default: &str) -> String {
        as_string(self.get(column)).unwrap_or_else(|| default.to_string())
    }

    pub fn opt_string(&self, column: &str) -> Option<String> {
        as_string(self.get(column))
    }

    pub fn int_or(&self, column: &str, default: i64) -> i64 {
        as_number(self.get(column))
            .map(|n| n.trunc() as i64)
            .unwrap_or(default)
    }

    pub fn opt_number(&self, column: &str) -> Option<f64> {
        as_number(self.get(column))
    }
}

/// Text, integer and real values become strings; anything else is absent
pub fn as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) if f.is_finite() => Some(f.to_string()),
        _ => None,
    }
}

/// Integer, real and numeric text become a finite number; anything else is absent
pub fn as_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Integer(i) => *i as f64,
        Value::Real(f) => *f,
        Value::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> RawRow {
        RawRow::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_string_coercion() {
        let r = row(&[
            ("text", Value::Text("abc".into())),
            ("int", Value::Integer(42)),
            ("null", Value::Null),
            ("blob", Value::Blob(vec![1, 2])),
        ]);
        assert_eq!(r.string_or("text", "-"), "abc");
        assert_eq!(r.string_or("int", "-"), "42");
        assert_eq!(r.string_or("null", "-"), "-");
        assert_eq!(r.string_or("blob", "-"), "-");
        assert_eq!(r.string_or("missing", "-"), "-");
    }

    #[test]
    fn test_numeric_coercion() {
        let r = row(&[
            ("int", Value::Integer(1_700_000_000_000)),
            ("text", Value::Text("1700000000000".into())),
            ("real", Value::Real(3.9)),
            ("junk", Value::Text("soon".into())),
            ("inf", Value::Real(f64::INFINITY)),
        ]);
        assert_eq!(r.int_or("int", 0), 1_700_000_000_000);
        assert_eq!(r.int_or("text", 0), 1_700_000_000_000);
        assert_eq!(r.int_or("real", 0), 3);
        assert_eq!(r.int_or("junk", -1), -1);
        assert_eq!(r.int_or("inf", -1), -1);
        assert_eq!(r.opt_number("missing"), None);
    }
}
