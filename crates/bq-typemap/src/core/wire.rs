//! Wire-level values exchanged with the remote service.
//!
//! These are the loosely typed shapes the protocol layer produces when it
//! decodes a result row (nested maps, lists and scalars) and the values handed
//! to it as bound query parameters.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::fields::Fields;

/// Loosely typed wire value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Numeric(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Time(NaiveTime),
    /// Spatial value as Well-Known Text.
    Geography(String),
    Array(Vec<WireValue>),
    /// Struct with field names as returned by the service.
    Struct(Fields<WireValue>),
}

impl WireValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }

    /// Short description of the value's shape for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Bool(_) => "bool",
            WireValue::Int64(_) => "int64",
            WireValue::Float64(_) => "float64",
            WireValue::Numeric(_) => "numeric",
            WireValue::String(_) => "string",
            WireValue::Bytes(_) => "bytes",
            WireValue::Date(_) => "date",
            WireValue::DateTime(_) => "datetime",
            WireValue::Timestamp(_) => "timestamp",
            WireValue::Time(_) => "time",
            WireValue::Geography(_) => "geography",
            WireValue::Array(_) => "array",
            WireValue::Struct(_) => "struct",
        }
    }

    /// Conservative estimate of the encoded request size of this value.
    ///
    /// Used for payload accounting of bound parameters. It is never below
    /// the length of the value's JSON encoding: strings are measured with
    /// JSON escaping applied, and every value carries a type tag allowance.
    #[must_use]
    pub fn estimated_size(&self) -> usize {
        const TAG: usize = 16;
        match self {
            WireValue::Null => TAG + 4,
            WireValue::Bool(_) => TAG + 5,
            WireValue::Int64(_) | WireValue::Float64(_) => TAG + 24,
            WireValue::Numeric(_) => TAG + 80,
            WireValue::String(s) | WireValue::Geography(s) => TAG + json_string_len(s),
            // Base64 on the wire, a JSON number array in the worst case.
            WireValue::Bytes(b) => TAG + 2 + b.len() * 4,
            WireValue::Date(_) => TAG + 16,
            WireValue::DateTime(_) | WireValue::Timestamp(_) | WireValue::Time(_) => TAG + 40,
            WireValue::Array(items) => {
                TAG + 2 + items.iter().map(|v| v.estimated_size() + 1).sum::<usize>()
            }
            WireValue::Struct(fields) => {
                TAG + 2
                    + fields
                        .iter()
                        .map(|(name, v)| json_string_len(name) + 4 + v.estimated_size())
                        .sum::<usize>()
            }
        }
    }
}

/// Length of `s` once escaped for a JSON string body (without quotes).
///
/// Matches `serde_json`: `"` and `\` and the short escapes take two bytes,
/// other control characters take six (`\u00XX`).
#[must_use]
pub fn json_escaped_len(s: &str) -> usize {
    s.chars()
        .map(|c| match c {
            '"' | '\\' | '\n' | '\r' | '\t' | '\u{8}' | '\u{c}' => 2,
            c if (c as u32) < 0x20 => 6,
            c => c.len_utf8(),
        })
        .sum()
}

/// Length of `s` as a quoted JSON string.
#[must_use]
pub fn json_string_len(s: &str) -> usize {
    json_escaped_len(s) + 2
}

impl From<&serde_json::Value> for WireValue {
    /// Untyped conversion; scalar codecs coerce strings and numbers to the
    /// declared store type when decoding.
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => WireValue::Null,
            serde_json::Value::Bool(b) => WireValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => WireValue::Int64(i),
                None => match n.as_f64() {
                    Some(f) => WireValue::Float64(f),
                    None => WireValue::String(n.to_string()),
                },
            },
            serde_json::Value::String(s) => WireValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                WireValue::Array(items.iter().map(WireValue::from).collect())
            }
            serde_json::Value::Object(map) => WireValue::Struct(
                map.iter()
                    .map(|(k, v)| (k.clone(), WireValue::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_preserves_order() {
        let wire = WireValue::from(&json!({"zeta": 1, "alpha": [true, null], "mid": "x"}));
        match wire {
            WireValue::Struct(fields) => {
                let names: Vec<&str> = fields.names().collect();
                assert_eq!(names, vec!["zeta", "alpha", "mid"]);
                assert_eq!(
                    fields.get("alpha"),
                    Some(&WireValue::Array(vec![WireValue::Bool(true), WireValue::Null]))
                );
            }
            other => panic!("expected struct, got {:?}", other),
        }
    }

    #[test]
    fn test_from_json_numbers() {
        assert_eq!(WireValue::from(&json!(7)), WireValue::Int64(7));
        assert_eq!(WireValue::from(&json!(1.5)), WireValue::Float64(1.5));
    }

    #[test]
    fn test_estimated_size_grows_with_content() {
        let short = WireValue::String("a".into());
        let long = WireValue::String("a".repeat(100));
        assert!(long.estimated_size() > short.estimated_size());
        assert!(short.estimated_size() >= 3);

        let nested = WireValue::Array(vec![short.clone(), short.clone()]);
        assert!(nested.estimated_size() > 2 * short.estimated_size());
    }

    #[test]
    fn test_json_escaped_len_matches_serde_json() {
        for s in ["plain", "quote\" and \\ slash", "\u{1}\u{1f}\n\t\u{8}", "caf\u{e9} \u{1f600}", ""] {
            let encoded = serde_json::to_string(s).unwrap();
            assert_eq!(json_string_len(s), encoded.len(), "{:?}", s);
        }
    }

    #[test]
    fn test_estimate_covers_json_encoding() {
        let control = "\u{1}".repeat(1000);
        let values = vec![
            WireValue::String(control.clone()),
            WireValue::Geography(format!("POINT(1 2){}", control)),
            WireValue::String("\\".repeat(500)),
            WireValue::Bytes(vec![255; 300]),
            WireValue::Int64(i64::MIN),
            WireValue::Float64(-2.2250738585072014e-308),
            WireValue::Null,
            WireValue::Array(vec![WireValue::String(control.clone()), WireValue::Null]),
            WireValue::Struct(
                Fields::new()
                    .with("a\u{2}b", WireValue::String(control))
                    .with("n", WireValue::Bool(false)),
            ),
        ];
        for value in values {
            let encoded = serde_json::to_string(&value).unwrap();
            assert!(
                encoded.len() <= value.estimated_size(),
                "{} bytes encoded, {} estimated for {}",
                encoded.len(),
                value.estimated_size(),
                value.kind()
            );
        }
    }
}
