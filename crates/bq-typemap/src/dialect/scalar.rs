//! Scalar leaf codecs.
//!
//! Every scalar store type (`INT64`, `STRING`, `GEOGRAPHY`, ...) is backed by a
//! [`ScalarCodec`]. The built-in GoogleSQL scalars live in [`BuiltinScalar`];
//! plugins register additional codecs with the
//! [`TypeMappingRegistry`](crate::typemap::TypeMappingRegistry).
//!
//! Codecs never see NULL: the owning mapping short-circuits null values
//! before calling into the codec.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;

use crate::core::identifier::quote_string;
use crate::core::{Fields, Geography, ModelValue, WireValue};
use crate::error::{Result, TypeMapError};
use crate::typemap::ModelType;

/// Conversion, comparison and literal rules for one scalar store type.
pub trait ScalarCodec: Send + Sync + fmt::Debug {
    /// Canonical store type name (upper case, without arguments).
    fn store_type(&self) -> &str;

    /// Alternative store type names resolving to this codec.
    fn aliases(&self) -> &[&'static str] {
        &[]
    }

    /// Model type produced by `from_wire`.
    fn model_type(&self) -> ModelType;

    /// Convert a non-null model value into its wire form.
    fn to_wire(&self, value: &ModelValue) -> Result<WireValue>;

    /// Convert a non-null wire value into a model value.
    fn from_wire(&self, wire: &WireValue) -> Result<ModelValue>;

    /// Render a non-null model value as SQL literal text.
    fn literal(&self, value: &ModelValue) -> Result<String>;

    /// Compare two non-null model values.
    fn values_equal(&self, a: &ModelValue, b: &ModelValue) -> bool {
        a == b
    }

    /// Value used for a non-nullable field absent from wire input.
    fn default_value(&self) -> Option<ModelValue> {
        None
    }

    /// Whether values of this type can only be written as literals.
    fn requires_literal(&self) -> bool {
        false
    }
}

fn mismatch(expected: &str, found: &str) -> TypeMapError {
    TypeMapError::field_mismatch("", format!("expected {} value, found {}", expected, found))
}

fn unparsable(expected: &str, text: &str) -> TypeMapError {
    TypeMapError::field_mismatch("", format!("cannot parse {:?} as {}", text, expected))
}

/// GoogleSQL built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinScalar {
    Bool,
    Int64,
    Float64,
    Numeric,
    BigNumeric,
    String,
    Bytes,
    Date,
    DateTime,
    Timestamp,
    Time,
    Json,
}

impl BuiltinScalar {
    /// All built-ins, in registration order.
    pub const ALL: [BuiltinScalar; 12] = [
        BuiltinScalar::Bool,
        BuiltinScalar::Int64,
        BuiltinScalar::Float64,
        BuiltinScalar::Numeric,
        BuiltinScalar::BigNumeric,
        BuiltinScalar::String,
        BuiltinScalar::Bytes,
        BuiltinScalar::Date,
        BuiltinScalar::DateTime,
        BuiltinScalar::Timestamp,
        BuiltinScalar::Time,
        BuiltinScalar::Json,
    ];
}

impl ScalarCodec for BuiltinScalar {
    fn store_type(&self) -> &str {
        match self {
            BuiltinScalar::Bool => "BOOL",
            BuiltinScalar::Int64 => "INT64",
            BuiltinScalar::Float64 => "FLOAT64",
            BuiltinScalar::Numeric => "NUMERIC",
            BuiltinScalar::BigNumeric => "BIGNUMERIC",
            BuiltinScalar::String => "STRING",
            BuiltinScalar::Bytes => "BYTES",
            BuiltinScalar::Date => "DATE",
            BuiltinScalar::DateTime => "DATETIME",
            BuiltinScalar::Timestamp => "TIMESTAMP",
            BuiltinScalar::Time => "TIME",
            BuiltinScalar::Json => "JSON",
        }
    }

    fn aliases(&self) -> &[&'static str] {
        match self {
            BuiltinScalar::Bool => &["BOOLEAN"],
            BuiltinScalar::Int64 => &["INT", "INTEGER", "SMALLINT", "BIGINT", "TINYINT", "BYTEINT"],
            BuiltinScalar::Float64 => &["FLOAT"],
            BuiltinScalar::Numeric => &["DECIMAL"],
            BuiltinScalar::BigNumeric => &["BIGDECIMAL"],
            _ => &[],
        }
    }

    fn model_type(&self) -> ModelType {
        match self {
            BuiltinScalar::Bool => ModelType::Bool,
            BuiltinScalar::Int64 => ModelType::Int64,
            BuiltinScalar::Float64 => ModelType::Float64,
            BuiltinScalar::Numeric | BuiltinScalar::BigNumeric => ModelType::Decimal,
            BuiltinScalar::String => ModelType::String,
            BuiltinScalar::Bytes => ModelType::Bytes,
            BuiltinScalar::Date => ModelType::Date,
            BuiltinScalar::DateTime => ModelType::DateTime,
            BuiltinScalar::Timestamp => ModelType::Timestamp,
            BuiltinScalar::Time => ModelType::Time,
            BuiltinScalar::Json => ModelType::Json,
        }
    }

    fn to_wire(&self, value: &ModelValue) -> Result<WireValue> {
        let wire = match (self, value) {
            (BuiltinScalar::Bool, ModelValue::Bool(b)) => WireValue::Bool(*b),
            (BuiltinScalar::Int64, ModelValue::Int64(i)) => WireValue::Int64(*i),
            (BuiltinScalar::Float64, ModelValue::Float64(f)) => WireValue::Float64(*f),
            (BuiltinScalar::Float64, ModelValue::Int64(i)) => WireValue::Float64(*i as f64),
            (BuiltinScalar::Numeric | BuiltinScalar::BigNumeric, ModelValue::Numeric(d)) => {
                WireValue::Numeric(*d)
            }
            (BuiltinScalar::Numeric | BuiltinScalar::BigNumeric, ModelValue::Int64(i)) => {
                WireValue::Numeric(Decimal::from(*i))
            }
            (BuiltinScalar::String, ModelValue::String(s)) => WireValue::String(s.clone()),
            (BuiltinScalar::Bytes, ModelValue::Bytes(b)) => WireValue::Bytes(b.clone()),
            (BuiltinScalar::Date, ModelValue::Date(d)) => WireValue::Date(*d),
            (BuiltinScalar::DateTime, ModelValue::DateTime(dt)) => WireValue::DateTime(*dt),
            (BuiltinScalar::Timestamp, ModelValue::Timestamp(ts)) => WireValue::Timestamp(*ts),
            (BuiltinScalar::Time, ModelValue::Time(t)) => WireValue::Time(*t),
            (BuiltinScalar::Json, ModelValue::Json(v)) => WireValue::String(v.to_string()),
            _ => return Err(mismatch(self.store_type(), value.kind())),
        };
        Ok(wire)
    }

    fn from_wire(&self, wire: &WireValue) -> Result<ModelValue> {
        let name = self.store_type();
        let value = match (self, wire) {
            (BuiltinScalar::Bool, WireValue::Bool(b)) => ModelValue::Bool(*b),
            (BuiltinScalar::Bool, WireValue::String(s)) => {
                if s.eq_ignore_ascii_case("true") {
                    ModelValue::Bool(true)
                } else if s.eq_ignore_ascii_case("false") {
                    ModelValue::Bool(false)
                } else {
                    return Err(unparsable(name, s));
                }
            }

            (BuiltinScalar::Int64, WireValue::Int64(i)) => ModelValue::Int64(*i),
            (BuiltinScalar::Int64, WireValue::String(s)) => {
                ModelValue::Int64(s.trim().parse().map_err(|_| unparsable(name, s))?)
            }

            (BuiltinScalar::Float64, WireValue::Float64(f)) => ModelValue::Float64(*f),
            (BuiltinScalar::Float64, WireValue::Int64(i)) => ModelValue::Float64(*i as f64),
            (BuiltinScalar::Float64, WireValue::String(s)) => {
                ModelValue::Float64(s.trim().parse().map_err(|_| unparsable(name, s))?)
            }

            (BuiltinScalar::Numeric | BuiltinScalar::BigNumeric, WireValue::Numeric(d)) => {
                ModelValue::Numeric(*d)
            }
            (BuiltinScalar::Numeric | BuiltinScalar::BigNumeric, WireValue::Int64(i)) => {
                ModelValue::Numeric(Decimal::from(*i))
            }
            (BuiltinScalar::Numeric | BuiltinScalar::BigNumeric, WireValue::Float64(f)) => {
                ModelValue::Numeric(Decimal::try_from(*f).map_err(|_| {
                    TypeMapError::field_mismatch("", format!("{} is out of range for {}", f, name))
                })?)
            }
            (BuiltinScalar::Numeric | BuiltinScalar::BigNumeric, WireValue::String(s)) => {
                let text = s.trim();
                let parsed = Decimal::from_str(text)
                    .or_else(|_| Decimal::from_scientific(text))
                    .map_err(|_| unparsable(name, s))?;
                ModelValue::Numeric(parsed)
            }

            (BuiltinScalar::String, WireValue::String(s)) => ModelValue::String(s.clone()),

            (BuiltinScalar::Bytes, WireValue::Bytes(b)) => ModelValue::Bytes(b.clone()),
            (BuiltinScalar::Bytes, WireValue::String(s)) => {
                ModelValue::Bytes(BASE64.decode(s).map_err(|_| unparsable(name, s))?)
            }

            (BuiltinScalar::Date, WireValue::Date(d)) => ModelValue::Date(*d),
            (BuiltinScalar::Date, WireValue::String(s)) => ModelValue::Date(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| unparsable(name, s))?,
            ),

            (BuiltinScalar::DateTime, WireValue::DateTime(dt)) => ModelValue::DateTime(*dt),
            (BuiltinScalar::DateTime, WireValue::String(s)) => {
                ModelValue::DateTime(parse_datetime(s).ok_or_else(|| unparsable(name, s))?)
            }

            (BuiltinScalar::Timestamp, WireValue::Timestamp(ts)) => ModelValue::Timestamp(*ts),
            (BuiltinScalar::Timestamp, WireValue::String(s)) => {
                ModelValue::Timestamp(parse_timestamp(s).ok_or_else(|| unparsable(name, s))?)
            }

            (BuiltinScalar::Time, WireValue::Time(t)) => ModelValue::Time(*t),
            (BuiltinScalar::Time, WireValue::String(s)) => ModelValue::Time(
                NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                    .map_err(|_| unparsable(name, s))?,
            ),

            (BuiltinScalar::Json, WireValue::String(s)) => {
                ModelValue::Json(serde_json::from_str(s).map_err(|_| unparsable(name, s))?)
            }
            (BuiltinScalar::Json, WireValue::Bool(b)) => ModelValue::Json(serde_json::Value::Bool(*b)),
            (BuiltinScalar::Json, WireValue::Int64(i)) => ModelValue::Json(serde_json::Value::from(*i)),
            (BuiltinScalar::Json, WireValue::Float64(f)) => ModelValue::Json(serde_json::Value::from(*f)),

            _ => return Err(mismatch(name, wire.kind())),
        };
        Ok(value)
    }

    fn literal(&self, value: &ModelValue) -> Result<String> {
        let wire = self.to_wire(value)?;
        Ok(match (self, &wire) {
            (BuiltinScalar::BigNumeric, WireValue::Numeric(d)) => format!("BIGNUMERIC '{}'", d),
            (BuiltinScalar::Json, WireValue::String(text)) => format!("JSON {}", quote_string(text)),
            _ => wire_literal(&wire),
        })
    }

    fn values_equal(&self, a: &ModelValue, b: &ModelValue) -> bool {
        match (a, b) {
            (ModelValue::Float64(x), ModelValue::Float64(y)) => x == y || (x.is_nan() && y.is_nan()),
            _ => a == b,
        }
    }

    fn default_value(&self) -> Option<ModelValue> {
        match self {
            BuiltinScalar::Bool => Some(ModelValue::Bool(false)),
            BuiltinScalar::Int64 => Some(ModelValue::Int64(0)),
            BuiltinScalar::Float64 => Some(ModelValue::Float64(0.0)),
            BuiltinScalar::Numeric | BuiltinScalar::BigNumeric => Some(ModelValue::Numeric(Decimal::ZERO)),
            BuiltinScalar::String => Some(ModelValue::String(String::new())),
            BuiltinScalar::Bytes => Some(ModelValue::Bytes(Vec::new())),
            _ => None,
        }
    }
}

/// Parse the DATETIME forms returned by the REST API.
fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Parse TIMESTAMP text: RFC 3339, `... UTC`, or epoch seconds as returned by
/// `tabledata.list`.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(naive) = text.strip_suffix(" UTC").and_then(parse_datetime) {
        return Some(naive.and_utc());
    }
    let seconds: f64 = text.parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }
    let micros = (seconds * 1_000_000.0).round() as i64;
    DateTime::from_timestamp_micros(micros)
}

/// Render a FLOAT64 literal; non-finite values need a cast.
pub(crate) fn float_literal(f: f64) -> String {
    if f.is_nan() {
        "CAST('NaN' AS FLOAT64)".to_string()
    } else if f.is_infinite() {
        if f > 0.0 {
            "CAST('inf' AS FLOAT64)".to_string()
        } else {
            "CAST('-inf' AS FLOAT64)".to_string()
        }
    } else {
        format!("{:?}", f)
    }
}

/// Render a wire value as literal text using the type implied by its variant.
///
/// Arrays and structs render untyped (`[..]`, `STRUCT(v AS name)`); typed
/// composite literals are produced by the mapping, which knows the store type.
pub(crate) fn wire_literal(wire: &WireValue) -> String {
    match wire {
        WireValue::Null => "NULL".to_string(),
        WireValue::Bool(true) => "TRUE".to_string(),
        WireValue::Bool(false) => "FALSE".to_string(),
        WireValue::Int64(i) => i.to_string(),
        WireValue::Float64(f) => float_literal(*f),
        WireValue::Numeric(d) => format!("NUMERIC '{}'", d),
        WireValue::String(s) => quote_string(s),
        WireValue::Bytes(b) => format!("FROM_HEX('{}')", hex::encode(b)),
        WireValue::Date(d) => format!("DATE '{}'", d.format("%Y-%m-%d")),
        WireValue::DateTime(dt) => format!("DATETIME '{}'", dt.format("%Y-%m-%d %H:%M:%S%.6f")),
        WireValue::Timestamp(ts) => {
            format!("TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.6f%:z"))
        }
        WireValue::Time(t) => format!("TIME '{}'", t.format("%H:%M:%S%.6f")),
        WireValue::Geography(wkt) => format!("ST_GEOGFROMTEXT({})", quote_string(wkt)),
        WireValue::Array(items) => {
            let rendered: Vec<String> = items.iter().map(wire_literal).collect();
            format!("[{}]", rendered.join(", "))
        }
        WireValue::Struct(fields) => {
            let rendered: Vec<String> = fields
                .iter()
                .map(|(name, value)| {
                    let alias = crate::core::identifier::quote_ident(name)
                        .unwrap_or_else(|_| name.to_string());
                    format!("{} AS {}", wire_literal(value), alias)
                })
                .collect();
            format!("STRUCT({})", rendered.join(", "))
        }
    }
}

/// Untyped codec for scalar names no registered codec claims.
///
/// Values pass through structurally; literals are rendered from the wire
/// variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughScalar {
    store_type: String,
}

impl PassthroughScalar {
    pub fn new(store_type: impl Into<String>) -> Self {
        Self {
            store_type: store_type.into(),
        }
    }
}

fn passthrough_to_wire(value: &ModelValue) -> WireValue {
    match value {
        ModelValue::Null => WireValue::Null,
        ModelValue::Bool(b) => WireValue::Bool(*b),
        ModelValue::Int64(i) => WireValue::Int64(*i),
        ModelValue::Float64(f) => WireValue::Float64(*f),
        ModelValue::Numeric(d) => WireValue::Numeric(*d),
        ModelValue::String(s) => WireValue::String(s.clone()),
        ModelValue::Bytes(b) => WireValue::Bytes(b.clone()),
        ModelValue::Date(d) => WireValue::Date(*d),
        ModelValue::DateTime(dt) => WireValue::DateTime(*dt),
        ModelValue::Timestamp(ts) => WireValue::Timestamp(*ts),
        ModelValue::Time(t) => WireValue::Time(*t),
        ModelValue::Json(v) => WireValue::String(v.to_string()),
        ModelValue::Geography(g) => WireValue::Geography(g.as_wkt().to_string()),
        ModelValue::List(items) => WireValue::Array(items.iter().map(passthrough_to_wire).collect()),
        ModelValue::Record(record) => WireValue::Struct(
            record
                .fields
                .iter()
                .map(|(name, v)| (name.to_string(), passthrough_to_wire(v)))
                .collect(),
        ),
        ModelValue::Anonymous(fields) => WireValue::Struct(
            fields
                .iter()
                .map(|(name, v)| (name.to_string(), passthrough_to_wire(v)))
                .collect(),
        ),
    }
}

fn passthrough_from_wire(wire: &WireValue) -> ModelValue {
    match wire {
        WireValue::Null => ModelValue::Null,
        WireValue::Bool(b) => ModelValue::Bool(*b),
        WireValue::Int64(i) => ModelValue::Int64(*i),
        WireValue::Float64(f) => ModelValue::Float64(*f),
        WireValue::Numeric(d) => ModelValue::Numeric(*d),
        WireValue::String(s) => ModelValue::String(s.clone()),
        WireValue::Bytes(b) => ModelValue::Bytes(b.clone()),
        WireValue::Date(d) => ModelValue::Date(*d),
        WireValue::DateTime(dt) => ModelValue::DateTime(*dt),
        WireValue::Timestamp(ts) => ModelValue::Timestamp(*ts),
        WireValue::Time(t) => ModelValue::Time(*t),
        WireValue::Geography(wkt) => ModelValue::Geography(Geography::from_wkt(wkt.clone())),
        WireValue::Array(items) => ModelValue::List(items.iter().map(passthrough_from_wire).collect()),
        WireValue::Struct(fields) => ModelValue::Anonymous(
            fields
                .iter()
                .map(|(name, v)| (name.to_string(), passthrough_from_wire(v)))
                .collect::<Fields<ModelValue>>(),
        ),
    }
}

impl ScalarCodec for PassthroughScalar {
    fn store_type(&self) -> &str {
        &self.store_type
    }

    fn model_type(&self) -> ModelType {
        ModelType::Opaque(self.store_type.clone())
    }

    fn to_wire(&self, value: &ModelValue) -> Result<WireValue> {
        Ok(passthrough_to_wire(value))
    }

    fn from_wire(&self, wire: &WireValue) -> Result<ModelValue> {
        Ok(passthrough_from_wire(wire))
    }

    fn literal(&self, value: &ModelValue) -> Result<String> {
        Ok(wire_literal(&passthrough_to_wire(value)))
    }
}
