//! Model-side values.
//!
//! [`ModelValue`] is the materialized object graph handed to and from entity
//! materialization: typed scalars, lists, named records and anonymous structs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::fields::Fields;

/// Opaque spatial value carried as Well-Known Text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Geography {
    wkt: String,
}

impl Geography {
    /// Wrap a WKT string (`POINT(-122.35 47.62)`).
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self { wkt: wkt.into() }
    }

    /// The Well-Known Text payload.
    pub fn as_wkt(&self) -> &str {
        &self.wkt
    }
}

/// Instance of a registered composite record type.
///
/// Field values are held in declared order, keyed by property name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordValue {
    /// Registered record type name.
    pub type_name: String,

    /// Property values in declaration order.
    pub fields: Fields<ModelValue>,
}

impl RecordValue {
    /// Create an empty record of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Fields::new(),
        }
    }

    /// Builder-style property assignment.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ModelValue>) -> Self {
        self.fields.set(name, value.into());
        self
    }

    /// Get a property value by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&ModelValue> {
        self.fields.get(name)
    }
}

/// Model value enum for materialized entity data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModelValue {
    /// Absent value.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 64-bit signed integer.
    Int64(i64),

    /// 64-bit floating point.
    Float64(f64),

    /// Exact decimal (NUMERIC / BIGNUMERIC).
    Numeric(Decimal),

    /// Text.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// Calendar date.
    Date(NaiveDate),

    /// Date and time without timezone.
    DateTime(NaiveDateTime),

    /// Absolute point in time.
    Timestamp(DateTime<Utc>),

    /// Time of day.
    Time(NaiveTime),

    /// JSON document.
    Json(serde_json::Value),

    /// Spatial value.
    Geography(Geography),

    /// Ordered collection.
    List(Vec<ModelValue>),

    /// Registered composite record.
    Record(RecordValue),

    /// Struct with no registered record type.
    Anonymous(Fields<ModelValue>),
}

impl ModelValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ModelValue::Null)
    }

    /// Short description of the value's shape for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ModelValue::Null => "null",
            ModelValue::Bool(_) => "bool",
            ModelValue::Int64(_) => "i64",
            ModelValue::Float64(_) => "f64",
            ModelValue::Numeric(_) => "decimal",
            ModelValue::String(_) => "string",
            ModelValue::Bytes(_) => "bytes",
            ModelValue::Date(_) => "date",
            ModelValue::DateTime(_) => "datetime",
            ModelValue::Timestamp(_) => "timestamp",
            ModelValue::Time(_) => "time",
            ModelValue::Json(_) => "json",
            ModelValue::Geography(_) => "geography",
            ModelValue::List(_) => "list",
            ModelValue::Record(_) => "record",
            ModelValue::Anonymous(_) => "anonymous struct",
        }
    }

    /// Struct fields of a record or anonymous struct.
    pub fn struct_fields(&self) -> Option<&Fields<ModelValue>> {
        match self {
            ModelValue::Record(r) => Some(&r.fields),
            ModelValue::Anonymous(f) => Some(f),
            _ => None,
        }
    }

    /// Build a list from anything convertible into model values.
    pub fn list<T: Into<ModelValue>>(items: impl IntoIterator<Item = T>) -> Self {
        ModelValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<bool> for ModelValue {
    fn from(v: bool) -> Self {
        ModelValue::Bool(v)
    }
}

impl From<i32> for ModelValue {
    fn from(v: i32) -> Self {
        ModelValue::Int64(v.into())
    }
}

impl From<i64> for ModelValue {
    fn from(v: i64) -> Self {
        ModelValue::Int64(v)
    }
}

impl From<f64> for ModelValue {
    fn from(v: f64) -> Self {
        ModelValue::Float64(v)
    }
}

impl From<Decimal> for ModelValue {
    fn from(v: Decimal) -> Self {
        ModelValue::Numeric(v)
    }
}

impl From<String> for ModelValue {
    fn from(v: String) -> Self {
        ModelValue::String(v)
    }
}

impl From<&str> for ModelValue {
    fn from(v: &str) -> Self {
        ModelValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for ModelValue {
    fn from(v: Vec<u8>) -> Self {
        ModelValue::Bytes(v)
    }
}

impl From<NaiveDate> for ModelValue {
    fn from(v: NaiveDate) -> Self {
        ModelValue::Date(v)
    }
}

impl From<NaiveDateTime> for ModelValue {
    fn from(v: NaiveDateTime) -> Self {
        ModelValue::DateTime(v)
    }
}

impl From<DateTime<Utc>> for ModelValue {
    fn from(v: DateTime<Utc>) -> Self {
        ModelValue::Timestamp(v)
    }
}

impl From<NaiveTime> for ModelValue {
    fn from(v: NaiveTime) -> Self {
        ModelValue::Time(v)
    }
}

impl From<Geography> for ModelValue {
    fn from(v: Geography) -> Self {
        ModelValue::Geography(v)
    }
}

impl From<RecordValue> for ModelValue {
    fn from(v: RecordValue) -> Self {
        ModelValue::Record(v)
    }
}

impl<T: Into<ModelValue>> From<Option<T>> for ModelValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ModelValue::Null)
    }
}
