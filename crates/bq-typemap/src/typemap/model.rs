//! Model-side type descriptions.
//!
//! Composite record shapes are declared ahead of time through
//! [`RecordShape`] (or the [`CompositeRecord`] trait) and registered with the
//! [`TypeMappingRegistry`](super::TypeMappingRegistry); nothing is discovered
//! at runtime.

use std::fmt;

use crate::core::value::{ModelValue, RecordValue};
use crate::error::Result;

/// Shape of a value on the model side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelType {
    Bool,
    Int64,
    Float64,
    Decimal,
    String,
    Bytes,
    Date,
    DateTime,
    Timestamp,
    Time,
    Json,
    /// Scalar shape contributed by a plugin (e.g. `Geography`).
    Opaque(String),
    /// Ordered collection of the element type.
    List(Box<ModelType>),
    /// Registered composite record, by name.
    Record(String),
    /// Struct without a registered record type.
    Anonymous,
}

impl ModelType {
    /// Collection of `element`.
    pub fn list(element: ModelType) -> Self {
        ModelType::List(Box::new(element))
    }

    /// Registered record by name.
    pub fn record(name: impl Into<String>) -> Self {
        ModelType::Record(name.into())
    }

    /// Plugin scalar by name.
    pub fn opaque(name: impl Into<String>) -> Self {
        ModelType::Opaque(name.into())
    }

    /// Check whether this is a list, record or anonymous struct.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            ModelType::List(_) | ModelType::Record(_) | ModelType::Anonymous
        )
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Bool => write!(f, "bool"),
            ModelType::Int64 => write!(f, "i64"),
            ModelType::Float64 => write!(f, "f64"),
            ModelType::Decimal => write!(f, "Decimal"),
            ModelType::String => write!(f, "String"),
            ModelType::Bytes => write!(f, "Vec<u8>"),
            ModelType::Date => write!(f, "NaiveDate"),
            ModelType::DateTime => write!(f, "NaiveDateTime"),
            ModelType::Timestamp => write!(f, "DateTime<Utc>"),
            ModelType::Time => write!(f, "NaiveTime"),
            ModelType::Json => write!(f, "serde_json::Value"),
            ModelType::Opaque(name) => write!(f, "{}", name),
            ModelType::List(element) => write!(f, "Vec<{}>", element),
            ModelType::Record(name) => write!(f, "{}", name),
            ModelType::Anonymous => write!(f, "anonymous struct"),
        }
    }
}

/// One property of a composite record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Property name (case preserved; used as the store field name when the
    /// store type is generated from the record).
    pub name: String,

    /// Property type.
    pub model_type: ModelType,

    /// Explicit store type (e.g. `NUMERIC(38,9)`), otherwise the default
    /// store type of `model_type`.
    pub store_type: Option<String>,

    /// Whether an absent or NULL value is acceptable.
    pub nullable: bool,
}

impl FieldSpec {
    /// Nullable property with the default store type.
    pub fn new(name: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            name: name.into(),
            model_type,
            store_type: None,
            nullable: true,
        }
    }

    /// Mark the property as non-nullable.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Pin an explicit store type.
    #[must_use]
    pub fn with_store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = Some(store_type.into());
        self
    }
}

/// Declared shape of a composite record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordShape {
    /// Record type name.
    pub name: String,

    /// Properties in declaration order.
    pub fields: Vec<FieldSpec>,
}

impl RecordShape {
    /// Create a shape with no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a property.
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Find a property by name, ignoring case.
    pub fn find_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| {
                self.fields
                    .iter()
                    .find(|f| crate::core::names_match(&f.name, name))
            })
    }
}

/// Marker trait for Rust types stored as STRUCT columns.
///
/// Implementors describe their shape once and convert to and from the
/// generic [`RecordValue`] representation used by the codec.
pub trait CompositeRecord: Sized {
    /// Declared shape; `shape().name` is the registered record name.
    fn shape() -> RecordShape;

    /// Convert into a record value.
    fn to_record(&self) -> RecordValue;

    /// Build an instance from a decoded record value.
    fn from_record(record: &RecordValue) -> Result<Self>;

    /// Model type referring to this record.
    fn model_type() -> ModelType {
        ModelType::Record(Self::shape().name)
    }

    /// Convert into a model value.
    fn to_model_value(&self) -> ModelValue {
        ModelValue::Record(self.to_record())
    }
}
