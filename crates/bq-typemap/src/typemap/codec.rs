//! Value conversion through a [`Mapping`].
//!
//! Composite mappings recurse into their element and field mappings at every
//! level, so conversion, comparison and literal rendering of nested values
//! compose without special cases:
//!
//! - `to_wire` / `from_wire`: model value <-> wire value
//! - `values_equal`: structural comparison under each level's own rules
//! - `generate_literal`: inline SQL text (`ARRAY<INT64>[1, NULL, 3]`,
//!   `STRUCT<a STRING>('x')`)
//!
//! Struct fields are matched by name ignoring case; the service returns
//! field names lower-cased regardless of the declared casing.

use tracing::trace;

use crate::core::{Fields, ModelValue, RecordValue, WireValue};
use crate::error::{Result, TypeMapError};
use crate::typemap::mapping::{FieldMapping, Mapping, MappingKind};
use crate::typemap::ModelType;

static NULL: ModelValue = ModelValue::Null;

fn index_path(index: usize) -> String {
    format!("[{}]", index)
}

impl Mapping {
    /// Convert a model value into its wire form.
    pub fn to_wire(&self, value: &ModelValue) -> Result<WireValue> {
        if value.is_null() {
            return Ok(WireValue::Null);
        }
        match self.kind() {
            MappingKind::Scalar(codec) => codec.to_wire(value),
            MappingKind::Array(element) => {
                let items = self.list_items(value)?;
                let mut wire = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    wire.push(element.to_wire(item).map_err(|e| e.in_field(&index_path(i)))?);
                }
                Ok(WireValue::Array(wire))
            }
            MappingKind::Struct(fields) => {
                let values = self.ordered_field_values(fields, value)?;
                let mut wire = Fields::with_capacity(fields.len());
                for (field, v) in fields.iter().zip(values) {
                    let converted = field
                        .mapping
                        .to_wire(v)
                        .map_err(|e| e.in_field(&field.property))?;
                    wire.push(field.name.clone(), converted);
                }
                Ok(WireValue::Struct(wire))
            }
        }
    }

    /// Convert a wire value into a model value.
    ///
    /// A null wire value decodes to `ModelValue::Null` without descending
    /// into fields. Struct fields missing from the wire object decode to NULL
    /// when nullable, otherwise to the field mapping's default.
    pub fn from_wire(&self, wire: &WireValue) -> Result<ModelValue> {
        if wire.is_null() {
            return Ok(ModelValue::Null);
        }
        match self.kind() {
            MappingKind::Scalar(codec) => codec.from_wire(wire),
            MappingKind::Array(element) => match wire {
                WireValue::Array(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        values.push(element.from_wire(item).map_err(|e| e.in_field(&index_path(i)))?);
                    }
                    Ok(ModelValue::List(values))
                }
                other => Err(self.shape_mismatch(other.kind())),
            },
            MappingKind::Struct(fields) => match wire {
                WireValue::Struct(incoming) => self.decode_struct(fields, incoming),
                other => Err(self.shape_mismatch(other.kind())),
            },
        }
    }

    /// Convert JSON (e.g. a REST response cell or CLI input) into a model
    /// value through the wire path.
    pub fn value_from_json(&self, json: &serde_json::Value) -> Result<ModelValue> {
        self.from_wire(&WireValue::from(json))
    }

    /// Compare two model values under this mapping's rules.
    ///
    /// Composites compare element by element and field by field using each
    /// child mapping's comparer.
    pub fn values_equal(&self, a: &ModelValue, b: &ModelValue) -> bool {
        match (a.is_null(), b.is_null()) {
            (true, true) => return true,
            (true, false) | (false, true) => return false,
            (false, false) => {}
        }
        match self.kind() {
            MappingKind::Scalar(codec) => codec.values_equal(a, b),
            MappingKind::Array(element) => match (a, b) {
                (ModelValue::List(xs), ModelValue::List(ys)) => {
                    xs.len() == ys.len()
                        && xs.iter().zip(ys).all(|(x, y)| element.values_equal(x, y))
                }
                _ => a == b,
            },
            MappingKind::Struct(fields) => {
                if let (ModelValue::Record(x), ModelValue::Record(y)) = (a, b) {
                    if x.type_name != y.type_name {
                        return false;
                    }
                }
                match (a.struct_fields(), b.struct_fields()) {
                    (Some(xs), Some(ys)) => fields.iter().all(|field| {
                        field.mapping.values_equal(
                            lookup(xs, field).unwrap_or(&NULL),
                            lookup(ys, field).unwrap_or(&NULL),
                        )
                    }),
                    _ => a == b,
                }
            }
        }
    }

    /// Render a model value as inline SQL literal text.
    ///
    /// Arrays render as `ARRAY<T>[e1, e2]`, structs as a positional
    /// constructor `STRUCT<a T, b U>(v1, v2)` in store field order. Nulls at
    /// any level render as the bare token `NULL`.
    pub fn generate_literal(&self, value: &ModelValue) -> Result<String> {
        if value.is_null() {
            return Ok("NULL".to_string());
        }
        match self.kind() {
            MappingKind::Scalar(codec) => codec.literal(value),
            MappingKind::Array(element) => {
                let items = self.list_items(value)?;
                let mut rendered = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    rendered.push(
                        element
                            .generate_literal(item)
                            .map_err(|e| e.in_field(&index_path(i)))?,
                    );
                }
                Ok(format!("{}[{}]", self.store_type(), rendered.join(", ")))
            }
            MappingKind::Struct(fields) => {
                let values = self.ordered_field_values(fields, value)?;
                let mut rendered = Vec::with_capacity(fields.len());
                for (field, v) in fields.iter().zip(values) {
                    rendered.push(
                        field
                            .mapping
                            .generate_literal(v)
                            .map_err(|e| e.in_field(&field.property))?,
                    );
                }
                Ok(format!("{}({})", self.store_type(), rendered.join(", ")))
            }
        }
    }

    fn shape_mismatch(&self, found: &str) -> TypeMapError {
        TypeMapError::field_mismatch(
            "",
            format!("expected {} value, found {}", self.store_type(), found),
        )
    }

    fn list_items<'a>(&self, value: &'a ModelValue) -> Result<&'a [ModelValue]> {
        match value {
            ModelValue::List(items) => Ok(items),
            other => Err(self.shape_mismatch(other.kind())),
        }
    }

    /// Collect a struct value's field values in store order.
    ///
    /// Missing properties yield NULL; properties with no matching field are
    /// rejected so no data is silently dropped.
    fn ordered_field_values<'a>(
        &self,
        fields: &[FieldMapping],
        value: &'a ModelValue,
    ) -> Result<Vec<&'a ModelValue>> {
        if let (ModelType::Record(expected), ModelValue::Record(record)) = (self.model_type(), value) {
            if &record.type_name != expected {
                return Err(TypeMapError::field_mismatch(
                    "",
                    format!("expected record {}, found record {}", expected, record.type_name),
                ));
            }
        }
        let source = value
            .struct_fields()
            .ok_or_else(|| self.shape_mismatch(value.kind()))?;

        for (name, _) in source.iter() {
            let known = fields.iter().any(|f| {
                crate::core::names_match(&f.property, name) || crate::core::names_match(&f.name, name)
            });
            if !known {
                return Err(TypeMapError::field_mismatch(
                    name,
                    format!("no such field in {}", self.store_type()),
                ));
            }
        }

        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            let v = lookup(source, field).unwrap_or(&NULL);
            if v.is_null() && !field.nullable {
                return Err(TypeMapError::field_mismatch(
                    field.property.as_str(),
                    "required field is null",
                ));
            }
            values.push(v);
        }
        Ok(values)
    }

    fn decode_struct(&self, fields: &[FieldMapping], incoming: &Fields<WireValue>) -> Result<ModelValue> {
        let mut decoded = Fields::with_capacity(fields.len());
        for field in fields {
            let value = match incoming.get(&field.name) {
                Some(wire) if !wire.is_null() => field
                    .mapping
                    .from_wire(wire)
                    .map_err(|e| e.in_field(&field.property))?,
                present => {
                    if present.is_none() {
                        trace!(field = %field.name, store_type = %self.store_type(), "field absent from wire value");
                    }
                    missing_value(field)?
                }
            };
            decoded.push(field.property.clone(), value);
        }

        Ok(match self.model_type() {
            ModelType::Record(name) => ModelValue::Record(RecordValue {
                type_name: name.clone(),
                fields: decoded,
            }),
            _ => ModelValue::Anonymous(decoded),
        })
    }
}

/// Find a field's value by property name, falling back to the store name.
fn lookup<'a>(source: &'a Fields<ModelValue>, field: &FieldMapping) -> Option<&'a ModelValue> {
    source
        .get(&field.property)
        .or_else(|| source.get(&field.name))
}

fn missing_value(field: &FieldMapping) -> Result<ModelValue> {
    if field.nullable {
        return Ok(ModelValue::Null);
    }
    field.mapping.default_value().ok_or_else(|| {
        TypeMapError::field_mismatch(
            field.property.as_str(),
            "required field is missing and has no default",
        )
    })
}
