//! Resolved type mappings.
//!
//! A [`Mapping`] pairs a [`TypeDescriptor`] with a [`ModelType`] and the
//! conversion rules between them. Scalar mappings delegate to a
//! [`ScalarCodec`]; array and struct mappings hold their element and field
//! mappings, which are themselves shared, cached mappings.

use std::sync::Arc;

use crate::core::{ModelValue, TypeDescriptor};
use crate::dialect::ScalarCodec;
use crate::typemap::ModelType;

/// How a mapping converts values.
#[derive(Debug, Clone)]
pub enum MappingKind {
    /// Scalar leaf backed by a codec.
    Scalar(Arc<dyn ScalarCodec>),

    /// `ARRAY<element>`.
    Array(Arc<Mapping>),

    /// `STRUCT<...>` fields in store order.
    Struct(Vec<FieldMapping>),
}

/// One field of a struct mapping.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    /// Store field name, as declared in the store type.
    pub name: String,

    /// Model property name (equal to `name` for anonymous structs).
    pub property: String,

    /// Mapping of the field's value.
    pub mapping: Arc<Mapping>,

    /// Whether NULL is acceptable for this field.
    pub nullable: bool,
}

/// A resolved (model type, store type) pair with its conversion rules.
#[derive(Debug, Clone)]
pub struct Mapping {
    model_type: ModelType,
    descriptor: TypeDescriptor,
    store_type: String,
    kind: MappingKind,
}

impl Mapping {
    pub(crate) fn scalar(
        model_type: ModelType,
        codec: Arc<dyn ScalarCodec>,
        descriptor: TypeDescriptor,
    ) -> Self {
        Self {
            model_type,
            store_type: descriptor.to_string(),
            descriptor,
            kind: MappingKind::Scalar(codec),
        }
    }

    pub(crate) fn array(model_type: ModelType, element: Arc<Mapping>) -> Self {
        let descriptor = TypeDescriptor::array(element.descriptor.clone());
        Self {
            model_type,
            store_type: descriptor.to_string(),
            descriptor,
            kind: MappingKind::Array(element),
        }
    }

    pub(crate) fn structure(model_type: ModelType, fields: Vec<FieldMapping>) -> Self {
        let descriptor = TypeDescriptor::structure(
            fields
                .iter()
                .map(|f| (f.name.clone(), f.mapping.descriptor.clone())),
        );
        Self {
            model_type,
            store_type: descriptor.to_string(),
            descriptor,
            kind: MappingKind::Struct(fields),
        }
    }

    /// Model-side type.
    pub fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    /// Parsed store type.
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Store type text (`ARRAY<INT64>`, `NUMERIC(38,9)`).
    pub fn store_type(&self) -> &str {
        &self.store_type
    }

    pub fn kind(&self) -> &MappingKind {
        &self.kind
    }

    /// Element mapping of an array mapping.
    pub fn element(&self) -> Option<&Arc<Mapping>> {
        match &self.kind {
            MappingKind::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Field mappings of a struct mapping, in store order.
    pub fn fields(&self) -> &[FieldMapping] {
        match &self.kind {
            MappingKind::Struct(fields) => fields,
            _ => &[],
        }
    }

    #[must_use]
    pub fn is_composite(&self) -> bool {
        !matches!(self.kind, MappingKind::Scalar(_))
    }

    /// Whether values must be written as literals rather than bound
    /// parameters. True for all composites and for plugin scalars that ask
    /// for it.
    #[must_use]
    pub fn requires_literal(&self) -> bool {
        match &self.kind {
            MappingKind::Scalar(codec) => codec.requires_literal(),
            MappingKind::Array(_) | MappingKind::Struct(_) => true,
        }
    }

    /// Value used for a non-nullable field absent from wire input.
    pub fn default_value(&self) -> Option<ModelValue> {
        match &self.kind {
            MappingKind::Scalar(codec) => codec.default_value(),
            MappingKind::Array(_) => Some(ModelValue::List(Vec::new())),
            MappingKind::Struct(_) => None,
        }
    }
}
