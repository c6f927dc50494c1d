//! Type mapping registry.
//!
//! The [`TypeMappingRegistry`] resolves [`Mapping`]s from a model type, a
//! store type string, or both, and caches each resolved mapping for the
//! lifetime of the registry. Repeated lookups return the same `Arc`.
//!
//! # Registration
//!
//! Scalar codecs and composite record shapes are registered explicitly, ahead
//! of any lookup:
//!
//! ```rust
//! use bq_typemap::typemap::{FieldSpec, ModelType, RecordShape, TypeMappingRegistry};
//!
//! let mut registry = TypeMappingRegistry::with_builtins();
//! registry
//!     .register_record(
//!         RecordShape::new("Contact")
//!             .field(FieldSpec::new("email", ModelType::String))
//!             .field(FieldSpec::new("phone", ModelType::String)),
//!     )
//!     .unwrap();
//!
//! let mapping = registry.find_mapping(&ModelType::record("Contact")).unwrap();
//! assert_eq!(mapping.store_type(), "STRUCT<email STRING, phone STRING>");
//! ```
//!
//! # Concurrency
//!
//! Lookups take `&self` and may run from many threads. Mappings are built
//! outside the cache lock; when two threads race on the same key the first
//! insert wins and the other build is discarded.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::MappingConfig;
use crate::core::{names_match, TypeDescriptor};
use crate::dialect::{parse_store_type, BuiltinScalar, PassthroughScalar, ScalarCodec};
use crate::error::{Result, TypeMapError};
use crate::typemap::mapping::{FieldMapping, Mapping};
use crate::typemap::model::{CompositeRecord, ModelType, RecordShape};

/// Cache key: the model side, the canonical store type text, or both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MappingKey {
    model: Option<ModelType>,
    store: Option<String>,
}

/// Registry of scalar codecs, record shapes and resolved mappings.
#[derive(Default)]
pub struct TypeMappingRegistry {
    /// Scalar codecs by upper-cased store type name and alias.
    scalars_by_store: HashMap<String, Arc<dyn ScalarCodec>>,

    /// Default codec per model type (first registration wins).
    scalars_by_model: HashMap<ModelType, Arc<dyn ScalarCodec>>,

    /// Composite record shapes by name.
    records: HashMap<String, Arc<RecordShape>>,

    /// Map unknown scalar names through a pass-through codec.
    scalar_fallback: bool,

    cache: RwLock<HashMap<MappingKey, Arc<Mapping>>>,
}

impl TypeMappingRegistry {
    /// Create an empty registry with no scalar codecs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in scalars (and GEOGRAPHY when the
    /// `spatial` feature is enabled).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();

        #[cfg(feature = "spatial")]
        crate::dialect::spatial::register(&mut registry);

        registry
    }

    /// Create a registry from the `mapping` configuration section.
    pub fn from_config(config: &MappingConfig) -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry.set_scalar_fallback(config.scalar_fallback);

        if config.spatial {
            #[cfg(feature = "spatial")]
            crate::dialect::spatial::register(&mut registry);

            #[cfg(not(feature = "spatial"))]
            warn!("mapping.spatial is set but the spatial feature is not compiled in");
        }

        registry
    }

    /// Register the GoogleSQL built-in scalars.
    pub fn register_builtins(&mut self) {
        for scalar in BuiltinScalar::ALL {
            self.register_scalar(scalar);
        }
    }

    /// Register a scalar codec under its store type name and aliases.
    pub fn register_scalar(&mut self, codec: impl ScalarCodec + 'static) {
        self.register_scalar_arc(Arc::new(codec));
    }

    /// Register a scalar codec as an Arc (for sharing).
    pub fn register_scalar_arc(&mut self, codec: Arc<dyn ScalarCodec>) {
        let store_type = codec.store_type().to_ascii_uppercase();
        for alias in codec.aliases() {
            self.scalars_by_store
                .insert(alias.to_ascii_uppercase(), Arc::clone(&codec));
        }
        self.scalars_by_model
            .entry(codec.model_type())
            .or_insert_with(|| Arc::clone(&codec));
        debug!(store_type = %store_type, model_type = %codec.model_type(), "registered scalar codec");
        self.scalars_by_store.insert(store_type, codec);
        self.cache.get_mut().clear();
    }

    /// Register a composite record shape.
    ///
    /// Property names must be unique ignoring case, since wire input is
    /// matched case-insensitively.
    pub fn register_record(&mut self, shape: RecordShape) -> Result<()> {
        if shape.name.trim().is_empty() {
            return Err(TypeMapError::Config(
                "Record type name cannot be empty".to_string(),
            ));
        }
        for (i, field) in shape.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(TypeMapError::field_mismatch(
                    format!("{}[{}]", shape.name, i),
                    "property name cannot be empty",
                ));
            }
            if shape.fields[..i]
                .iter()
                .any(|earlier| names_match(&earlier.name, &field.name))
            {
                return Err(TypeMapError::field_mismatch(
                    format!("{}.{}", shape.name, field.name),
                    "duplicate property (names are matched ignoring case)",
                ));
            }
        }

        debug!(record = %shape.name, fields = shape.fields.len(), "registered record shape");
        self.records.insert(shape.name.clone(), Arc::new(shape));
        self.cache.get_mut().clear();
        Ok(())
    }

    /// Register a [`CompositeRecord`] implementor.
    pub fn register_record_type<T: CompositeRecord>(&mut self) -> Result<()> {
        self.register_record(T::shape())
    }

    /// Enable or disable the pass-through fallback for unknown scalar names.
    pub fn set_scalar_fallback(&mut self, enabled: bool) {
        self.scalar_fallback = enabled;
        self.cache.get_mut().clear();
    }

    /// Get a registered record shape by name.
    pub fn record_shape(&self, name: &str) -> Option<&RecordShape> {
        self.records.get(name).map(Arc::as_ref)
    }

    /// Get the scalar codec for a store type name (arguments ignored).
    pub fn scalar_codec(&self, store_type: &str) -> Option<Arc<dyn ScalarCodec>> {
        let base = store_type.split('(').next().unwrap_or(store_type);
        self.scalars_by_store
            .get(&base.trim().to_ascii_uppercase())
            .cloned()
    }

    /// Number of cached mappings.
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }

    /// Resolve a mapping from a model type, generating the store type.
    pub fn find_mapping(&self, model: &ModelType) -> Result<Arc<Mapping>> {
        let key = MappingKey {
            model: Some(model.clone()),
            store: None,
        };
        self.cached(key, || self.build_from_model(model))
    }

    /// Resolve a mapping from a store type string.
    ///
    /// Structs without a model shape decode into anonymous struct values.
    pub fn find_store_mapping(&self, store_type: &str) -> Result<Arc<Mapping>> {
        let descriptor = parse_store_type(store_type)?;
        self.resolve_descriptor(&descriptor)
    }

    /// Resolve a mapping for a model type stored as a specific store type.
    ///
    /// Struct fields are matched to record properties ignoring case; the
    /// store type's field order and casing are kept.
    pub fn find_mapping_for(&self, model: &ModelType, store_type: &str) -> Result<Arc<Mapping>> {
        let descriptor = parse_store_type(store_type)?;
        self.resolve_pair(model, &descriptor)
    }

    /// Get a cached mapping, or build and cache it.
    fn cached(
        &self,
        key: MappingKey,
        build: impl FnOnce() -> Result<Mapping>,
    ) -> Result<Arc<Mapping>> {
        if let Some(found) = self.cache.read().get(&key) {
            return Ok(Arc::clone(found));
        }

        let built = Arc::new(build()?);

        let mut cache = self.cache.write();
        match cache.entry(key) {
            Entry::Occupied(existing) => Ok(Arc::clone(existing.get())),
            Entry::Vacant(slot) => {
                debug!(
                    store_type = %built.store_type(),
                    model_type = %built.model_type(),
                    "cached type mapping"
                );
                Ok(Arc::clone(slot.insert(built)))
            }
        }
    }

    fn resolve_descriptor(&self, descriptor: &TypeDescriptor) -> Result<Arc<Mapping>> {
        let key = MappingKey {
            model: None,
            store: Some(descriptor.to_string()),
        };
        self.cached(key, || self.build_from_descriptor(descriptor))
    }

    fn resolve_pair(&self, model: &ModelType, descriptor: &TypeDescriptor) -> Result<Arc<Mapping>> {
        let key = MappingKey {
            model: Some(model.clone()),
            store: Some(descriptor.to_string()),
        };
        self.cached(key, || self.build_from_pair(model, descriptor))
    }

    fn require_record(&self, name: &str) -> Result<Arc<RecordShape>> {
        self.records
            .get(name)
            .or_else(|| {
                self.records
                    .iter()
                    .find(|(registered, _)| names_match(registered, name))
                    .map(|(_, shape)| shape)
            })
            .cloned()
            .ok_or_else(|| {
                TypeMapError::MappingNotFound(format!("record type '{}' (not registered)", name))
            })
    }

    /// Look up the codec for a scalar leaf, falling back to pass-through
    /// when enabled.
    fn require_scalar(&self, raw: &str) -> Result<Arc<dyn ScalarCodec>> {
        if let Some(codec) = self.scalar_codec(raw) {
            return Ok(codec);
        }
        if self.scalar_fallback {
            warn!(store_type = %raw, "unknown scalar type, using pass-through mapping");
            let base = raw.split('(').next().unwrap_or(raw).trim();
            return Ok(Arc::new(PassthroughScalar::new(base.to_ascii_uppercase())));
        }
        Err(TypeMapError::MappingNotFound(format!("store type '{}'", raw)))
    }

    /// Reject a record that reaches itself through its properties, directly
    /// or via other records. No finite store type describes it.
    fn check_not_recursive(&self, shape: &RecordShape) -> Result<()> {
        let mut path = vec![shape.name.clone()];
        let mut finished = HashSet::new();
        self.walk_record(shape, &mut path, &mut finished)
    }

    fn walk_record(
        &self,
        shape: &RecordShape,
        path: &mut Vec<String>,
        finished: &mut HashSet<String>,
    ) -> Result<()> {
        for spec in &shape.fields {
            let name = match innermost_record(&spec.model_type) {
                Some(name) => name,
                None => continue,
            };
            // Unregistered records fail later with their own error.
            let target = match self.require_record(name) {
                Ok(target) => target,
                Err(_) => continue,
            };
            if let Some(start) = path.iter().position(|seen| *seen == target.name) {
                let mut cycle = path[start..].to_vec();
                cycle.push(target.name.clone());
                return Err(TypeMapError::MappingNotFound(format!(
                    "recursive record type {}",
                    cycle.join(" -> ")
                )));
            }
            if finished.contains(&target.name) {
                continue;
            }
            path.push(target.name.clone());
            self.walk_record(&target, path, finished)?;
            path.pop();
            finished.insert(target.name.clone());
        }
        Ok(())
    }

    fn build_from_model(&self, model: &ModelType) -> Result<Mapping> {
        match model {
            ModelType::List(element) => {
                let element = self.find_mapping(element)?;
                Ok(Mapping::array(model.clone(), element))
            }
            ModelType::Record(name) => {
                let shape = self.require_record(name)?;
                self.check_not_recursive(&shape)?;
                let mut fields = Vec::with_capacity(shape.fields.len());
                for spec in &shape.fields {
                    let mapping = match &spec.store_type {
                        Some(store_type) => self.find_mapping_for(&spec.model_type, store_type),
                        None => self.find_mapping(&spec.model_type),
                    }
                    .map_err(|e| e.in_field(&spec.name))?;
                    fields.push(FieldMapping {
                        name: spec.name.clone(),
                        property: spec.name.clone(),
                        mapping,
                        nullable: spec.nullable,
                    });
                }
                Ok(Mapping::structure(ModelType::Record(shape.name.clone()), fields))
            }
            ModelType::Anonymous => Err(TypeMapError::MappingNotFound(
                "anonymous struct without a store type".to_string(),
            )),
            scalar => {
                let codec = self.scalars_by_model.get(scalar).cloned().ok_or_else(|| {
                    TypeMapError::MappingNotFound(format!("model type {}", scalar))
                })?;
                let descriptor = TypeDescriptor::scalar(codec.store_type());
                Ok(Mapping::scalar(scalar.clone(), codec, descriptor))
            }
        }
    }

    fn build_from_descriptor(&self, descriptor: &TypeDescriptor) -> Result<Mapping> {
        match descriptor {
            TypeDescriptor::Scalar(raw) => {
                let codec = self.require_scalar(raw)?;
                Ok(Mapping::scalar(codec.model_type(), codec, descriptor.clone()))
            }
            TypeDescriptor::Array(element) => {
                let element = self.resolve_descriptor(element)?;
                let model = ModelType::list(element.model_type().clone());
                Ok(Mapping::array(model, element))
            }
            TypeDescriptor::Struct(store_fields) => {
                let mut fields: Vec<FieldMapping> = Vec::with_capacity(store_fields.len());
                for field in store_fields {
                    if fields.iter().any(|f| names_match(&f.name, &field.name)) {
                        return Err(TypeMapError::field_mismatch(
                            field.name.as_str(),
                            format!("duplicate field in {}", descriptor),
                        ));
                    }
                    let mapping = self
                        .resolve_descriptor(&field.ty)
                        .map_err(|e| e.in_field(&field.name))?;
                    fields.push(FieldMapping {
                        name: field.name.clone(),
                        property: field.name.clone(),
                        mapping,
                        nullable: true,
                    });
                }
                Ok(Mapping::structure(ModelType::Anonymous, fields))
            }
        }
    }

    fn build_from_pair(&self, model: &ModelType, descriptor: &TypeDescriptor) -> Result<Mapping> {
        match (model, descriptor) {
            (ModelType::List(element_model), TypeDescriptor::Array(element_store)) => {
                let element = self.resolve_pair(element_model, element_store)?;
                Ok(Mapping::array(model.clone(), element))
            }
            (ModelType::Anonymous, TypeDescriptor::Struct(_)) => {
                self.build_from_descriptor(descriptor)
            }
            (ModelType::Record(name), TypeDescriptor::Struct(store_fields)) => {
                let shape = self.require_record(name)?;
                self.check_not_recursive(&shape)?;
                let mut fields: Vec<FieldMapping> = Vec::with_capacity(store_fields.len());
                for field in store_fields {
                    let spec = shape.find_field(&field.name).ok_or_else(|| {
                        TypeMapError::field_mismatch(
                            field.name.as_str(),
                            format!("no matching property on record {}", shape.name),
                        )
                    })?;
                    if fields.iter().any(|f| f.property == spec.name) {
                        return Err(TypeMapError::field_mismatch(
                            field.name.as_str(),
                            format!("duplicate field in {}", descriptor),
                        ));
                    }
                    let mapping = self
                        .resolve_pair(&spec.model_type, &field.ty)
                        .map_err(|e| e.in_field(&spec.name))?;
                    fields.push(FieldMapping {
                        name: field.name.clone(),
                        property: spec.name.clone(),
                        mapping,
                        nullable: spec.nullable,
                    });
                }
                if let Some(unmatched) = shape
                    .fields
                    .iter()
                    .find(|spec| !fields.iter().any(|f| f.property == spec.name))
                {
                    return Err(TypeMapError::field_mismatch(
                        unmatched.name.as_str(),
                        format!("property has no matching field in {}", descriptor),
                    ));
                }
                Ok(Mapping::structure(ModelType::Record(shape.name.clone()), fields))
            }
            (scalar, TypeDescriptor::Scalar(raw)) if !scalar.is_composite() => {
                let codec = self.require_scalar(raw)?;
                let passthrough = self.scalar_codec(raw).is_none();
                if !passthrough && codec.model_type() != *scalar {
                    return Err(TypeMapError::MappingNotFound(format!(
                        "model type {} stored as {}",
                        scalar, raw
                    )));
                }
                Ok(Mapping::scalar(scalar.clone(), codec, descriptor.clone()))
            }
            _ => Err(TypeMapError::MappingNotFound(format!(
                "model type {} stored as {}",
                model, descriptor
            ))),
        }
    }
}

/// Record named by a property type, looking through lists.
fn innermost_record(model: &ModelType) -> Option<&str> {
    match model {
        ModelType::List(element) => innermost_record(element),
        ModelType::Record(name) => Some(name),
        _ => None,
    }
}

impl std::fmt::Debug for TypeMappingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut scalars: Vec<&str> = self.scalars_by_store.keys().map(String::as_str).collect();
        scalars.sort_unstable();
        let mut records: Vec<&str> = self.records.keys().map(String::as_str).collect();
        records.sort_unstable();
        f.debug_struct("TypeMappingRegistry")
            .field("scalars", &scalars)
            .field("records", &records)
            .field("scalar_fallback", &self.scalar_fallback)
            .field("cached", &self.cached_count())
            .finish()
    }
}
