//! Type mapping between model types and GoogleSQL store types.
//!
//! - [`model`]: model-side type descriptions and record shapes
//! - [`mapping`]: resolved mappings (scalar, array, struct)
//! - [`codec`]: wire conversion, equality and literal generation
//! - [`registry`]: resolution and caching

mod codec;
pub mod mapping;
pub mod model;
pub mod registry;

pub use mapping::{FieldMapping, Mapping, MappingKind};
pub use model::{CompositeRecord, FieldSpec, ModelType, RecordShape};
pub use registry::TypeMappingRegistry;
