//! # bq-typemap
//!
//! Composite type mapping and write batching for the GoogleSQL (BigQuery)
//! dialect.
//!
//! This library bridges a typed object model and the dialect's nested
//! `ARRAY<...>` / `STRUCT<...>` types:
//!
//! - **Type grammar parsing** of store type strings into descriptor trees
//! - **Type mapping registry** resolving and caching model/store type pairs
//! - **Composite codec** for wire conversion, structural equality and
//!   literal generation
//! - **Write batch planning** into multi-row statements bounded by payload
//!   and parameter ceilings
//!
//! ## Example
//!
//! ```rust
//! use bq_typemap::batch::{BatchLimits, PendingWriteCommand, TableRef, WriteBatchPlanner};
//! use bq_typemap::core::ModelValue;
//! use bq_typemap::typemap::{ModelType, TypeMappingRegistry};
//!
//! let registry = TypeMappingRegistry::with_builtins();
//! let id = registry.find_mapping(&ModelType::Int64).unwrap();
//! let tags = registry.find_store_mapping("ARRAY<STRING>").unwrap();
//!
//! let mut planner = WriteBatchPlanner::new(BatchLimits::default());
//! planner
//!     .add(
//!         PendingWriteCommand::insert(TableRef::with_schema("shop", "items"))
//!             .column("id", id, 1i64)
//!             .column("tags", tags, ModelValue::list(["new", "sale"])),
//!     )
//!     .unwrap();
//!
//! let batches = planner.finish();
//! assert_eq!(
//!     batches[0].sql,
//!     "INSERT INTO `shop`.`items` (`id`, `tags`) VALUES (1, ARRAY<STRING>['new', 'sale'])"
//! );
//! ```

pub mod batch;
pub mod config;
pub mod core;
pub mod dialect;
pub mod error;
pub mod typemap;

// Re-exports for convenient access
pub use batch::{
    BatchLimits, PendingWriteCommand, StatementBatch, TableRef, WriteBatchPlanner, WriteKind,
};
pub use config::{BatchConfig, Config, MappingConfig};
pub use crate::core::{ModelValue, RecordValue, TypeDescriptor, WireValue};
pub use dialect::parse_store_type;
pub use error::{Result, TypeMapError};
pub use typemap::{CompositeRecord, Mapping, ModelType, RecordShape, TypeMappingRegistry};
