//! Core data model shared by the parser, the mapping registry and the batch
//! planner.
//!
//! - [`descriptor`]: parsed store type trees
//! - [`value`]: model-side values (entity data)
//! - [`wire`]: wire-side values (protocol data)
//! - [`fields`]: ordered, case-insensitively keyed field lists
//! - [`identifier`]: identifier quoting and string literal escaping

pub mod descriptor;
pub mod fields;
pub mod identifier;
pub mod value;
pub mod wire;

pub use descriptor::{StructField, TypeDescriptor};
pub use fields::{names_match, Fields};
pub use value::{Geography, ModelValue, RecordValue};
pub use wire::WireValue;
