//! GoogleSQL dialect support.
//!
//! - [`parser`]: store type grammar (`ARRAY<...>`, `STRUCT<...>`, scalars)
//! - [`scalar`]: scalar leaf codecs and the built-in scalar table
//! - [`spatial`]: GEOGRAPHY plugin (`spatial` feature)
//!
//! # Usage
//!
//! ```rust
//! use bq_typemap::dialect::parse_store_type;
//!
//! let desc = parse_store_type("ARRAY<STRUCT<id INT64, tags ARRAY<STRING>>>").unwrap();
//! assert_eq!(desc.to_string(), "ARRAY<STRUCT<id INT64, tags ARRAY<STRING>>>");
//! ```

pub mod parser;
pub mod scalar;
#[cfg(feature = "spatial")]
pub mod spatial;

pub use parser::parse_store_type;
pub use scalar::{BuiltinScalar, PassthroughScalar, ScalarCodec};
