//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Type mapping behavior.
    #[serde(default)]
    pub mapping: MappingConfig,

    /// Write batching limits.
    #[serde(default)]
    pub batching: BatchConfig,
}

/// Type mapping configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Map unknown scalar store types through a pass-through codec instead
    /// of failing (default: false).
    #[serde(default)]
    pub scalar_fallback: bool,

    /// Register the GEOGRAPHY codec (default: true when the `spatial`
    /// feature is compiled in).
    #[serde(default = "default_spatial")]
    pub spatial: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            scalar_fallback: false,
            spatial: default_spatial(),
        }
    }
}

/// Write batching limits.
///
/// The payload and parameter ceilings are hard service limits; the planner
/// flushes before either would be exceeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum estimated request payload per statement, in bytes
    /// (default: 10 MiB).
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Maximum bound parameters per statement (default: 10000).
    #[serde(default = "default_max_parameters")]
    pub max_parameters: usize,

    /// Safety margin added to every row's size estimate (default: 32).
    #[serde(default = "default_row_overhead_bytes")]
    pub row_overhead_bytes: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            max_parameters: default_max_parameters(),
            row_overhead_bytes: default_row_overhead_bytes(),
        }
    }
}

// Default value functions for serde
fn default_spatial() -> bool {
    cfg!(feature = "spatial")
}

fn default_max_payload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_parameters() -> usize {
    10_000
}

fn default_row_overhead_bytes() -> usize {
    32
}
