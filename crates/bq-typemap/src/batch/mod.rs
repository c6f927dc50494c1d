//! Write batching.
//!
//! - [`command`]: pending single-row writes
//! - [`statement`]: finished statements with bound parameters
//! - [`planner`]: groups pending inserts into size-bounded runs

pub mod command;
pub mod planner;
pub mod statement;

pub use command::{ColumnValue, PendingWriteCommand, TableRef, WriteKind};
pub use planner::{BatchAccumulator, BatchLimits, PlannerState, WriteBatchPlanner};
pub use statement::{BoundParameter, ResultMapping, StatementBatch};
