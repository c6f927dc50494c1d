//! Finished statements handed to the execution layer.

use serde::Serialize;

use crate::batch::command::WriteKind;
use crate::core::WireValue;

/// A named parameter bound to a statement (`@p0` in the text, `p0` here).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundParameter {
    pub name: String,
    pub store_type: String,
    pub value: WireValue,
}

impl BoundParameter {
    /// Estimated request bytes for this parameter (name, type and value).
    pub fn estimated_size(&self) -> usize {
        self.name.len() + self.store_type.len() + self.value.estimated_size()
    }
}

/// What the execution layer should do with each row's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultMapping {
    /// Nothing to propagate back.
    NoResults,
    /// Store-generated values are read back into the entity.
    ReadBack,
}

/// One statement ready to send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementBatch {
    /// Target table (`dataset.table`).
    pub table: String,
    pub kind: WriteKind,
    pub sql: String,
    pub parameters: Vec<BoundParameter>,

    /// One entry per row, in row order.
    pub row_mappings: Vec<ResultMapping>,

    /// Columns read back for rows marked `ReadBack`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub read_columns: Vec<String>,

    /// Estimated request payload in bytes.
    pub estimated_bytes: usize,
}

impl StatementBatch {
    /// Number of rows written by this statement.
    pub fn row_count(&self) -> usize {
        self.row_mappings.len()
    }
}
