//! Pending single-row write commands.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::identifier::qualify;
use crate::core::ModelValue;
use crate::error::Result;
use crate::typemap::Mapping;

/// Target table identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Dataset (schema) name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Table name.
    pub name: String,
}

impl TableRef {
    /// Unqualified table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Table within a dataset.
    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Quoted, qualified name for statement text.
    pub fn qualified(&self) -> Result<String> {
        qualify(self.schema.as_deref(), &self.name)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Kind of write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteKind {
    #[default]
    Insert,
    Update,
    Delete,
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteKind::Insert => write!(f, "INSERT"),
            WriteKind::Update => write!(f, "UPDATE"),
            WriteKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// One column of a pending write: name, mapping and value.
#[derive(Debug, Clone)]
pub struct ColumnValue {
    /// Column name.
    pub name: String,

    /// Mapping used to convert or render the value.
    pub mapping: Arc<Mapping>,

    /// Value to write (or compare, for conditions).
    pub value: ModelValue,

    /// Write this column as a literal rather than a bound parameter.
    pub literal: bool,
}

impl ColumnValue {
    /// Create a column; literal encoding follows the mapping.
    pub fn new(name: impl Into<String>, mapping: Arc<Mapping>, value: impl Into<ModelValue>) -> Self {
        let literal = mapping.requires_literal();
        Self {
            name: name.into(),
            mapping,
            value: value.into(),
            literal,
        }
    }

    /// Force literal encoding.
    #[must_use]
    pub fn as_literal(mut self) -> Self {
        self.literal = true;
        self
    }
}

/// A single-row write waiting to be batched.
#[derive(Debug, Clone)]
pub struct PendingWriteCommand {
    pub table: TableRef,
    pub kind: WriteKind,

    /// Written columns (INSERT values, UPDATE assignments), in order.
    pub columns: Vec<ColumnValue>,

    /// Key columns identifying the row for UPDATE and DELETE.
    pub conditions: Vec<ColumnValue>,

    /// Store-generated columns read back after the write.
    pub read_columns: Vec<String>,
}

impl PendingWriteCommand {
    fn new(table: TableRef, kind: WriteKind) -> Self {
        Self {
            table,
            kind,
            columns: Vec::new(),
            conditions: Vec::new(),
            read_columns: Vec::new(),
        }
    }

    pub fn insert(table: TableRef) -> Self {
        Self::new(table, WriteKind::Insert)
    }

    pub fn update(table: TableRef) -> Self {
        Self::new(table, WriteKind::Update)
    }

    pub fn delete(table: TableRef) -> Self {
        Self::new(table, WriteKind::Delete)
    }

    /// Append a written column.
    #[must_use]
    pub fn column(
        mut self,
        name: impl Into<String>,
        mapping: Arc<Mapping>,
        value: impl Into<ModelValue>,
    ) -> Self {
        self.columns.push(ColumnValue::new(name, mapping, value));
        self
    }

    /// Append a prepared column.
    #[must_use]
    pub fn with_column(mut self, column: ColumnValue) -> Self {
        self.columns.push(column);
        self
    }

    /// Append a key condition.
    #[must_use]
    pub fn condition(
        mut self,
        name: impl Into<String>,
        mapping: Arc<Mapping>,
        value: impl Into<ModelValue>,
    ) -> Self {
        self.conditions.push(ColumnValue::new(name, mapping, value));
        self
    }

    /// Append a read-back column.
    #[must_use]
    pub fn read_column(mut self, name: impl Into<String>) -> Self {
        self.read_columns.push(name.into());
        self
    }

    /// Whether any column of this command must be written as a literal.
    #[must_use]
    pub fn requires_literals(&self) -> bool {
        self.columns
            .iter()
            .chain(&self.conditions)
            .any(|c| c.literal)
    }

    /// Whether two commands can share one multi-row INSERT.
    ///
    /// Both must be inserts into the same table with identical written and
    /// read-back column names in identical order.
    #[must_use]
    pub fn is_compatible_with(&self, other: &PendingWriteCommand) -> bool {
        self.kind == WriteKind::Insert
            && other.kind == WriteKind::Insert
            && self.table == other.table
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.name == b.name)
            && self.read_columns == other.read_columns
    }
}
