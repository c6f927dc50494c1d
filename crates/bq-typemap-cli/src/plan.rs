//! Plan files: pending write commands described in YAML.
//!
//! ```yaml
//! commands:
//!   - table: { schema: shop, name: items }
//!     columns:
//!       - { name: id, store_type: INT64, value: 1 }
//!       - { name: tags, store_type: "ARRAY<STRING>", value: [new, sale] }
//!   - table: { schema: shop, name: items }
//!     kind: delete
//!     conditions:
//!       - { name: id, store_type: INT64, value: 7 }
//! ```

use std::path::Path;

use bq_typemap::batch::{ColumnValue, PendingWriteCommand, TableRef, WriteKind};
use bq_typemap::{Result, TypeMappingRegistry};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PlanFile {
    pub commands: Vec<CommandSpec>,
}

/// One pending write.
#[derive(Debug, Deserialize)]
pub struct CommandSpec {
    pub table: TableRef,

    #[serde(default)]
    pub kind: WriteKind,

    #[serde(default)]
    pub columns: Vec<ColumnSpec>,

    #[serde(default)]
    pub conditions: Vec<ColumnSpec>,

    #[serde(default)]
    pub read_columns: Vec<String>,
}

/// A column value given as JSON-compatible YAML and converted through the
/// mapping resolved for `store_type`.
#[derive(Debug, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub store_type: String,

    #[serde(default)]
    pub value: serde_json::Value,

    /// Force literal encoding.
    #[serde(default)]
    pub literal: bool,
}

impl PlanFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Resolve every command against `registry`, in file order.
    pub fn resolve(&self, registry: &TypeMappingRegistry) -> Result<Vec<PendingWriteCommand>> {
        self.commands.iter().map(|c| c.resolve(registry)).collect()
    }
}

impl CommandSpec {
    fn resolve(&self, registry: &TypeMappingRegistry) -> Result<PendingWriteCommand> {
        let mut command = match self.kind {
            WriteKind::Insert => PendingWriteCommand::insert(self.table.clone()),
            WriteKind::Update => PendingWriteCommand::update(self.table.clone()),
            WriteKind::Delete => PendingWriteCommand::delete(self.table.clone()),
        };
        for column in &self.columns {
            command.columns.push(column.resolve(registry)?);
        }
        for condition in &self.conditions {
            command.conditions.push(condition.resolve(registry)?);
        }
        command.read_columns = self.read_columns.clone();
        Ok(command)
    }
}

impl ColumnSpec {
    fn resolve(&self, registry: &TypeMappingRegistry) -> Result<ColumnValue> {
        let mapping = registry
            .find_store_mapping(&self.store_type)
            .map_err(|e| e.in_field(&self.name))?;
        let value = mapping
            .value_from_json(&self.value)
            .map_err(|e| e.in_field(&self.name))?;
        let column = ColumnValue::new(self.name.clone(), mapping, value);
        Ok(if self.literal { column.as_literal() } else { column })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"
commands:
  - table: { schema: shop, name: items }
    columns:
      - { name: id, store_type: INT64, value: 1 }
      - { name: tags, store_type: "ARRAY<STRING>", value: [new, sale] }
  - table: { name: items }
    kind: update
    columns:
      - { name: qty, store_type: INT64, value: 3, literal: true }
    conditions:
      - { name: id, store_type: INT64, value: 1 }
    read_columns: [updated_at]
"#;

    #[test]
    fn test_parse_plan() {
        let plan: PlanFile = serde_yaml::from_str(PLAN).unwrap();
        assert_eq!(plan.commands.len(), 2);
        assert_eq!(plan.commands[0].kind, WriteKind::Insert);
        assert_eq!(plan.commands[0].table, TableRef::with_schema("shop", "items"));
        assert_eq!(plan.commands[1].kind, WriteKind::Update);
        assert!(plan.commands[1].columns[0].literal);
    }

    #[test]
    fn test_resolve_plan() {
        let registry = TypeMappingRegistry::with_builtins();
        let plan: PlanFile = serde_yaml::from_str(PLAN).unwrap();
        let commands = plan.resolve(&registry).unwrap();

        assert_eq!(commands[0].columns.len(), 2);
        assert!(commands[0].requires_literals());
        assert!(commands[1].columns[0].literal);
        assert_eq!(commands[1].conditions[0].name, "id");
        assert_eq!(commands[1].read_columns, vec!["updated_at".to_string()]);
    }

    #[test]
    fn test_resolve_reports_column() {
        let registry = TypeMappingRegistry::with_builtins();
        let plan: PlanFile = serde_yaml::from_str(
            "commands:\n  - table: { name: t }\n    columns:\n      - { name: n, store_type: INT64, value: [1] }\n",
        )
        .unwrap();
        let err = plan.resolve(&registry).unwrap_err();
        assert!(err.to_string().contains("n"));
        assert_eq!(err.exit_code(), 3);
    }
}
