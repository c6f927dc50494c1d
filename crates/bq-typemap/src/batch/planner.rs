//! Write batch planner.
//!
//! Groups compatible single-row inserts into multi-row
//! `INSERT INTO t (a, b) VALUES (...), (...)` statements without exceeding the
//! payload and parameter ceilings. Updates and deletes are emitted as
//! standalone statements.
//!
//! State machine: `Idle -> Accumulating -> Flushing -> Idle`.
//!
//! Size accounting per row: rendered row text as it appears inside the JSON
//! request body, separator, estimated bound parameter payload and a fixed
//! per-row overhead. The header is counted exactly. A row that does not fit
//! into the open run flushes it first; a row that does not fit into an empty
//! run is rejected.

use tracing::{debug, trace};

use crate::batch::command::{ColumnValue, PendingWriteCommand, WriteKind};
use crate::batch::statement::{BoundParameter, ResultMapping, StatementBatch};
use crate::config::BatchConfig;
use crate::core::identifier::quote_ident;
use crate::core::wire::{json_escaped_len, json_string_len};
use crate::error::{Result, TypeMapError};

/// Separator between rendered rows.
const ROW_SEPARATOR: &str = ", ";

/// Hard ceilings and the per-row safety margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_payload_bytes: usize,
    pub max_parameters: usize,
    pub row_overhead_bytes: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchLimits {
    fn from(config: &BatchConfig) -> Self {
        Self {
            max_payload_bytes: config.max_payload_bytes,
            max_parameters: config.max_parameters,
            row_overhead_bytes: config.row_overhead_bytes,
        }
    }
}

/// Planner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    /// No open run.
    Idle,
    /// An insert run is open.
    Accumulating,
    /// The open run is being turned into a statement.
    Flushing,
}

/// One row rendered at a fixed parameter offset.
#[derive(Debug, Clone)]
struct RenderedRow {
    text: String,
    parameters: Vec<BoundParameter>,
    cost: usize,
}

/// Render a value list for `columns`, as literals or as parameters.
///
/// Parameters are numbered from `offset + parameters.len()`.
fn render_values(
    columns: &[ColumnValue],
    literal: bool,
    offset: usize,
    parameters: &mut Vec<BoundParameter>,
) -> Result<Vec<String>> {
    let mut rendered = Vec::with_capacity(columns.len());
    for column in columns {
        if literal {
            let text = column
                .mapping
                .generate_literal(&column.value)
                .map_err(|e| e.in_field(&column.name))?;
            rendered.push(text);
        } else {
            let value = column
                .mapping
                .to_wire(&column.value)
                .map_err(|e| e.in_field(&column.name))?;
            let name = format!("p{}", offset + parameters.len());
            rendered.push(format!("@{}", name));
            parameters.push(BoundParameter {
                name,
                store_type: column.mapping.store_type().to_string(),
                value,
            });
        }
    }
    Ok(rendered)
}

fn parameter_bytes(parameters: &[BoundParameter]) -> usize {
    parameters.iter().map(BoundParameter::estimated_size).sum()
}

/// An open run of compatible inserts.
#[derive(Debug)]
pub struct BatchAccumulator {
    header: String,
    commands: Vec<PendingWriteCommand>,
    rows: Vec<RenderedRow>,
    estimated_bytes: usize,
    parameter_count: usize,
}

impl BatchAccumulator {
    fn new(header: String) -> Self {
        Self {
            estimated_bytes: json_string_len(&header),
            header,
            commands: Vec::new(),
            rows: Vec::new(),
            parameter_count: 0,
        }
    }

    /// Current estimated statement payload.
    pub fn estimated_bytes(&self) -> usize {
        self.estimated_bytes
    }

    /// Bound parameters accumulated so far.
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn accepts(&self, command: &PendingWriteCommand) -> bool {
        self.commands
            .first()
            .map_or(true, |first| first.is_compatible_with(command))
    }

    fn fits(&self, row: &RenderedRow, limits: &BatchLimits) -> bool {
        self.estimated_bytes + row.cost <= limits.max_payload_bytes
            && self.parameter_count + row.parameters.len() <= limits.max_parameters
    }

    fn push(&mut self, command: PendingWriteCommand, row: RenderedRow) {
        self.estimated_bytes += row.cost;
        self.parameter_count += row.parameters.len();
        self.commands.push(command);
        self.rows.push(row);
    }

    fn pop(&mut self) -> Option<PendingWriteCommand> {
        let row = self.rows.pop()?;
        self.estimated_bytes -= row.cost;
        self.parameter_count -= row.parameters.len();
        self.commands.pop()
    }

    fn into_statement(self) -> StatementBatch {
        let first = &self.commands[0];
        let mapping = if first.read_columns.is_empty() {
            ResultMapping::NoResults
        } else {
            ResultMapping::ReadBack
        };

        let mut sql = self.header;
        let mut parameters = Vec::with_capacity(self.parameter_count);
        for (i, row) in self.rows.into_iter().enumerate() {
            if i > 0 {
                sql.push_str(ROW_SEPARATOR);
            }
            sql.push_str(&row.text);
            parameters.extend(row.parameters);
        }

        StatementBatch {
            table: first.table.to_string(),
            kind: WriteKind::Insert,
            sql,
            parameters,
            row_mappings: vec![mapping; self.commands.len()],
            read_columns: first.read_columns.clone(),
            estimated_bytes: self.estimated_bytes,
        }
    }
}

/// Plans pending writes into size-bounded statements.
///
/// One planner serves one save operation and is not shared between threads.
///
/// ```rust
/// use bq_typemap::batch::{BatchLimits, PendingWriteCommand, TableRef, WriteBatchPlanner};
/// use bq_typemap::typemap::{ModelType, TypeMappingRegistry};
///
/// let registry = TypeMappingRegistry::with_builtins();
/// let id = registry.find_mapping(&ModelType::Int64).unwrap();
///
/// let mut planner = WriteBatchPlanner::new(BatchLimits::default());
/// for i in 0..3i64 {
///     let command = PendingWriteCommand::insert(TableRef::new("orders")).column("id", id.clone(), i);
///     planner.add(command).unwrap();
/// }
/// let batches = planner.finish();
/// assert_eq!(batches.len(), 1);
/// assert_eq!(batches[0].sql, "INSERT INTO `orders` (`id`) VALUES (@p0), (@p1), (@p2)");
/// ```
#[derive(Debug)]
pub struct WriteBatchPlanner {
    limits: BatchLimits,
    state: PlannerState,
    current: Option<BatchAccumulator>,
    completed: Vec<StatementBatch>,
}

impl WriteBatchPlanner {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            state: PlannerState::Idle,
            current: None,
            completed: Vec::new(),
        }
    }

    pub fn limits(&self) -> &BatchLimits {
        &self.limits
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    /// Rows in the open run.
    pub fn pending_rows(&self) -> usize {
        self.current.as_ref().map_or(0, BatchAccumulator::len)
    }

    /// Estimated payload of the open run (0 when idle).
    pub fn estimated_payload(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, BatchAccumulator::estimated_bytes)
    }

    /// Bound parameters in the open run.
    pub fn pending_parameters(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, BatchAccumulator::parameter_count)
    }

    /// Add a pending write.
    ///
    /// Inserts join the open run when compatible and within limits; anything
    /// else flushes the run first.
    pub fn add(&mut self, command: PendingWriteCommand) -> Result<()> {
        match command.kind {
            WriteKind::Insert => self.add_insert(command),
            WriteKind::Update | WriteKind::Delete => {
                self.flush();
                let statement = self.render_standalone(&command)?;
                debug!(
                    table = %statement.table,
                    kind = %statement.kind,
                    parameters = statement.parameters.len(),
                    "planned standalone statement"
                );
                self.completed.push(statement);
                Ok(())
            }
        }
    }

    /// Remove the most recently added row from the open run.
    ///
    /// Already flushed statements are not touched; returns `None` when there
    /// is no open run.
    pub fn remove_last(&mut self) -> Option<PendingWriteCommand> {
        let run = self.current.as_mut()?;
        let removed = run.pop();
        if run.is_empty() {
            self.current = None;
            self.state = PlannerState::Idle;
        }
        if let Some(command) = &removed {
            debug!(table = %command.table, remaining = self.pending_rows(), "rolled back pending row");
        }
        removed
    }

    /// Flush the open run, if any.
    pub fn flush(&mut self) {
        let Some(run) = self.current.take() else {
            return;
        };
        self.state = PlannerState::Flushing;
        let statement = run.into_statement();
        debug!(
            table = %statement.table,
            rows = statement.row_count(),
            parameters = statement.parameters.len(),
            estimated_bytes = statement.estimated_bytes,
            "flushed insert run"
        );
        self.completed.push(statement);
        self.state = PlannerState::Idle;
    }

    /// Take statements completed so far, leaving the open run in place.
    pub fn take_completed(&mut self) -> Vec<StatementBatch> {
        std::mem::take(&mut self.completed)
    }

    /// Flush the open run and return every planned statement.
    pub fn finish(mut self) -> Vec<StatementBatch> {
        self.flush();
        self.completed
    }

    fn add_insert(&mut self, command: PendingWriteCommand) -> Result<()> {
        if self.current.as_ref().is_some_and(|run| !run.accepts(&command)) {
            self.flush();
        }

        if let Some(offset) = self.current.as_ref().map(BatchAccumulator::parameter_count) {
            let row = self.render_row(&command, offset)?;
            let limits = self.limits;
            if let Some(run) = self.current.as_mut().filter(|run| run.fits(&row, &limits)) {
                trace!(
                    table = %command.table,
                    cost = row.cost,
                    estimated_bytes = run.estimated_bytes + row.cost,
                    "row joins open run"
                );
                run.push(command, row);
                return Ok(());
            }
        }

        let header = Self::render_header(&command)?;
        let row = self.render_row(&command, 0)?;
        let mut run = BatchAccumulator::new(header);
        if !run.fits(&row, &self.limits) {
            return Err(TypeMapError::batch_too_large(
                command.table.to_string(),
                format!(
                    "single row needs ~{} bytes and {} parameters (limits: {} bytes, {} parameters)",
                    run.estimated_bytes + row.cost,
                    row.parameters.len(),
                    self.limits.max_payload_bytes,
                    self.limits.max_parameters
                ),
            ));
        }

        if self.current.is_some() {
            trace!(table = %command.table, "row exceeds run limits, flushing");
            self.flush();
        }
        trace!(table = %command.table, cost = row.cost, "row starts new run");
        run.push(command, row);
        self.current = Some(run);
        self.state = PlannerState::Accumulating;
        Ok(())
    }

    fn render_header(command: &PendingWriteCommand) -> Result<String> {
        if command.columns.is_empty() {
            return Err(TypeMapError::field_mismatch(
                command.table.to_string(),
                "INSERT requires at least one column",
            ));
        }
        let columns = command
            .columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Result<Vec<_>>>()?;
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ",
            command.table.qualified()?,
            columns.join(", ")
        ))
    }

    fn render_row(&self, command: &PendingWriteCommand, offset: usize) -> Result<RenderedRow> {
        let mut parameters = Vec::new();
        let values = render_values(
            &command.columns,
            command.requires_literals(),
            offset,
            &mut parameters,
        )?;
        let text = format!("({})", values.join(", "));
        let cost = json_escaped_len(&text)
            + ROW_SEPARATOR.len()
            + parameter_bytes(&parameters)
            + self.limits.row_overhead_bytes;
        Ok(RenderedRow {
            text,
            parameters,
            cost,
        })
    }

    fn render_standalone(&self, command: &PendingWriteCommand) -> Result<StatementBatch> {
        let literal = command.requires_literals();
        let table = command.table.qualified()?;
        let mut parameters = Vec::new();

        let mut sql = match command.kind {
            WriteKind::Update => {
                if command.columns.is_empty() {
                    return Err(TypeMapError::field_mismatch(
                        command.table.to_string(),
                        "UPDATE requires at least one column",
                    ));
                }
                let values = render_values(&command.columns, literal, 0, &mut parameters)?;
                let assignments = command
                    .columns
                    .iter()
                    .zip(values)
                    .map(|(c, v)| Ok(format!("{} = {}", quote_ident(&c.name)?, v)))
                    .collect::<Result<Vec<_>>>()?;
                format!("UPDATE {} SET {}", table, assignments.join(", "))
            }
            _ => format!("DELETE FROM {}", table),
        };

        let mut predicates = Vec::with_capacity(command.conditions.len());
        for condition in &command.conditions {
            let column = quote_ident(&condition.name)?;
            if condition.value.is_null() {
                predicates.push(format!("{} IS NULL", column));
            } else {
                let value = render_values(
                    std::slice::from_ref(condition),
                    literal,
                    0,
                    &mut parameters,
                )?;
                predicates.push(format!("{} = {}", column, value.join("")));
            }
        }
        if predicates.is_empty() {
            sql.push_str(" WHERE TRUE");
        } else {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        let estimated_bytes =
            json_string_len(&sql) + parameter_bytes(&parameters) + self.limits.row_overhead_bytes;
        if estimated_bytes > self.limits.max_payload_bytes
            || parameters.len() > self.limits.max_parameters
        {
            return Err(TypeMapError::batch_too_large(
                command.table.to_string(),
                format!(
                    "{} needs ~{} bytes and {} parameters (limits: {} bytes, {} parameters)",
                    command.kind,
                    estimated_bytes,
                    parameters.len(),
                    self.limits.max_payload_bytes,
                    self.limits.max_parameters
                ),
            ));
        }

        let mapping = if command.read_columns.is_empty() {
            ResultMapping::NoResults
        } else {
            ResultMapping::ReadBack
        };
        Ok(StatementBatch {
            table: command.table.to_string(),
            kind: command.kind,
            sql,
            parameters,
            row_mappings: vec![mapping],
            read_columns: command.read_columns.clone(),
            estimated_bytes,
        })
    }
}
