//! One side of a comparison: rows for every table of a shared schema.

use crate::error::{ModelError, ModelResult};
use crate::schema::Schema;
use crate::table::Table;
use crate::value::{ColumnType, KeyCollation, RowKey, Value};
use sd_common::Side;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Kind of data problem recorded instead of aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A row repeated an existing primary key and was dropped on load.
    DuplicateKey,
    /// Two rows with distinct exact keys collapsed under the table collation.
    KeyCollision,
    /// A child row referenced a parent key present on neither side.
    OrphanRow,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::DuplicateKey => write!(f, "duplicate_key"),
            DiagnosticKind::KeyCollision => write!(f, "key_collision"),
            DiagnosticKind::OrphanRow => write!(f, "orphan_row"),
        }
    }
}

/// A recoverable data problem attached to a snapshot or diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub table: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, table: impl Into<String>, key: impl fmt::Display, message: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            key: key.to_string(),
            side: None,
            message: message.into(),
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.kind, self.table, self.key)?;
        if let Some(side) = self.side {
            write!(f, " ({})", side)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Rows for every table of a schema.
#[derive(Debug, Clone)]
pub struct Snapshot {
    schema: Arc<Schema>,
    tables: Vec<Table>,
    diagnostics: Vec<Diagnostic>,
}

impl Snapshot {
    pub fn new(schema: Arc<Schema>) -> Self {
        let tables = schema.tables().iter().cloned().map(Table::from_def).collect();
        Self {
            schema,
            tables,
            diagnostics: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.schema.table_index(name).map(|i| &self.tables[i])
    }

    pub fn table_at(&self, idx: usize) -> &Table {
        &self.tables[idx]
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Total rows across all tables.
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(Table::len).sum()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Insert a row, failing on any integrity violation.
    pub fn add_row(&mut self, table: &str, values: Vec<Value>) -> ModelResult<()> {
        let idx = self.schema.require_table(table)?;
        self.tables[idx].add_row(values)
    }

    /// Insert a row, dropping it with a diagnostic when its key repeats.
    ///
    /// Returns `Ok(false)` when the row was dropped. Arity and type errors
    /// still fail since they indicate a malformed input.
    pub fn add_row_lenient(&mut self, table: &str, values: Vec<Value>) -> ModelResult<bool> {
        let idx = self.schema.require_table(table)?;
        match self.tables[idx].add_row(values) {
            Ok(()) => Ok(true),
            Err(ModelError::DuplicateKey { table, key }) => {
                tracing::warn!(table = %table, key = %key, "duplicate primary key; later row dropped");
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DuplicateKey,
                    table,
                    key,
                    "later row with the same primary key was dropped",
                ));
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Overwrite `target` with a dense 1-based rank of `source` within
    /// each group of rows sharing the `group` columns.
    ///
    /// Ranks follow ascending `source`; rows with a null source rank last.
    /// Ties keep insertion order. Used to replace volatile ordering columns
    /// (raw precedence numbers) with stable positions before comparing.
    pub fn assign_ordinals(&mut self, table: &str, source: &str, target: &str, group: &[&str]) -> ModelResult<()> {
        let idx = self.schema.require_table(table)?;
        let def = self.schema.table(idx).clone();
        let source_col = def.require_column(source)?;
        let target_col = def.require_column(target)?;
        let group_cols = group
            .iter()
            .map(|g| def.require_column(g))
            .collect::<ModelResult<Vec<_>>>()?;
        let invalid = |detail: &str| ModelError::InvalidOrdinal {
            table: table.to_string(),
            detail: detail.to_string(),
        };
        if def.columns()[target_col].kind != ColumnType::Int {
            return Err(invalid("target column must be an int column"));
        }
        if def.is_key_column(target_col) {
            return Err(invalid("target column cannot be part of the primary key"));
        }

        let rows = self.tables[idx].rows();
        let mut group_order: Vec<RowKey> = Vec::new();
        let mut members: HashMap<RowKey, Vec<usize>> = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            let key = RowKey::from_values(row, &group_cols, KeyCollation::Ordinal);
            members
                .entry(key.clone())
                .or_insert_with(|| {
                    group_order.push(key);
                    Vec::new()
                })
                .push(i);
        }

        let mut assignments = Vec::with_capacity(rows.len());
        for key in &group_order {
            let Some(indices) = members.get(key) else { continue };
            let mut ranked = indices.clone();
            ranked.sort_by(|&a, &b| match (&rows[a][source_col], &rows[b][source_col]) {
                (Value::Null, Value::Null) => std::cmp::Ordering::Equal,
                (Value::Null, _) => std::cmp::Ordering::Greater,
                (_, Value::Null) => std::cmp::Ordering::Less,
                (x, y) => x.sort_cmp(y),
            });
            for (rank, row) in ranked.into_iter().enumerate() {
                assignments.push((row, Value::Int(rank as i64 + 1)));
            }
        }

        let table_rows = &mut self.tables[idx];
        for (row, value) in assignments {
            table_rows.set_value(row, target_col, value);
        }
        tracing::debug!(table = %table, groups = group_order.len(), "ordinals assigned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, TableDef};

    fn schema() -> Arc<Schema> {
        Schema::builder()
            .table(
                TableDef::new(
                    "rules",
                    vec![
                        Column::string("id"),
                        Column::string("object_type"),
                        Column::int("precedence"),
                        Column::int("position"),
                    ],
                    &["id"],
                )
                .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn row(id: &str, object_type: &str, precedence: Option<i64>) -> Vec<Value> {
        vec![id.into(), object_type.into(), precedence.into(), Value::Null]
    }

    #[test]
    fn test_lenient_insert_records_duplicate() {
        let mut snap = Snapshot::new(schema());
        assert!(snap.add_row_lenient("rules", row("r1", "person", Some(1))).unwrap());
        assert!(!snap.add_row_lenient("rules", row("r1", "group", Some(2))).unwrap());
        assert_eq!(snap.row_count(), 1);
        assert_eq!(snap.diagnostics().len(), 1);
        assert_eq!(snap.diagnostics()[0].kind, DiagnosticKind::DuplicateKey);
    }

    #[test]
    fn test_unknown_table() {
        let mut snap = Snapshot::new(schema());
        assert_eq!(
            snap.add_row("nope", vec![]),
            Err(ModelError::UnknownTable("nope".into()))
        );
    }

    #[test]
    fn test_assign_ordinals_dense_per_group() {
        let mut snap = Snapshot::new(schema());
        snap.add_row("rules", row("a", "person", Some(250))).unwrap();
        snap.add_row("rules", row("b", "person", Some(100))).unwrap();
        snap.add_row("rules", row("c", "group", Some(900))).unwrap();
        snap.add_row("rules", row("d", "person", None)).unwrap();
        snap.add_row("rules", row("e", "person", Some(100))).unwrap();
        snap.assign_ordinals("rules", "precedence", "position", &["object_type"])
            .unwrap();

        let positions: Vec<(String, i64)> = snap
            .table("rules")
            .unwrap()
            .rows()
            .iter()
            .map(|r| (r[0].to_string(), r[3].as_int().unwrap()))
            .collect();
        assert_eq!(
            positions,
            vec![
                ("a".to_string(), 3),
                ("b".to_string(), 1),
                ("c".to_string(), 1),
                ("d".to_string(), 4),
                ("e".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_assign_ordinals_rejects_key_target() {
        let mut snap = Snapshot::new(schema());
        assert!(matches!(
            snap.assign_ordinals("rules", "precedence", "object_type", &[]),
            Err(ModelError::InvalidOrdinal { .. })
        ));
    }
}
