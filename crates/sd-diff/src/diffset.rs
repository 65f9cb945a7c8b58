//! Classified comparison results.

use crate::schema::{Relation, Schema};
use crate::snapshot::Diagnostic;
use crate::table::TableDef;
use crate::value::{RowKey, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Classification of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Unchanged,
    Added,
    Deleted,
    Modified,
}

impl ChangeKind {
    /// CSS class used for this classification in rendered output.
    pub fn css_class(self) -> &'static str {
        match self {
            ChangeKind::Unchanged => "unchanged",
            ChangeKind::Added => "added",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Modified => "modified",
        }
    }

    pub fn is_change(self) -> bool {
        self != ChangeKind::Unchanged
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_class())
    }
}

/// One classified row.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffRow {
    pub kind: ChangeKind,
    /// Values to display: pilot values, except deleted rows and
    /// change-ignored columns which carry production values.
    pub values: Vec<Value>,
    /// Production values when the row exists on both sides.
    pub previous: Option<Vec<Value>>,
    /// Columns whose values differ and count as a change.
    pub changed: Vec<usize>,
    /// Change-ignored columns whose values differ.
    pub drifted: Vec<usize>,
    /// Classification was taken from an added or deleted parent.
    pub inherited: bool,
}

impl DiffRow {
    pub(crate) fn added(values: Vec<Value>, inherited: bool) -> Self {
        Self::single(ChangeKind::Added, values, inherited)
    }

    pub(crate) fn deleted(values: Vec<Value>, inherited: bool) -> Self {
        Self::single(ChangeKind::Deleted, values, inherited)
    }

    fn single(kind: ChangeKind, values: Vec<Value>, inherited: bool) -> Self {
        Self {
            kind,
            values,
            previous: None,
            changed: Vec::new(),
            drifted: Vec::new(),
            inherited,
        }
    }

    pub fn value(&self, column: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(column).unwrap_or(&NULL)
    }

    /// Production value of a column that counts as changed.
    pub fn old_value(&self, column: usize) -> Option<&Value> {
        if !self.changed.contains(&column) {
            return None;
        }
        self.previous.as_ref().and_then(|p| p.get(column))
    }

    pub fn is_changed(&self, column: usize) -> bool {
        self.changed.contains(&column)
    }
}

/// Classified rows of one table.
#[derive(Debug, Clone)]
pub struct DiffTable {
    pub(crate) def: Arc<TableDef>,
    pub(crate) rows: Vec<DiffRow>,
}

impl DiffTable {
    pub fn def(&self) -> &Arc<TableDef> {
        &self.def
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn rows(&self) -> &[DiffRow] {
        &self.rows
    }

    /// True when every row is unchanged (vacuously true when empty).
    pub fn can_hide(&self) -> bool {
        self.rows.iter().all(|r| r.kind == ChangeKind::Unchanged)
    }

    /// Primary key of a row rendered for messages.
    pub fn key_text(&self, row: &DiffRow) -> String {
        RowKey::from_values(&row.values, self.def.primary_key(), crate::value::KeyCollation::Ordinal).to_string()
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for row in &self.rows {
            summary.record(row.kind);
        }
        summary
    }
}

/// Counts per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub unchanged: usize,
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
}

impl DiffSummary {
    fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Unchanged => self.unchanged += 1,
            ChangeKind::Added => self.added += 1,
            ChangeKind::Deleted => self.deleted += 1,
            ChangeKind::Modified => self.modified += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.unchanged + self.added + self.deleted + self.modified
    }

    pub fn changes(&self) -> usize {
        self.added + self.deleted + self.modified
    }

    pub fn merge(&mut self, other: DiffSummary) {
        self.unchanged += other.unchanged;
        self.added += other.added;
        self.deleted += other.deleted;
        self.modified += other.modified;
    }
}

/// Result of comparing two snapshots.
#[derive(Debug, Clone)]
pub struct DiffSet {
    pub(crate) schema: Arc<Schema>,
    pub(crate) tables: Vec<DiffTable>,
    /// Per relation: child row indices keyed by link value.
    pub(crate) links: Vec<HashMap<RowKey, Vec<usize>>>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl DiffSet {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn tables(&self) -> &[DiffTable] {
        &self.tables
    }

    pub fn table_at(&self, idx: usize) -> &DiffTable {
        &self.tables[idx]
    }

    pub fn table(&self, name: &str) -> Option<&DiffTable> {
        self.schema.table_index(name).map(|i| &self.tables[i])
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// True when every table in the set is unchanged.
    pub fn can_hide(&self) -> bool {
        self.tables.iter().all(DiffTable::can_hide)
    }

    pub fn summary(&self) -> DiffSummary {
        let mut total = DiffSummary::default();
        for table in &self.tables {
            total.merge(table.summary());
        }
        total
    }

    /// Indices of child rows linked to `parent_row` through relation `relation`.
    pub fn child_rows(&self, relation: usize, parent_row: &DiffRow) -> &[usize] {
        let Some(rel) = self.schema.relations().get(relation) else {
            return &[];
        };
        let key = link_key(&self.schema, rel, &parent_row.values, &rel.parent_columns);
        self.links[relation]
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether a child row's link value matches some parent row.
    pub fn has_parent(&self, relation: usize, child_row: &DiffRow) -> bool {
        let Some(rel) = self.schema.relations().get(relation) else {
            return false;
        };
        let key = link_key(&self.schema, rel, &child_row.values, &rel.child_columns);
        let parent = &self.tables[rel.parent];
        parent
            .rows
            .iter()
            .any(|p| link_key(&self.schema, rel, &p.values, &rel.parent_columns) == key)
    }
}

/// Link values compare under the parent table's collation.
pub(crate) fn link_key(schema: &Schema, rel: &Relation, values: &[Value], columns: &[usize]) -> RowKey {
    RowKey::from_values(values, columns, schema.table(rel.parent).collation())
}
