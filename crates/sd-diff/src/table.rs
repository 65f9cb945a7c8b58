//! Column and table definitions plus the row store for one table.

use crate::error::{ModelError, ModelResult};
use crate::value::{ColumnType, KeyCollation, RowKey, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
    /// Differences in this column never make a row modified.
    pub change_ignored: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
            change_ignored: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::String)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Int)
    }

    /// Mark the column as change-ignored (volatile ids, timestamps).
    pub fn change_ignored(mut self) -> Self {
        self.change_ignored = true;
        self
    }
}

/// Shape of a table: ordered columns and a non-empty primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    name: String,
    columns: Vec<Column>,
    primary_key: Vec<usize>,
    collation: KeyCollation,
}

impl TableDef {
    /// Create a definition whose primary key is the named columns.
    pub fn new(name: impl Into<String>, columns: Vec<Column>, primary_key: &[&str]) -> ModelResult<Self> {
        let name = name.into();
        if primary_key.is_empty() {
            return Err(ModelError::EmptyPrimaryKey(name));
        }
        let mut seen = HashMap::new();
        for (i, col) in columns.iter().enumerate() {
            if seen.insert(col.name.as_str(), i).is_some() {
                return Err(ModelError::DuplicateColumn {
                    table: name.clone(),
                    column: col.name.clone(),
                });
            }
        }
        let primary_key = primary_key
            .iter()
            .map(|key| {
                seen.get(key).copied().ok_or_else(|| ModelError::UnknownColumn {
                    table: name.clone(),
                    column: key.to_string(),
                })
            })
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Self {
            name,
            columns,
            primary_key,
            collation: KeyCollation::Ordinal,
        })
    }

    /// Set how key values are compared across snapshots.
    pub fn with_collation(mut self, collation: KeyCollation) -> Self {
        self.collation = collation;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Resolve a column name or fail with [`ModelError::UnknownColumn`].
    pub fn require_column(&self, name: &str) -> ModelResult<usize> {
        self.column_index(name).ok_or_else(|| ModelError::UnknownColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    pub fn is_key_column(&self, idx: usize) -> bool {
        self.primary_key.contains(&idx)
    }

    pub fn collation(&self) -> KeyCollation {
        self.collation
    }

    /// Identity of a row under this table's collation.
    pub fn key_of(&self, values: &[Value]) -> RowKey {
        RowKey::from_values(values, &self.primary_key, self.collation)
    }

    /// Exact identity of a row, used for duplicate detection within one snapshot.
    pub(crate) fn exact_key_of(&self, values: &[Value]) -> RowKey {
        RowKey::from_values(values, &self.primary_key, KeyCollation::Ordinal)
    }

    /// Check arity and column types of a candidate row.
    pub fn check_row(&self, values: &[Value]) -> ModelResult<()> {
        if values.len() != self.columns.len() {
            return Err(ModelError::ArityMismatch {
                table: self.name.clone(),
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        for (col, value) in self.columns.iter().zip(values) {
            if !col.kind.accepts(value) {
                return Err(ModelError::TypeMismatch {
                    table: self.name.clone(),
                    column: col.name.clone(),
                    expected: col.kind,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Rows of one table in insertion order.
#[derive(Debug, Clone)]
pub struct Table {
    def: Arc<TableDef>,
    rows: Vec<Vec<Value>>,
    index: HashMap<RowKey, usize>,
}

impl Table {
    /// Create an empty table with the given columns and primary key.
    pub fn new(name: impl Into<String>, columns: Vec<Column>, primary_key: &[&str]) -> ModelResult<Self> {
        Ok(Self::from_def(Arc::new(TableDef::new(name, columns, primary_key)?)))
    }

    pub fn from_def(def: Arc<TableDef>) -> Self {
        Self {
            def,
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn def(&self) -> &Arc<TableDef> {
        &self.def
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Append a row. Fails on arity, type or exact duplicate key.
    pub fn add_row(&mut self, values: Vec<Value>) -> ModelResult<()> {
        self.def.check_row(&values)?;
        let key = self.def.exact_key_of(&values);
        if self.index.contains_key(&key) {
            return Err(ModelError::DuplicateKey {
                table: self.def.name().to_string(),
                key: key.to_string(),
            });
        }
        self.index.insert(key, self.rows.len());
        self.rows.push(values);
        Ok(())
    }

    /// Whether a row with exactly these key values exists.
    pub fn contains_key(&self, values: &[Value]) -> bool {
        self.index.contains_key(&self.def.exact_key_of(values))
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn set_value(&mut self, row: usize, column: usize, value: Value) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value;
        }
    }
}
