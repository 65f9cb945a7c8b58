//! Errors raised while building or comparing snapshots.

use crate::value::ColumnType;
use thiserror::Error;

/// Table model and diff errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("duplicate key {key} in table '{table}'")]
    DuplicateKey { table: String, key: String },

    #[error("table '{table}' expects {expected} values per row, got {actual}")]
    ArityMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("column '{table}.{column}' is {expected}, got value '{value}'")]
    TypeMismatch {
        table: String,
        column: String,
        expected: ColumnType,
        value: String,
    },

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("unknown column '{table}.{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("column '{table}.{column}' declared twice")]
    DuplicateColumn { table: String, column: String },

    #[error("table '{0}' declares no primary key")]
    EmptyPrimaryKey(String),

    #[error("table '{0}' declared twice")]
    DuplicateTable(String),

    #[error("relation {parent} -> {child}: {detail}")]
    InvalidRelation {
        parent: String,
        child: String,
        detail: String,
    },

    #[error("relations form a cycle through table '{0}'")]
    RelationCycle(String),

    #[error("ordinal on '{table}': {detail}")]
    InvalidOrdinal { table: String, detail: String },

    #[error("snapshots disagree on table '{table}': {detail}")]
    SchemaMismatch { table: String, detail: String },
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;

impl From<ModelError> for sd_common::Error {
    fn from(err: ModelError) -> Self {
        use sd_common::Error;
        match err {
            ModelError::DuplicateKey { table, key } => Error::DuplicateKey { table, key },
            ModelError::ArityMismatch { ref table, .. } | ModelError::TypeMismatch { ref table, .. } => {
                Error::InvalidRow {
                    table: table.clone(),
                    detail: err.to_string(),
                }
            }
            ModelError::SchemaMismatch { table, detail } => Error::SchemaMismatch { table, detail },
            other => Error::InvalidSchema(other.to_string()),
        }
    }
}
