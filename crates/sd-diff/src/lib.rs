//! Structural diff of configuration snapshots.
//!
//! A configuration area is described once as a [`Schema`] of typed tables
//! linked by parent/child [`Relation`]s. Each side of a comparison fills a
//! [`Snapshot`]; [`diff`] classifies every row as unchanged, added, deleted
//! or modified and [`visibility::resolve`] decides what a report may hide.

pub mod diffset;
pub mod engine;
pub mod error;
pub mod rules;
pub mod schema;
pub mod snapshot;
pub mod table;
pub mod value;
pub mod visibility;

pub use diffset::{ChangeKind, DiffRow, DiffSet, DiffSummary, DiffTable};
pub use engine::diff;
pub use error::{ModelError, ModelResult};
pub use rules::{classify_rules, RuleChange, RuleChangeKind, RuleTableSpec};
pub use schema::{Relation, Schema, SchemaBuilder};
pub use snapshot::{Diagnostic, DiagnosticKind, Snapshot};
pub use table::{Column, Table, TableDef};
pub use value::{ColumnType, KeyCollation, RowKey, Value};
pub use visibility::{
    resolve, HideOverride, HidePolicy, NoOverride, OutOfBoxPolicy, PolicyChain, SectionVisibility, TableVisibility,
};
