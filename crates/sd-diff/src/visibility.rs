//! Effective hideability of tables and sections.
//!
//! The generic rule is that a table may be hidden when it holds no changes.
//! A [`HidePolicy`] may tighten that (force a table visible) or relax it
//! (allow hiding despite changes) for known-benign vendor patterns.

use crate::diffset::{ChangeKind, DiffRow, DiffSet, DiffTable};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Decision of a policy for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HideOverride {
    /// Use the generic rule.
    Inherit,
    /// Never hide, with the reason shown in the report.
    ForceVisible(String),
    /// Hideable even though the table has changes.
    AllowHide(String),
}

/// Domain hook that overrides the generic hide rule per table.
pub trait HidePolicy {
    fn table_override(&self, table: &DiffTable) -> HideOverride;
}

/// The generic rule alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverride;

impl HidePolicy for NoOverride {
    fn table_override(&self, _table: &DiffTable) -> HideOverride {
        HideOverride::Inherit
    }
}

/// Several policies combined. A forced-visible decision from any member
/// wins over an allow-hide decision from another.
#[derive(Default)]
pub struct PolicyChain {
    policies: Vec<Box<dyn HidePolicy + Send + Sync>>,
}

impl PolicyChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, policy: impl HidePolicy + Send + Sync + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl HidePolicy for PolicyChain {
    fn table_override(&self, table: &DiffTable) -> HideOverride {
        let mut relaxed = None;
        for policy in &self.policies {
            match policy.table_override(table) {
                HideOverride::ForceVisible(reason) => return HideOverride::ForceVisible(reason),
                HideOverride::AllowHide(reason) if relaxed.is_none() => relaxed = Some(reason),
                _ => {}
            }
        }
        relaxed.map_or(HideOverride::Inherit, HideOverride::AllowHide)
    }
}

/// Rules for vendor-shipped ("out-of-box") rows, identified by a marker
/// column value.
///
/// Out-of-box rows normally come and go with product upgrades, so only
/// changes in `disregarded` columns are benign. A table whose only changes
/// are such benign edits may be hidden. An out-of-box row that was added,
/// deleted, changed in a `protected` column (even change-ignored drift) or
/// changed outside the disregarded columns forces the table visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutOfBoxPolicy {
    pub table: String,
    pub marker_column: String,
    pub marker_value: Value,
    #[serde(default)]
    pub disregarded: Vec<String>,
    #[serde(default)]
    pub protected: Vec<String>,
}

impl OutOfBoxPolicy {
    fn columns(table: &DiffTable, names: &[String]) -> Vec<usize> {
        names
            .iter()
            .filter_map(|n| {
                let idx = table.def().column_index(n);
                if idx.is_none() {
                    tracing::debug!(table = table.name(), column = %n, "policy column not in table");
                }
                idx
            })
            .collect()
    }

    fn is_out_of_box(&self, row: &DiffRow, marker: usize) -> bool {
        let previous = row.previous.as_ref().and_then(|p| p.get(marker));
        row.value(marker) == &self.marker_value || previous == Some(&self.marker_value)
    }
}

impl HidePolicy for OutOfBoxPolicy {
    fn table_override(&self, table: &DiffTable) -> HideOverride {
        if table.name() != self.table {
            return HideOverride::Inherit;
        }
        let Some(marker) = table.def().column_index(&self.marker_column) else {
            tracing::warn!(table = table.name(), column = %self.marker_column, "marker column missing; policy skipped");
            return HideOverride::Inherit;
        };
        let disregarded = Self::columns(table, &self.disregarded);
        let protected = Self::columns(table, &self.protected);
        let column_name = |c: usize| table.def().columns()[c].name.clone();

        let mut benign = 0usize;
        let mut other_changes = false;
        for row in table.rows() {
            if !self.is_out_of_box(row, marker) {
                other_changes |= row.kind.is_change();
                continue;
            }
            if matches!(row.kind, ChangeKind::Added | ChangeKind::Deleted) {
                return HideOverride::ForceVisible(format!(
                    "out-of-box row {} was {}",
                    table.key_text(row),
                    row.kind
                ));
            }
            if let Some(&c) = protected
                .iter()
                .find(|c| row.changed.contains(c) || row.drifted.contains(c))
            {
                return HideOverride::ForceVisible(format!(
                    "protected column '{}' changed on out-of-box row {}",
                    column_name(c),
                    table.key_text(row)
                ));
            }
            if row.kind == ChangeKind::Modified {
                if let Some(&c) = row.changed.iter().find(|c| !disregarded.contains(c)) {
                    return HideOverride::ForceVisible(format!(
                        "column '{}' changed on out-of-box row {}",
                        column_name(c),
                        table.key_text(row)
                    ));
                }
                benign += 1;
            }
        }
        if benign > 0 && !other_changes {
            HideOverride::AllowHide(format!("{} out-of-box row(s) differ only in disregarded columns", benign))
        } else {
            HideOverride::Inherit
        }
    }
}

/// Resolved visibility of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableVisibility {
    pub table: String,
    /// Generic rule: the table holds no changes.
    pub can_hide: bool,
    /// After policy overrides.
    pub effective: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relaxed_reason: Option<String>,
}

/// Resolved visibility of a whole section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionVisibility {
    pub tables: Vec<TableVisibility>,
    /// The section may be collapsed: every table is effectively hideable.
    pub can_hide: bool,
    /// Some table was forced visible by a policy.
    pub forced: bool,
}

impl SectionVisibility {
    /// Visibility for the table at schema index `idx`.
    pub fn table(&self, idx: usize) -> Option<&TableVisibility> {
        self.tables.get(idx)
    }

    pub fn forced_reasons(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().filter_map(|t| t.forced_reason.as_deref())
    }

    pub fn relaxed_reasons(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().filter_map(|t| t.relaxed_reason.as_deref())
    }
}

/// Combine the generic rule with policy overrides for every table.
pub fn resolve(diff: &DiffSet, policy: &dyn HidePolicy) -> SectionVisibility {
    let tables: Vec<TableVisibility> = diff
        .tables()
        .iter()
        .map(|table| {
            let can_hide = table.can_hide();
            let (effective, forced_reason, relaxed_reason) = match policy.table_override(table) {
                HideOverride::Inherit => (can_hide, None, None),
                HideOverride::ForceVisible(reason) => {
                    tracing::info!(table = table.name(), reason = %reason, "table forced visible");
                    (false, Some(reason), None)
                }
                HideOverride::AllowHide(reason) => {
                    tracing::debug!(table = table.name(), reason = %reason, "table hideable despite changes");
                    (true, None, Some(reason))
                }
            };
            TableVisibility {
                table: table.name().to_string(),
                can_hide,
                effective,
                forced_reason,
                relaxed_reason,
            }
        })
        .collect();
    SectionVisibility {
        can_hide: tables.iter().all(|t| t.effective),
        forced: tables.iter().any(|t| t.forced_reason.is_some()),
        tables,
    }
}
