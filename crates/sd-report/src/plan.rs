//! Declarative per-column rendering metadata.
//!
//! A [`PrintPlan`] is supplied by the caller for each section. Entries for a
//! table appear in visual column order; every column of every table must be
//! described exactly once. Bookmarks are named anchor namespaces: a cell of a
//! bookmark column becomes the anchor `<namespace>-<slug(value)>`, and a cell
//! of a jump column links to the same id, possibly in another section.

use crate::error::{ReportError, Result};
use sd_diff::Schema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rendering metadata for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintPlanEntry {
    pub table: usize,
    pub column: usize,
    /// Internal-only: usable for sorting and joining, never rendered.
    #[serde(default)]
    pub hidden: bool,
    /// Position in the table's multi-key sort, lowest first.
    #[serde(default)]
    pub sort_rank: Option<u32>,
    /// Bookmark namespace index this cell defines an anchor in.
    #[serde(default)]
    pub bookmark: Option<usize>,
    /// Bookmark namespace index this cell links into.
    #[serde(default)]
    pub jump_to: Option<usize>,
    /// Marks the header of a column whose changes are ignored.
    #[serde(default)]
    pub change_ignored: bool,
    /// Values are delimiter-segmented paths sorted root-first.
    #[serde(default)]
    pub path_sort: bool,
    #[serde(default)]
    pub label: Option<String>,
}

impl PrintPlanEntry {
    pub fn new(table: usize, column: usize) -> Self {
        Self {
            table,
            column,
            hidden: false,
            sort_rank: None,
            bookmark: None,
            jump_to: None,
            change_ignored: false,
            path_sort: false,
            label: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn sorted(mut self, rank: u32) -> Self {
        self.sort_rank = Some(rank);
        self
    }

    pub fn bookmark(mut self, namespace: usize) -> Self {
        self.bookmark = Some(namespace);
        self
    }

    pub fn jump_to(mut self, namespace: usize) -> Self {
        self.jump_to = Some(namespace);
        self
    }

    pub fn change_ignored(mut self) -> Self {
        self.change_ignored = true;
        self
    }

    pub fn path_sort(mut self) -> Self {
        self.path_sort = true;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A header cell spanning several visible columns of one table, e.g.
/// "Import Flows" over five sub-columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderGroup {
    pub table: usize,
    pub label: String,
    /// Index of the first spanned column among the table's visible columns.
    pub first: usize,
    pub span: usize,
}

/// Rendering metadata for a whole section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintPlan {
    pub entries: Vec<PrintPlanEntry>,
    #[serde(default)]
    pub bookmarks: Vec<String>,
    #[serde(default)]
    pub header_groups: Vec<HeaderGroup>,
    #[serde(default)]
    pub table_titles: HashMap<usize, String>,
    #[serde(default = "default_delimiter")]
    pub path_delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

impl PrintPlan {
    pub fn new() -> Self {
        Self {
            path_delimiter: default_delimiter(),
            ..Self::default()
        }
    }

    /// Every column visible in declared order, sorted by primary key.
    pub fn default_for(schema: &Schema) -> Self {
        let mut plan = Self::new();
        for (t, def) in schema.tables().iter().enumerate() {
            for (c, column) in def.columns().iter().enumerate() {
                let mut entry = PrintPlanEntry::new(t, c);
                if let Some(rank) = def.primary_key().iter().position(|&k| k == c) {
                    entry = entry.sorted(rank as u32);
                }
                if column.change_ignored {
                    entry = entry.change_ignored();
                }
                plan.entries.push(entry);
            }
        }
        plan
    }

    pub fn entry(mut self, entry: PrintPlanEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Register a bookmark namespace; entries refer to it by position.
    pub fn with_bookmark(mut self, namespace: impl Into<String>) -> Self {
        self.bookmarks.push(namespace.into());
        self
    }

    pub fn with_group(mut self, group: HeaderGroup) -> Self {
        self.header_groups.push(group);
        self
    }

    pub fn with_title(mut self, table: usize, title: impl Into<String>) -> Self {
        self.table_titles.insert(table, title.into());
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.path_delimiter = delimiter;
        self
    }

    /// Entries of one table in visual order.
    pub fn entries_for(&self, table: usize) -> impl Iterator<Item = &PrintPlanEntry> {
        self.entries.iter().filter(move |e| e.table == table)
    }

    /// Rendered entries of one table in visual order.
    pub fn visible(&self, table: usize) -> Vec<&PrintPlanEntry> {
        self.entries_for(table).filter(|e| !e.hidden).collect()
    }

    /// Sort entries of one table, lowest rank first.
    pub fn sort_keys(&self, table: usize) -> Vec<&PrintPlanEntry> {
        let mut keys: Vec<&PrintPlanEntry> = self.entries_for(table).filter(|e| e.sort_rank.is_some()).collect();
        keys.sort_by_key(|e| e.sort_rank);
        keys
    }

    pub fn groups_for(&self, table: usize) -> Vec<&HeaderGroup> {
        let mut groups: Vec<&HeaderGroup> = self.header_groups.iter().filter(|g| g.table == table).collect();
        groups.sort_by_key(|g| g.first);
        groups
    }

    pub fn title(&self, table: usize) -> Option<&str> {
        self.table_titles.get(&table).map(String::as_str)
    }

    /// Check the plan against the column counts of `schema`.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        let tables = schema.tables();
        for entry in &self.entries {
            if entry.table >= tables.len() {
                return Err(ReportError::plan(
                    format!("#{}", entry.table),
                    format!("entry references table {} of {}", entry.table, tables.len()),
                ));
            }
        }
        for (t, def) in tables.iter().enumerate() {
            let entries: Vec<&PrintPlanEntry> = self.entries_for(t).collect();
            let columns = def.columns().len();
            if entries.len() != columns {
                return Err(ReportError::plan(
                    def.name(),
                    format!("{} entries for {} columns", entries.len(), columns),
                ));
            }
            let mut seen = vec![false; columns];
            for entry in &entries {
                if entry.column >= columns {
                    return Err(ReportError::plan(
                        def.name(),
                        format!("entry references column {} of {}", entry.column, columns),
                    ));
                }
                if std::mem::replace(&mut seen[entry.column], true) {
                    return Err(ReportError::plan(
                        def.name(),
                        format!("column '{}' described twice", def.columns()[entry.column].name),
                    ));
                }
                for namespace in [entry.bookmark, entry.jump_to].into_iter().flatten() {
                    if namespace >= self.bookmarks.len() {
                        return Err(ReportError::plan(
                            def.name(),
                            format!("bookmark {} not declared ({} known)", namespace, self.bookmarks.len()),
                        ));
                    }
                }
            }
            let visible = entries.iter().filter(|e| !e.hidden).count();
            let mut next_free = 0;
            for group in self.groups_for(t) {
                if group.span == 0 || group.first < next_free || group.first + group.span > visible {
                    return Err(ReportError::plan(
                        def.name(),
                        format!(
                            "header group '{}' spans {}..{} of {} visible columns",
                            group.label,
                            group.first,
                            group.first + group.span,
                            visible
                        ),
                    ));
                }
                next_free = group.first + group.span;
            }
        }
        for t in self.table_titles.keys() {
            if *t >= tables.len() {
                return Err(ReportError::plan(format!("#{}", t), "title for unknown table"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_diff::{Column, TableDef};
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Schema::builder()
            .table(
                TableDef::new(
                    "rules",
                    vec![
                        Column::string("guid").change_ignored(),
                        Column::string("name"),
                        Column::int("precedence"),
                    ],
                    &["name"],
                )
                .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_plan_is_valid() {
        let schema = schema();
        let plan = PrintPlan::default_for(&schema);
        plan.validate(&schema).unwrap();
        assert_eq!(plan.visible(0).len(), 3);
        assert_eq!(plan.sort_keys(0).len(), 1);
        assert_eq!(plan.sort_keys(0)[0].column, 1);
        assert!(plan.entries[0].change_ignored);
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let schema = schema();
        let plan = PrintPlan::new()
            .entry(PrintPlanEntry::new(0, 0))
            .entry(PrintPlanEntry::new(0, 1));
        let err = plan.validate(&schema).unwrap_err();
        assert!(matches!(err, ReportError::PlanMismatch { ref table, .. } if table == "rules"));
    }

    #[test]
    fn test_nonexistent_column_rejected() {
        let schema = schema();
        let plan = PrintPlan::new()
            .entry(PrintPlanEntry::new(0, 0))
            .entry(PrintPlanEntry::new(0, 1))
            .entry(PrintPlanEntry::new(0, 7));
        assert!(plan.validate(&schema).is_err());
    }

    #[test]
    fn test_undeclared_bookmark_rejected() {
        let schema = schema();
        let plan = PrintPlan::new()
            .entry(PrintPlanEntry::new(0, 0).hidden())
            .entry(PrintPlanEntry::new(0, 1).bookmark(0))
            .entry(PrintPlanEntry::new(0, 2));
        assert!(plan.validate(&schema).is_err());
        plan.clone().with_bookmark("rule").validate(&schema).unwrap();
    }

    #[test]
    fn test_header_group_bounds() {
        let schema = schema();
        let base = PrintPlan::new()
            .entry(PrintPlanEntry::new(0, 0).hidden())
            .entry(PrintPlanEntry::new(0, 1))
            .entry(PrintPlanEntry::new(0, 2));
        let ok = base.clone().with_group(HeaderGroup {
            table: 0,
            label: "Rule".into(),
            first: 0,
            span: 2,
        });
        ok.validate(&schema).unwrap();
        let too_wide = base.with_group(HeaderGroup {
            table: 0,
            label: "Rule".into(),
            first: 1,
            span: 2,
        });
        assert!(too_wide.validate(&schema).is_err());
    }

    #[test]
    fn test_plan_deserializes_with_defaults() {
        let json = r#"{"entries":[{"table":0,"column":1,"sort_rank":0}]}"#;
        let plan: PrintPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.path_delimiter, ',');
        assert!(!plan.entries[0].hidden);
    }
}
