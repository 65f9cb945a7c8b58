//! Per-rule change classification for downstream consumers.

use crate::diffset::{ChangeKind, DiffRow, DiffSet};
use crate::error::ModelResult;
use serde::{Deserialize, Serialize};

/// Where rule identity lives in a section's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTableSpec {
    pub table: String,
    pub name_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_column: Option<String>,
}

/// How a rule differs between snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum RuleChangeKind {
    New,
    Removed,
    /// Changed columns of the rule row, then names of descendant tables
    /// holding changes.
    Updated { fields: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleChange {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub kind: RuleChangeKind,
}

/// Classify every changed rule of the rule table as new, removed or updated.
///
/// Unchanged rules with no changed descendants are omitted.
pub fn classify_rules(diff: &DiffSet, spec: &RuleTableSpec) -> ModelResult<Vec<RuleChange>> {
    let schema = diff.schema();
    let t = schema.require_table(&spec.table)?;
    let def = schema.table(t);
    let name_col = def.require_column(&spec.name_column)?;
    let id_col = spec
        .id_column
        .as_deref()
        .map(|c| def.require_column(c))
        .transpose()?;

    let mut changes = Vec::new();
    for row in diff.table_at(t).rows() {
        let kind = match row.kind {
            ChangeKind::Added => RuleChangeKind::New,
            ChangeKind::Deleted => RuleChangeKind::Removed,
            ChangeKind::Unchanged | ChangeKind::Modified => {
                let mut fields: Vec<String> = row
                    .changed
                    .iter()
                    .map(|&c| def.columns()[c].name.clone())
                    .collect();
                collect_descendant_changes(diff, t, row, &mut fields);
                if fields.is_empty() {
                    continue;
                }
                RuleChangeKind::Updated { fields }
            }
        };
        changes.push(RuleChange {
            name: row.value(name_col).to_string(),
            id: id_col.map(|c| row.value(c).to_string()).filter(|s| !s.is_empty()),
            kind,
        });
    }
    tracing::debug!(table = %spec.table, changed = changes.len(), "rules classified");
    Ok(changes)
}

/// Append the name of every descendant table holding a changed row linked
/// under `row`.
fn collect_descendant_changes(diff: &DiffSet, table: usize, row: &DiffRow, fields: &mut Vec<String>) {
    for (ri, rel) in diff.schema().child_relations(table) {
        let child = diff.table_at(rel.child);
        for &ci in diff.child_rows(ri, row) {
            let child_row = &child.rows()[ci];
            if child_row.kind.is_change() && !fields.iter().any(|f| f == child.name()) {
                fields.push(child.name().to_string());
            }
            collect_descendant_changes(diff, rel.child, child_row, fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::diff;
    use crate::schema::Schema;
    use crate::snapshot::Snapshot;
    use crate::table::{Column, TableDef};
    use crate::value::Value;

    fn snapshots() -> (Snapshot, Snapshot) {
        let schema = Schema::builder()
            .table(
                TableDef::new(
                    "rules",
                    vec![Column::string("guid"), Column::string("name"), Column::int("precedence")],
                    &["guid"],
                )
                .unwrap(),
            )
            .table(
                TableDef::new(
                    "flows",
                    vec![Column::string("rule"), Column::string("target"), Column::string("source")],
                    &["rule", "target"],
                )
                .unwrap(),
            )
            .relation("rules", &["guid"], "flows", &["rule"])
            .build()
            .unwrap();
        (Snapshot::new(schema.clone()), Snapshot::new(schema))
    }

    fn rule(guid: &str, name: &str, precedence: i64) -> Vec<Value> {
        vec![guid.into(), name.into(), precedence.into()]
    }

    fn flow(rule: &str, target: &str, source: &str) -> Vec<Value> {
        vec![rule.into(), target.into(), source.into()]
    }

    #[test]
    fn test_classify_new_removed_updated() {
        let (mut pilot, mut prod) = snapshots();
        pilot.add_row("rules", rule("g1", "Join", 1)).unwrap();
        pilot.add_row("rules", rule("g2", "Provision", 2)).unwrap();
        pilot.add_row("rules", rule("g4", "Flows", 4)).unwrap();
        pilot.add_row("rules", rule("g5", "Same", 5)).unwrap();
        pilot.add_row("flows", flow("g4", "mail", "email")).unwrap();
        prod.add_row("rules", rule("g1", "Join", 7)).unwrap();
        prod.add_row("rules", rule("g3", "Legacy", 3)).unwrap();
        prod.add_row("rules", rule("g4", "Flows", 4)).unwrap();
        prod.add_row("rules", rule("g5", "Same", 5)).unwrap();
        prod.add_row("flows", flow("g4", "mail", "proxyAddresses")).unwrap();

        let d = diff(&pilot, &prod).unwrap();
        let spec = RuleTableSpec {
            table: "rules".into(),
            name_column: "name".into(),
            id_column: Some("guid".into()),
        };
        let changes = classify_rules(&d, &spec).unwrap();
        let summary: Vec<(&str, &RuleChangeKind)> = changes.iter().map(|c| (c.name.as_str(), &c.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("Join", &RuleChangeKind::Updated { fields: vec!["precedence".into()] }),
                ("Provision", &RuleChangeKind::New),
                ("Flows", &RuleChangeKind::Updated { fields: vec!["flows".into()] }),
                ("Legacy", &RuleChangeKind::Removed),
            ]
        );
    }

    #[test]
    fn test_rule_change_json_shape() {
        let change = RuleChange {
            name: "Join".into(),
            id: Some("g1".into()),
            kind: RuleChangeKind::Updated {
                fields: vec!["precedence".into()],
            },
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["change"], "updated");
        assert_eq!(json["fields"][0], "precedence");
        assert_eq!(json["id"], "g1");
    }

    #[test]
    fn test_unknown_rule_table() {
        let (pilot, prod) = snapshots();
        let d = diff(&pilot, &prod).unwrap();
        let spec = RuleTableSpec {
            table: "nope".into(),
            name_column: "name".into(),
            id_column: None,
        };
        assert!(classify_rules(&d, &spec).is_err());
    }
}
