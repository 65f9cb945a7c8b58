//! Structural comparison of two snapshots.
//!
//! Rows are matched by primary key under each table's collation. Tables are
//! visited parent-first so that a child row under an added or deleted
//! parent inherits the parent's classification instead of the one its own
//! key presence would give.

use crate::diffset::{link_key, ChangeKind, DiffRow, DiffSet, DiffTable};
use crate::error::{ModelError, ModelResult};
use crate::schema::{Relation, Schema};
use crate::snapshot::{Diagnostic, DiagnosticKind, Snapshot};
use crate::table::{Table, TableDef};
use crate::value::{RowKey, Value};
use sd_common::Side;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Presence of a parent row, seen from its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkStatus {
    Added,
    Deleted,
    Present,
}

/// Compare `pilot` against `production`.
///
/// Both snapshots must share a structurally equal schema; a mismatch is a
/// caller defect reported as [`ModelError::SchemaMismatch`].
pub fn diff(pilot: &Snapshot, production: &Snapshot) -> ModelResult<DiffSet> {
    let schema = pilot.schema().clone();
    if !Arc::ptr_eq(&schema, production.schema()) {
        if let Some((table, detail)) = schema.first_difference(production.schema()) {
            return Err(ModelError::SchemaMismatch { table, detail });
        }
    }

    let mut diagnostics: Vec<Diagnostic> = pilot
        .diagnostics()
        .iter()
        .map(|d| d.clone().with_side(Side::Pilot))
        .chain(
            production
                .diagnostics()
                .iter()
                .map(|d| d.clone().with_side(Side::Production)),
        )
        .collect();

    let mut tables: Vec<Option<DiffTable>> = (0..schema.tables().len()).map(|_| None).collect();
    for &t in schema.order() {
        let def = schema.table(t).clone();
        let mut parents = Vec::new();
        for (_, rel) in schema.parent_relations(t) {
            let parent = tables[rel.parent].as_ref().ok_or_else(|| ModelError::RelationCycle(def.name().to_string()))?;
            parents.push((rel, link_statuses(&schema, rel, parent)));
        }
        let rows = diff_table(
            &def,
            pilot.table_at(t),
            production.table_at(t),
            &parents,
            &schema,
            &mut diagnostics,
        );
        let table = DiffTable { def, rows };
        let summary = table.summary();
        debug!(
            table = table.name(),
            added = summary.added,
            deleted = summary.deleted,
            modified = summary.modified,
            unchanged = summary.unchanged,
            "table compared"
        );
        tables[t] = Some(table);
    }
    let tables: Vec<DiffTable> = tables.into_iter().flatten().collect();

    let links = schema
        .relations()
        .iter()
        .map(|rel| {
            let mut map: HashMap<RowKey, Vec<usize>> = HashMap::new();
            for (i, row) in tables[rel.child].rows.iter().enumerate() {
                let key = link_key(&schema, rel, &row.values, &rel.child_columns);
                map.entry(key).or_default().push(i);
            }
            map
        })
        .collect();

    Ok(DiffSet {
        schema,
        tables,
        links,
        diagnostics,
    })
}

/// Rows of one side indexed under the table collation.
struct Indexed<'a> {
    order: Vec<(RowKey, &'a [Value])>,
    map: HashMap<RowKey, &'a [Value]>,
}

fn index_side<'a>(def: &TableDef, table: &'a Table, side: Side, diagnostics: &mut Vec<Diagnostic>) -> Indexed<'a> {
    let mut order = Vec::with_capacity(table.len());
    let mut map = HashMap::with_capacity(table.len());
    for row in table.rows() {
        let key = def.key_of(row);
        if map.contains_key(&key) {
            warn!(table = def.name(), key = %key, side = %side, "keys collide under collation; later row dropped");
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::KeyCollision,
                    def.name(),
                    &key,
                    "row collides with an earlier key under the table collation and was dropped",
                )
                .with_side(side),
            );
            continue;
        }
        map.insert(key.clone(), row.as_slice());
        order.push((key, row.as_slice()));
    }
    Indexed { order, map }
}

/// Link status of every parent row, keyed by its link columns.
///
/// A key reached by rows with different statuses counts as present.
fn link_statuses(schema: &Schema, rel: &Relation, parent: &DiffTable) -> HashMap<RowKey, LinkStatus> {
    let mut statuses = HashMap::new();
    let mut record = |key: RowKey, status: LinkStatus| {
        statuses
            .entry(key)
            .and_modify(|s| {
                if *s != status {
                    *s = LinkStatus::Present;
                }
            })
            .or_insert(status);
    };
    for row in &parent.rows {
        let status = match row.kind {
            ChangeKind::Added => LinkStatus::Added,
            ChangeKind::Deleted => LinkStatus::Deleted,
            ChangeKind::Unchanged | ChangeKind::Modified => LinkStatus::Present,
        };
        record(link_key(schema, rel, &row.values, &rel.parent_columns), status);
        if let Some(previous) = &row.previous {
            let old = link_key(schema, rel, previous, &rel.parent_columns);
            record(old, status);
        }
    }
    statuses
}

/// How a row relates to the parent rows of its relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parentage {
    /// Linked to an added or deleted parent row; the first such relation wins.
    Inherited(LinkStatus),
    /// Linked only to parent rows present on both sides.
    Linked,
    /// Linked to no parent row. `orphan` is set when some link value found
    /// no parent row at all.
    Unlinked { orphan: bool },
}

impl Parentage {
    fn status(self) -> Option<LinkStatus> {
        match self {
            Parentage::Inherited(status) => Some(status),
            Parentage::Linked | Parentage::Unlinked { .. } => None,
        }
    }
}

fn parentage(schema: &Schema, parents: &[(&Relation, HashMap<RowKey, LinkStatus>)], values: &[Value]) -> Parentage {
    let mut orphan = false;
    let mut linked = false;
    for (rel, statuses) in parents {
        let key = link_key(schema, rel, values, &rel.child_columns);
        if key.is_null() {
            continue;
        }
        match statuses.get(&key) {
            Some(LinkStatus::Present) => linked = true,
            Some(status) => return Parentage::Inherited(*status),
            None => orphan = true,
        }
    }
    if linked {
        Parentage::Linked
    } else {
        Parentage::Unlinked { orphan }
    }
}

fn diff_table(
    def: &TableDef,
    pilot: &Table,
    production: &Table,
    parents: &[(&Relation, HashMap<RowKey, LinkStatus>)],
    schema: &Schema,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<DiffRow> {
    let pilot_rows = index_side(def, pilot, Side::Pilot, diagnostics);
    let production_rows = index_side(def, production, Side::Production, diagnostics);
    let mut rows = Vec::with_capacity(pilot_rows.order.len().max(production_rows.order.len()));

    let mut note_orphan = |key: &RowKey, side: Side| {
        debug!(table = def.name(), key = %key, side = %side, "row links to no parent row");
        diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::OrphanRow,
                def.name(),
                key,
                "row references a parent row present on neither side",
            )
            .with_side(side),
        );
    };

    for (key, p) in &pilot_rows.order {
        let p = *p;
        let q = production_rows.map.get(key).copied();
        // The production placement only decides when the pilot row hangs
        // under no surviving parent; otherwise a moved link is a value change.
        let status = match parentage(schema, parents, p) {
            Parentage::Inherited(status) => Some(status),
            Parentage::Linked => None,
            Parentage::Unlinked { orphan } => {
                let status = q.and_then(|q| parentage(schema, parents, q).status());
                if orphan && status.is_none() {
                    note_orphan(key, Side::Pilot);
                }
                status
            }
        };
        rows.push(classify(def, Some(p), q, status));
    }
    for (key, q) in &production_rows.order {
        if pilot_rows.map.contains_key(key) {
            continue;
        }
        let q = *q;
        let link = parentage(schema, parents, q);
        if matches!(link, Parentage::Unlinked { orphan: true }) {
            note_orphan(key, Side::Production);
        }
        let status = link.status();
        rows.push(classify(def, None, Some(q), status));
    }
    rows
}

fn classify(def: &TableDef, pilot: Option<&[Value]>, production: Option<&[Value]>, inherited: Option<LinkStatus>) -> DiffRow {
    match (inherited, pilot, production) {
        (Some(LinkStatus::Added), Some(p), _) => DiffRow::added(p.to_vec(), true),
        (Some(LinkStatus::Added), None, Some(q)) => DiffRow::added(q.to_vec(), true),
        (Some(LinkStatus::Deleted), _, Some(q)) => DiffRow::deleted(q.to_vec(), true),
        (Some(LinkStatus::Deleted), Some(p), None) => DiffRow::deleted(p.to_vec(), true),
        (_, Some(p), None) => DiffRow::added(p.to_vec(), false),
        (_, None, Some(q)) => DiffRow::deleted(q.to_vec(), false),
        (_, Some(p), Some(q)) => compare(def, p, q),
        (_, None, None) => DiffRow::added(Vec::new(), false),
    }
}

fn compare(def: &TableDef, pilot: &[Value], production: &[Value]) -> DiffRow {
    let mut values = pilot.to_vec();
    let mut changed = Vec::new();
    let mut drifted = Vec::new();
    for (c, column) in def.columns().iter().enumerate() {
        if pilot[c] == production[c] {
            continue;
        }
        if column.change_ignored {
            drifted.push(c);
            values[c] = production[c].clone();
        } else {
            changed.push(c);
        }
    }
    DiffRow {
        kind: if changed.is_empty() {
            ChangeKind::Unchanged
        } else {
            ChangeKind::Modified
        },
        values,
        previous: Some(production.to_vec()),
        changed,
        drifted,
        inherited: false,
    }
}
