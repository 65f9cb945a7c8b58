//! Table definitions plus the parent/child relations between them.
//!
//! A [`Schema`] is immutable once built and shared by both snapshots of a
//! comparison through an `Arc`. Building validates every relation and
//! computes a parent-before-child processing order.

use crate::error::{ModelError, ModelResult};
use crate::table::TableDef;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A resolved parent/child link between two tables.
///
/// A child row belongs to the parent row whose `parent_columns` equal the
/// child's `child_columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub parent: usize,
    pub parent_columns: Vec<usize>,
    pub child: usize,
    pub child_columns: Vec<usize>,
}

#[derive(Debug, Clone)]
struct PendingRelation {
    parent: String,
    parent_columns: Vec<String>,
    child: String,
    child_columns: Vec<String>,
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<TableDef>,
    relations: Vec<PendingRelation>,
}

impl SchemaBuilder {
    pub fn table(mut self, def: TableDef) -> Self {
        self.tables.push(def);
        self
    }

    /// Declare that `child` rows hang under `parent` rows.
    pub fn relation(mut self, parent: &str, parent_columns: &[&str], child: &str, child_columns: &[&str]) -> Self {
        self.relations.push(PendingRelation {
            parent: parent.to_string(),
            parent_columns: parent_columns.iter().map(|c| c.to_string()).collect(),
            child: child.to_string(),
            child_columns: child_columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    /// Validate and freeze the schema.
    pub fn build(self) -> ModelResult<Arc<Schema>> {
        let mut by_name = HashMap::new();
        for (i, def) in self.tables.iter().enumerate() {
            if by_name.insert(def.name().to_string(), i).is_some() {
                return Err(ModelError::DuplicateTable(def.name().to_string()));
            }
        }

        let lookup = |name: &str| -> ModelResult<usize> {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| ModelError::UnknownTable(name.to_string()))
        };

        let mut relations = Vec::with_capacity(self.relations.len());
        for pending in &self.relations {
            let parent = lookup(&pending.parent)?;
            let child = lookup(&pending.child)?;
            let invalid = |detail: String| ModelError::InvalidRelation {
                parent: pending.parent.clone(),
                child: pending.child.clone(),
                detail,
            };
            if parent == child {
                return Err(invalid("a table cannot be its own parent".into()));
            }
            if pending.parent_columns.is_empty() || pending.parent_columns.len() != pending.child_columns.len() {
                return Err(invalid(format!(
                    "{} parent column(s) against {} child column(s)",
                    pending.parent_columns.len(),
                    pending.child_columns.len()
                )));
            }
            let parent_def = &self.tables[parent];
            let child_def = &self.tables[child];
            let parent_columns = pending
                .parent_columns
                .iter()
                .map(|c| parent_def.require_column(c))
                .collect::<ModelResult<Vec<_>>>()?;
            let child_columns = pending
                .child_columns
                .iter()
                .map(|c| child_def.require_column(c))
                .collect::<ModelResult<Vec<_>>>()?;
            for (&p, &c) in parent_columns.iter().zip(&child_columns) {
                let (pk, ck) = (parent_def.columns()[p].kind, child_def.columns()[c].kind);
                if pk != ck {
                    return Err(invalid(format!(
                        "column '{}' is {} but '{}' is {}",
                        parent_def.columns()[p].name,
                        pk,
                        child_def.columns()[c].name,
                        ck
                    )));
                }
            }
            relations.push(Relation {
                parent,
                parent_columns,
                child,
                child_columns,
            });
        }

        let order = topological_order(&self.tables, &relations)?;
        Ok(Arc::new(Schema {
            tables: self.tables.into_iter().map(Arc::new).collect(),
            relations,
            order,
        }))
    }
}

/// Kahn's algorithm, ties broken by declaration order.
fn topological_order(tables: &[TableDef], relations: &[Relation]) -> ModelResult<Vec<usize>> {
    let mut indegree = vec![0usize; tables.len()];
    for rel in relations {
        indegree[rel.child] += 1;
    }
    let mut ready: VecDeque<usize> = (0..tables.len()).filter(|&t| indegree[t] == 0).collect();
    let mut order = Vec::with_capacity(tables.len());
    while let Some(t) = ready.pop_front() {
        order.push(t);
        let mut released = Vec::new();
        for rel in relations.iter().filter(|r| r.parent == t) {
            indegree[rel.child] -= 1;
            if indegree[rel.child] == 0 {
                released.push(rel.child);
            }
        }
        released.sort_unstable();
        ready.extend(released);
    }
    if order.len() != tables.len() {
        let stuck = (0..tables.len())
            .find(|t| !order.contains(t))
            .map(|t| tables[t].name().to_string())
            .unwrap_or_default();
        return Err(ModelError::RelationCycle(stuck));
    }
    Ok(order)
}

/// Immutable set of table definitions and relations.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    tables: Vec<Arc<TableDef>>,
    relations: Vec<Relation>,
    order: Vec<usize>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn tables(&self) -> &[Arc<TableDef>] {
        &self.tables
    }

    pub fn table(&self, idx: usize) -> &Arc<TableDef> {
        &self.tables[idx]
    }

    pub fn table_index(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name() == name)
    }

    /// Resolve a table name or fail with [`ModelError::UnknownTable`].
    pub fn require_table(&self, name: &str) -> ModelResult<usize> {
        self.table_index(name)
            .ok_or_else(|| ModelError::UnknownTable(name.to_string()))
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Relations in which `table` is the child, with their indices.
    pub fn parent_relations(&self, table: usize) -> impl Iterator<Item = (usize, &Relation)> {
        self.relations
            .iter()
            .enumerate()
            .filter(move |(_, r)| r.child == table)
    }

    /// Relations in which `table` is the parent, with their indices.
    pub fn child_relations(&self, table: usize) -> impl Iterator<Item = (usize, &Relation)> {
        self.relations
            .iter()
            .enumerate()
            .filter(move |(_, r)| r.parent == table)
    }

    /// Tables with no parent relation, in declaration order.
    pub fn roots(&self) -> Vec<usize> {
        (0..self.tables.len())
            .filter(|&t| self.parent_relations(t).next().is_none())
            .collect()
    }

    /// Parent-before-child processing order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Describe the first structural difference from `other`, if any.
    pub fn first_difference(&self, other: &Schema) -> Option<(String, String)> {
        if self.tables.len() != other.tables.len() {
            return Some((
                String::from("*"),
                format!("{} tables against {}", self.tables.len(), other.tables.len()),
            ));
        }
        for (a, b) in self.tables.iter().zip(&other.tables) {
            if a.name() != b.name() {
                return Some((a.name().to_string(), format!("paired with table '{}'", b.name())));
            }
            if a.columns() != b.columns() {
                return Some((a.name().to_string(), "column lists differ".to_string()));
            }
            if a.primary_key() != b.primary_key() {
                return Some((a.name().to_string(), "primary keys differ".to_string()));
            }
            if a.collation() != b.collation() {
                return Some((a.name().to_string(), "key collations differ".to_string()));
            }
        }
        if self.relations != other.relations {
            return Some((String::from("*"), "relations differ".to_string()));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn def(name: &str, cols: &[&str]) -> TableDef {
        TableDef::new(name, cols.iter().map(|c| Column::string(*c)).collect(), &cols[..1]).unwrap()
    }

    #[test]
    fn test_build_orders_parents_first() {
        let schema = Schema::builder()
            .table(def("flows", &["id", "rule_id"]))
            .table(def("rules", &["id"]))
            .relation("rules", &["id"], "flows", &["rule_id"])
            .build()
            .unwrap();
        assert_eq!(schema.order(), &[1, 0]);
        assert_eq!(schema.roots(), vec![1]);
        assert_eq!(schema.child_relations(1).count(), 1);
        assert_eq!(schema.parent_relations(0).count(), 1);
    }

    #[test]
    fn test_cycle_rejected() {
        let err = Schema::builder()
            .table(def("a", &["id", "b_id"]))
            .table(def("b", &["id", "a_id"]))
            .relation("a", &["id"], "b", &["a_id"])
            .relation("b", &["id"], "a", &["b_id"])
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::RelationCycle(_)));
    }

    #[test]
    fn test_relation_validation() {
        let unknown = Schema::builder()
            .table(def("a", &["id"]))
            .relation("a", &["id"], "missing", &["id"])
            .build()
            .unwrap_err();
        assert_eq!(unknown, ModelError::UnknownTable("missing".into()));

        let arity = Schema::builder()
            .table(def("a", &["id", "x"]))
            .table(def("b", &["id", "a_id"]))
            .relation("a", &["id", "x"], "b", &["a_id"])
            .build()
            .unwrap_err();
        assert!(matches!(arity, ModelError::InvalidRelation { .. }));
    }

    #[test]
    fn test_first_difference() {
        let a = Schema::builder().table(def("t", &["id"])).build().unwrap();
        let b = Schema::builder().table(def("t", &["id"])).build().unwrap();
        let c = Schema::builder().table(def("t", &["id", "extra"])).build().unwrap();
        assert_eq!(a.first_difference(&b), None);
        assert_eq!(
            a.first_difference(&c),
            Some(("t".to_string(), "column lists differ".to_string()))
        );
    }
}
