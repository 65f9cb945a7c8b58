//! Property-based tests for diff classification invariants.

use proptest::prelude::*;
use sd_diff::{diff, ChangeKind, Column, DiffRow, DiffSet, Schema, Snapshot, TableDef, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

type Rules = BTreeMap<u8, (i64, i64)>;
type Flows = BTreeMap<(u8, u8), i64>;

fn schema() -> Arc<Schema> {
    Schema::builder()
        .table(
            TableDef::new(
                "rules",
                vec![
                    Column::int("id"),
                    Column::int("precedence"),
                    Column::int("revision").change_ignored(),
                ],
                &["id"],
            )
            .unwrap(),
        )
        .table(
            TableDef::new(
                "flows",
                vec![Column::int("rule"), Column::int("slot"), Column::int("source")],
                &["rule", "slot"],
            )
            .unwrap(),
        )
        .relation("rules", &["id"], "flows", &["rule"])
        .build()
        .unwrap()
}

fn snapshot(schema: &Arc<Schema>, rules: &Rules, flows: &Flows) -> Snapshot {
    let mut snap = Snapshot::new(schema.clone());
    for (id, (precedence, revision)) in rules {
        snap.add_row(
            "rules",
            vec![Value::Int(i64::from(*id)), Value::Int(*precedence), Value::Int(*revision)],
        )
        .unwrap();
    }
    for ((rule, slot), source) in flows {
        snap.add_row(
            "flows",
            vec![Value::Int(i64::from(*rule)), Value::Int(i64::from(*slot)), Value::Int(*source)],
        )
        .unwrap();
    }
    snap
}

fn rules_strategy() -> impl Strategy<Value = Rules> {
    prop::collection::btree_map(0u8..12, (0i64..3, 0i64..3), 0..10)
}

fn flows_strategy() -> impl Strategy<Value = Flows> {
    prop::collection::btree_map((0u8..12, 0u8..3), 0i64..3, 0..16)
}

fn rows_by_key<'a>(diff: &'a DiffSet, table: &str) -> BTreeMap<String, &'a DiffRow> {
    let t = diff.table(table).unwrap();
    t.rows().iter().map(|r| (t.key_text(r), r)).collect()
}

fn mirrored(kind: ChangeKind) -> ChangeKind {
    match kind {
        ChangeKind::Added => ChangeKind::Deleted,
        ChangeKind::Deleted => ChangeKind::Added,
        other => other,
    }
}

fn kind_of(diff: &DiffSet, table: &str, key: &[Value]) -> Option<ChangeKind> {
    let t = diff.table(table)?;
    let pk = t.def().primary_key().to_vec();
    t.rows()
        .iter()
        .find(|r| pk.iter().zip(key).all(|(&c, v)| &r.values[c] == v))
        .map(|r| r.kind)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Comparing a snapshot with itself reports nothing.
    #[test]
    fn self_diff_is_hideable(rules in rules_strategy(), flows in flows_strategy()) {
        let schema = schema();
        let snap = snapshot(&schema, &rules, &flows);
        let d = diff(&snap, &snap).unwrap();
        prop_assert!(d.can_hide());
        prop_assert_eq!(d.summary().changes(), 0);
        prop_assert_eq!(d.summary().total(), rules.len() + flows.len());
    }

    /// Swapping sides keeps every key, swaps added and deleted, and swaps
    /// old and new values of modified rows.
    #[test]
    fn swapping_sides_mirrors_every_row(
        a_rules in rules_strategy(), a_flows in flows_strategy(),
        b_rules in rules_strategy(), b_flows in flows_strategy(),
    ) {
        let schema = schema();
        let a = snapshot(&schema, &a_rules, &a_flows);
        let b = snapshot(&schema, &b_rules, &b_flows);
        let ab_set = diff(&a, &b).unwrap();
        let ba_set = diff(&b, &a).unwrap();

        for table in ["rules", "flows"] {
            let ab_rows = rows_by_key(&ab_set, table);
            let ba_rows = rows_by_key(&ba_set, table);
            prop_assert_eq!(ab_rows.keys().collect::<Vec<_>>(), ba_rows.keys().collect::<Vec<_>>());
            for (key, ab_row) in &ab_rows {
                let ba_row = ba_rows[key];
                prop_assert_eq!(mirrored(ab_row.kind), ba_row.kind, "{} {}", table, key);
                if ab_row.kind != ChangeKind::Modified {
                    continue;
                }
                prop_assert_eq!(&ab_row.changed, &ba_row.changed);
                for &c in &ab_row.changed {
                    prop_assert_eq!(Some(ab_row.value(c)), ba_row.old_value(c));
                    prop_assert_eq!(ab_row.old_value(c), Some(ba_row.value(c)));
                }
            }
        }

        let ab = ab_set.summary();
        let ba = ba_set.summary();
        prop_assert_eq!(ab.added, ba.deleted);
        prop_assert_eq!(ab.deleted, ba.added);
        prop_assert_eq!(ab.modified, ba.modified);
        prop_assert_eq!(ab.unchanged, ba.unchanged);
    }

    /// Root rows follow key presence; change-ignored columns never modify.
    #[test]
    fn root_rows_follow_key_presence(a_rules in rules_strategy(), b_rules in rules_strategy()) {
        let schema = schema();
        let empty = Flows::new();
        let d = diff(&snapshot(&schema, &a_rules, &empty), &snapshot(&schema, &b_rules, &empty)).unwrap();
        for id in a_rules.keys().chain(b_rules.keys()) {
            let key = [Value::Int(i64::from(*id))];
            let expected = match (a_rules.get(id), b_rules.get(id)) {
                (Some(_), None) => ChangeKind::Added,
                (None, Some(_)) => ChangeKind::Deleted,
                (Some(p), Some(q)) if p.0 == q.0 => ChangeKind::Unchanged,
                (Some(_), Some(_)) => ChangeKind::Modified,
                (None, None) => unreachable!(),
            };
            prop_assert_eq!(kind_of(&d, "rules", &key), Some(expected));
        }
        let union: std::collections::BTreeSet<_> = a_rules.keys().chain(b_rules.keys()).collect();
        prop_assert_eq!(d.summary().total(), union.len());
    }

    /// Children of an added or deleted rule share the rule's classification.
    #[test]
    fn children_inherit_added_and_deleted(
        a_rules in rules_strategy(), a_flows in flows_strategy(),
        b_rules in rules_strategy(), b_flows in flows_strategy(),
    ) {
        let schema = schema();
        let d = diff(&snapshot(&schema, &a_rules, &a_flows), &snapshot(&schema, &b_rules, &b_flows)).unwrap();
        let rules = d.table("rules").unwrap();
        let flows = d.table("flows").unwrap();
        for rule in rules.rows() {
            if !matches!(rule.kind, ChangeKind::Added | ChangeKind::Deleted) {
                continue;
            }
            for &ci in d.child_rows(0, rule) {
                prop_assert_eq!(flows.rows()[ci].kind, rule.kind);
            }
        }
    }
}
