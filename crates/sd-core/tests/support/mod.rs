//! Shared fixtures: a data root with `Pilot` and `Prod` exports.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CONNECTOR_GUID: &str = "{5E2F0C4A-1B2C-4D3E-8F90-112233445566}";

pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// Empty `Pilot` and `Prod` exports.
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        for side in ["Pilot", "Prod"] {
            std::fs::create_dir_all(dir.path().join(side).join("sections")).expect("sections dir");
        }
        Self { dir }
    }

    /// Global settings (identical) and one AD sync rule section (changed).
    pub fn standard() -> Self {
        let fixture = Self::empty();
        fixture.write("Pilot", "00-global.json", &settings_section("7"));
        fixture.write("Prod", "00-global.json", &settings_section("7"));
        fixture.write(
            "Pilot",
            "10-rules.json",
            &rules_section(
                &[("Join", 100), ("Provision", 50)],
                &[("Join", "mail", "email"), ("Provision", "cn", "name")],
            ),
        );
        fixture.write(
            "Prod",
            "10-rules.json",
            &rules_section(&[("Join", 100)], &[("Join", "mail", "userPrincipalName")]),
        );
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, side: &str, file: &str, section: &Value) {
        let path = self.dir.path().join(side).join("sections").join(file);
        std::fs::write(path, serde_json::to_string_pretty(section).expect("json")).expect("write section");
    }

    pub fn write_raw(&self, side: &str, file: &str, text: &str) {
        let path = self.dir.path().join(side).join("sections").join(file);
        std::fs::write(path, text).expect("write section");
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.path().join("Report").join("Pilot_AppliedTo_Prod_SyncDoc.html")
    }

    pub fn report(&self) -> String {
        std::fs::read_to_string(self.report_path()).expect("report written")
    }
}

pub fn settings_section(retention: &str) -> Value {
    json!({
        "id": "global-settings",
        "title": "",
        "kind": "settings",
        "category": "global",
        "schema": {
            "tables": [{
                "name": "settings",
                "columns": [
                    {"name": "name", "type": "string"},
                    {"name": "value", "type": "string"}
                ],
                "primary_key": ["name"]
            }]
        },
        "rows": {"settings": [["retention_days", retention], ["purge", "enabled"]]}
    })
}

pub fn rules_section(rules: &[(&str, i64)], flows: &[(&str, &str, &str)]) -> Value {
    let rule_rows: Vec<Value> = rules.iter().map(|(name, p)| json!([name, p, null])).collect();
    let flow_rows: Vec<Value> = flows.iter().map(|(r, t, s)| json!([r, t, s])).collect();
    json!({
        "id": "contoso-sync-rules",
        "title": "Synchronization Rules",
        "kind": "sync_rules",
        "connector": {"guid": CONNECTOR_GUID, "name": "contoso.com", "category": "AD"},
        "schema": {
            "tables": [
                {
                    "name": "rules",
                    "columns": [
                        {"name": "name", "type": "string"},
                        {"name": "precedence", "type": "int", "change_ignored": true},
                        {"name": "rank", "type": "int"}
                    ],
                    "primary_key": ["name"]
                },
                {
                    "name": "flows",
                    "columns": [
                        {"name": "rule", "type": "string"},
                        {"name": "target", "type": "string"},
                        {"name": "source", "type": "string"}
                    ],
                    "primary_key": ["rule", "target"]
                }
            ],
            "relations": [
                {"parent": "rules", "parent_columns": ["name"], "child": "flows", "child_columns": ["rule"]}
            ]
        },
        "rows": {"rules": rule_rows, "flows": flow_rows},
        "ordinals": [{"table": "rules", "source": "precedence", "target": "rank"}],
        "plan": {
            "bookmarks": ["rule"],
            "tables": [{
                "table": "rules",
                "columns": [
                    {"column": "name", "sort": 0, "bookmark": "rule"},
                    {"column": "precedence", "hidden": true},
                    {"column": "rank", "label": "Order"}
                ]
            }]
        },
        "rule_table": {"table": "rules", "name_column": "name"}
    })
}

/// A section whose print plan names a column its schema lacks.
pub fn broken_plan_section() -> Value {
    let mut section = settings_section("7");
    section["id"] = json!("broken");
    section["title"] = json!("Broken Section");
    section["plan"] = json!({
        "tables": [{"table": "settings", "columns": [{"column": "nonexistent"}]}]
    });
    section
}

/// A metaverse section that depends on a connector neither side exports.
pub fn dangling_reference_section() -> Value {
    let mut section = settings_section("7");
    section["id"] = json!("metaverse-precedence");
    section["title"] = json!("Attribute Precedence");
    section["category"] = json!("metaverse");
    section["kind"] = json!("precedence");
    section["references"] = json!([{"kind": "connector", "id": "{00000000-0000-0000-0000-0000000000AA}"}]);
    section
}
