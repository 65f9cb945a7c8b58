//! Shredded snapshot interchange.
//!
//! The external shredding step writes one JSON [`SectionFile`] per report
//! section below `<data_root>/<side>/sections/`. A section file carries its
//! own table schema, the rows of every table, and optionally a print plan,
//! hide policies, ordinal derivations, the rule table descriptor and the
//! connector it belongs to. Sections are paired across sides by `id`; a
//! section found on one side only is compared against an empty snapshot of
//! the same schema.

use crate::connector::{ConnectorInfo, ConnectorKind};
use sd_common::{Error, Result, SectionContext, Side};
use sd_diff::{
    Column, ColumnType, KeyCollation, OutOfBoxPolicy, PolicyChain, RuleTableSpec, Schema, Snapshot, TableDef, Value,
};
use sd_report::{HeaderGroup, PrintPlan, PrintPlanEntry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::logging::event_names;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    #[serde(default)]
    pub change_ignored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub collation: KeyCollation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub parent: String,
    pub parent_columns: Vec<String>,
    pub child: String,
    pub child_columns: Vec<String>,
}

/// Tables and relations of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub tables: Vec<TableSpec>,
    #[serde(default)]
    pub relations: Vec<RelationSpec>,
}

impl SchemaSpec {
    pub fn build(&self) -> Result<Arc<Schema>> {
        let mut builder = Schema::builder();
        for table in &self.tables {
            let columns = table
                .columns
                .iter()
                .map(|c| {
                    let column = Column::new(c.name.clone(), c.kind);
                    if c.change_ignored {
                        column.change_ignored()
                    } else {
                        column
                    }
                })
                .collect();
            let key: Vec<&str> = table.primary_key.iter().map(String::as_str).collect();
            let def = TableDef::new(table.name.clone(), columns, &key)?.with_collation(table.collation);
            builder = builder.table(def);
        }
        for rel in &self.relations {
            let parent: Vec<&str> = rel.parent_columns.iter().map(String::as_str).collect();
            let child: Vec<&str> = rel.child_columns.iter().map(String::as_str).collect();
            builder = builder.relation(&rel.parent, &parent, &rel.child, &child);
        }
        Ok(builder.build()?)
    }
}

/// Dense rank derivation, see [`Snapshot::assign_ordinals`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinalSpec {
    pub table: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub group: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanColumnSpec {
    pub column: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub sort: Option<u32>,
    #[serde(default)]
    pub bookmark: Option<String>,
    #[serde(default)]
    pub jump_to: Option<String>,
    #[serde(default)]
    pub path_sort: bool,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanGroupSpec {
    pub label: String,
    /// First spanned column, by name.
    pub first: String,
    pub span: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTableSpec {
    pub table: String,
    #[serde(default)]
    pub title: Option<String>,
    pub columns: Vec<PlanColumnSpec>,
    #[serde(default)]
    pub groups: Vec<PlanGroupSpec>,
}

/// Print plan written with table and column names instead of indices.
///
/// Tables not listed here get the default plan. A listed table
/// must list every column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSpec {
    #[serde(default)]
    pub bookmarks: Vec<String>,
    #[serde(default)]
    pub path_delimiter: Option<char>,
    #[serde(default)]
    pub tables: Vec<PlanTableSpec>,
}

impl PlanSpec {
    /// Translate names into a [`PrintPlan`] for `schema`.
    pub fn resolve(&self, schema: &Schema) -> Result<PrintPlan> {
        let mismatch = |table: &str, detail: String| Error::PrintPlanMismatch {
            table: table.to_string(),
            detail,
        };

        for spec in &self.tables {
            if schema.table_index(&spec.table).is_none() {
                return Err(mismatch(&spec.table, "plan names a table the schema lacks".into()));
            }
        }

        let defaults = PrintPlan::default_for(schema);
        let mut plan = PrintPlan::new();
        if let Some(delimiter) = self.path_delimiter {
            plan = plan.with_delimiter(delimiter);
        }
        for namespace in &self.bookmarks {
            plan = plan.with_bookmark(namespace.clone());
        }
        let namespace = |table: &str, name: &str| {
            self.bookmarks
                .iter()
                .position(|b| b == name)
                .ok_or_else(|| mismatch(table, format!("bookmark '{}' is not declared", name)))
        };

        for (t, def) in schema.tables().iter().enumerate() {
            let Some(spec) = self.tables.iter().find(|s| s.table == def.name()) else {
                for entry in defaults.entries_for(t) {
                    plan = plan.entry(entry.clone());
                }
                continue;
            };
            if let Some(title) = &spec.title {
                plan = plan.with_title(t, title.clone());
            }
            for column in &spec.columns {
                let idx = def
                    .column_index(&column.column)
                    .ok_or_else(|| mismatch(def.name(), format!("unknown column '{}'", column.column)))?;
                let mut entry = PrintPlanEntry::new(t, idx);
                if column.hidden {
                    entry = entry.hidden();
                }
                if let Some(rank) = column.sort {
                    entry = entry.sorted(rank);
                }
                if let Some(name) = &column.bookmark {
                    entry = entry.bookmark(namespace(def.name(), name)?);
                }
                if let Some(name) = &column.jump_to {
                    entry = entry.jump_to(namespace(def.name(), name)?);
                }
                if column.path_sort {
                    entry = entry.path_sort();
                }
                if let Some(label) = &column.label {
                    entry = entry.label(label.clone());
                }
                if def.columns()[idx].change_ignored {
                    entry = entry.change_ignored();
                }
                plan = plan.entry(entry);
            }
            let visible: Vec<&str> = spec
                .columns
                .iter()
                .filter(|c| !c.hidden)
                .map(|c| c.column.as_str())
                .collect();
            for group in &spec.groups {
                let first = visible
                    .iter()
                    .position(|c| *c == group.first)
                    .ok_or_else(|| mismatch(def.name(), format!("group '{}' starts at a hidden or unknown column", group.label)))?;
                plan = plan.with_group(HeaderGroup {
                    table: t,
                    label: group.label.clone(),
                    first,
                    span: group.span,
                });
            }
        }
        Ok(plan)
    }
}

/// Hide policies applied to a section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HidePolicySpec {
    #[serde(default)]
    pub out_of_box: Vec<OutOfBoxPolicy>,
}

impl HidePolicySpec {
    pub fn build(&self) -> PolicyChain {
        self.out_of_box
            .iter()
            .cloned()
            .fold(PolicyChain::new(), |chain, policy| chain.with(policy))
    }
}

/// A cross reference the section depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    pub kind: String,
    pub id: String,
}

/// One section of one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionFile {
    pub id: String,
    pub title: String,
    /// Section kind key used for ordering, e.g. `sync_rules`.
    #[serde(default)]
    pub kind: Option<String>,
    /// `global` or `metaverse` for sections outside any connector.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub connector: Option<ConnectorInfo>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub rule: Option<String>,
    /// Explicit position among sections of the same kind.
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub intro: Option<String>,
    pub schema: SchemaSpec,
    /// Rows per table name, each aligned to the table's columns.
    #[serde(default)]
    pub rows: BTreeMap<String, Vec<Vec<Value>>>,
    #[serde(default)]
    pub ordinals: Vec<OrdinalSpec>,
    #[serde(default)]
    pub plan: Option<PlanSpec>,
    #[serde(default)]
    pub hide_policy: Option<HidePolicySpec>,
    #[serde(default)]
    pub rule_table: Option<RuleTableSpec>,
    #[serde(default)]
    pub references: Vec<ReferenceSpec>,
}

impl SectionFile {
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a section file. Any failure is a malformed-section error named
    /// after the file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| Error::malformed(name.clone(), e))?;
        Self::from_json(&text).map_err(|e| Error::malformed(name, e))
    }

    pub fn connector_kind(&self) -> ConnectorKind {
        match &self.connector {
            Some(connector) => connector.kind(),
            None => ConnectorKind::dispatch(self.category.as_deref().unwrap_or("global"), ""),
        }
    }

    /// Configured title, or the connector kind's title for the section kind.
    pub fn display_title(&self) -> String {
        if !self.title.is_empty() {
            return self.title.clone();
        }
        self.kind
            .as_deref()
            .and_then(|k| self.connector_kind().section_title(k))
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone())
    }

    pub fn context(&self) -> SectionContext {
        let mut ctx = SectionContext::new(self.id.clone());
        if let Some(object_type) = &self.object_type {
            ctx = ctx.with_object_type(object_type.clone());
        }
        if let Some(connector) = &self.connector {
            ctx = ctx.with_connector(connector.name.clone(), connector.guid.clone());
        }
        if let Some(rule) = &self.rule {
            ctx = ctx.with_rule(rule.clone(), None);
        }
        ctx
    }

    /// Populate a snapshot of `schema` from this file's rows.
    ///
    /// Duplicate keys are dropped with a diagnostic; wrong arity or types
    /// fail the section.
    pub fn snapshot(&self, schema: Arc<Schema>) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new(schema);
        for (table, rows) in &self.rows {
            for row in rows {
                snapshot.add_row_lenient(table, row.clone())?;
            }
        }
        for ordinal in &self.ordinals {
            let group: Vec<&str> = ordinal.group.iter().map(String::as_str).collect();
            snapshot.assign_ordinals(&ordinal.table, &ordinal.source, &ordinal.target, &group)?;
        }
        Ok(snapshot)
    }
}

/// Section files of one side plus the files that could not be read.
#[derive(Debug)]
pub struct SideSections {
    pub side: Side,
    pub sections: Vec<SectionFile>,
    pub errors: Vec<Error>,
}

/// Read every `*.json` file of a side's section directory, in file name
/// order.
///
/// A missing directory yields no sections. Unreadable files and duplicate
/// section ids are recorded as errors and skipped.
pub fn load_side(dir: &Path, side: Side) -> Result<SideSections> {
    let mut loaded = SideSections {
        side,
        sections: Vec::new(),
        errors: Vec::new(),
    };
    if !dir.is_dir() {
        warn!(%side, path = %dir.display(), "no sections directory; side is empty");
        return Ok(loaded);
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut seen = HashSet::new();
    for path in paths {
        match SectionFile::from_path(&path) {
            Ok(section) if !seen.insert(section.id.clone()) => {
                let err = Error::malformed(path.display().to_string(), format!("duplicate section id '{}'", section.id));
                warn!(event = event_names::SECTION_FILE_INVALID, %side, error = %err, "section file skipped");
                loaded.errors.push(err);
            }
            Ok(section) => {
                debug!(%side, id = %section.id, "section file read");
                loaded.sections.push(section);
            }
            Err(err) => {
                warn!(event = event_names::SECTION_FILE_INVALID, %side, error = %err, "section file skipped");
                loaded.errors.push(err);
            }
        }
    }
    info!(
        event = event_names::SIDE_LOADED,
        %side,
        sections = loaded.sections.len(),
        skipped = loaded.errors.len(),
        "side loaded"
    );
    Ok(loaded)
}

/// The two sides of one section.
#[derive(Debug, Clone)]
pub struct SectionPair {
    pub id: String,
    pub pilot: Option<SectionFile>,
    pub production: Option<SectionFile>,
}

/// Inputs of one section, ready for the assembler.
pub struct PreparedSection {
    pub pilot: Snapshot,
    pub production: Snapshot,
    pub plan: PrintPlan,
    pub policy: PolicyChain,
}

impl SectionPair {
    /// The pilot file when present, else the production file.
    pub fn primary(&self) -> Option<&SectionFile> {
        self.pilot.as_ref().or(self.production.as_ref())
    }

    /// Key ordering sections: group, connector, section kind, explicit
    /// order, title.
    pub fn sort_key(&self) -> (u8, String, usize, i64, String) {
        match self.primary() {
            Some(file) => {
                let kind = file.connector_kind();
                (
                    kind.group_rank(),
                    file.connector.as_ref().map(|c| c.name.to_lowercase()).unwrap_or_default(),
                    file.kind.as_deref().map_or(usize::MAX, |k| kind.section_rank(k)),
                    file.order.unwrap_or(0),
                    file.display_title().to_lowercase(),
                )
            }
            None => (u8::MAX, String::new(), usize::MAX, 0, self.id.clone()),
        }
    }

    /// Schemas for both sides. Identical schema declarations share one
    /// schema; differing ones are built separately and left to the diff
    /// engine to compare.
    pub fn schemas(&self) -> Result<(Arc<Schema>, Arc<Schema>)> {
        match (&self.pilot, &self.production) {
            (Some(p), Some(q)) if p.schema != q.schema => Ok((p.schema.build()?, q.schema.build()?)),
            (Some(file), _) | (None, Some(file)) => {
                let schema = file.schema.build()?;
                Ok((schema.clone(), schema))
            }
            (None, None) => Err(Error::malformed(self.id.clone(), "section present on neither side")),
        }
    }

    /// Build both snapshots, the print plan and the hide policy.
    pub fn prepare(&self) -> Result<PreparedSection> {
        let (pilot_schema, production_schema) = self.schemas()?;
        let pilot = match &self.pilot {
            Some(file) => file.snapshot(pilot_schema.clone())?,
            None => Snapshot::new(pilot_schema.clone()),
        };
        let production = match &self.production {
            Some(file) => file.snapshot(production_schema)?,
            None => Snapshot::new(production_schema),
        };
        let primary = self.primary();
        let plan = match primary.and_then(|f| f.plan.as_ref()) {
            Some(spec) => spec.resolve(&pilot_schema)?,
            None => PrintPlan::default_for(&pilot_schema),
        };
        let policy = primary
            .and_then(|f| f.hide_policy.as_ref())
            .map(HidePolicySpec::build)
            .unwrap_or_default();
        Ok(PreparedSection {
            pilot,
            production,
            plan,
            policy,
        })
    }
}

/// Pair sections by id: pilot order first, then production-only sections in
/// production order.
pub fn pair_sections(pilot: Vec<SectionFile>, production: Vec<SectionFile>) -> Vec<SectionPair> {
    let mut production: Vec<Option<SectionFile>> = production.into_iter().map(Some).collect();
    let mut pairs = Vec::with_capacity(pilot.len() + production.len());
    for file in pilot {
        let other = production
            .iter_mut()
            .find(|slot| slot.as_ref().map_or(false, |p| p.id == file.id))
            .and_then(Option::take);
        if other.is_none() {
            info!(event = event_names::SECTION_ONE_SIDED, id = %file.id, side = %Side::Pilot, "section only in pilot");
        }
        pairs.push(SectionPair {
            id: file.id.clone(),
            pilot: Some(file),
            production: other,
        });
    }
    for file in production.into_iter().flatten() {
        info!(event = event_names::SECTION_ONE_SIDED, id = %file.id, side = %Side::Production, "section only in production");
        pairs.push(SectionPair {
            id: file.id.clone(),
            pilot: None,
            production: Some(file),
        });
    }
    pairs
}

/// Stable sort of sections into document order.
pub fn order_sections(pairs: &mut [SectionPair]) {
    pairs.sort_by_key(|p| p.sort_key());
}
