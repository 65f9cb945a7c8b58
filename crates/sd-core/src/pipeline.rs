//! One report run from input directories to the written document.

use crate::assembler::Assembler;
use crate::config::{display_name, RunConfig};
use crate::connector::{ConnectorKind, ConnectorRegistry};
use crate::exit_codes::ExitCode;
use crate::interchange::{load_side, order_sections, pair_sections, SectionFile};
use crate::logging::{event_names, Stage};
use sd_common::{Error, Result, RunId, SectionId, Side, StructuredError};
use sd_diff::{classify_rules, RuleChange};
use sd_report::{DocumentMeta, ReportSummary, SectionHeader};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

/// Rule changes of one section, as written to the rule change export.
#[derive(Debug, Clone, Serialize)]
pub struct SectionRuleChanges {
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector: Option<String>,
    pub changes: Vec<RuleChange>,
}

/// Result of a completed run, printed as the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub output: PathBuf,
    pub bytes: u64,
    pub summary: ReportSummary,
    pub errors: Vec<StructuredError>,
    pub dangling_links: Vec<String>,
    #[serde(skip)]
    pub rule_changes: Vec<SectionRuleChanges>,
    pub elapsed_ms: u64,
}

impl RunOutcome {
    pub fn exit_code(&self) -> ExitCode {
        if self.summary.failed > 0 || !self.errors.is_empty() {
            ExitCode::Degraded
        } else {
            ExitCode::Clean
        }
    }
}

/// Heading a run of consecutive sections is grouped under.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Group {
    header: SectionHeader,
    intro: Option<String>,
}

fn group_of(file: &SectionFile) -> Group {
    if let Some(connector) = &file.connector {
        return Group {
            header: SectionHeader::new(format!("connector-{}", connector.name), connector.name.clone()).with_level(2),
            intro: Some(format!("{} connector {}", connector.kind().label(), connector.canonical_guid())),
        };
    }
    let (anchor, title) = match file.connector_kind() {
        ConnectorKind::Global => ("global", "Global Settings"),
        ConnectorKind::Metaverse => ("metaverse", "Metaverse"),
        _ => ("other", "Other Sections"),
    };
    Group {
        header: SectionHeader::new(anchor, title).with_level(2),
        intro: None,
    }
}

/// Produce the report described by `config`.
///
/// Missing inputs, an unreadable configuration and I/O failures abort the
/// run. Everything else degrades: the failing section becomes a placeholder
/// and the error is listed in the outcome.
pub fn run(config: &RunConfig) -> Result<RunOutcome> {
    let started = Instant::now();
    let run_id = RunId::new();
    let span = info_span!("report", run_id = %run_id);
    let _guard = span.enter();
    info!(
        event = event_names::REPORT_STARTED,
        stage = %Stage::Init,
        pilot = %config.pilot,
        production = %config.production,
        data_root = %config.data_root.display(),
        strict = config.strict,
        "report started"
    );

    config.preflight()?;
    let report_config = config.load_report_config()?;
    let pilot = load_side(&config.sections_dir(Side::Pilot), Side::Pilot)?;
    let production = load_side(&config.sections_dir(Side::Production), Side::Production)?;

    let mut registry = ConnectorRegistry::new();
    for file in pilot.sections.iter().chain(production.sections.iter()) {
        if let Some(connector) = &file.connector {
            registry.register(connector);
        }
    }
    for connector in registry.iter() {
        debug!(connector = %connector.name, kind = connector.kind().label(), "connector registered");
    }

    let mut assembler = Assembler::new(report_config, config.strict)?;
    for err in pilot.errors.iter().chain(production.errors.iter()) {
        assembler.record_error(err);
    }

    let mut pairs = pair_sections(pilot.sections, production.sections);
    order_sections(&mut pairs);

    let mut current: Option<Group> = None;
    let mut rule_changes = Vec::new();
    for pair in &pairs {
        let Some(primary) = pair.primary() else { continue };

        let group = group_of(primary);
        if current.as_ref() != Some(&group) {
            assembler.add_group(&group.header, group.intro.as_deref())?;
            current = Some(group);
        }

        for reference in &primary.references {
            if reference.kind != "connector" || registry.resolve(&reference.id).is_some() {
                continue;
            }
            let err = Error::UnresolvedReference {
                kind: reference.kind.clone(),
                id: reference.id.clone(),
            };
            warn!(event = event_names::REFERENCE_UNRESOLVED, section = %pair.id, id = %reference.id, "reference not resolved");
            assembler.add_notice(&format!("{}: referenced connector {} is not part of either side", primary.display_title(), reference.id))?;
            assembler.record_error(&err);
        }

        let ctx = primary.context();
        let header = SectionHeader::new(SectionId::new(&pair.id).as_str(), primary.display_title()).with_level(3);
        let prepared = match pair.prepare() {
            Ok(prepared) => prepared,
            Err(err) => {
                assembler.fail_section(&ctx, &header, &err)?;
                continue;
            }
        };
        let diff = assembler.add_section(
            &ctx,
            &header,
            &prepared.pilot,
            &prepared.production,
            &prepared.plan,
            &prepared.policy,
        )?;

        if let (Some(diff), Some(spec)) = (diff, &primary.rule_table) {
            match classify_rules(&diff, spec) {
                Ok(changes) if changes.is_empty() => {}
                Ok(changes) => rule_changes.push(SectionRuleChanges {
                    section: pair.id.clone(),
                    connector: primary.connector.as_ref().map(|c| c.name.clone()),
                    changes,
                }),
                Err(err) => {
                    let err = Error::from(err);
                    warn!(section = %pair.id, error = %err, "rule changes not classified");
                    assembler.record_error(&err);
                }
            }
        }
    }

    if let Some(path) = &config.rule_changes {
        write_rule_changes(path, &rule_changes)?;
    }

    let meta = DocumentMeta::new(
        display_name(&config.pilot),
        display_name(&config.production),
        run_id.to_string(),
    );
    let outcome = assembler.finish(&meta, &config.output_path())?;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        event = event_names::REPORT_FINISHED,
        sections = outcome.summary.sections,
        failed = outcome.summary.failed,
        errors = outcome.errors.len(),
        elapsed_ms,
        "report finished"
    );

    Ok(RunOutcome {
        run_id: run_id.to_string(),
        output: outcome.output,
        bytes: outcome.bytes,
        summary: outcome.summary,
        errors: outcome.errors,
        dangling_links: outcome.dangling_links,
        rule_changes,
        elapsed_ms,
    })
}

fn write_rule_changes(path: &Path, changes: &[SectionRuleChanges]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(changes)?;
    std::fs::write(path, json)?;
    info!(
        event = event_names::RULE_CHANGES_WRITTEN,
        path = %path.display(),
        sections = changes.len(),
        "rule changes written"
    );
    Ok(())
}
