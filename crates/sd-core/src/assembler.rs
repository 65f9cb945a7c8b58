//! Document assembly.
//!
//! Sections are diffed, rendered and appended one at a time to two anonymous
//! fragment files, one for the outline and one for the body, so memory stays
//! bounded by the largest single section. `finish` stitches the fragments
//! into the final document and moves it into place atomically.

use crate::logging::{event_names, Stage};
use sd_common::{Error, Result, SectionContext, StructuredError};
use sd_diff::{diff, resolve, DiffSet, HidePolicy, Snapshot};
use sd_report::{
    toc_html, write_document, DocumentMeta, PrintPlan, RenderedSection, ReportConfig, ReportSummary, SectionHeader,
    TableRenderer,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

/// What `finish` produced.
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyOutcome {
    pub output: PathBuf,
    pub bytes: u64,
    pub summary: ReportSummary,
    pub errors: Vec<StructuredError>,
    /// Jump targets no section defined.
    pub dangling_links: Vec<String>,
}

pub struct Assembler {
    config: ReportConfig,
    strict: bool,
    renderer: TableRenderer,
    summary: ReportSummary,
    toc: File,
    body: File,
    /// `(target id, anchor of the section linking to it)`
    jumps: Vec<(String, String)>,
    errors: Vec<StructuredError>,
}

impl Assembler {
    /// With `strict` set, schema and print plan defects panic instead of
    /// degrading to a placeholder.
    pub fn new(config: ReportConfig, strict: bool) -> Result<Self> {
        Ok(Self {
            renderer: TableRenderer::new(&config),
            config,
            strict,
            summary: ReportSummary::default(),
            toc: tempfile::tempfile()?,
            body: tempfile::tempfile()?,
            jumps: Vec::new(),
            errors: Vec::new(),
        })
    }

    pub fn summary(&self) -> &ReportSummary {
        &self.summary
    }

    pub fn errors(&self) -> &[StructuredError] {
        &self.errors
    }

    fn append(&mut self, section: &RenderedSection) -> Result<()> {
        self.toc.write_all(toc_html(&section.toc).as_bytes())?;
        self.body.write_all(section.html.as_bytes())?;
        for id in &section.jumps {
            self.jumps.push((id.clone(), section.anchor.clone()));
        }
        Ok(())
    }

    /// Add a grouping heading (connector, global settings) with optional
    /// introductory text.
    pub fn add_group(&mut self, header: &SectionHeader, intro: Option<&str>) -> Result<()> {
        let heading = self.renderer.heading(header, intro);
        self.append(&heading)
    }

    /// Add a free-standing notice paragraph to the body.
    pub fn add_notice(&mut self, message: &str) -> Result<()> {
        let html = format!(r#"<p class="notice">{}</p>"#, sd_report::html_escape(message));
        self.body.write_all(html.as_bytes())?;
        Ok(())
    }

    /// Diff, classify and render one section.
    ///
    /// Returns the diff on success so callers can derive exports from it.
    /// A failing section is replaced by a placeholder and `None` is
    /// returned; only fragment I/O errors propagate.
    pub fn add_section(
        &mut self,
        ctx: &SectionContext,
        header: &SectionHeader,
        pilot: &Snapshot,
        production: &Snapshot,
        plan: &PrintPlan,
        policy: &dyn HidePolicy,
    ) -> Result<Option<DiffSet>> {
        let span = ctx.span();
        let _guard = span.enter();
        debug!(event = event_names::SECTION_STARTED, stage = %Stage::Diff, "section started");

        let rendered = diff(pilot, production).map_err(Error::from).and_then(|d| {
            let visibility = resolve(&d, policy);
            let section = self.renderer.render(&d, &visibility, plan, header)?;
            Ok((d, section))
        });

        match rendered {
            Ok((d, section)) => {
                for diagnostic in d.diagnostics() {
                    warn!(%diagnostic, "section diagnostic");
                }
                info!(
                    event = event_names::SECTION_RENDERED,
                    stage = %Stage::Render,
                    added = section.summary.added,
                    deleted = section.summary.deleted,
                    modified = section.summary.modified,
                    unchanged = section.summary.unchanged,
                    collapsible = section.collapsible,
                    forced = section.forced,
                    "section rendered"
                );
                self.summary.record(&section);
                self.append(&section)?;
                Ok(Some(d))
            }
            Err(err) => {
                self.fail_section(ctx, header, &err)?;
                Ok(None)
            }
        }
    }

    /// Replace a section with a placeholder and record why.
    ///
    /// # Panics
    ///
    /// In strict mode, when `err` is a schema or print plan defect.
    pub fn fail_section(&mut self, ctx: &SectionContext, header: &SectionHeader, err: &Error) -> Result<()> {
        if self.strict && err.is_defect() {
            panic!("section {}: {}", ctx, err);
        }
        error!(
            event = event_names::SECTION_FAILED,
            section = %ctx,
            code = err.code(),
            error = %err,
            "section replaced by placeholder"
        );
        self.errors.push(
            StructuredError::from(err)
                .with_context("section", &ctx.section_id)
                .with_context("anchor", &header.anchor),
        );
        let message = format!("{}: {}", err.headline(), err);
        let placeholder = self.renderer.placeholder(header, &message);
        self.summary.record_failure();
        self.append(&placeholder)
    }

    /// Record a non-section error (skipped input file, unresolved
    /// reference) for the run summary.
    pub fn record_error(&mut self, err: &Error) {
        self.errors.push(StructuredError::from(err));
    }

    /// Write the document to `output` and return the outcome.
    ///
    /// The document is written to a temporary file next to `output` and
    /// renamed over it, so a failed run never leaves a truncated report.
    pub fn finish(mut self, meta: &DocumentMeta, output: &Path) -> Result<AssemblyOutcome> {
        let mut dangling = Vec::new();
        for (id, from) in &self.jumps {
            if !self.renderer.is_defined(id) && !dangling.contains(id) {
                warn!(event = event_names::LINK_DANGLING, target = %id, from = %from, "link target not defined");
                dangling.push(id.clone());
            }
        }

        self.toc.seek(SeekFrom::Start(0))?;
        self.body.seek(SeekFrom::Start(0))?;

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        let bytes = {
            let mut out = BufWriter::new(tmp.as_file_mut());
            let bytes = write_document(&self.config, meta, &self.summary, &mut self.toc, &mut self.body, &mut out)?;
            out.flush()?;
            bytes
        };
        tmp.persist(output).map_err(|e| Error::Io(e.error))?;
        info!(
            event = event_names::DOCUMENT_WRITTEN,
            stage = %Stage::Write,
            path = %output.display(),
            bytes,
            "report written"
        );

        Ok(AssemblyOutcome {
            output: output.to_path_buf(),
            bytes,
            summary: self.summary,
            errors: self.errors,
            dangling_links: dangling,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_diff::{Column, NoOverride, Schema, TableDef};
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Schema::builder()
            .table(TableDef::new("items", vec![Column::string("key"), Column::int("val")], &["key"]).unwrap())
            .build()
            .unwrap()
    }

    fn assembler(strict: bool) -> Assembler {
        Assembler::new(ReportConfig::default().with_minify(false), strict).unwrap()
    }

    #[test]
    fn test_section_and_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut asm = assembler(false);
        let mut pilot = Snapshot::new(schema());
        pilot.add_row("items", vec!["a".into(), 1.into()]).unwrap();
        let prod = Snapshot::new(schema());

        let ctx = SectionContext::new("items");
        let header = SectionHeader::new("items", "Items");
        let d = asm
            .add_section(&ctx, &header, &pilot, &prod, &PrintPlan::default_for(&schema()), &NoOverride)
            .unwrap();
        assert_eq!(d.unwrap().summary().added, 1);

        // A plan describing no columns is a defect.
        let bad = SectionHeader::new("broken", "Broken");
        let d = asm
            .add_section(&SectionContext::new("broken"), &bad, &pilot, &prod, &PrintPlan::new(), &NoOverride)
            .unwrap();
        assert!(d.is_none());
        assert_eq!(asm.summary().failed, 1);
        assert_eq!(asm.errors().len(), 1);
        assert!(asm.errors()[0].defect);

        let output = dir.path().join("out").join("report.html");
        let outcome = asm.finish(&DocumentMeta::new("P", "Q", "run"), &output).unwrap();
        let html = std::fs::read_to_string(&output).unwrap();
        assert_eq!(outcome.bytes as usize, html.len());
        assert_eq!(outcome.summary.sections, 1);
        assert!(html.contains(r#"id="items""#));
        assert!(html.contains(r#"id="broken""#));
        assert!(html.contains("report-section failed"));
    }

    #[test]
    #[should_panic(expected = "print plan mismatch")]
    fn test_strict_mode_panics_on_defect() {
        let mut asm = assembler(true);
        let snap = Snapshot::new(schema());
        let _ = asm.add_section(
            &SectionContext::new("broken"),
            &SectionHeader::new("broken", "Broken"),
            &snap,
            &snap,
            &PrintPlan::new(),
            &NoOverride,
        );
    }

    #[test]
    fn test_notice_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let mut asm = assembler(false);
        asm.add_notice("connector <x> not found").unwrap();
        let output = dir.path().join("r.html");
        asm.finish(&DocumentMeta::new("P", "Q", "run"), &output).unwrap();
        let html = std::fs::read_to_string(&output).unwrap();
        assert!(html.contains(r#"<p class="notice">connector &lt;x&gt; not found</p>"#));
    }
}
