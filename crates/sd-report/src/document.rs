//! The outer HTML document.
//!
//! Sections are rendered one at a time into fragment streams (outline and
//! body). The document is written as head template, outline fragment, body
//! fragment and tail template, so fragments never need to be held in memory
//! unless the output is minified.

use crate::config::ReportConfig;
use crate::error::Result;
use crate::render::RenderedSection;
use askama::Template;
use chrono::{DateTime, Utc};
use sd_diff::DiffSummary;
use serde::Serialize;
use std::io::{self, Read, Write};
use tracing::{debug, info};

/// Who produced the report and from what.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMeta {
    pub pilot: String,
    pub production: String,
    pub generated_at: DateTime<Utc>,
    pub run_id: String,
    pub generator_version: String,
}

impl DocumentMeta {
    pub fn new(pilot: impl Into<String>, production: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            pilot: pilot.into(),
            production: production.into(),
            generated_at: Utc::now(),
            run_id: run_id.into(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Report title when the configuration does not set one.
    pub fn default_title(&self) -> String {
        format!("{} applied to {}", self.pilot, self.production)
    }
}

/// Totals shown at the top of the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub sections: usize,
    pub changed: usize,
    pub collapsible: usize,
    pub failed: usize,
    pub truncated_tables: usize,
    pub rows: DiffSummary,
}

impl ReportSummary {
    /// Count a successfully rendered section.
    pub fn record(&mut self, section: &RenderedSection) {
        self.sections += 1;
        if section.summary.changes() > 0 {
            self.changed += 1;
        }
        if section.collapsible {
            self.collapsible += 1;
        }
        self.truncated_tables += section.truncated_tables;
        self.rows.merge(section.summary);
    }

    /// Count a section replaced by a placeholder.
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Template)]
#[template(path = "report_head.html")]
struct HeadTemplate<'a> {
    title: &'a str,
    theme_class: &'a str,
    meta: &'a DocumentMeta,
    generated: String,
    summary: &'a ReportSummary,
    show_unchanged: bool,
}

#[derive(Template)]
#[template(path = "report_tail.html")]
struct TailTemplate<'a> {
    meta: &'a DocumentMeta,
}

/// Write the complete document to `out`. Returns the number of bytes
/// written.
pub fn write_document<T: Read, B: Read, W: Write>(
    config: &ReportConfig,
    meta: &DocumentMeta,
    summary: &ReportSummary,
    toc: &mut T,
    body: &mut B,
    out: &mut W,
) -> Result<u64> {
    let title = config.title.clone().unwrap_or_else(|| meta.default_title());
    let head = HeadTemplate {
        title: &title,
        theme_class: config.theme.css_class(),
        meta,
        generated: meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        summary,
        show_unchanged: config.show_unchanged,
    }
    .render()?;
    let tail = TailTemplate { meta }.render()?;

    let written = if config.minify {
        let mut html = head;
        toc.read_to_string(&mut html)?;
        html.push_str("</ul></nav><main>");
        body.read_to_string(&mut html)?;
        html.push_str(&tail);
        let output = minify(html);
        out.write_all(output.as_bytes())?;
        output.len() as u64
    } else {
        let mut written = 0u64;
        out.write_all(head.as_bytes())?;
        written += head.len() as u64;
        written += io::copy(toc, out)?;
        out.write_all(b"</ul></nav><main>")?;
        written += 17;
        written += io::copy(body, out)?;
        out.write_all(tail.as_bytes())?;
        written += tail.len() as u64;
        written
    };
    out.flush()?;

    debug!(minified = config.minify, "document written");
    info!(
        bytes = written,
        title = %title,
        sections = summary.sections,
        failed = summary.failed,
        "Report generated"
    );
    Ok(written)
}

fn minify(html: String) -> String {
    let cfg = minify_html::Cfg {
        minify_js: true,
        minify_css: true,
        ..Default::default()
    };
    String::from_utf8(minify_html::minify(html.as_bytes(), &cfg)).unwrap_or(html)
}
