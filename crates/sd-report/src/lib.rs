//! HTML report rendering for configuration diffs.
//!
//! Turns a classified [`sd_diff::DiffSet`] into nested HTML tables and
//! assembles sections into one self-contained document.
//!
//! # Features
//!
//! - **Print plans**: per-column visibility, sort rank, bookmarks and jumps
//! - **Nested tables**: parent cells merged over their children with `rowspan`
//! - **Path ordering**: distinguished-name style paths sorted root-first
//! - **Collapsible sections**: unchanged content folds away, rows can be hidden
//! - **Outline**: every heading written also yields a table-of-contents entry
//!
//! # Example
//!
//! ```no_run
//! use sd_report::{PrintPlan, ReportConfig, SectionHeader, TableRenderer};
//! # fn demo(diff: &sd_diff::DiffSet) -> sd_report::Result<()> {
//! let visibility = sd_diff::resolve(diff, &sd_diff::NoOverride);
//! let plan = PrintPlan::default_for(diff.schema());
//! let mut renderer = TableRenderer::new(&ReportConfig::default());
//! let section = renderer.render(diff, &visibility, &plan, &SectionHeader::new("rules", "Sync Rules"))?;
//! println!("{}", section.html);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod html;
pub mod pathsort;
pub mod plan;
pub mod render;

pub use config::{ReportConfig, ReportLimits, ReportTheme};
pub use document::{write_document, DocumentMeta, ReportSummary};
pub use error::{ReportError, Result};
pub use html::{bookmark_id, html_escape};
pub use pathsort::{compare_paths, sort_paths, split_path, MAX_PATH_SEGMENTS};
pub use plan::{HeaderGroup, PrintPlan, PrintPlanEntry};
pub use render::{toc_html, RenderedSection, SectionHeader, TableRenderer, TocEntry};
