//! Stable event names and pipeline stages.
//!
//! Event names are part of the JSONL log contract: tooling filters on the
//! `event` field, so names only ever get added.

use serde::{Deserialize, Serialize};

/// Processing stages of a report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Argument and configuration resolution, input pre-flight.
    Init,
    /// Reading section files from both sides.
    Load,
    /// Building snapshots and classifying rows.
    Diff,
    /// Rendering one section.
    Render,
    /// Writing the final document and exports.
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Diff => "diff",
            Stage::Render => "render",
            Stage::Write => "write",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const REPORT_STARTED: &str = "report.started";
    pub const REPORT_FINISHED: &str = "report.finished";

    // Input
    pub const SIDE_LOADED: &str = "side.loaded";
    pub const SECTION_FILE_INVALID: &str = "section_file.invalid";
    pub const SECTION_ONE_SIDED: &str = "section.one_sided";

    // Sections
    pub const SECTION_STARTED: &str = "section.started";
    pub const SECTION_RENDERED: &str = "section.rendered";
    pub const SECTION_FAILED: &str = "section.failed";
    pub const REFERENCE_UNRESOLVED: &str = "reference.unresolved";
    pub const LINK_DANGLING: &str = "link.dangling";

    // Output
    pub const DOCUMENT_WRITTEN: &str = "document.written";
    pub const RULE_CHANGES_WRITTEN: &str = "rule_changes.written";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
}
