//! Error types for syncdoc.
//!
//! Errors carry:
//! - Stable error codes for machine parsing
//! - Category classification for grouping
//! - A fatal/recoverable split: pre-flight errors abort the run, everything
//!   else is confined to the section being processed
//! - A defect flag for programming errors (schema or print plan mismatches)
//! - Remediation hints for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Missing Input Directory
//!   Reason: pilot input directory not found: Data/Pilot
//!   Fix: Check the positional arguments and --data-root.
//! ```

use crate::context::Side;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for syncdoc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Command line usage errors.
    Usage,
    /// Missing or unreadable input snapshots.
    Input,
    /// Report or run configuration errors.
    Config,
    /// Schema and print plan defects (caller bugs).
    Schema,
    /// Data integrity problems inside one section.
    Data,
    /// HTML rendering errors.
    Render,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Usage => write!(f, "usage"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Schema => write!(f, "schema"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Render => write!(f, "render"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for syncdoc.
#[derive(Error, Debug)]
pub enum Error {
    // Usage and pre-flight errors (10-19)
    #[error("usage error: {0}")]
    Usage(String),

    #[error("{side} input directory not found: {}", path.display())]
    MissingInput { side: Side, path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),

    // Schema and print plan defects (20-29)
    #[error("schema mismatch in table '{table}': {detail}")]
    SchemaMismatch { table: String, detail: String },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("print plan mismatch for table '{table}': {detail}")]
    PrintPlanMismatch { table: String, detail: String },

    // Data integrity errors (30-39)
    #[error("duplicate primary key {key} in table '{table}'")]
    DuplicateKey { table: String, key: String },

    #[error("row rejected by table '{table}': {detail}")]
    InvalidRow { table: String, detail: String },

    #[error("unresolved {kind} reference: {id}")]
    UnresolvedReference { kind: String, id: String },

    #[error("malformed section '{section}': {detail}")]
    MalformedSection { section: String, detail: String },

    // Render errors (40-49)
    #[error("render error: {0}")]
    Render(String),

    #[error("template error: {0}")]
    Template(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// - 10-19: Usage and pre-flight errors
    /// - 20-29: Schema and print plan defects
    /// - 30-39: Data integrity errors
    /// - 40-49: Render errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Usage(_) => 10,
            Error::MissingInput { .. } => 11,
            Error::Config(_) => 12,
            Error::SchemaMismatch { .. } => 20,
            Error::InvalidSchema(_) => 21,
            Error::PrintPlanMismatch { .. } => 22,
            Error::DuplicateKey { .. } => 30,
            Error::InvalidRow { .. } => 31,
            Error::UnresolvedReference { .. } => 32,
            Error::MalformedSection { .. } => 33,
            Error::Render(_) => 40,
            Error::Template(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Usage(_) => ErrorCategory::Usage,
            Error::MissingInput { .. } => ErrorCategory::Input,
            Error::Config(_) => ErrorCategory::Config,

            Error::SchemaMismatch { .. }
            | Error::InvalidSchema(_)
            | Error::PrintPlanMismatch { .. } => ErrorCategory::Schema,

            Error::DuplicateKey { .. }
            | Error::InvalidRow { .. }
            | Error::UnresolvedReference { .. }
            | Error::MalformedSection { .. } => ErrorCategory::Data,

            Error::Render(_) | Error::Template(_) => ErrorCategory::Render,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Pre-flight errors abort the whole run before any section is processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Usage(_) | Error::MissingInput { .. } | Error::Config(_)
        )
    }

    /// Section-local errors: the section is skipped or degraded and the
    /// report continues.
    pub fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }

    /// Programming errors in the caller (schema or print plan disagreement).
    pub fn is_defect(&self) -> bool {
        self.category() == ErrorCategory::Schema
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Usage(_) => "Usage Error",
            Error::MissingInput { .. } => "Missing Input Directory",
            Error::Config(_) => "Configuration Error",
            Error::SchemaMismatch { .. } => "Schema Mismatch",
            Error::InvalidSchema(_) => "Invalid Schema",
            Error::PrintPlanMismatch { .. } => "Print Plan Mismatch",
            Error::DuplicateKey { .. } => "Duplicate Primary Key",
            Error::InvalidRow { .. } => "Invalid Row",
            Error::UnresolvedReference { .. } => "Unresolved Reference",
            Error::MalformedSection { .. } => "Malformed Section",
            Error::Render(_) => "Render Error",
            Error::Template(_) => "Template Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Usage(_) => "Run 'syncdoc --help' for the expected arguments.",
            Error::MissingInput { .. } => {
                "Check the positional arguments and --data-root; both sides must exist beneath the data root."
            }
            Error::Config(_) => "Check the report configuration file for syntax errors.",
            Error::SchemaMismatch { .. } | Error::InvalidSchema(_) => {
                "Both snapshots must be shredded with the same schema. Re-run the shredding step for both sides."
            }
            Error::PrintPlanMismatch { .. } => {
                "The print plan does not match the section's tables. Regenerate the section files."
            }
            Error::DuplicateKey { .. } | Error::InvalidRow { .. } => {
                "The offending row was dropped. Inspect the exported configuration for duplicates."
            }
            Error::UnresolvedReference { .. } => {
                "The referenced object is missing from both snapshots. Export the complete configuration."
            }
            Error::MalformedSection { .. } => {
                "The section file could not be interpreted. Re-run the shredding step for this section."
            }
            Error::Render(_) | Error::Template(_) => "Report this as a bug with the section files attached.",
            Error::Io(_) => "Check disk space and permissions for the data root and report directory.",
            Error::Json(_) => "Invalid JSON in an input file. Check its syntax.",
        }
    }

    /// Wrap any displayable error as a malformed-section error.
    pub fn malformed(section: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Error::MalformedSection {
            section: section.into(),
            detail: detail.to_string(),
        }
    }
}

/// Structured error record for JSON output (run summaries, rule exports).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether processing continued past this error.
    pub recoverable: bool,

    /// Whether the error indicates a caller defect.
    pub defect: bool,

    /// Additional structured context (section, connector, rule).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::MissingInput { side, path } => {
                context.insert("side".to_string(), serde_json::json!(side));
                context.insert("path".to_string(), serde_json::json!(path));
            }
            Error::SchemaMismatch { table, .. }
            | Error::PrintPlanMismatch { table, .. }
            | Error::InvalidRow { table, .. } => {
                context.insert("table".to_string(), serde_json::json!(table));
            }
            Error::DuplicateKey { table, key } => {
                context.insert("table".to_string(), serde_json::json!(table));
                context.insert("key".to_string(), serde_json::json!(key));
            }
            Error::UnresolvedReference { kind, id } => {
                context.insert("kind".to_string(), serde_json::json!(kind));
                context.insert("id".to_string(), serde_json::json!(id));
            }
            Error::MalformedSection { section, .. } => {
                context.insert("section".to_string(), serde_json::json!(section));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            defect: err.is_defect(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human consumption on stderr.
pub fn format_error_human(err: &Error) -> String {
    format!(
        "✗ {}\n  Reason: {}\n  Fix: {}",
        err.headline(),
        err,
        err.remediation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_grouped_by_category() {
        assert_eq!(Error::Usage("x".into()).code(), 10);
        assert_eq!(
            Error::SchemaMismatch {
                table: "t".into(),
                detail: "d".into()
            }
            .code(),
            20
        );
        assert_eq!(
            Error::DuplicateKey {
                table: "t".into(),
                key: "k".into()
            }
            .code(),
            30
        );
        assert_eq!(Error::Render("r".into()).code(), 40);
    }

    #[test]
    fn test_preflight_errors_are_fatal() {
        let err = Error::MissingInput {
            side: Side::Pilot,
            path: PathBuf::from("Data/Pilot"),
        };
        assert!(err.is_fatal());
        assert!(!err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.to_string().contains("pilot"));
    }

    #[test]
    fn test_schema_errors_are_defects_but_section_local() {
        let err = Error::PrintPlanMismatch {
            table: "rules".into(),
            detail: "3 entries for 4 columns".into(),
        };
        assert!(err.is_defect());
        assert!(err.is_recoverable());

        let data = Error::DuplicateKey {
            table: "rules".into(),
            key: "(a)".into(),
        };
        assert!(!data.is_defect());
        assert!(data.is_recoverable());
    }

    #[test]
    fn test_structured_error_context() {
        let err = Error::UnresolvedReference {
            kind: "connector".into(),
            id: "8f1c".into(),
        };
        let structured = StructuredError::from(&err).with_context("rule", "In from AD");
        assert_eq!(structured.code, 32);
        assert_eq!(structured.context["id"], serde_json::json!("8f1c"));
        assert_eq!(structured.context["rule"], serde_json::json!("In from AD"));
        assert!(structured.to_json().contains("\"category\":\"data\""));
    }

    #[test]
    fn test_format_error_human() {
        let text = format_error_human(&Error::Config("bad theme".into()));
        assert!(text.starts_with("✗ Configuration Error"));
        assert!(text.contains("Reason: configuration error: bad theme"));
    }
}
