//! Error types for report generation.

use thiserror::Error;

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors that can occur during report generation.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Print plan disagrees with the table it describes.
    #[error("print plan mismatch for table '{table}': {detail}")]
    PlanMismatch { table: String, detail: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Template rendering error.
    #[error("template error: {0}")]
    TemplateError(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ReportError {
    pub(crate) fn plan(table: impl Into<String>, detail: impl Into<String>) -> Self {
        ReportError::PlanMismatch {
            table: table.into(),
            detail: detail.into(),
        }
    }
}

impl From<askama::Error> for ReportError {
    fn from(err: askama::Error) -> Self {
        ReportError::TemplateError(err.to_string())
    }
}

impl From<ReportError> for sd_common::Error {
    fn from(err: ReportError) -> Self {
        use sd_common::Error;
        match err {
            ReportError::PlanMismatch { table, detail } => Error::PrintPlanMismatch { table, detail },
            ReportError::JsonError(e) => Error::Json(e),
            ReportError::TemplateError(msg) => Error::Template(msg),
            ReportError::IoError(e) => Error::Io(e),
            ReportError::InvalidConfig(msg) => Error::Config(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_mismatch_is_defect() {
        let err: sd_common::Error = ReportError::plan("rules", "3 entries for 4 columns").into();
        assert!(err.is_defect());
        assert!(err.to_string().contains("rules"));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let err: sd_common::Error = ReportError::InvalidConfig("bad theme".into()).into();
        assert!(err.is_fatal());
    }
}
