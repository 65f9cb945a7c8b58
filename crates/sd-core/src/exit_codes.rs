//! Exit codes for the syncdoc CLI.
//!
//! Exit code ranges:
//! - 0-1: Report produced (clean or degraded)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use sd_common::Error;

/// Exit codes for syncdoc runs.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Report written, every section rendered.
    Clean = 0,

    /// Report written, but some sections were replaced by placeholders or
    /// input files were skipped.
    Degraded = 1,

    /// Invalid or missing arguments.
    ArgsError = 10,

    /// Pilot or production input directory missing.
    InputError = 11,

    /// Report configuration unreadable or invalid.
    ConfigError = 12,

    /// Internal error (bug - please report).
    InternalError = 20,

    /// I/O error writing the report.
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// A report file was produced.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::Degraded)
    }

    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Map a run-aborting error to its exit code.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::Usage(_) => ExitCode::ArgsError,
            Error::MissingInput { .. } => ExitCode::InputError,
            Error::Config(_) => ExitCode::ConfigError,
            Error::Io(_) | Error::Json(_) => ExitCode::IoError,
            _ => ExitCode::InternalError,
        }
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::Degraded => "OK_DEGRADED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
