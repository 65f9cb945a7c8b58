//! Run configuration: where inputs live, where the report goes.

use sd_common::{Error, Result, Side};
use sd_report::ReportConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::logging::event_names;

/// Default data root when neither the flag nor the environment sets one.
pub const DEFAULT_DATA_ROOT: &str = "Data";

/// Directory below each side holding the section files.
pub const SECTIONS_DIR: &str = "sections";

/// Resolved settings for one report run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_root: PathBuf,
    pub pilot: String,
    pub production: String,
    /// Explicit output path; defaults below the data root.
    pub output: Option<PathBuf>,
    /// Report configuration file (JSON).
    pub report_config: Option<PathBuf>,
    /// Where to write the rule change list, if anywhere.
    pub rule_changes: Option<PathBuf>,
    /// Panic on schema and print plan defects instead of degrading.
    pub strict: bool,
    /// Overrides the configuration file's minify setting.
    pub minify: Option<bool>,
}

impl RunConfig {
    pub fn new(data_root: impl Into<PathBuf>, pilot: impl Into<String>, production: impl Into<String>) -> Self {
        Self {
            data_root: data_root.into(),
            pilot: pilot.into(),
            production: production.into(),
            output: None,
            report_config: None,
            rule_changes: None,
            strict: cfg!(debug_assertions),
            minify: None,
        }
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_report_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_config = Some(path.into());
        self
    }

    pub fn with_rule_changes(mut self, path: impl Into<PathBuf>) -> Self {
        self.rule_changes = Some(path.into());
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = Some(minify);
        self
    }

    /// Input directory of one side.
    pub fn side_dir(&self, side: Side) -> PathBuf {
        match side {
            Side::Pilot => self.data_root.join(&self.pilot),
            Side::Production => self.data_root.join(&self.production),
        }
    }

    /// Directory holding one side's section files.
    pub fn sections_dir(&self, side: Side) -> PathBuf {
        self.side_dir(side).join(SECTIONS_DIR)
    }

    /// `<data_root>/Report/<pilot>_AppliedTo_<production>_SyncDoc.html` unless
    /// an output path was given.
    pub fn output_path(&self) -> PathBuf {
        if let Some(path) = &self.output {
            return path.clone();
        }
        let name = format!(
            "{}_AppliedTo_{}_SyncDoc.html",
            display_name(&self.pilot),
            display_name(&self.production)
        );
        self.data_root.join("Report").join(name)
    }

    /// Fail fast when either side is missing.
    pub fn preflight(&self) -> Result<()> {
        for side in [Side::Pilot, Side::Production] {
            let dir = self.side_dir(side);
            if !dir.is_dir() {
                return Err(Error::MissingInput { side, path: dir });
            }
            debug!(%side, path = %dir.display(), "input directory present");
        }
        Ok(())
    }

    /// Report configuration from the configured file, or defaults.
    pub fn load_report_config(&self) -> Result<ReportConfig> {
        let mut config = match &self.report_config {
            Some(path) => {
                let config = ReportConfig::load(path)?;
                info!(event = event_names::CONFIG_LOADED, path = %path.display(), "report configuration loaded");
                config
            }
            None => {
                debug!(event = event_names::CONFIG_DEFAULT_USED, "using default report configuration");
                ReportConfig::default()
            }
        };
        if let Some(minify) = self.minify {
            config.minify = minify;
        }
        Ok(config)
    }
}

/// Last path component of a side argument, for file names and titles.
pub fn display_name(side: &str) -> String {
    Path::new(side)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| side.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        let config = RunConfig::new("Data", "Pilot", "Prod");
        assert_eq!(
            config.output_path(),
            PathBuf::from("Data/Report/Pilot_AppliedTo_Prod_SyncDoc.html")
        );
        let config = config.with_output("/tmp/out.html");
        assert_eq!(config.output_path(), PathBuf::from("/tmp/out.html"));
    }

    #[test]
    fn test_display_name_uses_last_component() {
        assert_eq!(display_name("exports/Pilot"), "Pilot");
        assert_eq!(display_name("Prod"), "Prod");
    }

    #[test]
    fn test_preflight_reports_missing_side() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Pilot")).unwrap();
        let config = RunConfig::new(dir.path(), "Pilot", "Prod");
        match config.preflight() {
            Err(Error::MissingInput { side, path }) => {
                assert_eq!(side, Side::Production);
                assert!(path.ends_with("Prod"));
            }
            other => panic!("expected missing input, got {:?}", other),
        }
        std::fs::create_dir(dir.path().join("Prod")).unwrap();
        config.preflight().unwrap();
    }

    #[test]
    fn test_bad_report_config_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, "{ not json").unwrap();
        let config = RunConfig::new(dir.path(), "a", "b").with_report_config(&path);
        let err = config.load_report_config().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_minify_override() {
        let config = RunConfig::new("Data", "a", "b").with_minify(false);
        assert!(!config.load_report_config().unwrap().minify);
    }
}
