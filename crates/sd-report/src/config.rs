//! Report configuration types.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Report color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportTheme {
    /// Light theme.
    Light,
    /// Dark theme.
    Dark,
    /// Auto-detect from system preference.
    #[default]
    Auto,
}

impl ReportTheme {
    /// Get the CSS class for this theme.
    pub fn css_class(&self) -> &'static str {
        match self {
            ReportTheme::Light => "light",
            ReportTheme::Dark => "dark",
            ReportTheme::Auto => "",
        }
    }
}

/// Resource limits for report generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportLimits {
    /// Maximum rendered lines per nested table before truncation.
    #[serde(default = "default_max_rows_per_table")]
    pub max_rows_per_table: usize,
}

fn default_max_rows_per_table() -> usize {
    5000
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            max_rows_per_table: default_max_rows_per_table(),
        }
    }
}

/// Complete report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Schema version.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Custom report title.
    pub title: Option<String>,
    /// Color theme.
    #[serde(default)]
    pub theme: ReportTheme,
    /// Render collapsible sections closed.
    #[serde(default = "default_true")]
    pub start_collapsed: bool,
    /// Initial state of the "show unchanged rows" toggle.
    #[serde(default = "default_true")]
    pub show_unchanged: bool,
    /// Minify the final document.
    #[serde(default = "default_minify")]
    pub minify: bool,
    /// Resource limits.
    #[serde(default)]
    pub limits: ReportLimits,
}

fn default_schema_version() -> String {
    "1.0.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_minify() -> bool {
    !cfg!(debug_assertions)
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            title: None,
            theme: ReportTheme::default(),
            start_collapsed: true,
            show_unchanged: true,
            minify: default_minify(),
            limits: ReportLimits::default(),
        }
    }
}

impl ReportConfig {
    /// Create a new report configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the report title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the theme.
    pub fn with_theme(mut self, theme: ReportTheme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_start_collapsed(mut self, collapsed: bool) -> Self {
        self.start_collapsed = collapsed;
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Set the per-table row limit.
    pub fn with_max_rows_per_table(mut self, rows: usize) -> Self {
        self.limits.max_rows_per_table = rows;
        self
    }

    /// Load configuration from JSON.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load and validate configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ReportError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&text)
            .map_err(|e| ReportError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limits.max_rows_per_table == 0 {
            return Err(ReportError::InvalidConfig(
                "limits.max_rows_per_table must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
