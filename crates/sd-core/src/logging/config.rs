//! Logging configuration.
//!
//! The level comes from `-v`/`-q`, then `SYNCDOC_LOG`, then the default.
//! `RUST_LOG` directives are applied by the subscriber filter itself.

use clap::ValueEnum;
use tracing_subscriber::filter::LevelFilter;

/// Log output format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    #[value(alias = "json")]
    Jsonl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LevelFilter::INFO,
        }
    }
}

impl LogConfig {
    pub fn from_env(cli_level: Option<LevelFilter>, format: LogFormat) -> Self {
        Self::from_lookup(|name| std::env::var(name).ok(), cli_level, format)
    }

    /// Same as [`LogConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F, cli_level: Option<LevelFilter>, format: LogFormat) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = cli_level
            .or_else(|| lookup("SYNCDOC_LOG").and_then(|val| val.trim().parse().ok()))
            .unwrap_or(LevelFilter::INFO);
        LogConfig { format, level }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_values() {
        assert_eq!(LogFormat::from_str("jsonl", true).unwrap(), LogFormat::Jsonl);
        assert_eq!(LogFormat::from_str("json", true).unwrap(), LogFormat::Jsonl);
        assert!(LogFormat::from_str("xml", true).is_err());
    }

    #[test]
    fn test_level_from_env() {
        let config = LogConfig::from_lookup(|_| Some("warn".into()), None, LogFormat::Human);
        assert_eq!(config.level, LevelFilter::WARN);

        // Unparseable values fall back to the default.
        let config = LogConfig::from_lookup(|_| Some("loud".into()), None, LogFormat::Human);
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_cli_level_wins() {
        let config = LogConfig::from_lookup(|_| Some("error".into()), Some(LevelFilter::DEBUG), LogFormat::Jsonl);
        assert_eq!(config.level, LevelFilter::DEBUG);
        assert_eq!(config.format, LogFormat::Jsonl);
    }
}
