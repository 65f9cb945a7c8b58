//! syncdoc CLI entry point.

use clap::{Parser, ValueEnum};
use sd_common::{format_error_human, Error, StructuredError};
use sd_core::config::DEFAULT_DATA_ROOT;
use sd_core::exit_codes::ExitCode;
use sd_core::logging::{init_logging, LogConfig, LogFormat};
use sd_core::{run, RunConfig, RunOutcome};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Compare two configuration exports and write an HTML change report
#[derive(Parser, Debug)]
#[command(name = "syncdoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pilot export directory name, below the data root
    pilot: Option<String>,

    /// Production export directory name, below the data root
    production: Option<String>,

    /// Directory holding both exports and the Report folder
    #[arg(long, env = "SYNCDOC_DATA_ROOT", default_value = DEFAULT_DATA_ROOT)]
    data_root: PathBuf,

    /// Report path (default: <data-root>/Report/<pilot>_AppliedTo_<production>_SyncDoc.html)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Report configuration file (JSON)
    #[arg(long, env = "SYNCDOC_CONFIG")]
    config: Option<PathBuf>,

    /// Also write the changed rules as JSON to this path
    #[arg(long)]
    rule_changes: Option<PathBuf>,

    /// Panic on schema and print plan defects (default in debug builds)
    #[arg(long, overrides_with = "no_strict")]
    strict: bool,

    /// Replace defective sections with placeholders instead of panicking
    #[arg(long)]
    no_strict: bool,

    /// Minify the report
    #[arg(long, overrides_with = "no_minify")]
    minify: bool,

    /// Write the report unminified
    #[arg(long)]
    no_minify: bool,

    /// Run summary format on stdout
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Log format on stderr
    #[arg(long, env = "SYNCDOC_LOG_FORMAT", value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

impl Cli {
    fn log_level(&self) -> Option<LevelFilter> {
        if self.quiet {
            return Some(LevelFilter::ERROR);
        }
        match self.verbose {
            0 => None,
            1 => Some(LevelFilter::DEBUG),
            _ => Some(LevelFilter::TRACE),
        }
    }

    fn run_config(&self) -> Result<RunConfig, Error> {
        let (Some(pilot), Some(production)) = (&self.pilot, &self.production) else {
            return Err(Error::Usage(
                "both the pilot and the production export names are required".to_string(),
            ));
        };
        let mut config = RunConfig::new(&self.data_root, pilot, production);
        if let Some(path) = &self.output {
            config = config.with_output(path);
        }
        if let Some(path) = &self.config {
            config = config.with_report_config(path);
        }
        if let Some(path) = &self.rule_changes {
            config = config.with_rule_changes(path);
        }
        if self.strict {
            config = config.with_strict(true);
        } else if self.no_strict {
            config = config.with_strict(false);
        }
        if self.minify {
            config = config.with_minify(true);
        } else if self.no_minify {
            config = config.with_minify(false);
        }
        Ok(config)
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(ExitCode::ArgsError.as_i32());
        }
        Err(err) => err.exit(),
    };

    init_logging(&LogConfig::from_env(cli.log_level(), cli.log_format));

    let code = match cli.run_config().and_then(|config| run(&config)) {
        Ok(outcome) => {
            print_outcome(&outcome, cli.format);
            outcome.exit_code()
        }
        Err(err) => {
            eprintln!("{}", format_error_human(&err));
            if cli.format == OutputFormat::Json {
                println!("{}", StructuredError::from(&err).to_json());
            }
            ExitCode::from_error(&err)
        }
    };
    std::process::exit(code.as_i32());
}

fn print_outcome(outcome: &RunOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(outcome) {
            Ok(json) => println!("{}", json),
            Err(err) => eprintln!("failed to serialize run summary: {}", err),
        },
        OutputFormat::Human => {
            let s = &outcome.summary;
            println!("Report: {} ({} bytes)", outcome.output.display(), outcome.bytes);
            println!(
                "Sections: {} rendered, {} changed, {} collapsible, {} failed",
                s.sections, s.changed, s.collapsible, s.failed
            );
            println!(
                "Rows: {} added, {} deleted, {} modified, {} unchanged",
                s.rows.added, s.rows.deleted, s.rows.modified, s.rows.unchanged
            );
            for err in &outcome.errors {
                println!("  [{}] {}", err.code, err.message);
            }
            if !outcome.dangling_links.is_empty() {
                println!("Dangling links: {}", outcome.dangling_links.join(", "));
            }
            println!("Status: {}", outcome.exit_code().code_name());
        }
    }
}
