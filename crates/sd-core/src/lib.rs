//! syncdoc core library
//!
//! This library drives a report run:
//! - Exit codes for CLI operations
//! - Run configuration and logging setup
//! - Loading and pairing shredded section files
//! - Connector dispatch and section ordering
//! - Streaming document assembly
//!
//! The binary entry point is in `main.rs`.

pub mod assembler;
pub mod config;
pub mod connector;
pub mod exit_codes;
pub mod interchange;
pub mod logging;
pub mod pipeline;

pub use assembler::{Assembler, AssemblyOutcome};
pub use config::RunConfig;
pub use connector::{ConnectorInfo, ConnectorKind, ConnectorRegistry};
pub use exit_codes::ExitCode;
pub use interchange::{load_side, order_sections, pair_sections, SectionFile, SectionPair};
pub use pipeline::{run, RunOutcome, SectionRuleChanges};
