//! syncdoc common types, identifiers and errors.
//!
//! This crate provides foundational types shared across the syncdoc crates:
//! - The unified error taxonomy with stable codes
//! - Identifier types (run ids, connector GUIDs, anchor-safe section ids)
//! - The explicit diagnostic context threaded through section processing

pub mod context;
pub mod error;
pub mod id;

pub use context::{SectionContext, Side};
pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError};
pub use id::{anchor_slug, Guid, RunId, SectionId};
