//! # PO-Relay Domain
//!
//! Foundation layer shared by every crate in the workspace:
//! - Error taxonomy ([`RelayError`], [`Result`])
//! - Pipeline data model ([`Document`], [`Token`], [`SubmissionOutcome`],
//!   [`ArchiveRecord`], [`RunOutcome`])
//! - Configuration types ([`RelayConfig`] and friends)
//! - Wire-level and default-value constants
//!
//! No infrastructure dependencies live here.

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

pub use config::{
    ApiEndpoints, DirectoryLayout, Endpoint, Environment, HttpSettings, RelayConfig,
    RetentionSettings, TokenConfig,
};
pub use errors::{RelayError, Result};
pub use types::{
    ArchiveRecord, Disposition, Document, DocumentShape, RunOutcome, SubmissionOutcome, Token,
};
