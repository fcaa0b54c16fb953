//! # PO-Relay Core
//!
//! Pure pipeline logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The envelope transformer (shape detection + SOAP wrapping)
//! - The pipeline orchestrator and its terminal-outcome mapping
//! - Port interfaces (traits) for the token issuer, submission gateway
//!   and archive router
//!
//! ## Architecture Principles
//! - Only depends on `porelay-domain`
//! - No filesystem, HTTP, or crypto code
//! - All external collaborators via traits

pub mod envelope;
pub mod pipeline;
pub mod ports;

pub use pipeline::{Pipeline, RunReport};
pub use ports::{ArchiveRouter, SubmissionGateway, TokenIssuer};
