//! # PO-Relay Infrastructure
//!
//! Adapters behind the core's port traits:
//! - [`token::RsaTokenIssuer`] - RS256 token issuance over a local RSA key
//! - [`gateway::HttpSubmissionGateway`] - HTTPS submission with bounded
//!   timeout and retry
//! - [`archive::FsArchiveRouter`] - claim-by-rename and archive routing on
//!   the local filesystem
//! - [`config`] - configuration loading and validation

pub mod archive;
pub mod config;
pub mod gateway;
pub mod token;

pub use archive::{claim_input, FsArchiveRouter};
pub use gateway::HttpSubmissionGateway;
pub use token::RsaTokenIssuer;
