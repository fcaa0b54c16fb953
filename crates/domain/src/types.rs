//! Pipeline data model
//!
//! These types flow strictly forward through one pipeline run:
//! a [`Document`] is read and classified once, a fresh [`Token`] is issued
//! for it, the gateway produces a [`SubmissionOutcome`], the orchestrator
//! collapses that into a terminal [`RunOutcome`], and the archive router
//! records exactly one [`ArchiveRecord`].

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::RelayError;

/// Shape of an input document, computed once when the document is read
/// and carried through the pipeline instead of re-inspected per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentShape {
    /// Business document root only; needs the transport envelope.
    Bare,
    /// Already wrapped in the transport envelope; passed through unchanged.
    Enveloped,
}

/// One input document for the lifetime of a single pipeline run.
///
/// Immutable once constructed; the envelope transformer produces a new
/// `Document` rather than mutating this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path the document was read from (the claimed source file).
    pub source_path: PathBuf,
    /// Raw UTF-8 XML content.
    pub content: String,
    /// Detected envelope shape.
    pub shape: DocumentShape,
}

/// Short-lived signed authentication token.
///
/// Issued fresh for every submission, never cached across files, and
/// discarded once the submission that requested it completes.
#[derive(Debug, Clone)]
pub struct Token {
    /// Compact signed token string, presented as the bearer credential.
    pub value: String,
    pub issuer: String,
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

/// Classified result of one submission, produced by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// HTTP 2xx; `body` is the remote response captured verbatim.
    Success { status: u16, body: String },
    /// HTTP 401/403. Never retried.
    AuthFailure { status: u16, detail: String },
    /// Any other HTTP 4xx/5xx. Never retried.
    ApiFailure { status: u16, detail: String },
    /// Timeout, connection or DNS failure. Retried up to the bounded
    /// attempt count; this is the last failure once retries are exhausted.
    NetworkFailure { detail: String },
}

/// Where an input file was routed after its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    Error,
}

/// Final resting place of one processed input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    /// Path the source file was moved to.
    pub archived_path: PathBuf,
    /// Response body (success) or error detail file written alongside.
    pub detail_path: Option<PathBuf>,
    pub disposition: Disposition,
}

/// Terminal classification of one pipeline run.
///
/// The exit code is a pure function of this value; the caller (an external
/// batch script) branches on the code alone, so lower-level kinds are never
/// masked by a generic one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success { status: u16, body: String },
    ValidationFailure { detail: String },
    AuthFailure { detail: String },
    ApiFailure { detail: String },
    NetworkFailure { detail: String },
}

impl RunOutcome {
    /// Process exit code for this terminal outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Success { .. } => 0,
            RunOutcome::ValidationFailure { .. } => 1,
            RunOutcome::AuthFailure { .. } => 2,
            RunOutcome::ApiFailure { .. } => 3,
            RunOutcome::NetworkFailure { .. } => 4,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }

    /// Stable label used in logs and error-detail files.
    pub fn kind(&self) -> &'static str {
        match self {
            RunOutcome::Success { .. } => "Success",
            RunOutcome::ValidationFailure { .. } => "ValidationFailure",
            RunOutcome::AuthFailure { .. } => "AuthFailure",
            RunOutcome::ApiFailure { .. } => "ApiFailure",
            RunOutcome::NetworkFailure { .. } => "NetworkFailure",
        }
    }

    /// Failure detail, if this is a failure outcome.
    pub fn detail(&self) -> Option<&str> {
        match self {
            RunOutcome::Success { .. } => None,
            RunOutcome::ValidationFailure { detail }
            | RunOutcome::AuthFailure { detail }
            | RunOutcome::ApiFailure { detail }
            | RunOutcome::NetworkFailure { detail } => Some(detail),
        }
    }

    /// Classify a stage failure into its terminal category.
    ///
    /// Key load and signing problems are authentication failures (the
    /// remote side would reject the credential anyway); malformed input
    /// and configuration problems are validation failures.
    pub fn from_error(err: &RelayError) -> Self {
        match err {
            RelayError::Config(_) | RelayError::Validation(_) | RelayError::MalformedInput(_) => {
                RunOutcome::ValidationFailure { detail: err.to_string() }
            }
            RelayError::KeyLoad(_) | RelayError::Signing(_) | RelayError::Auth { .. } => {
                RunOutcome::AuthFailure { detail: err.to_string() }
            }
            RelayError::Api { .. } => RunOutcome::ApiFailure { detail: err.to_string() },
            RelayError::Network(_) => RunOutcome::NetworkFailure { detail: err.to_string() },
            RelayError::Archive(_) => RunOutcome::ValidationFailure { detail: err.to_string() },
        }
    }
}

impl From<SubmissionOutcome> for RunOutcome {
    fn from(outcome: SubmissionOutcome) -> Self {
        match outcome {
            SubmissionOutcome::Success { status, body } => RunOutcome::Success { status, body },
            SubmissionOutcome::AuthFailure { status, detail } => RunOutcome::AuthFailure {
                detail: format!("HTTP {status}: {detail}"),
            },
            SubmissionOutcome::ApiFailure { status, detail } => RunOutcome::ApiFailure {
                detail: format!("HTTP {status}: {detail}"),
            },
            SubmissionOutcome::NetworkFailure { detail } => RunOutcome::NetworkFailure { detail },
        }
    }
}
