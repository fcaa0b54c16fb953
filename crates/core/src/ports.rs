//! Pipeline port interfaces
//!
//! One trait per external collaborator; implementations live in
//! `porelay-infra`. The orchestrator only sees these.

use std::path::Path;

use async_trait::async_trait;
use porelay_domain::{ArchiveRecord, Document, Result, RunOutcome, SubmissionOutcome, Token};

/// Produces a signed, time-bounded authentication token.
///
/// A fresh token is requested for every pipeline run; implementations must
/// not cache tokens across calls.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issue a new token.
    ///
    /// # Errors
    /// `RelayError::KeyLoad` if the private key is missing, unreadable or
    /// not a valid asymmetric key; `RelayError::Signing` if the signing
    /// operation itself fails.
    async fn issue(&self) -> Result<Token>;
}

/// Sends a document plus token to the remote endpoint and classifies the
/// response.
///
/// Classification is total: transport-level failures surface as
/// `SubmissionOutcome::NetworkFailure` after the implementation's bounded
/// retry policy is exhausted, never as an `Err`.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, document: &Document, token: &Token) -> SubmissionOutcome;
}

/// Routes a consumed input file to the success or error archive and
/// persists the response (or error detail) alongside it.
#[async_trait]
pub trait ArchiveRouter: Send + Sync {
    /// Archive `source` according to `outcome`.
    ///
    /// # Errors
    /// `RelayError::Archive` if the destination is unwritable or the move
    /// cannot complete. The failure is reported by the caller but never
    /// re-triggers processing of the same file.
    async fn archive(&self, source: &Path, outcome: &RunOutcome) -> Result<ArchiveRecord>;
}
