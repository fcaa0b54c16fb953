//! Pipeline orchestrator
//!
//! Sequences one run: `Received -> TokenIssued -> Transformed ->
//! Submitted -> Terminal`. Any stage failure short-circuits to the
//! terminal state with that failure's kind; the archive step then runs
//! unconditionally. Reading the document acquires an archive obligation
//! that is discharged exactly once on every control-flow exit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use porelay_domain::{ArchiveRecord, RunOutcome};
use tracing::{error, info, warn};

use crate::envelope;
use crate::ports::{ArchiveRouter, SubmissionGateway, TokenIssuer};

/// Result of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    /// Terminal outcome; the process exit code is a pure function of it.
    pub outcome: RunOutcome,
    /// Archive record, or `None` if archiving itself failed (reported via
    /// logs; never masks `outcome`).
    pub archive: Option<ArchiveRecord>,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

/// Orchestrates the per-file processing pipeline over the three ports.
pub struct Pipeline {
    token_issuer: Arc<dyn TokenIssuer>,
    gateway: Arc<dyn SubmissionGateway>,
    archiver: Arc<dyn ArchiveRouter>,
}

impl Pipeline {
    pub fn new(
        token_issuer: Arc<dyn TokenIssuer>,
        gateway: Arc<dyn SubmissionGateway>,
        archiver: Arc<dyn ArchiveRouter>,
    ) -> Self {
        Self { token_issuer, gateway, archiver }
    }

    /// Process one claimed input file whose content has already been read.
    ///
    /// The archive step runs on every terminal path: the caller handing us
    /// `content` means the document entered the pipeline, so exactly one
    /// archive record is owed regardless of which stage fails.
    pub async fn run(&self, source: PathBuf, content: String) -> RunReport {
        info!(path = %source.display(), "processing input file");

        let outcome = self.execute(&source, content).await;

        match &outcome {
            RunOutcome::Success { status, .. } => {
                info!(path = %source.display(), status, "submission succeeded");
            }
            failure => {
                warn!(
                    path = %source.display(),
                    kind = failure.kind(),
                    detail = failure.detail().unwrap_or_default(),
                    "submission failed"
                );
            }
        }

        let archive = match self.archiver.archive(&source, &outcome).await {
            Ok(record) => {
                info!(
                    archived = %record.archived_path.display(),
                    disposition = ?record.disposition,
                    "input file archived"
                );
                Some(record)
            }
            Err(err) => {
                error!(path = %source.display(), error = %err, "failed to archive input file");
                None
            }
        };

        RunReport { outcome, archive }
    }

    /// Run the sequential stages up to the terminal outcome. Archiving is
    /// the caller's responsibility.
    async fn execute(&self, source: &Path, content: String) -> RunOutcome {
        // Token issuance fails before any content inspection or network
        // call, mirroring the remote side's evaluation order.
        let token = match self.token_issuer.issue().await {
            Ok(token) => token,
            Err(err) => return RunOutcome::from_error(&err),
        };

        let document = match envelope::classify_document(source.to_path_buf(), content) {
            Ok(document) => document,
            Err(err) => return RunOutcome::from_error(&err),
        };

        let transformed = match envelope::transform(&document) {
            Ok(transformed) => transformed,
            Err(err) => return RunOutcome::from_error(&err),
        };

        self.gateway.submit(&transformed, &token).await.into()
    }
}
