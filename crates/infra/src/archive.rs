//! Filesystem archive routing
//!
//! Input files are claimed by renaming them to `<name>.processing` before
//! any work starts; a rename is atomic on the same filesystem, so two
//! concurrent runs can never claim (and therefore never submit or
//! archive) the same source path. After the run, the claimed file is
//! moved into the success or error archive under a timestamped name, with
//! the remote response or a structured error detail persisted alongside.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::Utc;
use porelay_core::ArchiveRouter;
use porelay_domain::constants::{
    ARCHIVE_TIMESTAMP_FORMAT, CLAIM_EXTENSION, ERROR_DETAIL_SUFFIX,
};
use porelay_domain::{
    ArchiveRecord, DirectoryLayout, Disposition, RelayError, Result, RunOutcome,
};
use tracing::{debug, info, warn};

/// Claim an input file for exclusive processing by renaming it to
/// `<name>.processing`.
///
/// # Errors
/// `RelayError::Validation` if the rename fails - typically because
/// another run already claimed the path or the file vanished. The caller
/// skips such files; no document entered the pipeline, so no archive
/// record is owed.
pub fn claim_input(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RelayError::Validation(format!("not a file path: {}", path.display())))?;

    let claimed = path.with_file_name(format!("{file_name}.{CLAIM_EXTENSION}"));
    std::fs::rename(path, &claimed).map_err(|err| {
        RelayError::Validation(format!("cannot claim {}: {err}", path.display()))
    })?;

    debug!(path = %path.display(), claimed = %claimed.display(), "claimed input file");
    Ok(claimed)
}

/// Archive router over the local filesystem.
pub struct FsArchiveRouter {
    success_dir: PathBuf,
    error_dir: PathBuf,
    output_dir: PathBuf,
}

impl FsArchiveRouter {
    pub fn new(layout: &DirectoryLayout) -> Self {
        Self {
            success_dir: layout.archive_success.clone(),
            error_dir: layout.archive_error.clone(),
            output_dir: layout.output.clone(),
        }
    }

    /// Move `source` into `dir` under `stem_YYYYMMDD_HHMMSS.ext`, with the
    /// claim extension stripped so the archived name reflects the original
    /// file.
    fn move_into(&self, source: &Path, dir: &Path) -> Result<PathBuf> {
        let original = original_file_name(source)?;
        let (stem, extension) = match original.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (original.as_str(), None),
        };

        let timestamp = Utc::now().format(ARCHIVE_TIMESTAMP_FORMAT);
        let archived_name = match extension {
            Some(ext) => format!("{stem}_{timestamp}.{ext}"),
            None => format!("{stem}_{timestamp}"),
        };
        let destination = dir.join(archived_name);

        rename_or_copy(source, &destination).map_err(|err| {
            RelayError::Archive(format!(
                "cannot move {} to {}: {err}",
                source.display(),
                destination.display()
            ))
        })?;

        Ok(destination)
    }

    /// Persist the remote response into the output directory, named after
    /// the purchase-order number when one can be extracted.
    fn write_response(&self, source_xml: &str, body: &str) -> Result<PathBuf> {
        let name = match extract_po_number(source_xml) {
            Some(po_number) => format!("response_{po_number}.xml"),
            None => format!("response_{}.xml", Utc::now().format(ARCHIVE_TIMESTAMP_FORMAT)),
        };
        let path = self.output_dir.join(name);

        std::fs::write(&path, body).map_err(|err| {
            RelayError::Archive(format!("cannot write response {}: {err}", path.display()))
        })?;

        info!(path = %path.display(), "saved remote response");
        Ok(path)
    }

    /// Write the structured error detail next to the archived file.
    fn write_error_detail(&self, archived: &Path, outcome: &RunOutcome) -> Result<PathBuf> {
        let mut name = archived
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("archived")
            .to_string();
        name.push_str(ERROR_DETAIL_SUFFIX);
        let path = archived.with_file_name(name);

        let detail = format!(
            "Outcome: {}\nTimestamp: {}\nArchived file: {}\n\n{}\n",
            outcome.kind(),
            Utc::now().to_rfc3339(),
            archived.display(),
            outcome.detail().unwrap_or_default(),
        );

        std::fs::write(&path, detail).map_err(|err| {
            RelayError::Archive(format!("cannot write error detail {}: {err}", path.display()))
        })?;

        Ok(path)
    }

    /// Delete archived files older than `days` from both archive
    /// directories. Returns the number of files deleted and the bytes
    /// freed; with `dry_run` nothing is deleted, only counted.
    pub fn cleanup_old_archives(&self, days: u32, dry_run: bool) -> Result<(u64, u64)> {
        let cutoff = SystemTime::now() - Duration::from_secs(u64::from(days) * 86_400);
        let mut files_deleted = 0u64;
        let mut bytes_freed = 0u64;

        for dir in [&self.success_dir, &self.error_dir] {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "cannot read archive directory");
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                let Ok(metadata) = entry.metadata() else { continue };
                if !metadata.is_file() {
                    continue;
                }
                let Ok(modified) = metadata.modified() else { continue };
                if modified >= cutoff {
                    continue;
                }

                if dry_run {
                    info!(path = %path.display(), "would delete expired archive file");
                    files_deleted += 1;
                    bytes_freed += metadata.len();
                } else {
                    match std::fs::remove_file(&path) {
                        Ok(()) => {
                            info!(path = %path.display(), "deleted expired archive file");
                            files_deleted += 1;
                            bytes_freed += metadata.len();
                        }
                        Err(err) => {
                            warn!(path = %path.display(), error = %err, "failed to delete");
                        }
                    }
                }
            }
        }

        Ok((files_deleted, bytes_freed))
    }
}

#[async_trait]
impl ArchiveRouter for FsArchiveRouter {
    async fn archive(&self, source: &Path, outcome: &RunOutcome) -> Result<ArchiveRecord> {
        // The source is read before the move so the response file can be
        // named after the purchase-order number it carries.
        let source_xml = std::fs::read_to_string(source).unwrap_or_default();

        match outcome {
            RunOutcome::Success { body, .. } => {
                let archived_path = self.move_into(source, &self.success_dir)?;
                let detail_path = self.write_response(&source_xml, body)?;
                Ok(ArchiveRecord {
                    archived_path,
                    detail_path: Some(detail_path),
                    disposition: Disposition::Success,
                })
            }
            failure => {
                let archived_path = self.move_into(source, &self.error_dir)?;
                let detail_path = self.write_error_detail(&archived_path, failure)?;
                Ok(ArchiveRecord {
                    archived_path,
                    detail_path: Some(detail_path),
                    disposition: Disposition::Error,
                })
            }
        }
    }
}

/// File name with the claim extension stripped.
fn original_file_name(source: &Path) -> Result<String> {
    let name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RelayError::Archive(format!("not a file path: {}", source.display())))?;

    Ok(name
        .strip_suffix(&format!(".{CLAIM_EXTENSION}"))
        .unwrap_or(name)
        .to_string())
}

/// Rename, falling back to copy-and-delete when the archive directory is
/// on a different filesystem.
fn rename_or_copy(source: &Path, destination: &Path) -> std::io::Result<()> {
    match std::fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if std::fs::copy(source, destination).is_ok() {
                std::fs::remove_file(source)
            } else {
                Err(rename_err)
            }
        }
    }
}

/// Extract the purchase-order number for response-file naming. Returns
/// `None` when the document carries none; naming falls back to a
/// timestamp.
pub fn extract_po_number(xml: &str) -> Option<String> {
    let marker = "DistiPONumber";

    let mut search_from = 0usize;
    while let Some(rel) = xml[search_from..].find(marker) {
        let start = search_from + rel;
        // Must be the tail of an opening tag: "<DistiPONumber>" or
        // "<prefix:DistiPONumber>".
        let tag_end = start + marker.len();
        let opens_tag = xml[..start].rfind('<').is_some_and(|lt| {
            let between = &xml[lt + 1..start];
            between.is_empty() || (between.ends_with(':') && !between.contains('>'))
        });
        if opens_tag && xml[tag_end..].starts_with('>') {
            let value_start = tag_end + 1;
            let value_end = xml[value_start..].find('<')? + value_start;
            let value = xml[value_start..value_end].trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
        search_from = tag_end;
    }
    None
}
