//! # PO-Relay CLI
//!
//! Operator-facing binary. `process` submits purchase-order documents
//! (one file, or the input directory under `--watch`), `validate` checks
//! the configuration without touching any file, and `cleanup` applies the
//! archive retention policy.
//!
//! The process exit code of `process --input` is the terminal outcome of
//! that file's run: 0 success, 1 validation, 2 authentication, 3 API
//! rejection, 4 network failure. Watch mode exits 0 on interrupt;
//! per-file failures are logged and archived but do not stop the loop.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use porelay_core::{ArchiveRouter, Pipeline, TokenIssuer};
use porelay_domain::{RelayConfig, RunOutcome};
use porelay_infra::config as config_loader;
use porelay_infra::{claim_input, FsArchiveRouter, HttpSubmissionGateway, RsaTokenIssuer};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "porelay", about = "Unattended purchase-order submission relay", version)]
pub struct Cli {
    /// Path to the configuration file (standard locations are probed
    /// when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Submit purchase-order documents to the partner endpoint
    Process {
        /// Single input file to process
        #[arg(long, conflicts_with = "watch")]
        input: Option<PathBuf>,

        /// Poll the configured input directory until interrupted
        #[arg(long)]
        watch: bool,

        /// Seconds between input directory scans in watch mode
        #[arg(long, default_value_t = 5)]
        poll_interval: u64,
    },
    /// Load and check the configuration, then exit
    Validate,
    /// Delete archived files past the retention window
    Cleanup {
        /// Retention in days (defaults to the configured value)
        #[arg(long)]
        older_than: Option<u32>,

        /// Report what would be deleted without deleting anything
        #[arg(long)]
        dry_run: bool,
    },
}

/// Initialize tracing, honoring `RUST_LOG` over the configured level.
pub fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .try_init()
        .ok();
}

/// Execute the parsed command and return the process exit code.
pub async fn run(cli: Cli) -> i32 {
    let config = match config_loader::load(cli.config.clone()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return 1;
        }
    };
    init_tracing(config.log_level());

    match cli.command {
        Command::Validate => validate_config(&config).await,
        Command::Process { input, watch, poll_interval } => {
            if let Err(err) = config_loader::ensure_directories(&config) {
                error!(error = %err, "cannot create working directories");
                return 1;
            }
            let (pipeline, archiver) = build_pipeline(&config);

            match (input, watch) {
                (Some(path), _) => process_single(&pipeline, &archiver, &path).await,
                (None, true) => {
                    let interval = Duration::from_secs(poll_interval.max(1));
                    watch_loop(&pipeline, &archiver, &config.paths.input, interval).await
                }
                (None, false) => {
                    eprintln!("process requires --input <FILE> or --watch");
                    1
                }
            }
        }
        Command::Cleanup { older_than, dry_run } => cleanup(&config, older_than, dry_run),
    }
}

fn build_pipeline(config: &RelayConfig) -> (Pipeline, Arc<FsArchiveRouter>) {
    let archiver = Arc::new(FsArchiveRouter::new(&config.paths));
    let pipeline = Pipeline::new(
        Arc::new(RsaTokenIssuer::from_config(&config.token)),
        Arc::new(HttpSubmissionGateway::from_config(config)),
        archiver.clone(),
    );
    (pipeline, archiver)
}

/// Check the configuration end to end, including a probe token issuance
/// so a bad key surfaces here instead of on the first real file.
async fn validate_config(config: &RelayConfig) -> i32 {
    if let Err(err) = config_loader::check_private_key(config) {
        eprintln!("configuration error: {err}");
        return 1;
    }
    let issuer = RsaTokenIssuer::from_config(&config.token);
    let probe = match issuer.issue().await {
        Ok(token) => token,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return 1;
        }
    };

    println!("configuration OK");
    println!("  environment: {}", config.environment);
    println!("  endpoint:    {}", config.endpoint_url());
    println!("  input:       {}", config.paths.input.display());
    println!("  key:         {}", config.token.private_key_path.display());
    println!("  token:       signs OK, expires {}", probe.expires_at);
    0
}

async fn process_single(pipeline: &Pipeline, archiver: &FsArchiveRouter, path: &Path) -> i32 {
    let claimed = match claim_input(path) {
        Ok(claimed) => claimed,
        Err(err) => {
            error!(path = %path.display(), error = %err, "cannot claim input file");
            return 1;
        }
    };
    run_claimed(pipeline, archiver, claimed).await
}

/// Process a file that has already been claimed. The claim means an
/// archive record is owed even when the file cannot be read back.
async fn run_claimed(pipeline: &Pipeline, archiver: &FsArchiveRouter, claimed: PathBuf) -> i32 {
    let content = match tokio::fs::read_to_string(&claimed).await {
        Ok(content) => content,
        Err(err) => {
            let outcome = RunOutcome::ValidationFailure {
                detail: format!("cannot read {}: {err}", claimed.display()),
            };
            if let Err(archive_err) = archiver.archive(&claimed, &outcome).await {
                error!(path = %claimed.display(), error = %archive_err, "failed to archive unreadable file");
            }
            return outcome.exit_code();
        }
    };

    pipeline.run(claimed, content).await.exit_code()
}

async fn watch_loop(
    pipeline: &Pipeline,
    archiver: &FsArchiveRouter,
    input_dir: &Path,
    interval: Duration,
) -> i32 {
    info!(
        dir = %input_dir.display(),
        interval_secs = interval.as_secs(),
        "watching input directory"
    );

    // Interrupts are honored between files, never mid-file: a file that
    // entered the pipeline finishes its run and gets archived.
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    loop {
        for path in pending_inputs(input_dir) {
            if shutdown.load(Ordering::SeqCst) {
                info!("interrupt received, stopping watch");
                return 0;
            }
            // Another run may have claimed the file since the scan.
            let claimed = match claim_input(&path) {
                Ok(claimed) => claimed,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping input file");
                    continue;
                }
            };
            let code = run_claimed(pipeline, archiver, claimed).await;
            if code != 0 {
                warn!(path = %path.display(), exit_code = code, "file processing failed");
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, stopping watch");
                return 0;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// Unclaimed `.xml` files in the input directory, in name order. Claimed
/// files end in `.processing` and fall out of the extension filter.
fn pending_inputs(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "cannot read input directory");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("xml"))
        })
        .collect();
    paths.sort();
    paths
}

fn cleanup(config: &RelayConfig, older_than: Option<u32>, dry_run: bool) -> i32 {
    let days = older_than.unwrap_or(config.archive.retention_days);
    let archiver = FsArchiveRouter::new(&config.paths);

    match archiver.cleanup_old_archives(days, dry_run) {
        Ok((files, bytes)) => {
            let action = if dry_run { "would delete" } else { "deleted" };
            println!("{action} {files} file(s), {bytes} byte(s), older than {days} day(s)");
            0
        }
        Err(err) => {
            eprintln!("cleanup failed: {err}");
            1
        }
    }
}
