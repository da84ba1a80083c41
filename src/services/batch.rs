//! Batch execution over workshop mod folders.
//!
//! Components:
//! - [`FolderOutcome`]: classification of one processed folder
//! - [`FolderAction`]: the per-folder operation a batch runs
//! - [`discover_mod_folders`]: enumeration of candidate folders
//! - [`run_batch`]: the sequential loop with progress events, pacing, and
//!   cooperative cancellation
//!
//! The loop deliberately processes one folder at a time
//! ([`MAX_CONCURRENT_PROVIDER_CALLS`] is 1). A folder that has started is
//! always finished; cancellation is only observed between folders, so the
//! three About files are never left mid-rename by a shutdown.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::{FolderStatus, MAX_CONCURRENT_PROVIDER_CALLS};
use crate::services::metadata::ABOUT_DIR;
use crate::services::swap::{SwapError, SwapOutcome, SwapService};
use crate::state::StateManager;

const _: () = assert!(MAX_CONCURRENT_PROVIDER_CALLS == 1);

/// How often to write a periodic metrics line during a long batch.
const PERIODIC_METRICS_EVERY: usize = 25;

/// Result of processing one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    Success { detail: String },
    Skipped { reason: String },
    Failed { reason: String },
}

impl FolderOutcome {
    pub fn status(&self) -> FolderStatus {
        match self {
            FolderOutcome::Success { .. } => FolderStatus::Succeeded,
            FolderOutcome::Skipped { .. } => FolderStatus::Skipped,
            FolderOutcome::Failed { .. } => FolderStatus::Failed,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            FolderOutcome::Success { detail } => detail,
            FolderOutcome::Skipped { reason } => reason,
            FolderOutcome::Failed { reason } => reason,
        }
    }
}

/// The per-folder operation a batch executes.
///
/// Implementations classify every folder themselves; `run` never aborts the
/// batch. Unexpected errors map to [`FolderOutcome::Failed`].
#[async_trait]
pub trait FolderAction: Send + Sync {
    /// Verb used in logs and progress lines.
    fn name(&self) -> &'static str;

    /// Whether a successful folder is followed by the courtesy delay.
    /// Only actions that call a provider endpoint need pacing.
    fn paced(&self) -> bool {
        false
    }

    async fn run(&self, folder: &Utf8Path) -> FolderOutcome;
}

/// Errors from batch setup. Once a batch is running, per-folder problems
/// become [`FolderOutcome::Failed`] instead.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("workshop root {0} does not exist")]
    RootNotFound(Utf8PathBuf),

    #[error("workshop root {0} is not a directory")]
    RootNotADirectory(Utf8PathBuf),

    #[error("no mod folders found under {0}")]
    NoFolders(Utf8PathBuf),

    #[error("failed to read workshop root {path}: {source}")]
    ReadDir {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
}

/// Tunable parameters for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Pause after each successful paced folder. Keeps request rates polite
    /// toward provider endpoints.
    pub courtesy_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            courtesy_delay: Duration::from_secs(1),
        }
    }
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// True when the run stopped early at a folder boundary.
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    pub fn summary_line(&self) -> String {
        let line = format!(
            "{} succeeded, {} skipped, {} failed",
            self.succeeded, self.skipped, self.failed
        );
        if self.cancelled {
            format!("{line} (cancelled)")
        } else {
            line
        }
    }
}

/// List the immediate subdirectories of the workshop root, sorted by name.
///
/// Files and unreadable entries under the root are ignored. An empty result
/// is an error; pointing the tool at the wrong directory should be loud, not
/// a silent zero-folder run.
pub fn discover_mod_folders(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, BatchError> {
    if !root.exists() {
        return Err(BatchError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(BatchError::RootNotADirectory(root.to_path_buf()));
    }

    let entries = root.read_dir_utf8().map_err(|source| BatchError::ReadDir {
        path: root.to_path_buf(),
        source,
    })?;

    let mut folders = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {}", root, err);
                continue;
            }
        };
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => folders.push(entry.into_path()),
            Ok(_) => {}
            Err(err) => {
                warn!("Skipping entry {}: {}", entry.path(), err);
            }
        }
    }

    if folders.is_empty() {
        return Err(BatchError::NoFolders(root.to_path_buf()));
    }

    folders.sort();
    debug!(count = folders.len(), root = %root, "Discovered mod folders");
    Ok(folders)
}

/// Run `action` over `folders` one at a time.
///
/// Progress is reported through `state` after every folder. The watch
/// channel is checked before each folder starts; once `true` is observed the
/// remaining folders are left untouched and the summary is marked cancelled.
pub async fn run_batch(
    action: &dyn FolderAction,
    folders: &[Utf8PathBuf],
    state: &StateManager,
    cancel_rx: watch::Receiver<bool>,
    options: &BatchOptions,
) -> BatchSummary {
    let metrics = state.metrics();
    state.start_run(folders.len());
    info!(
        action = action.name(),
        total = folders.len(),
        "Batch started"
    );

    let mut cancelled = false;

    for (index, folder) in folders.iter().enumerate() {
        if *cancel_rx.borrow() {
            info!(
                processed = index,
                remaining = folders.len() - index,
                "Cancellation requested, stopping at folder boundary"
            );
            cancelled = true;
            break;
        }

        let folder_name = folder
            .file_name()
            .unwrap_or(folder.as_str())
            .to_string();
        state.update_progress(
            folder_name.clone(),
            format!("{} {}", action.name(), folder_name),
        );

        let started = Instant::now();
        let outcome = action.run(folder).await;
        metrics.record_processing_time(started.elapsed());

        debug!(
            folder = %folder_name,
            status = outcome.status().label(),
            message = outcome.message(),
            "Folder processed"
        );
        state.add_folder_result(folder_name, outcome.status(), outcome.message().to_string());

        if (index + 1) % PERIODIC_METRICS_EVERY == 0 {
            metrics.log_periodic();
        }

        if action.paced() && matches!(outcome, FolderOutcome::Success { .. }) {
            tokio::time::sleep(options.courtesy_delay).await;
        }
    }

    state.finish_run();
    let (succeeded, skipped, failed, _) = state.read(|s| s.run_stats());
    let summary = BatchSummary {
        succeeded,
        skipped,
        failed,
        cancelled,
    };
    info!(
        succeeded,
        skipped, failed, cancelled, "Batch finished"
    );
    summary
}

/// Runs the forward swap (`About.xml` takes the translated name from the
/// backup) across a batch.
#[derive(Default)]
pub struct SwapApplyAction {
    service: SwapService,
}

impl SwapApplyAction {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FolderAction for SwapApplyAction {
    fn name(&self) -> &'static str {
        "apply"
    }

    async fn run(&self, folder: &Utf8Path) -> FolderOutcome {
        swap_outcome(self.service.apply_translation(&folder.join(ABOUT_DIR)))
    }
}

/// Runs the reverse swap (original `About.xml` comes back) across a batch.
#[derive(Default)]
pub struct SwapRestoreAction {
    service: SwapService,
}

impl SwapRestoreAction {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FolderAction for SwapRestoreAction {
    fn name(&self) -> &'static str {
        "restore"
    }

    async fn run(&self, folder: &Utf8Path) -> FolderOutcome {
        swap_outcome(self.service.restore_original(&folder.join(ABOUT_DIR)))
    }
}

fn swap_outcome(result: Result<SwapOutcome, SwapError>) -> FolderOutcome {
    match result {
        Ok(SwapOutcome::Applied) => FolderOutcome::Success {
            detail: "files swapped".to_string(),
        },
        Ok(SwapOutcome::NotApplicable) => FolderOutcome::Skipped {
            reason: "not applicable".to_string(),
        },
        Err(err) => FolderOutcome::Failed {
            reason: err.to_string(),
        },
    }
}
