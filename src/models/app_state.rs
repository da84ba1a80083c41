use camino::Utf8PathBuf;
use std::collections::HashSet;

/// Maximum number of concurrent chat-completion calls.
///
/// **IMPORTANT:** This is hardcoded to 1 to serialize all outbound API
/// traffic. The free-tier endpoints this tool targets throttle aggressively,
/// and the batch already inserts a courtesy delay between items; running
/// provider calls in parallel would defeat both. Swap-only batches make no
/// external calls, so the cap does not apply to them, but processing stays
/// sequential either way.
///
/// The batch loop in [`crate::services::batch`] enforces this by driving
/// items one at a time.
pub const MAX_CONCURRENT_PROVIDER_CALLS: usize = 1;

/// Classification of a processed mod folder.
///
/// Every folder a batch touches lands in exactly one of these buckets.
/// [`crate::services::batch::FolderOutcome`] carries the human-readable
/// detail; this is the counting key used by [`AppState`] and the state
/// events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FolderStatus {
    Succeeded,
    Skipped,
    Failed,
}

impl FolderStatus {
    /// Short lowercase label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            FolderStatus::Succeeded => "succeeded",
            FolderStatus::Skipped => "skipped",
            FolderStatus::Failed => "failed",
        }
    }
}

/// Single source of truth for all application state.
///
/// # Thread Safety
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by
/// [`crate::state::StateManager`] to provide thread-safe access. Never hold
/// the struct directly across tasks - always go through
/// [`StateManager`](crate::state::StateManager) methods:
/// - [`read()`](crate::state::StateManager::read) for read-only access
/// - [`update()`](crate::state::StateManager::update) for mutations with automatic change events
#[derive(Clone, Debug)]
pub struct AppState {
    // Configuration
    pub workshop_root: Option<Utf8PathBuf>,
    pub provider_id: String,
    pub is_root_configured: bool,
    pub is_provider_configured: bool,

    // Runtime state
    pub is_running: bool,
    pub current_folder: Option<String>,
    pub current_operation: String,

    // Progress state
    pub progress: usize,
    pub total_folders: usize,

    // Results
    pub succeeded_folders: HashSet<String>,
    pub skipped_folders: HashSet<String>,
    pub failed_folders: HashSet<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            // Configuration
            workshop_root: None,
            provider_id: String::new(),
            is_root_configured: false,
            is_provider_configured: false,

            // Runtime state
            is_running: false,
            current_folder: None,
            current_operation: String::new(),

            // Progress state
            progress: 0,
            total_folders: 0,

            // Results
            succeeded_folders: HashSet::new(),
            skipped_folders: HashSet::new(),
            failed_folders: HashSet::new(),
        }
    }
}

impl AppState {
    /// Check if everything needed to start a translate batch is present.
    ///
    /// Swap-only batches need just the root; provider configuration is
    /// checked separately by the CLI before a translate run.
    pub fn is_fully_configured(&self) -> bool {
        self.is_root_configured && self.is_provider_configured
    }

    /// Current run statistics.
    ///
    /// Returns a tuple of (succeeded, skipped, failed, total).
    pub fn run_stats(&self) -> (usize, usize, usize, usize) {
        (
            self.succeeded_folders.len(),
            self.skipped_folders.len(),
            self.failed_folders.len(),
            self.total_folders,
        )
    }

    /// Reset all run-related state to initial values.
    pub fn reset_run_state(&mut self) {
        self.is_running = false;
        self.current_folder = None;
        self.current_operation.clear();
        self.progress = 0;
        self.total_folders = 0;
        self.succeeded_folders.clear();
        self.skipped_folders.clear();
        self.failed_folders.clear();
    }

    /// Record one processed folder and advance progress.
    pub fn add_result(&mut self, folder: String, status: FolderStatus) {
        match status {
            FolderStatus::Succeeded => {
                self.succeeded_folders.insert(folder);
            }
            FolderStatus::Skipped => {
                self.skipped_folders.insert(folder);
            }
            FolderStatus::Failed => {
                self.failed_folders.insert(folder);
            }
        }
        self.progress += 1;
    }
}
