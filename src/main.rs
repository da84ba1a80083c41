//! rimnamer - Batch AI renaming and metadata swap for RimWorld workshop mods
//!
//! Main entry point for the command-line application. It initializes:
//! - Logging infrastructure (daily-rotating file logs, console echo in debug mode)
//! - Tokio async runtime (worker threads for provider calls and file I/O)
//! - State management ([`StateManager`])
//! - Command execution (`rimnamer::cli` - translate / apply / restore batches)
//!
//! # Execution Flow
//!
//! 1. Parse arguments (subcommand plus global --log-dir / --debug)
//! 2. Initialize logging → logs/rimnamer.<date>
//! 3. Create tokio runtime with 4 worker threads
//! 4. Create StateManager (Arc<RwLock<AppState>>)
//! 5. Run the selected batch to completion (Ctrl-C stops at folder boundaries)
//! 6. Log the metrics summary and shut the runtime down with a 5s timeout
//!
//! # Configuration
//!
//! The translate command reads provider settings from `model_config.json`
//! (or the file named by `--config`); flags and environment variables
//! override it. Swap commands need no configuration beyond `--root`.

use anyhow::Result;
use clap::Parser;
use rimnamer::cli::{self, Args};
use rimnamer::{APP_NAME, StateManager, VERSION};
use std::sync::Arc;

/// Main entry point for the rimnamer CLI
///
/// # Returns
///
/// - `Ok(())` if the requested batch ran to completion (individual folder
///   failures are reported in the summary, not here)
/// - `Err(_)` if initialization failed or the run could not proceed
///
/// # Errors
///
/// This function can fail if:
/// - Logging initialization fails (disk space, permissions)
/// - Tokio runtime creation fails (system resources)
/// - The provider id is unknown or no credential could be resolved
/// - The workshop root is missing, unreadable, or empty
fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging before anything else; the guard must outlive the run
    let _guard =
        rimnamer::logging::setup_logging(&args.log_dir, "rimnamer", args.debug, args.debug)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    // Create tokio runtime for async operations
    // This will handle provider HTTP calls and file I/O
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(4)
        .thread_name("rimnamer-worker")
        .build()?;

    tracing::info!("Tokio runtime initialized with {} worker threads", 4);

    // Create state manager for run state and progress events
    let state_manager = Arc::new(StateManager::new());
    tracing::info!("State manager initialized");

    // Run the selected command to completion
    let result = runtime.block_on(cli::run(args, state_manager.clone()));

    // Log aggregate counters collected during the run
    state_manager.metrics().log_summary();

    // Shutdown the tokio runtime gracefully
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("Run failed: {e:#}");
        e
    })
}
