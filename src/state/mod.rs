// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe
// access using Arc<RwLock<T>> and emits change events for progress reporting.

use crate::metrics::Metrics;
use crate::models::{AppState, FolderStatus};
use camino::Utf8PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
///
/// These events are emitted to notify interested parties (primarily the CLI
/// progress renderer) about state changes without requiring them to poll.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// Configuration has been updated
    ConfigurationChanged {
        is_fully_configured: bool,
    },

    /// A batch run has started
    RunStarted {
        total_folders: usize,
    },

    /// A batch run has finished
    RunFinished {
        succeeded: usize,
        skipped: usize,
        failed: usize,
    },

    /// Progress has been updated during a run
    ProgressUpdated {
        current: usize,
        total: usize,
        current_folder: Option<String>,
    },

    /// A folder has been processed
    FolderProcessed {
        folder: String,
        status: FolderStatus,
        message: String,
    },

    /// Current operation has changed
    OperationChanged {
        operation: String,
    },

    /// State has been reset
    StateReset,
}

/// Thread-safe state manager with event emission
///
/// This is the central state management component that:
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Owns the [`Metrics`] counters for the process
///
/// # Usage
///
/// Always use `StateManager` instead of accessing [`AppState`] directly:
/// - [`read()`](Self::read) for reading state without cloning
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
pub struct StateManager {
    /// The application state protected by RwLock for thread-safe access
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,

    /// Process-wide counters, shared with the services that record into them
    metrics: Arc<Metrics>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Get a read-only snapshot of the current state
    ///
    /// This clones the entire state, so it's safe to use without holding locks.
    /// For checking individual fields, consider using `read()` with a closure.
    pub fn snapshot(&self) -> AppState {
        self.state.read().unwrap().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let is_configured = state_manager.read(|state| state.is_fully_configured());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// The shared metrics counters owned by this manager
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Update the state and emit change events
    ///
    /// This is the primary way to modify state. It:
    /// 1. Captures the old state
    /// 2. Applies the update function
    /// 3. Detects what changed
    /// 4. Emits appropriate events
    ///
    /// # Returns
    /// A vector of StateChange events that were emitted
    ///
    /// # Example
    /// ```ignore
    /// state_manager.update(|state| {
    ///     state.is_running = true;
    ///     state.progress = 0;
    /// });
    /// ```
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap();
        let old_state = state.clone();

        // Apply the update
        update_fn(&mut state);
        self.metrics.record_state_update();

        // Detect changes and emit events
        let changes = self.detect_changes(&old_state, &state);

        for change in &changes {
            self.send_event(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    ///
    /// Returns a receiver that will get notified of all future state changes.
    /// Multiple subscribers can listen simultaneously.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Send one event to all subscribers
    ///
    /// A send error just means no one is listening, which is fine; it is
    /// still counted so a silent progress display shows up in the metrics.
    fn send_event(&self, change: StateChange) {
        match self.state_tx.send(change) {
            Ok(_) => self.metrics.record_state_broadcast(),
            Err(_) => self.metrics.record_state_broadcast_error(),
        }
    }

    /// Detect what changed between two states and generate events
    ///
    /// This is called internally by `update()` to determine which events to emit.
    fn detect_changes(&self, old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        // Configuration changes
        if old.is_root_configured != new.is_root_configured
            || old.is_provider_configured != new.is_provider_configured
        {
            changes.push(StateChange::ConfigurationChanged {
                is_fully_configured: new.is_fully_configured(),
            });
        }

        // Run state changes
        if old.is_running != new.is_running {
            if new.is_running {
                changes.push(StateChange::RunStarted {
                    total_folders: new.total_folders,
                });
            } else {
                let (succeeded, skipped, failed, _) = new.run_stats();
                changes.push(StateChange::RunFinished {
                    succeeded,
                    skipped,
                    failed,
                });
            }
        }

        // Progress changes
        if old.progress != new.progress
            || old.total_folders != new.total_folders
            || old.current_folder != new.current_folder
        {
            changes.push(StateChange::ProgressUpdated {
                current: new.progress,
                total: new.total_folders,
                current_folder: new.current_folder.clone(),
            });
        }

        // Operation changes
        if old.current_operation != new.current_operation {
            changes.push(StateChange::OperationChanged {
                operation: new.current_operation.clone(),
            });
        }

        changes
    }

    // Convenience methods for common state updates

    /// Set the workshop root directory and update configuration status
    pub fn set_workshop_root(&self, root: Option<Utf8PathBuf>) -> Vec<StateChange> {
        self.update(|state| {
            state.workshop_root = root.clone();
            state.is_root_configured = root.is_some();
        })
    }

    /// Set the active provider id and update configuration status
    pub fn set_provider(&self, provider_id: &str) -> Vec<StateChange> {
        self.update(|state| {
            state.provider_id = provider_id.to_string();
            state.is_provider_configured = !provider_id.trim().is_empty();
        })
    }

    /// Start a batch run over the given number of folders
    pub fn start_run(&self, total_folders: usize) -> Vec<StateChange> {
        self.update(|state| {
            state.is_running = true;
            state.progress = 0;
            state.total_folders = total_folders;
            state.current_folder = None;
            state.current_operation = "Starting batch".to_string();
            state.succeeded_folders.clear();
            state.skipped_folders.clear();
            state.failed_folders.clear();
        })
    }

    /// Finish the current batch run
    pub fn finish_run(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.is_running = false;
            state.current_folder = None;
            state.current_operation.clear();
        })
    }

    /// Update progress for the folder currently being processed
    pub fn update_progress(&self, folder: String, operation: String) -> Vec<StateChange> {
        self.update(|state| {
            state.current_folder = Some(folder);
            state.current_operation = operation;
        })
    }

    /// Record the result of processing a folder
    ///
    /// # Arguments
    /// * `folder` - Name of the folder that was processed
    /// * `status` - Outcome classification
    /// * `message` - Human-readable message about the result
    pub fn add_folder_result(
        &self,
        folder: String,
        status: FolderStatus,
        message: String,
    ) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.add_result(folder.clone(), status);
        });

        match status {
            FolderStatus::Succeeded => self.metrics.record_folder_succeeded(),
            FolderStatus::Skipped => self.metrics.record_folder_skipped(),
            FolderStatus::Failed => self.metrics.record_folder_failed(),
        }

        // Emit a folder processed event
        let event = StateChange::FolderProcessed {
            folder,
            status,
            message,
        };
        self.send_event(event.clone());
        changes.push(event);

        changes
    }

    /// Reset all run-related state
    pub fn reset_run_state(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.reset_run_state();
        });

        // Emit a reset event
        let reset_event = StateChange::StateReset;
        self.send_event(reset_event.clone());
        changes.push(reset_event);

        changes
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across tasks
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}
