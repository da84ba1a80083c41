// rimnamer - Batch AI renaming and metadata swap for RimWorld workshop mods
//
// This is the library crate containing the core business logic and data structures.
// The binary crate (main.rs) provides the CLI entry point.

pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{AppState, FolderStatus, ModelConfig};
pub use providers::{ChatProvider, ProviderError, ProviderKind};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
