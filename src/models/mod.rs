//! Data models for the rimnamer application.
//!
//! This module contains the core data structures used throughout the
//! application:
//! - [`AppState`]: The central state container holding configuration, run
//!   progress, and per-folder results
//! - [`FolderStatus`]: Classification key for processed folders
//! - [`ModelConfig`]: The three-key provider configuration persisted as
//!   `model_config.json`
//! - [`MAX_CONCURRENT_PROVIDER_CALLS`]: Concurrency policy constant (always 1
//!   to serialize outbound API traffic)
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: `ModelConfig` derives `Serialize`/`Deserialize` for
//!   JSON persistence
//! - **Cloneable**: `AppState` is wrapped in `Arc<RwLock<>>` by
//!   [`StateManager`](crate::state::StateManager) for thread-safe access
//! - **Passive**: state updates go through the manager's `update()` method so
//!   change events are never missed

pub mod app_state;
pub mod config;

pub use app_state::{AppState, FolderStatus, MAX_CONCURRENT_PROVIDER_CALLS};
pub use config::ModelConfig;
