//! Services module - Pure business logic for mod metadata operations.
//!
//! This module contains the core logic for batch renaming RimWorld workshop
//! mods and swapping their About files. The services are **framework-agnostic**
//! and have no dependencies on the CLI layer, making them testable and
//! reusable.
//!
//! # Components
//!
//! - [`metadata`]: Parsing and rewriting of `About/About.xml` documents:
//!   - Extracting the root-level `name` and `description` elements
//!   - The CJK-ideograph predicate that marks a mod as already translated
//!   - Rewriting the display name while preserving the rest of the document
//!
//! - [`swap`]: The three-way rename between `About.xml`, `About_old.xml`,
//!   and the `About_temp.xml` staging file, plus repair of interrupted swaps.
//!
//! - [`translate`]: The per-folder AI rename: backup, summary request,
//!   display-name rewrite.
//!
//! - [`batch`]: The sequential runner that drives any of the above across a
//!   workshop directory with progress events, pacing, and cancellation.
//!
//! # Design Philosophy
//!
//! The services layer is designed to be:
//! - **Pure**: No side effects beyond file I/O and provider HTTP calls
//! - **Async**: Provider-facing operations use tokio for non-blocking I/O
//! - **Testable**: No hidden dependencies, all inputs are explicit parameters
//! - **Framework-agnostic**: No terminal handling, only business logic
//!
//! # Usage Example
//!
//! ```ignore
//! use rimnamer::services::batch::{self, BatchOptions, SwapRestoreAction};
//!
//! let folders = batch::discover_mod_folders(&workshop_root)?;
//! let action = SwapRestoreAction::new();
//! let summary = batch::run_batch(
//!     &action,
//!     &folders,
//!     &state,
//!     cancel_rx,
//!     &BatchOptions::default(),
//! ).await;
//! println!("{}", summary.summary_line());
//! ```

pub mod batch;
pub mod metadata;
pub mod swap;
pub mod translate;

pub use batch::{
    BatchError, BatchOptions, BatchSummary, FolderAction, FolderOutcome, SwapApplyAction,
    SwapRestoreAction, discover_mod_folders, run_batch,
};
pub use metadata::{AboutMetadata, MetadataError, contains_cjk};
pub use swap::{LeftoverRepair, SwapError, SwapOutcome, SwapService};
pub use translate::{SYSTEM_PROMPT, TranslateError, TranslateService};
