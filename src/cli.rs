// Command-line interface
//
// This module contains the argument surface and the command runners that
// coordinate between:
// - clap argument parsing (Args / Command)
// - ConfigManager (saved provider settings)
// - Provider construction (credential resolution, retry wrapping)
// - Batch execution (StateManager events rendered to stdout)
//
// It handles:
// - Merging provider settings: flags > config file > environment
// - Subscribing to state changes and printing [i/total] outcome lines
// - Ctrl-C → cancellation signal through the watch channel

use crate::config::{self, ConfigManager, DEFAULT_CONFIG_FILE};
use crate::models::ModelConfig;
use crate::providers::{self, ProviderKind, ProviderSettings};
use crate::services::{
    BatchOptions, BatchSummary, FolderAction, SwapApplyAction, SwapRestoreAction, TranslateService,
    discover_mod_folders, run_batch,
};
use crate::state::{StateChange, StateManager};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// rimnamer - Batch AI renaming for RimWorld workshop mods
///
/// Summarizes mod names into Chinese through a chat-completion provider and
/// swaps the renamed metadata in and out of the `About/About.xml` slot.
#[derive(Parser, Debug)]
#[command(
    name = "rimnamer",
    version,
    about = "Batch AI renaming and metadata swap for RimWorld workshop mods",
    long_about = "Walks a workshop directory of RimWorld mods, asks a chat-completion provider\nfor a short Chinese summary of each mod, and rewrites the display name in\nAbout/About.xml (keeping the original as About/About_old.xml). The apply and\nrestore commands toggle between the renamed and original metadata files."
)]
pub struct Args {
    /// Directory for rotating log files
    #[arg(long, default_value = "logs", global = true)]
    pub log_dir: String,

    /// Enable debug logging (console output plus debug filter)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rename mods through a chat provider
    ///
    /// For every mod folder with a non-Chinese display name, asks the provider
    /// for a short Chinese summary, backs up About.xml to About_old.xml and
    /// rewrites the name element with the summary.
    Translate {
        /// Workshop directory containing one subfolder per mod
        #[arg(long)]
        root: Utf8PathBuf,

        /// Provider id (gpt, deepseek, glm, qwen)
        #[arg(long)]
        provider: Option<String>,

        /// API key (overrides the config file and environment)
        #[arg(long)]
        api_key: Option<String>,

        /// Endpoint override replacing the provider's base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Path to the JSON config file
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: Utf8PathBuf,

        /// Persist the resolved provider settings back to the config file
        #[arg(long)]
        save_config: bool,
    },

    /// Swap the translated names into the active metadata slot
    ///
    /// For every mod folder whose About.xml name has no Chinese character and
    /// whose About_old.xml backup exists, exchanges the two files.
    Apply {
        /// Workshop directory containing one subfolder per mod
        #[arg(long)]
        root: Utf8PathBuf,
    },

    /// Swap the original names back into the active metadata slot
    ///
    /// The inverse of apply: exchanges the pair wherever the About.xml name
    /// contains a Chinese character and the backup exists.
    Restore {
        /// Workshop directory containing one subfolder per mod
        #[arg(long)]
        root: Utf8PathBuf,
    },
}

/// Execute the parsed command. Returns an error only when the run itself
/// cannot proceed (bad provider id, missing credential, unreadable root);
/// individual folder failures are reported in the summary instead.
pub async fn run(args: Args, state: Arc<StateManager>) -> Result<()> {
    match args.command {
        Command::Translate {
            root,
            provider,
            api_key,
            base_url,
            config,
            save_config,
        } => {
            run_translate(
                &state,
                root,
                provider.as_deref(),
                api_key.as_deref(),
                base_url.as_deref(),
                &config,
                save_config,
            )
            .await
        }
        Command::Apply { root } => run_swap(&state, root, SwapApplyAction::new()).await,
        Command::Restore { root } => run_swap(&state, root, SwapRestoreAction::new()).await,
    }
}

async fn run_translate(
    state: &StateManager,
    root: Utf8PathBuf,
    provider_flag: Option<&str>,
    api_key_flag: Option<&str>,
    base_url_flag: Option<&str>,
    config_path: &Utf8PathBuf,
    save_config: bool,
) -> Result<()> {
    let manager = ConfigManager::new(config_path);
    let file_config = manager.load()?;

    let settings =
        resolve_provider_settings(&file_config, provider_flag, api_key_flag, base_url_flag)?;

    let provider = providers::create_provider(&settings).with_context(|| {
        format!(
            "Cannot start a translate run with provider '{}'",
            settings.kind
        )
    })?;

    if save_config {
        let resolved = ModelConfig {
            model_name: settings.kind.id().to_string(),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url_override.clone().unwrap_or_default(),
        };
        manager.save(&resolved)?;
        println!("Saved provider settings to {}", manager.config_path());
    }

    state.set_workshop_root(Some(root.clone()));
    state.set_provider(settings.kind.id());

    let folders = discover_mod_folders(&root)?;
    println!("Found {} mod folders under {}", folders.len(), root);

    let service = TranslateService::new(provider, state.metrics());
    let summary = execute_batch(state, &service, &folders).await;
    tracing::info!("Translate run finished: {}", summary.summary_line());
    Ok(())
}

async fn run_swap<A: FolderAction>(
    state: &StateManager,
    root: Utf8PathBuf,
    action: A,
) -> Result<()> {
    state.set_workshop_root(Some(root.clone()));

    let folders = discover_mod_folders(&root)?;
    println!("Found {} mod folders under {}", folders.len(), root);

    let summary = execute_batch(state, &action, &folders).await;
    tracing::info!("Swap run finished: {}", summary.summary_line());
    Ok(())
}

/// Run one batch with progress rendering and Ctrl-C cancellation.
async fn execute_batch(
    state: &StateManager,
    action: &dyn FolderAction,
    folders: &[Utf8PathBuf],
) -> BatchSummary {
    // Cancellation channel: Ctrl-C flips it, the batch loop checks it
    // between folders so the in-flight item always runs to completion.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received - stopping after the current folder");
            eprintln!("Interrupt received, stopping after the current folder...");
            let _ = cancel_tx.send(true);
        }
    });

    // Subscribe before the batch starts so no events are missed.
    let renderer = spawn_progress_renderer(state);

    let summary = run_batch(action, folders, state, cancel_rx, &BatchOptions::default()).await;

    if renderer.await.is_err() {
        tracing::warn!("Progress renderer task failed");
    }
    println!("{}", summary.summary_line());
    summary
}

/// Spawn the task that renders state change events to stdout.
///
/// Terminates when the run finishes or the broadcast channel closes.
fn spawn_progress_renderer(state: &StateManager) -> tokio::task::JoinHandle<()> {
    let mut rx = state.subscribe();
    tokio::spawn(async move {
        let mut total = 0usize;
        let mut done = 0usize;

        loop {
            match rx.recv().await {
                Ok(StateChange::RunStarted { total_folders }) => {
                    total = total_folders;
                    done = 0;
                }
                Ok(StateChange::FolderProcessed {
                    folder,
                    status,
                    message,
                }) => {
                    done += 1;
                    println!("[{done}/{total}] {folder}: {} - {message}", status.label());
                }
                Ok(StateChange::RunFinished { .. }) => break,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Progress renderer lagged - {} events dropped", skipped);
                }
            }
        }
    })
}

/// Merge provider settings from the flag layer, the config file, and the
/// environment. Flags win over the file; the environment fills a credential
/// neither provided.
fn resolve_provider_settings(
    file_config: &ModelConfig,
    provider_flag: Option<&str>,
    api_key_flag: Option<&str>,
    base_url_flag: Option<&str>,
) -> Result<ProviderSettings> {
    let provider_id = provider_flag
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(&file_config.model_name);
    let kind = ProviderKind::from_str(provider_id)?;

    let explicit_key = api_key_flag
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .or_else(|| file_config.api_key_value());
    let api_key = config::resolve_api_key(kind, explicit_key).unwrap_or_default();

    let base_url_override = base_url_flag
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .or_else(|| file_config.base_url_override().map(str::to_string));

    Ok(ProviderSettings {
        kind,
        api_key,
        base_url_override,
    })
}
