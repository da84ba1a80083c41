//! AI renaming of workshop mod metadata.
//!
//! The per-folder translate operation: read the About document, ask the
//! configured provider for a short Chinese summary, back up `About.xml` to
//! `About_old.xml`, then rewrite the display name in place. Pacing between
//! folders and cancellation belong to [`crate::services::batch`].

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::metrics::Metrics;
use crate::providers::{ChatProvider, ProviderError};
use crate::services::batch::{FolderAction, FolderOutcome};
use crate::services::metadata::{
    self, ABOUT_DIR, ABOUT_FILE, AboutMetadata, BACKUP_FILE, MetadataError,
};

/// Instruction sent with every summary request. The wording is part of the
/// payload contract with the upstream models and stays in Chinese.
pub const SYSTEM_PROMPT: &str = "我会给出游戏《RIMWORLD》的模组名称和模组的描述，你需根据原来的英文名称和描述(不一定是英文，可能是任何语言)用大约20个字（不能超过20）来简短总结这个mod是什么或者有什么功能，请直接回答你对这个mod的总结即可，总结必须为中文。";

/// Errors from the translate operation that are not soft outcomes.
///
/// These surface as failed folders in a batch; the batch itself keeps going.
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("failed to back up to {path}: {source}")]
    Backup {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
}

/// Message payload sent to the provider.
///
/// Placeholder strings stand in for missing fields; they are part of the
/// payload contract, not display text.
pub fn user_message(metadata: &AboutMetadata) -> String {
    let name = metadata
        .effective_name()
        .unwrap_or_else(|| "未找到名称".to_string());
    format!("名称：{name}，描述：{}", metadata.effective_description())
}

/// Service for renaming one mod folder through a chat provider.
pub struct TranslateService {
    provider: Arc<dyn ChatProvider>,
    metrics: Arc<Metrics>,
}

impl TranslateService {
    pub fn new(provider: Arc<dyn ChatProvider>, metrics: Arc<Metrics>) -> Self {
        Self { provider, metrics }
    }

    /// Process one mod folder.
    ///
    /// Soft classifications (already processed, ineligible document, name
    /// already Chinese) come back as `Ok` outcomes; `Err` is reserved for
    /// I/O and provider failures.
    pub async fn process_folder(&self, folder: &Utf8Path) -> Result<FolderOutcome, TranslateError> {
        let about_dir = folder.join(ABOUT_DIR);
        let about_path = about_dir.join(ABOUT_FILE);
        let backup_path = about_dir.join(BACKUP_FILE);

        if backup_path.exists() {
            return Ok(FolderOutcome::Skipped {
                reason: "already processed".to_string(),
            });
        }
        if !about_path.exists() {
            return Ok(FolderOutcome::Failed {
                reason: "About.xml not found".to_string(),
            });
        }

        let xml = fs::read_to_string(&about_path).map_err(|source| TranslateError::Read {
            path: about_path.clone(),
            source,
        })?;
        let parsed = metadata::parse_metadata(&xml)?;

        let Some(raw_name) = parsed.name.clone() else {
            return Ok(FolderOutcome::Failed {
                reason: "name element not found".to_string(),
            });
        };

        // Eligibility is judged on the raw element text; the placeholder
        // below only enters the message payload.
        if metadata::contains_cjk(&raw_name) {
            return Ok(FolderOutcome::Skipped {
                reason: "name already Chinese".to_string(),
            });
        }

        let display_name = if raw_name.is_empty() {
            "未找到名称".to_string()
        } else {
            raw_name
        };
        let message = user_message(&parsed);
        debug!(folder = %folder, name = %display_name, "Requesting summary");

        self.metrics.record_provider_call();
        let summary = match self.provider.complete(SYSTEM_PROMPT, &message).await {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                self.metrics.record_provider_failure();
                return Err(err.into());
            }
        };

        let rewritten = metadata::rewrite_display_name(&xml, &summary)?;

        // The backup keeps the original bytes; only About.xml is rewritten.
        fs::copy(&about_path, &backup_path).map_err(|source| TranslateError::Backup {
            path: backup_path.clone(),
            source,
        })?;
        fs::write(&about_path, rewritten).map_err(|source| TranslateError::Write {
            path: about_path.clone(),
            source,
        })?;

        info!(folder = %folder, from = %display_name, to = %summary, "Renamed mod");
        Ok(FolderOutcome::Success {
            detail: format!("{display_name} -> {summary}"),
        })
    }
}

#[async_trait]
impl FolderAction for TranslateService {
    fn name(&self) -> &'static str {
        "translate"
    }

    fn paced(&self) -> bool {
        true
    }

    async fn run(&self, folder: &Utf8Path) -> FolderOutcome {
        match self.process_folder(folder).await {
            Ok(outcome) => outcome,
            Err(err) => FolderOutcome::Failed {
                reason: err.to_string(),
            },
        }
    }
}
