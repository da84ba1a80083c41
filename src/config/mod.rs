use crate::models::ModelConfig;
use crate::providers::ProviderKind;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Default settings file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "model_config.json";

/// Generic fallback credential variable shared by every provider.
pub const GENERIC_KEY_VAR: &str = "RIMNAMER_API_KEY";

/// Configuration manager for loading and saving the JSON settings file.
///
/// The file holds exactly the provider trio `{model_name, api_key, base_url}`.
/// Values are stored as raw UTF-8; Chinese text in any field round-trips
/// unescaped.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager bound to the given settings file path.
    pub fn new<P: AsRef<Utf8Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Load the settings file.
    ///
    /// # Returns
    /// The loaded ModelConfig, or defaults if the file doesn't exist
    pub fn load(&self) -> Result<ModelConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
            return Ok(ModelConfig::default());
        }

        let file_contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: ModelConfig = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(config)
    }

    /// Save the settings file as pretty-printed JSON.
    ///
    /// # Arguments
    /// * `config` - The ModelConfig to save
    pub fn save(&self, config: &ModelConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {parent}"))?;
            }
        }

        let json_string =
            serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")?;

        fs::write(&self.config_path, json_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Get the settings file path.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

/// Resolve the API key for a provider.
///
/// Order: explicit value (flag or config file), the provider-specific
/// environment variable, then the generic [`GENERIC_KEY_VAR`]. Called once
/// at startup; nothing downstream reads the environment.
pub fn resolve_api_key(kind: ProviderKind, explicit: Option<&str>) -> Option<String> {
    if let Some(value) = explicit {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    env_var(kind.env_key()).or_else(|| env_var(GENERIC_KEY_VAR))
}

fn env_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}
