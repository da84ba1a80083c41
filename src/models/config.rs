use serde::{Deserialize, Serialize};

/// Saved provider configuration, persisted as `model_config.json`.
///
/// The on-disk document carries exactly these three keys. Values are stored
/// as-is in UTF-8; non-ASCII text (Chinese model names, for instance) is
/// written raw rather than `\u`-escaped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub model_name: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub base_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            api_key: String::new(),
            base_url: String::new(),
        }
    }
}

fn default_model_name() -> String {
    "glm".to_string()
}

impl ModelConfig {
    /// Endpoint override, if one was configured. An empty string means
    /// "use the provider's built-in endpoint".
    pub fn base_url_override(&self) -> Option<&str> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    }

    /// Explicit credential, if one was configured.
    pub fn api_key_value(&self) -> Option<&str> {
        let trimmed = self.api_key.trim();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    }
}
