//! Chat-completion provider clients.
//!
//! Four built-in backends generate the Chinese summaries: `gpt`, `deepseek`,
//! `glm`, and `qwen`. They all speak the same OpenAI-style wire protocol and
//! differ only in endpoint, model identifier, and sampling parameters, so a
//! single HTTP client ([`OpenAiChatClient`]) serves every profile. The
//! retry/timeout policy wraps the capability trait once
//! ([`RetryingProvider`]) instead of being repeated per backend.
//!
//! Credentials are explicit. Nothing in this module reads the environment;
//! resolution (flags, config file, named environment variables) happens in
//! [`crate::config`] before a provider is built.

pub mod openai_compat;
pub mod retry;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;

pub use openai_compat::OpenAiChatClient;
pub use retry::{RetryPolicy, RetryingProvider};

/// Errors surfaced by provider calls.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("no API key configured for provider '{provider}'")]
    MissingCredential { provider: String },

    #[error("unknown provider '{0}' (expected one of: gpt, deepseek, glm, qwen)")]
    UnknownProvider(String),

    #[error("request error: {0}")]
    Request(String),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Capability interface every backend implements.
///
/// `complete` sends one system instruction plus one user message and returns
/// the completion text. Failure is a first-class error; an empty completion
/// is reported as [`ProviderError::MalformedResponse`], never as `Ok("")`.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str)
    -> Result<String, ProviderError>;

    /// Canonical identifier of the backend serving this provider.
    fn id(&self) -> &str;
}

impl std::fmt::Debug for dyn ChatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatProvider").field("id", &self.id()).finish()
    }
}

/// The four built-in backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gpt,
    DeepSeek,
    Glm,
    Qwen,
}

impl ProviderKind {
    pub fn all() -> [ProviderKind; 4] {
        [
            ProviderKind::Gpt,
            ProviderKind::DeepSeek,
            ProviderKind::Glm,
            ProviderKind::Qwen,
        ]
    }

    /// Canonical lowercase identifier (the registry key).
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::Gpt => "gpt",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Glm => "glm",
            ProviderKind::Qwen => "qwen",
        }
    }

    /// Provider-specific environment variable consulted when no explicit
    /// credential is given. The generic `RIMNAMER_API_KEY` is the fallback;
    /// see [`crate::config::resolve_api_key`].
    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderKind::Gpt => "OPENAI_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderKind::Glm => "GLM_API_KEY",
            ProviderKind::Qwen => "QWEN_API_KEY",
        }
    }

    pub fn profile(&self) -> ProviderProfile {
        match self {
            ProviderKind::Gpt => ProviderProfile {
                kind: *self,
                base_url: "https://api.aliyy.cc/v1",
                model: "gpt-4o-mini",
                temperature: Some(0.7),
                top_p: Some(1.0),
                presence_penalty: Some(1.0),
                frequency_penalty: Some(1.1),
                max_tokens: Some(400),
            },
            ProviderKind::DeepSeek => ProviderProfile {
                kind: *self,
                base_url: "https://api.deepseek.com",
                model: "deepseek-chat",
                temperature: None,
                top_p: None,
                presence_penalty: None,
                frequency_penalty: None,
                max_tokens: None,
            },
            ProviderKind::Glm => ProviderProfile {
                kind: *self,
                base_url: "https://open.bigmodel.cn/api/paas/v4",
                model: "glm-4-flash",
                temperature: Some(0.9),
                top_p: Some(0.7),
                presence_penalty: None,
                frequency_penalty: None,
                max_tokens: None,
            },
            ProviderKind::Qwen => ProviderProfile {
                kind: *self,
                base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1",
                model: "qwen-flash",
                temperature: Some(0.9),
                top_p: Some(0.7),
                presence_penalty: None,
                frequency_penalty: None,
                max_tokens: None,
            },
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gpt" | "gpt4o" | "gpt-4o-mini" | "openai" => Ok(ProviderKind::Gpt),
            "deepseek" | "deepseek-chat" => Ok(ProviderKind::DeepSeek),
            "glm" | "glm-4-flash" | "zhipu" => Ok(ProviderKind::Glm),
            "qwen" | "qwen-flash" | "dashscope" => Ok(ProviderKind::Qwen),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Fixed wire parameters for one backend.
#[derive(Debug, Clone, Copy)]
pub struct ProviderProfile {
    pub kind: ProviderKind,
    pub base_url: &'static str,
    pub model: &'static str,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Built-in provider table in registration order, keyed by canonical id.
/// Used for `--help` listings and validation messages.
pub fn registry() -> IndexMap<&'static str, ProviderProfile> {
    ProviderKind::all()
        .into_iter()
        .map(|kind| (kind.id(), kind.profile()))
        .collect()
}

/// Everything needed to construct a provider, resolved up front by the
/// configuration layer.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: String,
    pub base_url_override: Option<String>,
}

/// Build the ready-to-use provider for the given settings: the wire client
/// for the backend's profile, decorated with the uniform retry policy.
///
/// A blank credential is rejected here, before any network attempt.
pub fn create_provider(
    settings: &ProviderSettings,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    create_provider_with_policy(settings, RetryPolicy::default())
}

/// [`create_provider`] with an explicit retry policy. Tests use this to run
/// the backoff schedule on millisecond delays.
pub fn create_provider_with_policy(
    settings: &ProviderSettings,
    policy: RetryPolicy,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    if settings.api_key.trim().is_empty() {
        return Err(ProviderError::MissingCredential {
            provider: settings.kind.id().to_string(),
        });
    }

    let client = OpenAiChatClient::new(
        settings.kind.profile(),
        settings.api_key.clone(),
        settings.base_url_override.as_deref(),
    )?;

    Ok(Arc::new(RetryingProvider::new(client, policy)))
}
