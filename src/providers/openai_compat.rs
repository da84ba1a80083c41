//! OpenAI-compatible chat completion client.
//!
//! All four backends expose the same `POST {base_url}/chat/completions`
//! endpoint with bearer authentication, so one client covers them. The
//! per-backend differences (model id, sampling parameters) come in through
//! the [`ProviderProfile`]; optional parameters are omitted from the JSON
//! body entirely when the profile leaves them unset.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChatProvider, ProviderError, ProviderProfile};

/// Cap on a single HTTP attempt. Retries are handled a layer above, so a
/// stalled connection costs at most this long per attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for one configured backend.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    profile: ProviderProfile,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OpenAiChatClient {
    /// Create a client for the given profile. `base_url_override` replaces
    /// the profile's endpoint host, keeping the `/chat/completions` path.
    pub fn new(
        profile: ProviderProfile,
        api_key: String,
        base_url_override: Option<&str>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let base = base_url_override.unwrap_or(profile.base_url);
        let endpoint = format!("{}/chat/completions", base.trim_end_matches('/'));

        Ok(Self {
            client,
            profile,
            api_key,
            endpoint,
        })
    }

    fn build_request<'a>(&'a self, system_prompt: &'a str, user_message: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: self.profile.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            stream: false,
            temperature: self.profile.temperature,
            top_p: self.profile.top_p,
            presence_penalty: self.profile.presence_penalty,
            frequency_penalty: self.profile.frequency_penalty,
            max_tokens: self.profile.max_tokens,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, ProviderError> {
        let request_body = self.build_request(system_prompt, user_message);

        debug!(
            provider = self.profile.kind.id(),
            model = self.profile.model,
            endpoint = %self.endpoint,
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                provider = self.profile.kind.id(),
                status = status.as_u16(),
                "Chat completion request rejected"
            );
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response_body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let content = response_body
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("response contained no choices".to_string())
            })?;

        if content.trim().is_empty() {
            return Err(ProviderError::MalformedResponse(
                "response contained an empty completion".to_string(),
            ));
        }

        Ok(content)
    }

    fn id(&self) -> &str {
        self.profile.kind.id()
    }
}
