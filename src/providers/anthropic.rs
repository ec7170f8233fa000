//! Anthropic Messages API provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{LlmExecError, Result};

use super::{
    build_client, missing_key, parse_provider_error, ChatOptions, LLMProvider, LLMResponse,
    Message, Role, Usage,
};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// The Messages API requires `max_tokens`; used when the caller sets none.
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Provider for Claude models.
pub struct AnthropicProvider {
    api_key: Option<String>,
    api_base: String,
    model: String,
    client: Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(api_key: Option<&str>, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()).map(String::from),
            api_base: ANTHROPIC_API_BASE.to_string(),
            model: model.to_string(),
            client: build_client(timeout),
        }
    }

    pub fn with_api_base(mut self, api_base: Option<&str>) -> Self {
        if let Some(base) = api_base.filter(|b| !b.is_empty()) {
            self.api_base = base.trim_end_matches('/').to_string();
        }
        self
    }

    /// System messages go to the top-level `system` field; the rest stay in order.
    fn build_request<'a>(
        model: &'a str,
        messages: &'a [Message],
        options: &ChatOptions,
    ) -> MessagesRequest<'a> {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str());
        MessagesRequest {
            model,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: options.temperature,
        }
    }

    fn parse_response(body: MessagesResponse) -> Result<LLMResponse> {
        let text: Vec<String> = body
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();
        if text.is_empty() {
            return Err(LlmExecError::Provider(
                "No text content in Anthropic response".to_string(),
            ));
        }
        let mut response = LLMResponse::text(&text.join(""));
        if let Some(u) = body.usage {
            response = response.with_usage(Usage::new(u.input_tokens, u.output_tokens));
        }
        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| missing_key("ANTHROPIC_API_KEY"))?;
        let model = model.unwrap_or(&self.model);
        let request = Self::build_request(model, &messages, &options);

        debug!("Anthropic request to model {}", model);

        let response = self
            .client
            .post(format!("{}/messages", self.api_base))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmExecError::Provider(format!("Anthropic request failed: {}", e)))?;

        if response.status().is_success() {
            let body: MessagesResponse = response.json().await.map_err(|e| {
                LlmExecError::Provider(format!("Failed to parse Anthropic response: {}", e))
            })?;
            return Self::parse_response(body);
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(error_text);

        Err(LlmExecError::from(parse_provider_error(
            status,
            &format!("Anthropic API error: {}", message),
        )))
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
