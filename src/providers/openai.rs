//! OpenAI-compatible chat completions provider.
//!
//! Serves OpenAI itself and OpenRouter, which accepts the same wire format at
//! a different base URL with a different key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{LlmExecError, Result};

use super::{
    build_client, missing_key, parse_provider_error, ChatOptions, LLMProvider, LLMResponse,
    Message, Usage,
};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Provider for any `/chat/completions` endpoint with bearer auth.
pub struct OpenAiProvider {
    name: &'static str,
    key_env: &'static str,
    api_key: Option<String>,
    api_base: String,
    model: String,
    client: Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("name", &self.name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn openai(api_key: Option<&str>, model: &str, timeout: Duration) -> Self {
        Self::with_endpoint("openai", "OPENAI_API_KEY", OPENAI_API_BASE, api_key, model, timeout)
    }

    pub fn openrouter(api_key: Option<&str>, model: &str, timeout: Duration) -> Self {
        Self::with_endpoint(
            "openrouter",
            "OPENROUTER_API_KEY",
            OPENROUTER_API_BASE,
            api_key,
            model,
            timeout,
        )
    }

    fn with_endpoint(
        name: &'static str,
        key_env: &'static str,
        api_base: &str,
        api_key: Option<&str>,
        model: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            key_env,
            api_key: api_key.filter(|k| !k.is_empty()).map(String::from),
            api_base: api_base.to_string(),
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

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    fn build_request<'a>(
        model: &'a str,
        messages: &'a [Message],
        options: &ChatOptions,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }

    fn parse_response(&self, body: ChatResponse) -> Result<LLMResponse> {
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                LlmExecError::Provider(format!("No content in {} response", self.name))
            })?;
        let mut response = LLMResponse::text(&content);
        if let Some(u) = body.usage {
            response = response.with_usage(Usage::new(u.prompt_tokens, u.completion_tokens));
        }
        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| missing_key(self.key_env))?;
        let model = model.unwrap_or(&self.model);
        let request = Self::build_request(model, &messages, &options);

        debug!("{} request to model {}", self.name, model);

        let response = self
            .client
            .post(self.api_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmExecError::Provider(format!("{} request failed: {}", self.name, e)))?;

        if response.status().is_success() {
            let body: ChatResponse = response.json().await.map_err(|e| {
                LlmExecError::Provider(format!("Failed to parse {} response: {}", self.name, e))
            })?;
            return self.parse_response(body);
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(error_text);

        Err(LlmExecError::from(parse_provider_error(
            status,
            &format!("{} API error: {}", self.name, message),
        )))
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        self.name
    }
}
