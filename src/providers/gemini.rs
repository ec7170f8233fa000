//! Native Gemini provider.
//!
//! Speaks the `generateContent` REST API directly with an API key
//! (`GEMINI_API_KEY` or `GOOGLE_API_KEY`).
//!
//! Thinking model support: Gemini 2.5 models return parts tagged `thought: true`.
//! This provider filters those out and only returns the final non-thought text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{LlmExecError, Result};

use super::{
    build_client, missing_key, parse_provider_error, ChatOptions, LLMProvider, LLMResponse,
    Message, Role, Usage,
};

/// Gemini v1beta REST API base.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Provider for Google's Gemini models.
pub struct GeminiProvider {
    api_key: Option<String>,
    api_base: String,
    model: String,
    client: Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(api_key: Option<&str>, model: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()).map(String::from),
            api_base: GEMINI_API_BASE.to_string(),
            model: model.to_string(),
            client: build_client(timeout),
        }
    }

    /// Point the provider at a different endpoint (proxies, tests).
    pub fn with_api_base(mut self, api_base: Option<&str>) -> Self {
        if let Some(base) = api_base.filter(|b| !b.is_empty()) {
            self.api_base = base.trim_end_matches('/').to_string();
        }
        self
    }

    /// Build a full `generateContent` request body from a slice of [`Message`]s.
    fn build_messages_body(&self, messages: &[Message], options: &ChatOptions) -> Value {
        // The first system message becomes the system instruction.
        let system_prompt = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str());

        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| {
                let gemini_role = match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                };
                json!({
                    "role": gemini_role,
                    "parts": [{ "text": &m.content }]
                })
            })
            .collect();

        let mut generation_config = json!({});
        if let Some(max_tokens) = options.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        if let Some(temp) = options.temperature {
            generation_config["temperature"] = json!(temp);
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config
        });

        if let Some(sys) = system_prompt {
            body["systemInstruction"] = json!({ "parts": [{ "text": sys }] });
        }

        body
    }

    /// Extract final answer text from a Gemini API response.
    ///
    /// Parts tagged `"thought": true` are intermediate reasoning and are
    /// skipped. If only thought parts exist, their text is returned instead.
    pub fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;

        let final_parts: Vec<&str> = parts
            .iter()
            .filter(|p| !p["thought"].as_bool().unwrap_or(false))
            .filter_map(|p| p["text"].as_str())
            .collect();

        if !final_parts.is_empty() {
            return Some(final_parts.join(""));
        }

        let thought_parts: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();

        if !thought_parts.is_empty() {
            Some(thought_parts.join(""))
        } else {
            None
        }
    }

    /// Parse token usage from a Gemini response if available.
    fn extract_usage(response: &Value) -> Option<Usage> {
        let meta = response.get("usageMetadata")?;
        let prompt = meta["promptTokenCount"].as_u64()? as u32;
        let completion = meta["candidatesTokenCount"].as_u64()? as u32;
        Some(Usage::new(prompt, completion))
    }

    fn api_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| missing_key("GEMINI_API_KEY"))?;
        let model = model.unwrap_or(&self.model);
        let body = self.build_messages_body(&messages, &options);

        debug!("Gemini request to model {}", model);

        let response = self
            .client
            .post(self.api_url(model))
            .query(&[("key", api_key)])
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmExecError::Provider(format!("Gemini request failed: {}", e)))?;

        if response.status().is_success() {
            let json: Value = response.json().await.map_err(|e| {
                LlmExecError::Provider(format!("Failed to parse Gemini response: {}", e))
            })?;

            let content = Self::extract_text(&json).ok_or_else(|| {
                LlmExecError::Provider("Gemini response contained no text".to_string())
            })?;

            let mut llm_response = LLMResponse::text(&content);
            if let Some(u) = Self::extract_usage(&json) {
                llm_response = llm_response.with_usage(u);
            }
            return Ok(llm_response);
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();

        let body_msg = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| {
                v["error"]["message"]
                    .as_str()
                    .map(|s| format!("Gemini API error: {}", s))
            })
            .unwrap_or_else(|| format!("Gemini API error: {}", error_text));

        Err(LlmExecError::from(parse_provider_error(status, &body_msg)))
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
