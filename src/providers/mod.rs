//! Completion providers.
//!
//! Each provider speaks one vendor's REST API behind the [`LLMProvider`]
//! trait. [`build_provider`] picks one from the model identifier:
//!
//! | model id                          | provider            |
//! |-----------------------------------|---------------------|
//! | `gemini/...` or `gemini-*`        | Gemini              |
//! | `anthropic/...` or `claude-*`     | Anthropic           |
//! | `openrouter/...`                  | OpenRouter (OpenAI wire format) |
//! | `openai/...` or anything else     | OpenAI              |
//!
//! The provider prefix is part of the cache key but is stripped before the
//! model name goes on the wire (see [`api_model_id`]).

pub mod anthropic;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::error::{LlmExecError, Result};

// ── Messages ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Role name in the OpenAI/Anthropic wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

/// Sampling options for a single call. `None` leaves the provider default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

impl LLMResponse {
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

// ── Provider trait ───────────────────────────────────────────────────────────

/// A chat-completion backend.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send `messages` and return the assistant's reply.
    ///
    /// `model` overrides [`LLMProvider::default_model`] when given.
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse>;

    fn default_model(&self) -> &str;

    fn name(&self) -> &str;
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Classification of a non-2xx provider response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    RateLimit(String),
    #[error("{0}")]
    Other(String),
}

/// Map an HTTP status and error message to a [`ProviderError`].
pub fn parse_provider_error(status: u16, message: &str) -> ProviderError {
    let message = format!("HTTP {}: {}", status, message);
    match status {
        401 | 403 => ProviderError::Auth(message),
        429 => ProviderError::RateLimit(message),
        _ => ProviderError::Other(message),
    }
}

impl From<ProviderError> for LlmExecError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Auth(msg) => LlmExecError::Unauthorized(msg),
            ProviderError::RateLimit(msg) => LlmExecError::RateLimited(msg),
            ProviderError::Other(msg) => LlmExecError::Provider(msg),
        }
    }
}

/// Error for a provider invoked without credentials.
pub(crate) fn missing_key(env_var: &str) -> LlmExecError {
    LlmExecError::Config(format!(
        "{} is not set (export it or add it to a .env file)",
        env_var
    ))
}

// ── Routing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Anthropic,
    OpenRouter,
}

impl ProviderKind {
    const ALL: [ProviderKind; 4] = [
        ProviderKind::Gemini,
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::OpenRouter,
    ];

    /// Namespace prefix that selects this provider explicitly.
    pub fn prefix(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini/",
            ProviderKind::OpenAi => "openai/",
            ProviderKind::Anthropic => "anthropic/",
            ProviderKind::OpenRouter => "openrouter/",
        }
    }

    /// Choose the provider for a model identifier.
    pub fn for_model(model: &str) -> Self {
        if let Some(kind) = Self::ALL.iter().find(|k| model.starts_with(k.prefix())) {
            return *kind;
        }
        let name = model.to_ascii_lowercase();
        if name.starts_with("gemini") {
            ProviderKind::Gemini
        } else if name.starts_with("claude") {
            ProviderKind::Anthropic
        } else {
            ProviderKind::OpenAi
        }
    }
}

/// Model name as sent to the provider: the routing prefix, if any, removed.
pub fn api_model_id(model: &str) -> &str {
    ProviderKind::ALL
        .iter()
        .find_map(|k| model.strip_prefix(k.prefix()))
        .unwrap_or(model)
}

/// Build the provider that serves `model`.
///
/// Construction never fails; missing credentials surface on the first call,
/// so a fully cached run needs no API key.
pub fn build_provider(config: &Config, model: &str) -> Box<dyn LLMProvider> {
    let api_model = api_model_id(model);
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let providers = &config.providers;

    match ProviderKind::for_model(model) {
        ProviderKind::Gemini => Box::new(
            GeminiProvider::new(providers.gemini.api_key.as_deref(), api_model, timeout)
                .with_api_base(providers.gemini.api_base.as_deref()),
        ),
        ProviderKind::Anthropic => Box::new(
            AnthropicProvider::new(providers.anthropic.api_key.as_deref(), api_model, timeout)
                .with_api_base(providers.anthropic.api_base.as_deref()),
        ),
        ProviderKind::OpenAi => Box::new(
            OpenAiProvider::openai(providers.openai.api_key.as_deref(), api_model, timeout)
                .with_api_base(providers.openai.api_base.as_deref()),
        ),
        ProviderKind::OpenRouter => Box::new(
            OpenAiProvider::openrouter(providers.openrouter.api_key.as_deref(), api_model, timeout)
                .with_api_base(providers.openrouter.api_base.as_deref()),
        ),
    }
}

/// Shared HTTP client construction for all providers.
pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_by_prefix() {
        assert_eq!(
            ProviderKind::for_model("gemini/gemini-2.5-flash"),
            ProviderKind::Gemini
        );
        assert_eq!(ProviderKind::for_model("openai/gpt-4.1"), ProviderKind::OpenAi);
        assert_eq!(
            ProviderKind::for_model("anthropic/claude-sonnet-4-20250514"),
            ProviderKind::Anthropic
        );
        assert_eq!(
            ProviderKind::for_model("openrouter/meta-llama/llama-3.1-70b"),
            ProviderKind::OpenRouter
        );
    }

    #[test]
    fn test_routing_by_bare_name() {
        assert_eq!(ProviderKind::for_model("gemini-2.5-pro"), ProviderKind::Gemini);
        assert_eq!(ProviderKind::for_model("Claude-3-haiku"), ProviderKind::Anthropic);
        assert_eq!(ProviderKind::for_model("gpt-4o-mini"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::for_model("o3"), ProviderKind::OpenAi);
    }

    #[test]
    fn test_api_model_id_strips_one_prefix() {
        assert_eq!(api_model_id("gemini/gemini-2.5-flash"), "gemini-2.5-flash");
        assert_eq!(
            api_model_id("openrouter/meta-llama/llama-3.1-70b"),
            "meta-llama/llama-3.1-70b"
        );
        assert_eq!(api_model_id("gpt-4.1"), "gpt-4.1");
        assert_eq!(api_model_id("groq/llama3"), "groq/llama3");
    }

    #[test]
    fn test_parse_provider_error_classifies_status() {
        assert!(matches!(
            parse_provider_error(401, "bad key"),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            parse_provider_error(403, "forbidden"),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            parse_provider_error(429, "slow down"),
            ProviderError::RateLimit(_)
        ));
        assert!(matches!(
            parse_provider_error(500, "boom"),
            ProviderError::Other(_)
        ));
    }

    #[test]
    fn test_provider_error_into_crate_error() {
        let err = LlmExecError::from(parse_provider_error(429, "quota"));
        assert!(matches!(err, LlmExecError::RateLimited(ref m) if m.contains("quota")));
    }

    #[test]
    fn test_build_provider_names() {
        let cfg = Config::default();
        assert_eq!(build_provider(&cfg, "gemini/gemini-2.5-flash").name(), "gemini");
        assert_eq!(build_provider(&cfg, "gpt-4.1").name(), "openai");
        assert_eq!(build_provider(&cfg, "claude-3-5-haiku").name(), "anthropic");
        assert_eq!(build_provider(&cfg, "openrouter/x/y").name(), "openrouter");
    }

    #[test]
    fn test_build_provider_uses_stripped_model() {
        let cfg = Config::default();
        let provider = build_provider(&cfg, "gemini/gemini-2.5-flash");
        assert_eq!(provider.default_model(), "gemini-2.5-flash");
    }

    #[test]
    fn test_usage_total() {
        let u = Usage::new(10, 5);
        assert_eq!(u.total_tokens, 15);
    }

    #[test]
    fn test_chat_options_builder() {
        let opts = ChatOptions::new().with_max_tokens(4000).with_temperature(0.1);
        assert_eq!(opts.max_tokens, Some(4000));
        assert_eq!(opts.temperature, Some(0.1));
    }
}
