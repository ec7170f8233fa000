//! Cached response generation.
//!
//! [`ResponseGenerator::generate`] returns the cached response for a
//! (model, prompt) pair when one is valid, and otherwise asks the provider and
//! caches the answer.

use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStore};
use crate::error::{LlmExecError, Result};
use crate::prompt::SYSTEM_PROMPT;
use crate::providers::{api_model_id, ChatOptions, LLMProvider, Message};

/// Low temperature keeps regenerated code close to what was cached.
pub const GENERATION_TEMPERATURE: f32 = 0.1;

pub const GENERATION_MAX_TOKENS: u32 = 4000;

pub struct ResponseGenerator {
    provider: Box<dyn LLMProvider>,
    store: CacheStore,
}

impl ResponseGenerator {
    pub fn new(provider: Box<dyn LLMProvider>, store: CacheStore) -> Self {
        Self { provider, store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Produce the raw response for `prompt` under `model`.
    ///
    /// The cache is neither read nor written when `no_cache` is set or `ttl`
    /// is negative. Any provider failure comes back as
    /// [`LlmExecError::Generation`] with the provider error as its source.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        ttl: i64,
        no_cache: bool,
    ) -> Result<String> {
        let key = self.store.key_for(model, prompt);
        let caching = !no_cache && ttl >= 0;

        if caching {
            if let Some(content) = self.store.lookup(&key, ttl) {
                return Ok(content);
            }
        }

        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)];
        let options = ChatOptions::new()
            .with_temperature(GENERATION_TEMPERATURE)
            .with_max_tokens(GENERATION_MAX_TOKENS);

        debug!(provider = self.provider.name(), model, "Requesting completion");
        let response = self
            .provider
            .chat(messages, Some(api_model_id(model)), options)
            .await
            .map_err(LlmExecError::generation)?;

        if let Some(usage) = response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Completion received"
            );
        }
        let content = response.content.trim().to_string();

        if caching {
            let entry = CacheEntry::new(model, prompt, &content);
            if let Err(e) = self.store.store(&key, &entry) {
                warn!("Failed to cache response at {}: {}", key.path().display(), e);
            }
        }

        Ok(content)
    }
}
