//! Configuration loading.
//!
//! Sources, lowest priority first: built-in defaults, the JSON file at
//! `~/.config/llmexec/config.json`, then environment variables (after `.env`
//! has been loaded by the binary).

pub mod cache_dir;

pub use cache_dir::{CacheDir, LOCAL_CACHE_DIR_NAME};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LlmExecError, Result};

/// Model used when neither `--model`, `LLMEXEC_MODEL` nor the config file names one.
pub const DEFAULT_MODEL: &str = "gemini/gemini-2.5-flash";

/// Default HTTP timeout for completion calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[cfg(windows)]
const DEFAULT_PYTHON: &str = "python";
#[cfg(not(windows))]
const DEFAULT_PYTHON: &str = "python3";

/// Credentials and endpoint for one completion provider.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    /// Override for the provider's REST base URL.
    pub api_base: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub gemini: ProviderConfig,
    pub openai: ProviderConfig,
    pub anthropic: ProviderConfig,
    pub openrouter: ProviderConfig,
}

/// Top-level llmexec configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model identifier, optionally prefixed with a provider (`gemini/...`).
    pub model: String,
    /// Interpreter used to run generated programs.
    pub python: String,
    /// Explicit cache directory. The project-local `.llmexec-cache` still wins.
    pub cache_dir: Option<PathBuf>,
    /// Directory for the temporary scripts handed to the interpreter.
    pub temp_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub providers: ProvidersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            python: DEFAULT_PYTHON.to_string(),
            cache_dir: None,
            temp_dir: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    /// Path of the optional config file.
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("llmexec")
            .join("config.json")
    }

    /// Load the config file (if present) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_path(&Self::path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a specific file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).map_err(|e| {
                LlmExecError::Config(format!("Invalid config file {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(LlmExecError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup. Empty values are ignored.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(model) = get("LLMEXEC_MODEL") {
            self.model = model;
        }
        if let Some(python) = get("LLMEXEC_PYTHON") {
            self.python = python;
        }
        if let Some(dir) = get("LLMEXEC_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = get("LLMEXEC_TEMP_DIR") {
            self.temp_dir = Some(PathBuf::from(dir));
        }
        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.providers.gemini.api_key = Some(key);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.providers.openai.api_key = Some(key);
        }
        if let Some(base) = get("OPENAI_BASE_URL") {
            self.providers.openai.api_base = Some(base);
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.providers.anthropic.api_key = Some(key);
        }
        if let Some(key) = get("OPENROUTER_API_KEY") {
            self.providers.openrouter.api_key = Some(key);
        }
    }
}
