//! Error types for llmexec.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the llmexec pipeline.
///
/// Cache corruption and temp-file cleanup failures never show up here; they
/// are logged and absorbed where they happen.
#[derive(Debug, Error)]
pub enum LlmExecError {
    /// The script path names a file that exists but could not be read.
    #[error("Error reading script file '{}'", path.display())]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request text is empty once the shebang line is removed.
    #[error("Empty script content")]
    EmptyContent,

    /// The completion call failed; the underlying cause is kept as the source.
    #[error("LLM API error")]
    Generation {
        #[source]
        source: Box<LlmExecError>,
    },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The interpreter for the generated program could not be started.
    #[error("Failed to launch '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LlmExecError {
    /// Wrap any failure of the completion call into the single generation kind.
    pub fn generation(cause: LlmExecError) -> Self {
        Self::Generation {
            source: Box::new(cause),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LlmExecError>;
