//! llmexec: turn a natural-language request into a Python program and run it.
//!
//! The pipeline is: resolve the request ([`script`]), generate a response through a
//! cached LLM call ([`generator`], [`cache`], [`providers`]), recover the code from
//! the response ([`extract`]) and run it as a child process ([`exec`]).

pub mod cache;
pub mod config;
pub mod error;
pub mod exec;
pub mod extract;
pub mod generator;
pub mod prompt;
pub mod providers;
pub mod script;

pub use cache::{CacheEntry, CacheKey, CacheStore};
pub use config::{CacheDir, Config};
pub use error::{LlmExecError, Result};
pub use exec::Executor;
pub use extract::extract_code;
pub use generator::ResponseGenerator;
pub use script::{resolve_request, Request, ScriptOrigin};
