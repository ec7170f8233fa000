//! Command-line interface.

mod run;

use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llmexec::config::{CacheDir, Config};

use run::cmd_run;

const EXAMPLES: &str = "\
Examples:
  llmexec \"say hello\"
  llmexec --model openai/gpt-4.1 --execute script.llm
  llmexec --dry-run script.llm
  llmexec --model anthropic/claude-sonnet-4-20250514 -o rename.py script.llm

Scripts can start with `#!/usr/bin/env llmexec` and be run directly.

Environment variables:
  GEMINI_API_KEY / GOOGLE_API_KEY   Gemini models (gemini/...)
  OPENAI_API_KEY                    OpenAI models (openai/..., gpt-*)
  ANTHROPIC_API_KEY                 Anthropic models (anthropic/..., claude-*)
  OPENROUTER_API_KEY                OpenRouter models (openrouter/...)
  LLMEXEC_MODEL                     Default model
  LLMEXEC_PYTHON                    Interpreter for generated code
  LLMEXEC_CACHE_DIR                 Cache directory (./.llmexec-cache wins if present)
  LLMEXEC_TEMP_DIR                  Directory for temporary generated scripts";

#[derive(Parser, Debug)]
#[command(name = "llmexec", version)]
#[command(about = "LLM-powered shebang script executor")]
#[command(after_help = EXAMPLES)]
pub(crate) struct Cli {
    /// Script file containing a natural-language request, or the request text itself
    pub script: String,

    /// LLM model to use [default: gemini/gemini-2.5-flash]
    #[arg(long)]
    pub model: Option<String>,

    /// Execute the generated code even when --output is given
    #[arg(short = 'x', long)]
    pub execute: bool,

    /// Save generated code to a file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Show generated code without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Cache time-to-live in seconds (0 for infinite, -1 to disable caching for this call)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub cache_ttl: i64,

    /// Disable caching for this call
    #[arg(long)]
    pub no_cache: bool,
}

/// Parse arguments, set up logging and configuration, run, and return the
/// process exit code.
pub(crate) async fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: cannot determine current directory: {}", e);
            return 1;
        }
    };
    let cache_dir = CacheDir::resolve(&cwd, config.cache_dir.as_deref());

    match cmd_run(cli, config, cache_dir, cwd).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// Logs go to stderr. `RUST_LOG` wins; otherwise `--verbose` enables debug
/// output for this crate.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "llmexec=debug,warn" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}
