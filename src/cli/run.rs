//! Generate-and-run command handler.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use llmexec::cache::CacheStore;
use llmexec::config::{CacheDir, Config};
use llmexec::providers::build_provider;
use llmexec::{extract_code, resolve_request, Executor, ResponseGenerator, ScriptOrigin};

use super::Cli;

const SEPARATOR_WIDTH: usize = 50;

/// Resolve the request, generate (or reuse) code for it, then show, save
/// and/or execute it. Returns the process exit code.
pub(crate) async fn cmd_run(
    cli: Cli,
    config: Config,
    cache_dir: CacheDir,
    cwd: PathBuf,
) -> Result<i32> {
    let request = resolve_request(&cli.script)?;
    let model = cli.model.clone().unwrap_or_else(|| config.model.clone());
    let separator = "-".repeat(SEPARATOR_WIDTH);

    if cli.verbose {
        println!("Using model: {}", model);
        println!("Request: {}", request.text);
        println!("{}", separator);
    }

    cache_dir.ensure().with_context(|| {
        format!(
            "Failed to create cache directory {}",
            cache_dir.path().display()
        )
    })?;
    debug!(cache_dir = %cache_dir.path().display(), "Using cache directory");

    let generator = ResponseGenerator::new(
        build_provider(&config, &model),
        CacheStore::new(cache_dir),
    );
    let no_cache = cli.no_cache || cli.cache_ttl < 0;
    let response = generator
        .generate(&model, &request.text, cli.cache_ttl, no_cache)
        .await?;
    let code = extract_code(&response);

    if cli.verbose {
        println!("Generated code:");
        println!("{}", separator);
    }
    if cli.dry_run || cli.verbose {
        println!("{}", code);
    }
    if cli.dry_run {
        return Ok(0);
    }

    if let Some(output) = &cli.output {
        std::fs::write(output, &code)
            .with_context(|| format!("Failed to write generated code to {}", output.display()))?;
        if cli.verbose {
            println!("\nCode saved to: {}", output.display());
        }
    }

    if !(cli.execute || cli.output.is_none()) {
        return Ok(0);
    }

    if cli.verbose {
        println!("\nExecuting generated code:");
        println!("{}", separator);
    }
    // The child shares our stdout; anything printed so far must land first.
    std::io::stdout().flush().ok();

    let executor = Executor::from_config(&config);
    let exit_code = match &request.origin {
        ScriptOrigin::File(path) => executor.execute(&code, path)?,
        ScriptOrigin::Inline => executor.execute_in(&code, &cwd)?,
    };
    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use llmexec::cache::CacheEntry;
    use llmexec::LlmExecError;
    use tempfile::TempDir;

    const MODEL: &str = "gemini/gemini-2.5-flash";

    /// A config whose provider has no key, so any cache miss fails.
    fn offline_config() -> Config {
        Config {
            model: MODEL.to_string(),
            ..Config::default()
        }
    }

    fn seed(dir: &CacheDir, prompt: &str, content: &str) {
        let store = CacheStore::new(dir.clone());
        let key = store.key_for(MODEL, prompt);
        store
            .store(&key, &CacheEntry::new(MODEL, prompt, content))
            .unwrap();
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("llmexec").chain(args.iter().copied())).unwrap()
    }

    #[tokio::test]
    async fn test_dry_run_uses_cache_and_returns_zero() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = CacheDir::new(tmp.path().join("cache"));
        seed(&cache_dir, "say hello", "```python\nprint('hello')\n```");

        let code = cmd_run(
            cli(&["--dry-run", "say hello"]),
            offline_config(),
            cache_dir,
            tmp.path().to_path_buf(),
        )
        .await
        .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_output_only_saves_extracted_code() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = CacheDir::new(tmp.path().join("cache"));
        seed(&cache_dir, "say hello", "Sure:\n```python\nprint('hello')\n```");
        let out = tmp.path().join("hello.py");

        let code = cmd_run(
            cli(&["-o", out.to_str().unwrap(), "say hello"]),
            offline_config(),
            cache_dir,
            tmp.path().to_path_buf(),
        )
        .await
        .unwrap();
        assert_eq!(code, 0);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "print('hello')");
    }

    #[tokio::test]
    async fn test_script_file_request_is_shebang_stripped() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = CacheDir::new(tmp.path().join("cache"));
        seed(&cache_dir, "list the files", "import os\nprint(os.listdir('.'))");
        let script = tmp.path().join("list.llm");
        std::fs::write(&script, "#!/usr/bin/env llmexec\nlist the files\n").unwrap();
        let out = tmp.path().join("list.py");

        let code = cmd_run(
            cli(&["--output", out.to_str().unwrap(), script.to_str().unwrap()]),
            offline_config(),
            cache_dir,
            tmp.path().to_path_buf(),
        )
        .await
        .unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "import os\nprint(os.listdir('.'))"
        );
    }

    #[tokio::test]
    async fn test_cache_dir_is_created() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("cache");
        let cache_dir = CacheDir::new(&dir);

        // Nothing cached and no key configured: generation fails, but only
        // after the cache directory exists.
        let err = cmd_run(
            cli(&["--dry-run", "say hello"]),
            offline_config(),
            cache_dir,
            tmp.path().to_path_buf(),
        )
        .await
        .unwrap_err();
        assert!(dir.is_dir());
        let err = err.downcast::<LlmExecError>().unwrap();
        assert!(matches!(err, LlmExecError::Generation { .. }));
    }

    #[tokio::test]
    async fn test_empty_request_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = cmd_run(
            cli(&["--dry-run", "   "]),
            offline_config(),
            CacheDir::new(tmp.path()),
            tmp.path().to_path_buf(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Empty script content");
    }

    #[tokio::test]
    async fn test_negative_ttl_skips_cached_entry() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = CacheDir::new(tmp.path().join("cache"));
        seed(&cache_dir, "say hello", "print('hello')");

        // The cached entry would answer, but caching is off for this call.
        let result = cmd_run(
            cli(&["--dry-run", "--cache-ttl", "-1", "say hello"]),
            offline_config(),
            cache_dir,
            tmp.path().to_path_buf(),
        )
        .await;
        assert!(result.is_err());
    }
}
