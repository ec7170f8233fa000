//! Cache key derivation.
//!
//! A key is a file path `<cache-dir>/<prompt>.<model>.<digest>.json`. The first
//! two parts are sanitized, readable hints for anyone browsing the cache; the
//! 10-hex-char SHA-256 prefix of `model + "-" + prompt` is what keeps keys apart
//! when the hints collide after sanitization.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::config::CacheDir;

/// Maximum length of the prompt part of the file name.
const PROMPT_PREFIX_LEN: usize = 30;

/// Number of hex characters of the digest kept in the file name.
const DIGEST_HEX_LEN: usize = 10;

static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[. ]").unwrap());

static UNSAFE_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());

/// Deterministic location of the cached response for one (model, prompt) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    path: PathBuf,
}

impl CacheKey {
    /// Derive the key for `model` and `prompt` inside `dir`.
    pub fn derive(dir: &CacheDir, model: &str, prompt: &str) -> Self {
        Self {
            path: dir.path().join(Self::file_name(model, prompt)),
        }
    }

    /// Build `<prompt>.<model>.<digest>.json` without a directory.
    pub fn file_name(model: &str, prompt: &str) -> String {
        format!(
            "{}.{}.{}.json",
            prompt_prefix(prompt),
            model_suffix(model),
            digest_suffix(model, prompt)
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Spaces and periods become `_`, anything else outside `[A-Za-z0-9_-]` is
/// dropped, then the result is cut to 30 characters.
fn prompt_prefix(prompt: &str) -> String {
    let underscored = SEPARATOR_RE.replace_all(prompt, "_");
    let cleaned = UNSAFE_CHARS_RE.replace_all(&underscored, "");
    // Only ASCII survives the filter, so a byte cut is a char cut.
    cleaned[..cleaned.len().min(PROMPT_PREFIX_LEN)].to_string()
}

/// Drops the provider namespace (`gemini/`, `openrouter/meta-llama/`), then
/// sanitizes like the prompt but without truncation.
fn model_suffix(model: &str) -> String {
    let name = model.rsplit('/').next().unwrap_or(model);
    let underscored = name.replace('.', "_");
    UNSAFE_CHARS_RE.replace_all(&underscored, "").into_owned()
}

fn digest_suffix(model: &str, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b"-");
    hasher.update(prompt.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..DIGEST_HEX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_deterministic() {
        let dir = CacheDir::new("/cache");
        let k1 = CacheKey::derive(&dir, "gemini/gemini-2.5-flash", "say hello");
        let k2 = CacheKey::derive(&dir, "gemini/gemini-2.5-flash", "say hello");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_file_name_layout() {
        let name = CacheKey::file_name("gemini/gemini-2.5-flash", "say hello");
        let parts: Vec<&str> = name.split('.').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "say_hello");
        assert_eq!(parts[1], "gemini-2_5-flash");
        assert_eq!(parts[2].len(), 10);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(parts[3], "json");
    }

    #[test]
    fn test_digest_matches_sha256_of_model_dash_prompt() {
        let expected = hex::encode(Sha256::digest(b"m-p"));
        assert_eq!(digest_suffix("m", "p"), expected[..10]);
    }

    #[test]
    fn test_path_is_inside_cache_dir() {
        let dir = CacheDir::new("/var/cache/llmexec");
        let key = CacheKey::derive(&dir, "gpt-4.1", "list files");
        assert_eq!(key.path().parent(), Some(Path::new("/var/cache/llmexec")));
    }

    #[test]
    fn test_prompt_prefix_sanitized_and_truncated() {
        let prefix = prompt_prefix("Rename all *.jpg files in ./photos to lowercase, please!");
        assert_eq!(prefix, "Rename_all__jpg_files_in__phot");
        assert_eq!(prefix.len(), 30);
    }

    #[test]
    fn test_prompt_prefix_drops_newlines_and_unicode() {
        assert_eq!(prompt_prefix("héllo\nwörld"), "hllowrld");
    }

    #[test]
    fn test_model_suffix_strips_namespace() {
        assert_eq!(model_suffix("openrouter/meta-llama/llama-3.1-70b"), "llama-3_1-70b");
        assert_eq!(model_suffix("gpt-4o"), "gpt-4o");
        assert_eq!(model_suffix("provider/"), "");
    }

    #[test]
    fn test_cache_key_model_aware() {
        let k1 = CacheKey::file_name("gpt-4", "hello");
        let k2 = CacheKey::file_name("claude", "hello");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_cache_key_prompt_aware() {
        let k1 = CacheKey::file_name("gpt-4", "hello");
        let k2 = CacheKey::file_name("gpt-4", "goodbye");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_sanitization_collision_separated_by_digest() {
        // Both prompts sanitize to "list_files" but must not share a file.
        let k1 = CacheKey::file_name("gpt-4", "list files");
        let k2 = CacheKey::file_name("gpt-4", "list.files");
        assert!(k1.starts_with("list_files.gpt-4."));
        assert!(k2.starts_with("list_files.gpt-4."));
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_namespace_only_difference_changes_digest() {
        // Same readable parts, different provider prefix.
        let k1 = CacheKey::file_name("gemini/gemini-2.5-pro", "x");
        let k2 = CacheKey::file_name("vertex/gemini-2.5-pro", "x");
        assert_ne!(k1, k2);
    }
}
