//! TTL-governed cache of LLM responses, one JSON document per file.
//!
//! TTL semantics (seconds):
//! - `0`   never expires
//! - `> 0` expires once the file's mtime is `ttl` seconds old; expired files are deleted
//! - `< 0` caching disabled, the filesystem is not touched
//!
//! There is no locking. Concurrent processes may regenerate the same entry and
//! race on the write; writes land via rename so a reader sees either the old or
//! the new document, and anything unparsable is treated as a miss.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CacheDir;
use crate::error::{LlmExecError, Result};

use super::CacheKey;

/// A single cached LLM response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub model: String,
    pub prompt: String,
    /// The raw response text, before code extraction.
    pub content: String,
    /// Unix timestamp (seconds) when the response was generated.
    pub timestamp: f64,
}

impl CacheEntry {
    /// Build an entry stamped with the current time.
    pub fn new(model: &str, prompt: &str, content: &str) -> Self {
        Self {
            model: model.to_string(),
            prompt: prompt.to_string(),
            content: content.to_string(),
            timestamp: now_secs(),
        }
    }
}

/// Reads and writes cache entries under a [`CacheDir`].
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: CacheDir,
}

impl CacheStore {
    pub fn new(dir: CacheDir) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &CacheDir {
        &self.dir
    }

    /// Key for `(model, prompt)` inside this store's directory.
    pub fn key_for(&self, model: &str, prompt: &str) -> CacheKey {
        CacheKey::derive(&self.dir, model, prompt)
    }

    /// Return the cached content for `key`, or `None` on a miss.
    ///
    /// Expired entries are deleted as a side effect. Unreadable or corrupt
    /// files are misses, never errors.
    pub fn lookup(&self, key: &CacheKey, ttl: i64) -> Option<String> {
        if ttl < 0 {
            return None;
        }
        let path = key.path();

        let metadata = match std::fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return None,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %path.display(), error = %e, "Cache entry not accessible");
                }
                return None;
            }
        };

        if ttl > 0 {
            let age = file_age(&metadata);
            if age >= Duration::from_secs(ttl as u64) {
                debug!(
                    path = %path.display(),
                    age_secs = age.as_secs(),
                    ttl,
                    "Cache expired"
                );
                remove_expired(path);
                return None;
            }
        }

        let entry = read_entry(path)?;
        debug!(path = %path.display(), "Using cached response");
        Some(entry.content)
    }

    /// Write `entry` at `key`, replacing any existing file.
    ///
    /// The document is written to a temp file next to the target and renamed
    /// into place, so a concurrent `lookup` never observes a partial write.
    pub fn store(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let target = key.path();
        let parent = target.parent().unwrap_or_else(|| self.dir.path());
        std::fs::create_dir_all(parent)?;

        let data = serde_json::to_string_pretty(entry)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".llmexec-")
            .suffix(".tmp")
            .tempfile_in(parent)?;
        tmp.write_all(data.as_bytes())?;
        tmp.flush()?;
        tmp.persist(target)
            .map_err(|e| LlmExecError::Io(e.error))?;

        debug!(path = %target.display(), "Cached response");
        Ok(())
    }
}

fn read_entry(path: &Path) -> Option<CacheEntry> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to read cache entry {}, ignoring: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&data) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Cache entry {} is corrupt, ignoring: {}", path.display(), e);
            None
        }
    }
}

/// Best-effort delete; another process may have removed the file already.
fn remove_expired(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!(path = %path.display(), error = %e, "Could not remove expired cache entry");
    }
}

/// Age from mtime. A clock skewed into the future reads as age zero.
fn file_age(metadata: &std::fs::Metadata) -> Duration {
    metadata
        .modified()
        .ok()
        .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
        .unwrap_or_default()
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
