//! Cache directory resolution.
//!
//! Resolved once at startup and handed to [`crate::cache::CacheStore`]; nothing
//! downstream looks at the working directory or the environment again.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Name of the project-local cache directory looked up in the working directory.
pub const LOCAL_CACHE_DIR_NAME: &str = ".llmexec-cache";

/// Directory holding one JSON file per cached response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDir {
    path: PathBuf,
}

impl CacheDir {
    /// Use `path` as-is.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Pick the cache directory.
    ///
    /// 1. `<cwd>/.llmexec-cache` when it already exists as a directory
    /// 2. `configured` (config file or `LLMEXEC_CACHE_DIR`)
    /// 3. the per-user platform cache dir, e.g. `~/.cache/llmexec`
    pub fn resolve(cwd: &Path, configured: Option<&Path>) -> Self {
        let local = cwd.join(LOCAL_CACHE_DIR_NAME);
        if local.is_dir() {
            debug!(path = %local.display(), "Using project-local cache directory");
            return Self::new(local);
        }
        if let Some(dir) = configured {
            return Self::new(dir);
        }
        let user = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("llmexec");
        Self::new(user)
    }

    /// Create the directory (and parents) if absent.
    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_cache_dir_wins() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join(LOCAL_CACHE_DIR_NAME)).unwrap();
        let dir = CacheDir::resolve(tmp.path(), Some(Path::new("/elsewhere")));
        assert_eq!(dir.path(), tmp.path().join(LOCAL_CACHE_DIR_NAME));
    }

    #[test]
    fn test_local_cache_file_is_not_a_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(LOCAL_CACHE_DIR_NAME), "x").unwrap();
        let dir = CacheDir::resolve(tmp.path(), Some(Path::new("/elsewhere")));
        assert_eq!(dir.path(), Path::new("/elsewhere"));
    }

    #[test]
    fn test_falls_back_to_user_cache_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = CacheDir::resolve(tmp.path(), None);
        assert!(dir.path().ends_with("llmexec"));
    }

    #[test]
    fn test_ensure_creates_nested_dirs() {
        let tmp = TempDir::new().unwrap();
        let dir = CacheDir::new(tmp.path().join("a").join("b"));
        dir.ensure().unwrap();
        assert!(dir.path().is_dir());
        // idempotent
        dir.ensure().unwrap();
    }
}
