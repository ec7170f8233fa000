//! Request resolution from the `script` argument.
//!
//! The argument is either a path to a request file (typically run through a
//! `#!/usr/bin/env llmexec` shebang) or the request text itself.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{LlmExecError, Result};

/// Where the request text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOrigin {
    /// Read from this file.
    File(PathBuf),
    /// The argument was the request itself.
    Inline,
}

/// A natural-language request ready for generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub text: String,
    pub origin: ScriptOrigin,
}

impl Request {
    /// Path of the script file, if the request came from one.
    pub fn script_path(&self) -> Option<&Path> {
        match &self.origin {
            ScriptOrigin::File(path) => Some(path),
            ScriptOrigin::Inline => None,
        }
    }
}

/// Turn the `script` argument into a [`Request`].
///
/// An existing file is read as UTF-8 and trimmed; anything else is taken as
/// the request text verbatim. A leading shebang line is removed in both cases.
pub fn resolve_request(arg: &str) -> Result<Request> {
    let path = Path::new(arg);
    let (content, origin) = if path.is_file() {
        let content = std::fs::read_to_string(path).map_err(|source| LlmExecError::ScriptRead {
            path: path.to_path_buf(),
            source,
        })?;
        (
            content.trim().to_string(),
            ScriptOrigin::File(path.to_path_buf()),
        )
    } else {
        debug!("'{}' is not a file. Interpreting as direct message.", arg);
        (arg.to_string(), ScriptOrigin::Inline)
    };

    let text = strip_shebang(&content);
    if text.trim().is_empty() {
        return Err(LlmExecError::EmptyContent);
    }
    Ok(Request { text, origin })
}

/// Drop the first line when it is a `#!` shebang, trimming what remains.
/// Content without a shebang is returned unchanged.
pub fn strip_shebang(content: &str) -> String {
    if content.starts_with("#!") {
        match content.split_once('\n') {
            Some((_, rest)) => rest.trim().to_string(),
            None => String::new(),
        }
    } else {
        content.to_string()
    }
}
