//! Run generated code as a child process.
//!
//! The code is written to a uniquely named temp file, the process moves into
//! the directory of the script that asked for it (so relative paths in the
//! request mean what the user meant), and the interpreter runs with the
//! terminal's stdin/stdout/stderr. The temp file is removed on every path out.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tempfile::TempPath;
use tracing::debug;

use crate::config::Config;
use crate::error::{LlmExecError, Result};

/// Runs generated Python programs.
#[derive(Debug, Clone)]
pub struct Executor {
    interpreter: String,
    /// Where temp scripts are written; the system temp dir when `None`.
    temp_dir: Option<PathBuf>,
}

impl Executor {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            temp_dir: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.python.clone()).with_temp_dir(config.temp_dir.clone())
    }

    pub fn with_temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    /// Run `code` from the directory containing `script_path` and return the
    /// child's exit code.
    pub fn execute(&self, code: &str, script_path: &Path) -> Result<i32> {
        let work_dir = working_dir_for(script_path)?;
        self.execute_in(code, &work_dir)
    }

    /// Run `code` with `work_dir` as the process working directory.
    pub fn execute_in(&self, code: &str, work_dir: &Path) -> Result<i32> {
        let script = write_temp_script(code, self.temp_dir.as_deref())?;
        let result = self.run(&script, work_dir);

        // Dropping a TempPath also deletes, but swallows the error; close()
        // lets the failure reach the debug log.
        let path = script.to_path_buf();
        if let Err(e) = script.close() {
            debug!(path = %path.display(), error = %e, "Failed to remove temporary script");
        }

        result
    }

    fn run(&self, script: &Path, work_dir: &Path) -> Result<i32> {
        std::env::set_current_dir(work_dir)?;
        debug!(
            interpreter = %self.interpreter,
            script = %script.display(),
            cwd = %work_dir.display(),
            "Executing generated code"
        );

        let status = Command::new(&self.interpreter)
            .arg(script)
            .status()
            .map_err(|source| LlmExecError::Spawn {
                program: self.interpreter.clone(),
                source,
            })?;

        let code = exit_code(status);
        debug!(code, "Generated code exited");
        Ok(code)
    }
}

/// Write `code` to a fresh `llmexec-*.py` file in `dir` (or the system temp
/// dir) and close it.
fn write_temp_script(code: &str, dir: Option<&Path>) -> Result<TempPath> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("llmexec-").suffix(".py");
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(code.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

/// Directory containing `script_path`, made absolute against the current dir.
pub fn working_dir_for(script_path: &Path) -> Result<PathBuf> {
    let absolute = if script_path.is_absolute() {
        script_path.to_path_buf()
    } else {
        std::env::current_dir()?.join(script_path)
    };
    match absolute.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => Ok(absolute),
    }
}

/// The child's exit code. A Unix child killed by a signal reports `128 + signal`
/// as a shell would.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
