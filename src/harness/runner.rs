//! harness/runner.rs
//!
//! Invocation of the external test runner. Everything above this module
//! only sees STDOUT text.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};

pub trait CommandRunner {
    /// Run with `flags` appended; STDOUT on success.
    fn run(&self, flags: &[String]) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    binary: PathBuf,
    args: Vec<String>,
    cwd: PathBuf,
}

impl ProcessRunner {
    pub fn new(binary: &str, args: Vec<String>, cwd: &Path) -> Self {
        Self {
            binary: resolve_binary(binary, cwd),
            args,
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn from_config(config: &Config, root: &Path) -> Self {
        Self::new(&config.runner.binary, config.runner.args.clone(), root)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, flags: &[String]) -> Result<String> {
        debug!(binary = %self.binary.display(), ?flags, "invoking test runner");

        let output = Command::new(&self.binary)
            .args(&self.args)
            .args(flags)
            .current_dir(&self.cwd)
            .output()
            .map_err(|e| {
                Error::RunnerInvocationFailed(format!("{}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "test runner reported failure");
            return Err(Error::RunnerInvocationFailed(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Relative paths with a directory part (`vendor/bin/pest`) are resolved
/// against the project root; bare names go through `PATH`.
fn resolve_binary(binary: &str, cwd: &Path) -> PathBuf {
    let path = Path::new(binary);
    if path.is_relative() && path.components().count() > 1 {
        cwd.join(path)
    } else {
        path.to_path_buf()
    }
}
