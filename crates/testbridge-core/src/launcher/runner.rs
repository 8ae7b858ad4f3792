//! Hands control to the framework's own entry point.

use std::io::Write;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use crate::python::PythonConfig;

/// Runs a rendered launch script with the framework arguments and returns
/// the process exit code.
#[async_trait]
pub trait FrameworkRunner: Send + Sync {
    async fn run(&self, script: &str, args: &[String]) -> Result<i32>;
}

/// Writes the script to a temporary file and runs it with inherited stdio.
///
/// There is no timeout: an attach wait blocks until the IDE connects or the
/// process is killed.
#[derive(Debug, Clone, Default)]
pub struct PythonRunner {
    python: PythonConfig,
}

impl PythonRunner {
    pub fn new(python: PythonConfig) -> Self {
        Self { python }
    }
}

#[async_trait]
impl FrameworkRunner for PythonRunner {
    async fn run(&self, script: &str, args: &[String]) -> Result<i32> {
        let mut file = tempfile::Builder::new()
            .prefix("testbridge_launch_")
            .suffix(".py")
            .tempfile()
            .context("failed to create launch script")?;
        file.write_all(script.as_bytes())
            .and_then(|()| file.flush())
            .context("failed to write launch script")?;

        tracing::debug!(script = %file.path().display(), args = ?args, "starting test framework");

        let status = Command::new(&self.python.interpreter)
            .arg(file.path())
            .args(args)
            .status()
            .await
            .with_context(|| {
                format!(
                    "failed to start python interpreter {}",
                    self.python.interpreter.display()
                )
            })?;

        // Killed by a signal: report a generic failure.
        Ok(status.code().unwrap_or(1))
    }
}
