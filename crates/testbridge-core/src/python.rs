//! Running embedded Python scripts through the configured interpreter.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Line printed by embedded scripts right before their JSON payload.
pub const RESULT_MARKER: &str = "==testbridge-result==";

/// Interpreter settings shared by discovery and the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonConfig {
    /// Interpreter executable, found via `$PATH` when not absolute.
    pub interpreter: PathBuf,
    /// Upper bound on a discovery subprocess.
    pub discovery_timeout: Duration,
}

impl PythonConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    #[cfg(windows)]
    pub const DEFAULT_INTERPRETER: &str = "python";
    #[cfg(not(windows))]
    pub const DEFAULT_INTERPRETER: &str = "python3";

    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            discovery_timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERPRETER)
    }
}

/// Captured result of one script run.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    /// `None` when the interpreter was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    /// Split stdout at [`RESULT_MARKER`] into the framework's own output
    /// and the payload that follows the marker.
    pub fn split_payload(&self) -> (&str, Option<&str>) {
        let needle = format!("\n{RESULT_MARKER}\n");
        match self.stdout.rfind(&needle) {
            Some(pos) => (
                &self.stdout[..pos],
                Some(self.stdout[pos + needle.len()..].trim()),
            ),
            None => (self.stdout.as_str(), None),
        }
    }

    /// Framework stdout and stderr, as shown to the user.
    pub fn framework_output(&self) -> String {
        let (framework, _) = self.split_payload();
        let mut out = framework.trim_start_matches('\n').to_owned();
        out.push_str(&self.stderr);
        out
    }
}

/// Run `interpreter -c <script> <args...>` in the current directory and
/// capture its output, killing it after `config.discovery_timeout`.
pub async fn run_script(config: &PythonConfig, script: &str, args: &[String]) -> Result<ScriptOutput> {
    tracing::debug!(
        interpreter = %config.interpreter.display(),
        args = ?args,
        "running python script"
    );

    let mut child = Command::new(&config.interpreter)
        .arg("-c")
        .arg(script)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| {
            format!(
                "failed to start python interpreter {}",
                config.interpreter.display()
            )
        })?;

    // Drain both pipes while waiting so a chatty child cannot block on a
    // full pipe buffer.
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let read_stdout = async {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stdout_pipe {
            pipe.read_to_end(&mut buf).await.ok();
        }
        String::from_utf8_lossy(&buf).into_owned()
    };

    let read_stderr = async {
        let mut buf = Vec::new();
        if let Some(ref mut pipe) = stderr_pipe {
            pipe.read_to_end(&mut buf).await.ok();
        }
        String::from_utf8_lossy(&buf).into_owned()
    };

    let waited = tokio::time::timeout(config.discovery_timeout, async {
        tokio::join!(child.wait(), read_stdout, read_stderr)
    })
    .await;

    match waited {
        Ok((Ok(status), stdout, stderr)) => Ok(ScriptOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        }),
        Ok((Err(e), _, _)) => Err(e).with_context(|| {
            format!(
                "failed to wait on python interpreter {}",
                config.interpreter.display()
            )
        }),
        Err(_) => {
            let _ = child.kill().await;
            anyhow::bail!(
                "python interpreter {} timed out after {}s",
                config.interpreter.display(),
                config.discovery_timeout.as_secs()
            )
        }
    }
}
