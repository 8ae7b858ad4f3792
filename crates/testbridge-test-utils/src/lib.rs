//! Shared test utilities for testbridge integration tests.
//!
//! - [`FakePython`]: a shell script standing in for the interpreter, so
//!   discovery can be exercised without Python installed (Unix only).
//! - Recording discoverers and reporters for dispatch tests.
//! - A fake host, debugger, and runner for launcher tests.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use testbridge_core::discovery::{DiscoveredTest, DiscoveryResult, NodeKind, Parents};
use testbridge_core::launcher::{Bootstrap, Debugger, FrameworkRunner, Host};
use testbridge_core::registry::{Discoverer, Reporter};
use testbridge_core::AdapterOptions;

// ---------------------------------------------------------------------------
// Fake interpreter
// ---------------------------------------------------------------------------

/// An executable shell script in a temp directory.
///
/// Discovery runs `interpreter -c <script> <marker> <args...>`; the fake
/// skips the leading interpreter arguments and logs the rest to
/// `args.log`.
#[cfg(unix)]
pub struct FakePython {
    dir: tempfile::TempDir,
    path: PathBuf,
}

#[cfg(unix)]
impl FakePython {
    /// Write `body` (shell) as the interpreter, after the argument logging
    /// preamble.
    pub fn with_body(body: &str) -> Self {
        Self::write(2, body)
    }

    /// An interpreter invoked as `<script-file> <args...>`, as the launcher
    /// runs it. Logs the arguments after the script file.
    pub fn runner(body: &str) -> Self {
        Self::write(1, body)
    }

    fn write(skip: usize, body: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("python");
        let log = dir.path().join("args.log");
        let script = format!(
            "#!/bin/sh\nshift {skip}\n: > '{log}'\nfor arg in \"$@\"; do printf '%s\\n' \"$arg\" >> '{log}'; done\n{body}\n",
            log = log.display()
        );
        std::fs::write(&path, script).expect("failed to write fake python");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to mark fake python executable");
        Self { dir, path }
    }

    /// An interpreter that prints `framework_output`, then the result
    /// marker it was given followed by `payload`, and exits with
    /// `exit_code`.
    pub fn discovery(framework_output: &str, payload: &str, exit_code: i32) -> Self {
        Self::with_body(&format!(
            "cat <<'TESTBRIDGE_OUT'\n{framework_output}\nTESTBRIDGE_OUT\nprintf '\\n%s\\n' \"$1\"\ncat <<'TESTBRIDGE_PAYLOAD'\n{payload}\nTESTBRIDGE_PAYLOAD\nexit {exit_code}"
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Logged arguments, one per entry.
    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("args.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Dispatch fakes
// ---------------------------------------------------------------------------

/// One collaborator invocation seen by the recording fakes.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Discover {
        args: Vec<String>,
        options: AdapterOptions,
    },
    Report {
        result: DiscoveryResult,
        parents: Parents,
        options: AdapterOptions,
    },
}

/// Shared, ordered log of collaborator calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().expect("call log poisoned").clone()
    }

    fn push(&self, call: Call) {
        self.0.lock().expect("call log poisoned").push(call);
    }
}

/// A small hierarchy: one file, one class, one test.
pub fn sample_discovery() -> (Parents, DiscoveryResult) {
    let mut parents = Parents::new();
    let file = parents.add_file("tests/test_spam.py");
    let suite = parents.add_child(NodeKind::Suite, &file, "TestSpam");
    let mut result = DiscoveryResult::new("/proj");
    result.tests.push(DiscoveredTest {
        id: "./tests/test_spam.py::TestSpam::test_eggs".to_owned(),
        name: "test_eggs".to_owned(),
        relfile: "tests/test_spam.py".to_owned(),
        lineno: Some(3),
        testfunc: "TestSpam.test_eggs".to_owned(),
        subtest: None,
        markers: Vec::new(),
        parentid: suite,
    });
    (parents, result)
}

/// Returns a canned discovery (or error) and logs each call.
pub struct RecordingDiscoverer {
    log: CallLog,
    outcome: std::result::Result<(Parents, DiscoveryResult), String>,
}

impl RecordingDiscoverer {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            outcome: Ok(sample_discovery()),
        }
    }

    pub fn failing(log: &CallLog, message: &str) -> Self {
        Self {
            log: log.clone(),
            outcome: Err(message.to_owned()),
        }
    }
}

#[async_trait]
impl Discoverer for RecordingDiscoverer {
    async fn discover(
        &self,
        args: &[String],
        options: &AdapterOptions,
    ) -> Result<(Parents, DiscoveryResult)> {
        self.log.push(Call::Discover {
            args: args.to_vec(),
            options: *options,
        });
        self.outcome.clone().map_err(|message| anyhow!(message))
    }
}

/// Logs what it was asked to report.
pub struct RecordingReporter {
    log: CallLog,
}

impl RecordingReporter {
    pub fn new(log: &CallLog) -> Self {
        Self { log: log.clone() }
    }
}

impl Reporter for RecordingReporter {
    fn report(
        &self,
        result: &DiscoveryResult,
        parents: &Parents,
        options: &AdapterOptions,
    ) -> Result<()> {
        self.log.push(Call::Report {
            result: result.clone(),
            parents: parents.clone(),
            options: *options,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Launcher fakes
// ---------------------------------------------------------------------------

/// In-memory working directory.
#[derive(Debug, Clone)]
pub struct FakeHost {
    cwd: PathBuf,
    /// Every directory change, in order.
    pub changes: Vec<PathBuf>,
    fail_chdir: bool,
}

impl FakeHost {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            changes: Vec::new(),
            fail_chdir: false,
        }
    }

    /// A host whose `set_current_dir` always fails.
    pub fn failing_chdir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            fail_chdir: true,
            ..Self::new(cwd)
        }
    }
}

impl Host for FakeHost {
    fn current_dir(&self) -> std::io::Result<PathBuf> {
        Ok(self.cwd.clone())
    }

    fn set_current_dir(&mut self, path: &Path) -> std::io::Result<()> {
        if self.fail_chdir {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such directory: {}", path.display()),
            ));
        }
        self.cwd = path.to_path_buf();
        self.changes.push(self.cwd.clone());
        Ok(())
    }
}

/// A debugger call seen by [`RecordingDebugger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerCall {
    DontDebug,
    EntryPoint,
    EnableAttach {
        secret: Option<String>,
        address: SocketAddr,
    },
    WaitForAttach,
}

/// Logs debugger calls and leaves a comment in the prelude for each.
#[derive(Debug, Clone, Default)]
pub struct RecordingDebugger {
    calls: Arc<Mutex<Vec<DebuggerCall>>>,
    fail_enable: bool,
}

impl RecordingDebugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A debugger whose `enable_attach` fails.
    pub fn failing_enable() -> Self {
        Self {
            fail_enable: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DebuggerCall> {
        self.calls.lock().expect("debugger log poisoned").clone()
    }

    fn record(&self, bootstrap: &mut Bootstrap, call: DebuggerCall) {
        bootstrap.push_debugger(format!("# {call:?}"));
        self.calls.lock().expect("debugger log poisoned").push(call);
    }
}

#[async_trait]
impl Debugger for RecordingDebugger {
    async fn register_dont_debug(&mut self, bootstrap: &mut Bootstrap) -> Result<()> {
        self.record(bootstrap, DebuggerCall::DontDebug);
        Ok(())
    }

    async fn register_entry_point(&mut self, bootstrap: &mut Bootstrap) -> Result<()> {
        self.record(bootstrap, DebuggerCall::EntryPoint);
        Ok(())
    }

    async fn enable_attach(
        &mut self,
        bootstrap: &mut Bootstrap,
        secret: Option<&str>,
        address: SocketAddr,
    ) -> Result<()> {
        if self.fail_enable {
            return Err(anyhow!("the ptvsd debugger package could not be imported"));
        }
        self.record(
            bootstrap,
            DebuggerCall::EnableAttach {
                secret: secret.map(str::to_owned),
                address,
            },
        );
        Ok(())
    }

    async fn wait_for_attach(&mut self, bootstrap: &mut Bootstrap) -> Result<()> {
        self.record(bootstrap, DebuggerCall::WaitForAttach);
        Ok(())
    }
}

/// Records the rendered script and arguments instead of running them.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    exit_code: i32,
    runs: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingRunner {
    pub fn new(exit_code: i32) -> Self {
        Self {
            exit_code,
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn runs(&self) -> Vec<(String, Vec<String>)> {
        self.runs.lock().expect("runner log poisoned").clone()
    }
}

#[async_trait]
impl FrameworkRunner for RecordingRunner {
    async fn run(&self, script: &str, args: &[String]) -> Result<i32> {
        self.runs
            .lock()
            .expect("runner log poisoned")
            .push((script.to_owned(), args.to_vec()));
        Ok(self.exit_code)
    }
}
