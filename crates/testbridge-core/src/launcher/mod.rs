//! Debug-attach launcher.
//!
//! Configures the process, optionally arms one of two attach handshakes,
//! then hands control to the framework's run entry point. The sequence is
//! linear and runs once per process:
//!
//! ```text
//! Init -> PathConfigured -> LegacyAttachPending -> Attached    -> Running -> Terminated
//!                        -> ModernAttachPending -> Attached    -> Running
//!                        -> NoAttach            -> NotAttached -> Running
//! ```

pub mod bootstrap;
pub mod debugger;
pub mod failure;
pub mod host;
pub mod runner;

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use thiserror::Error;

pub use bootstrap::Bootstrap;
pub use debugger::{Debugger, Ptvsd, attach_address};
pub use host::{Host, OsHost};
pub use runner::{FrameworkRunner, PythonRunner};

/// Framework whose run entry point the launcher calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runner {
    Pytest,
    Nose,
}

impl Runner {
    /// `pytest` selects pytest; every other name selects nose.
    pub fn from_name(name: &str) -> Self {
        if name == "pytest" { Self::Pytest } else { Self::Nose }
    }
}

/// Which handshake the launcher performs, decided once from the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachMode {
    /// Secret-authenticated handshake on the given port.
    Legacy { secret: String, port: u16 },
    /// Port-only handshake.
    Modern { port: u16 },
    Disabled,
}

/// Launcher settings, built once from the process arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    pub working_directory: PathBuf,
    pub runner: Runner,
    pub legacy_secret: Option<String>,
    pub port: Option<u16>,
    pub debugger_search_path: Option<PathBuf>,
    /// Passed to the framework unmodified.
    pub runner_args: Vec<String>,
}

impl LauncherConfig {
    /// Build from the launcher positionals. An empty secret or search path
    /// and a zero port mean "absent".
    pub fn from_positionals(
        working_directory: impl Into<PathBuf>,
        runner: &str,
        secret: &str,
        port: u16,
        debugger_search_path: &str,
        runner_args: Vec<String>,
    ) -> Self {
        Self {
            working_directory: working_directory.into(),
            runner: Runner::from_name(runner),
            legacy_secret: (!secret.is_empty()).then(|| secret.to_owned()),
            port: (port != 0).then_some(port),
            debugger_search_path: (!debugger_search_path.is_empty())
                .then(|| PathBuf::from(debugger_search_path)),
            runner_args,
        }
    }

    /// Secret and port select the legacy handshake; a port alone selects
    /// the modern one.
    pub fn attach_mode(&self) -> AttachMode {
        match (&self.legacy_secret, self.port) {
            (Some(secret), Some(port)) => AttachMode::Legacy {
                secret: secret.clone(),
                port,
            },
            (None, Some(port)) => AttachMode::Modern { port },
            (_, None) => AttachMode::Disabled,
        }
    }
}

/// Launcher states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    Init,
    PathConfigured,
    LegacyAttachPending,
    ModernAttachPending,
    NoAttach,
    Attached,
    NotAttached,
    Running,
    Terminated,
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::PathConfigured => "path_configured",
            Self::LegacyAttachPending => "legacy_attach_pending",
            Self::ModernAttachPending => "modern_attach_pending",
            Self::NoAttach => "no_attach",
            Self::Attached => "attached",
            Self::NotAttached => "not_attached",
            Self::Running => "running",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid launcher transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: LaunchState,
    pub to: LaunchState,
}

/// How a launch ended without reaching the framework's own exit code.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Path setup or the attach handshake failed. Reported with
    /// [`failure::report_failure`] and a blocking prompt.
    #[error("debugger bootstrap failed")]
    Bootstrap(#[source] anyhow::Error),
    /// The framework could not be started.
    #[error("failed to run the test framework")]
    Run(#[source] anyhow::Error),
}

/// The launcher state machine.
#[derive(Debug)]
pub struct Launcher {
    config: LauncherConfig,
    state: LaunchState,
    bootstrap: Bootstrap,
}

impl Launcher {
    pub fn new(config: LauncherConfig) -> Self {
        Self {
            config,
            state: LaunchState::Init,
            bootstrap: Bootstrap::new(),
        }
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn bootstrap(&self) -> &Bootstrap {
        &self.bootstrap
    }

    /// Check whether `from -> to` is an edge of the state graph.
    pub fn is_valid_transition(from: LaunchState, to: LaunchState) -> bool {
        use LaunchState::*;
        matches!(
            (from, to),
            (Init, PathConfigured)
                | (PathConfigured, LegacyAttachPending)
                | (PathConfigured, ModernAttachPending)
                | (PathConfigured, NoAttach)
                | (LegacyAttachPending, Attached)
                | (ModernAttachPending, Attached)
                | (NoAttach, NotAttached)
                | (Attached, Running)
                | (NotAttached, Running)
                | (Running, Terminated)
        )
    }

    fn transition(&mut self, to: LaunchState) -> Result<(), TransitionError> {
        if !Self::is_valid_transition(self.state, to) {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        tracing::debug!(from = %self.state, to = %to, "launcher transition");
        self.state = to;
        Ok(())
    }

    /// `Init -> PathConfigured`.
    ///
    /// Points the first module search path entry at the current directory,
    /// changes the process working directory, then appends the debugger
    /// search path. The directory change is permanent for the process.
    pub fn configure_paths(&mut self, host: &mut dyn Host) -> Result<()> {
        if self.state != LaunchState::Init {
            return Err(TransitionError {
                from: self.state,
                to: LaunchState::PathConfigured,
            }
            .into());
        }

        let original = host
            .current_dir()
            .context("failed to read the current directory")?;
        host.set_current_dir(&self.config.working_directory)
            .with_context(|| {
                format!(
                    "failed to change directory to {}",
                    self.config.working_directory.display()
                )
            })?;

        self.bootstrap.set_first_search_path(&original);
        if let Some(path) = &self.config.debugger_search_path {
            self.bootstrap.append_search_path(path);
        }

        self.transition(LaunchState::PathConfigured)?;
        Ok(())
    }

    /// `PathConfigured -> {Legacy, Modern, No}Attach* -> Attached | NotAttached`.
    pub async fn attach(&mut self, debugger: &mut dyn Debugger) -> Result<()> {
        match self.config.attach_mode() {
            AttachMode::Legacy { secret, port } => {
                self.transition(LaunchState::LegacyAttachPending)?;
                tracing::info!(port, "arming legacy debugger attach");
                debugger.register_dont_debug(&mut self.bootstrap).await?;
                debugger.register_entry_point(&mut self.bootstrap).await?;
                debugger
                    .enable_attach(&mut self.bootstrap, Some(secret.as_str()), attach_address(port))
                    .await?;
                debugger.wait_for_attach(&mut self.bootstrap).await?;
                self.transition(LaunchState::Attached)?;
            }
            AttachMode::Modern { port } => {
                self.transition(LaunchState::ModernAttachPending)?;
                tracing::info!(port, "arming debugger attach");
                debugger
                    .enable_attach(&mut self.bootstrap, None, attach_address(port))
                    .await?;
                debugger.wait_for_attach(&mut self.bootstrap).await?;
                self.transition(LaunchState::Attached)?;
            }
            AttachMode::Disabled => {
                self.transition(LaunchState::NoAttach)?;
                self.transition(LaunchState::NotAttached)?;
            }
        }
        Ok(())
    }

    /// `Attached | NotAttached -> Running -> Terminated`.
    ///
    /// Returns the framework process's exit code.
    pub async fn run(&mut self, runner: &dyn FrameworkRunner) -> Result<i32> {
        self.transition(LaunchState::Running)?;
        let script = self.bootstrap.render(self.config.runner);
        let code = runner.run(&script, &self.config.runner_args).await;
        self.transition(LaunchState::Terminated)?;
        code
    }
}

/// Run the whole launch sequence once.
pub async fn launch(
    config: LauncherConfig,
    host: &mut dyn Host,
    debugger: &mut dyn Debugger,
    runner: &dyn FrameworkRunner,
) -> Result<i32, LaunchError> {
    let mut launcher = Launcher::new(config);

    launcher.configure_paths(host).map_err(LaunchError::Bootstrap)?;
    launcher.attach(debugger).await.map_err(LaunchError::Bootstrap)?;

    let code = launcher.run(runner).await.map_err(LaunchError::Run)?;
    tracing::debug!(code, "test framework exited");
    Ok(code)
}
