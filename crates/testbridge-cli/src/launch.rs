//! `testbridge-launch`: run a test framework, optionally waiting for a
//! debugger to attach first.
//!
//! ```text
//! testbridge-launch <cwd> <runner> <secret> <port> <debugger-search-path> [framework-args...]
//! ```
//!
//! Empty strings and a zero port mean "absent". The process exits with the
//! framework's exit code.
//!
//! Only the five positionals go through clap. Everything after them reaches
//! the framework untouched, including `--`, `-h` and `--version`.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use testbridge_cli::{config, logging};
use testbridge_core::launcher::failure::{open_terminal, report_failure, wait_for_enter};
use testbridge_core::launcher::{LaunchError, LauncherConfig, OsHost, Ptvsd, PythonRunner, launch};

#[derive(Parser, Debug)]
#[command(
    name = "testbridge-launch",
    version,
    about = "Launch a Python test framework under an optional debugger attach"
)]
struct LaunchArgs {
    /// Directory the framework runs in
    cwd: PathBuf,
    /// `pytest`, or anything else for nose
    runner: String,
    /// Legacy attach secret; empty for none
    #[arg(allow_hyphen_values = true)]
    secret: String,
    /// Attach port; 0 for none
    port: u16,
    /// Extra module search path for the debugger package; empty for none
    #[arg(allow_hyphen_values = true)]
    debugger_search_path: String,
}

/// Program name plus the five positionals.
const LAUNCHER_ARGC: usize = 6;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init_tracing();

    let argv: Vec<OsString> = std::env::args_os().collect();
    let cli = LaunchArgs::parse_from(argv.iter().take(LAUNCHER_ARGC));
    let runner_args = argv
        .into_iter()
        .skip(LAUNCHER_ARGC)
        .map(|arg| {
            arg.into_string()
                .map_err(|arg| anyhow::anyhow!("framework argument is not valid UTF-8: {arg:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    tracing::debug!(?cli, ?runner_args, "launcher arguments");
    let python = config::resolve().context("failed to load testbridge configuration")?;

    let config = LauncherConfig::from_positionals(
        cli.cwd,
        &cli.runner,
        &cli.secret,
        cli.port,
        &cli.debugger_search_path,
        runner_args,
    );

    let mut host = OsHost;
    let mut debugger = Ptvsd::new(python.clone());
    let runner = PythonRunner::new(python);

    match launch(config, &mut host, &mut debugger, &runner).await {
        Ok(code) => Ok(exit_code(code)),
        Err(LaunchError::Bootstrap(error)) => {
            report_failure(&error, &mut std::io::stderr(), &mut std::io::stdout())
                .context("failed to report launcher failure")?;
            if let Err(error) = wait_for_enter(&mut std::io::stdin().lock(), open_terminal) {
                tracing::debug!(%error, "no input available for the failure prompt");
            }
            Ok(ExitCode::FAILURE)
        }
        Err(e @ LaunchError::Run(_)) => {
            eprintln!("error: {:#}", anyhow::Error::new(e));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Exit statuses are a byte; anything outside that range is a failure.
fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}
