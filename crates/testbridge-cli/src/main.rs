use std::process::ExitCode;

use anyhow::Context;

use testbridge_cli::{config, logging};
use testbridge_core::dispatch::dispatch_invocation;
use testbridge_core::parse_invocation;
use testbridge_core::tools::default_registry;

const PROG: &str = "testbridge";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init_tracing();

    let argv: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let python = config::resolve().context("failed to load testbridge configuration")?;
    let registry = default_registry(&python);

    let invocation = match parse_invocation(PROG, &argv, &registry) {
        Ok(invocation) => invocation,
        // Usage errors (and --help) print themselves and exit 2 (0 for help).
        Err(e) => e.exit(),
    };

    if let Err(e) = dispatch_invocation(&registry, &invocation).await {
        eprintln!("error: {:#}", anyhow::Error::new(e));
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
