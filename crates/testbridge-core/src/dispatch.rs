//! Runs one resolved request: discovery handler, then reporter.

use crate::error::DispatchError;
use crate::options::{AdapterOptions, CommandName};
use crate::registry::Registry;
use crate::router::Invocation;

/// Resolve `(tool, command)` and run its handler and reporter in order.
///
/// Lookup failures stop before either collaborator runs. The reporter
/// receives exactly what the handler returned.
pub async fn dispatch(
    registry: &Registry,
    tool: &str,
    command: CommandName,
    options: &AdapterOptions,
    args: &[String],
) -> Result<(), DispatchError> {
    let handlers = registry.lookup(tool, command)?;

    tracing::info!(tool, command = %command, "dispatching");

    let (parents, result) = handlers
        .discoverer
        .discover(args, options)
        .await
        .map_err(|source| DispatchError::Discovery {
            tool: tool.to_owned(),
            source,
        })?;

    tracing::debug!(tool, tests = result.tests.len(), parents = parents.len(), "reporting");

    handlers
        .reporter
        .report(&result, &parents, options)
        .map_err(|source| DispatchError::Report {
            tool: tool.to_owned(),
            source,
        })
}

/// [`dispatch`] for an already parsed [`Invocation`].
pub async fn dispatch_invocation(registry: &Registry, invocation: &Invocation) -> Result<(), DispatchError> {
    dispatch(
        registry,
        &invocation.tool,
        invocation.command,
        &invocation.options,
        &invocation.args,
    )
    .await
}
