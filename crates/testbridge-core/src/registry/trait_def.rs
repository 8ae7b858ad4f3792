//! Collaborator interfaces the registry stores.
//!
//! All three traits are object safe so they can live in the registry as
//! boxed trait objects.

use anyhow::Result;
use async_trait::async_trait;

use crate::discovery::{DiscoveryResult, Parents};
use crate::options::{AdapterOptions, CommandName};

/// Handler for one `(tool, command)` pair.
///
/// Receives the pass-through arguments verbatim and returns the parent
/// hierarchy alongside the discovered tests. The dispatcher relays both to
/// the reporter without inspecting them.
#[async_trait]
pub trait Discoverer: Send + Sync {
    async fn discover(
        &self,
        args: &[String],
        options: &AdapterOptions,
    ) -> Result<(Parents, DiscoveryResult)>;
}

/// Renders a discovery result for the host. Owns its output sink.
pub trait Reporter: Send + Sync {
    fn report(
        &self,
        result: &DiscoveryResult,
        parents: &Parents,
        options: &AdapterOptions,
    ) -> Result<()>;
}

/// Contributes the flag grammar for one tool under one command.
///
/// The returned subcommand must be named `tool`. Adapter-level flags are
/// added by the router afterwards.
pub trait GrammarContributor: Send + Sync {
    fn subcommand(&self, command: CommandName, tool: &'static str) -> clap::Command;
}

const _: () = {
    fn _assert_object_safe(_: &dyn Discoverer, _: &dyn Reporter, _: &dyn GrammarContributor) {}
};
