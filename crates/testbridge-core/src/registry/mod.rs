//! Tool registry: a fixed `tool -> command -> handler` table plus a
//! parallel `tool -> command -> reporter` table.
//!
//! The registry is built once at startup and passed explicitly to the
//! router and the dispatcher.
//!
//! ```text
//! Registry
//!   tools:     "pytest"   -> { grammar, discover -> &dyn Discoverer }
//!              "unittest" -> { grammar, discover -> &dyn Discoverer }
//!   reporters: "pytest"   -> { discover -> &dyn Reporter }
//!              "unittest" -> { discover -> &dyn Reporter }
//! ```

pub mod trait_def;

use std::collections::BTreeMap;

use crate::error::LookupError;
use crate::options::CommandName;

pub use trait_def::{Discoverer, GrammarContributor, Reporter};

/// Execution-table entry for a single tool.
#[derive(Default)]
struct ToolEntry {
    /// Flag grammar contributor; tools without one are left out of the CLI.
    grammar: Option<Box<dyn GrammarContributor>>,
    handlers: BTreeMap<CommandName, Box<dyn Discoverer>>,
}

/// The handler pair resolved for one `(tool, command)` request.
#[derive(Clone, Copy)]
pub struct Handlers<'a> {
    pub discoverer: &'a dyn Discoverer,
    pub reporter: &'a dyn Reporter,
}

/// Immutable tool registry. Build one with [`Registry::builder`].
pub struct Registry {
    tools: BTreeMap<&'static str, ToolEntry>,
    reporters: BTreeMap<&'static str, BTreeMap<CommandName, Box<dyn Reporter>>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Resolve the discovery handler and reporter for `(tool, command)`.
    ///
    /// A missing tool is [`LookupError::UnsupportedTool`]. A known tool
    /// missing either the handler or the reporter for `command` is
    /// [`LookupError::UnsupportedCommand`].
    pub fn lookup(&self, tool: &str, command: CommandName) -> Result<Handlers<'_>, LookupError> {
        let entry = self
            .tools
            .get(tool)
            .ok_or_else(|| LookupError::UnsupportedTool(tool.to_owned()))?;

        let unsupported = || LookupError::UnsupportedCommand(command.to_string());
        let discoverer = entry.handlers.get(&command).ok_or_else(unsupported)?;
        let reporter = self
            .reporters
            .get(tool)
            .and_then(|by_command| by_command.get(&command))
            .ok_or_else(unsupported)?;

        Ok(Handlers {
            discoverer: discoverer.as_ref(),
            reporter: reporter.as_ref(),
        })
    }

    /// Whether `tool` has an execution-table entry.
    pub fn contains(&self, tool: &str) -> bool {
        self.tools.contains_key(tool)
    }

    /// Registered tool names, sorted.
    pub fn tool_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.keys().copied()
    }

    /// Tools that contribute a CLI grammar, sorted by name.
    pub fn grammars(&self) -> impl Iterator<Item = (&'static str, &dyn GrammarContributor)> + '_ {
        self.tools
            .iter()
            .filter_map(|(name, entry)| entry.grammar.as_deref().map(|g| (*name, g)))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tools: BTreeMap<_, Vec<_>> = self
            .tools
            .iter()
            .map(|(name, entry)| (*name, entry.handlers.keys().collect()))
            .collect();
        f.debug_struct("Registry").field("tools", &tools).finish()
    }
}

/// Accumulates registry entries; consumed by [`RegistryBuilder::build`].
#[derive(Default)]
pub struct RegistryBuilder {
    tools: BTreeMap<&'static str, ToolEntry>,
    reporters: BTreeMap<&'static str, BTreeMap<CommandName, Box<dyn Reporter>>>,
}

impl RegistryBuilder {
    /// Register the flag grammar contributor for `tool`.
    pub fn grammar(mut self, tool: &'static str, grammar: impl GrammarContributor + 'static) -> Self {
        self.tools.entry(tool).or_default().grammar = Some(Box::new(grammar));
        self
    }

    /// Register the handler run for `(tool, command)`.
    pub fn handler(
        mut self,
        tool: &'static str,
        command: CommandName,
        handler: impl Discoverer + 'static,
    ) -> Self {
        self.tools
            .entry(tool)
            .or_default()
            .handlers
            .insert(command, Box::new(handler));
        self
    }

    /// Register the reporter for `(tool, command)`.
    pub fn reporter(
        mut self,
        tool: &'static str,
        command: CommandName,
        reporter: impl Reporter + 'static,
    ) -> Self {
        self.reporters
            .entry(tool)
            .or_default()
            .insert(command, Box::new(reporter));
        self
    }

    pub fn build(self) -> Registry {
        for (tool, entry) in &self.tools {
            for command in entry.handlers.keys() {
                let reported = self
                    .reporters
                    .get(tool)
                    .is_some_and(|by_command| by_command.contains_key(command));
                if !reported {
                    tracing::warn!(tool = %tool, command = %command, "handler registered without a reporter");
                }
            }
        }
        Registry {
            tools: self.tools,
            reporters: self.reporters,
        }
    }
}
