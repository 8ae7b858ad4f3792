//! Adapter-level command names and options.

use std::fmt;
use std::str::FromStr;

/// An adapter-level operation requested for a tool.
///
/// Only [`CommandName::Discover`] is wired into the CLI grammar; `run` and
/// `debug` are reserved names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandName {
    Discover,
    Run,
    Debug,
}

impl CommandName {
    /// Commands exposed by the CLI grammar.
    pub const ENABLED: &[CommandName] = &[CommandName::Discover];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Run => "run",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discover" => Ok(Self::Discover),
            "run" => Ok(Self::Run),
            "debug" => Ok(Self::Debug),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

/// Options recognised by the adapter itself, parsed once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Emit a flat list of tests instead of the parent hierarchy.
    pub simple: bool,
    /// Hide the framework's own stdout while discovering.
    pub hidestdio: bool,
    /// Indent the JSON output.
    pub pretty: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            simple: false,
            hidestdio: true,
            pretty: false,
        }
    }
}
