//! Failure kinds raised when a request cannot be routed to a handler.

use thiserror::Error;

/// Registry resolution failure.
///
/// Callers must handle the two kinds separately; there is no catch-all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The tool has no registry entry at all.
    #[error("unsupported tool: {0}")]
    UnsupportedTool(String),
    /// The tool exists but has no handler (or no reporter) for the command.
    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),
}

/// Everything that can stop a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    /// The discovery handler failed.
    #[error("{tool} discovery failed")]
    Discovery {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
    /// The reporter failed to emit its output.
    #[error("failed to report {tool} results")]
    Report {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
}

impl DispatchError {
    /// The lookup failure, if dispatch never reached a handler.
    pub fn as_lookup(&self) -> Option<&LookupError> {
        match self {
            Self::Lookup(err) => Some(err),
            _ => None,
        }
    }
}
