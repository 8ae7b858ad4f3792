//! Core of the testbridge adapter.
//!
//! Routes `discover` requests for Python test frameworks through a fixed
//! tool registry, and bootstraps debugger attachment before handing control
//! to a framework's own runner.
//!
//! ```text
//! argv --split_args--> (structured, pass-through)
//!          |
//!          v
//!     parse_invocation --> Invocation { tool, command, options, args }
//!          |
//!          v
//!     dispatch(&Registry, ...) --lookup--> (&dyn Discoverer, &dyn Reporter)
//!                                   discover(args, options) -> (parents, result)
//!                                   report(result, parents, options)
//! ```

pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod launcher;
pub mod options;
pub mod python;
pub mod registry;
pub mod report;
pub mod router;
pub mod tools;

pub use dispatch::dispatch;
pub use error::{DispatchError, LookupError};
pub use options::{AdapterOptions, CommandName};
pub use registry::Registry;
pub use router::{Invocation, parse_invocation, split_args};
