//! Shared plumbing for the `testbridge` and `testbridge-launch` binaries.

pub mod config;
pub mod logging;
