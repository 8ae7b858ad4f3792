//! Process-wide state the launcher mutates.

use std::io;
use std::path::{Path, PathBuf};

/// Access to the process working directory.
///
/// Changes made through a host are one-way and last for the rest of the
/// process.
pub trait Host {
    fn current_dir(&self) -> io::Result<PathBuf>;
    fn set_current_dir(&mut self, path: &Path) -> io::Result<()>;
}

/// The real process.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsHost;

impl Host for OsHost {
    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn set_current_dir(&mut self, path: &Path) -> io::Result<()> {
        std::env::set_current_dir(path)
    }
}
