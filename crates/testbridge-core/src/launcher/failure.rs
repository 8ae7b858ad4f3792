//! Terminal failure path for the launcher bootstrap.

use std::io::{self, BufRead, Write};

/// Printed after the error trace.
pub const FAILURE_MESSAGE: &str = "
Internal error detected. Please copy the above traceback and report at
https://github.com/Microsoft/vscode-python/issues/new

Press Enter to close. . .";

/// Write the full error chain to `trace`, then the fixed message to `out`.
pub fn report_failure(error: &anyhow::Error, trace: &mut dyn Write, out: &mut dyn Write) -> io::Result<()> {
    writeln!(trace, "{error:?}")?;
    trace.flush()?;
    writeln!(out, "{FAILURE_MESSAGE}")?;
    out.flush()
}

/// Block until Enter is pressed on `primary`, falling back to `fallback`
/// when `primary` is closed or unreadable.
pub fn wait_for_enter<F>(primary: &mut dyn BufRead, fallback: F) -> io::Result<()>
where
    F: FnOnce() -> io::Result<Box<dyn BufRead>>,
{
    let mut line = String::new();
    match primary.read_line(&mut line) {
        Ok(n) if n > 0 => Ok(()),
        _ => {
            let mut input = fallback()?;
            input.read_line(&mut line).map(|_| ())
        }
    }
}

/// The controlling terminal, for when stdin is redirected or closed.
pub fn open_terminal() -> io::Result<Box<dyn BufRead>> {
    #[cfg(windows)]
    let path = "CONIN$";
    #[cfg(not(windows))]
    let path = "/dev/tty";
    let file = std::fs::File::open(path)?;
    Ok(Box::new(io::BufReader::new(file)))
}
