//! The debugger package seam.
//!
//! A [`Debugger`] turns the attach handshake into prelude statements on a
//! [`Bootstrap`]; the interpreter blocks in `wait_for_attach` until the IDE
//! connects.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;

use super::bootstrap::{Bootstrap, py_str};
use crate::python::{PythonConfig, run_script};

/// Attach handshakes only ever listen on the loopback interface.
pub const ATTACH_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

pub fn attach_address(port: u16) -> SocketAddr {
    SocketAddr::new(ATTACH_HOST, port)
}

/// Operations the launcher needs from a debugger package.
#[async_trait]
pub trait Debugger: Send {
    /// Exclude the launch script itself from debugging (legacy handshake).
    async fn register_dont_debug(&mut self, bootstrap: &mut Bootstrap) -> Result<()>;

    /// Mark the framework entry point as a debug entry point (legacy handshake).
    async fn register_entry_point(&mut self, bootstrap: &mut Bootstrap) -> Result<()>;

    /// Start listening on `address`, authenticating with `secret` when given.
    async fn enable_attach(
        &mut self,
        bootstrap: &mut Bootstrap,
        secret: Option<&str>,
        address: SocketAddr,
    ) -> Result<()>;

    /// Block until a debugger client has attached.
    async fn wait_for_attach(&mut self, bootstrap: &mut Bootstrap) -> Result<()>;
}

/// The `ptvsd` package, located through the bootstrap's search path.
#[derive(Debug, Clone)]
pub struct Ptvsd {
    python: PythonConfig,
    probed: bool,
}

impl Ptvsd {
    pub const MODULE: &str = "ptvsd";

    pub fn new(python: PythonConfig) -> Self {
        Self {
            python,
            probed: false,
        }
    }

    /// Import the package once with the configured search path so a missing
    /// debugger fails the launch instead of the test run.
    async fn ensure_importable(&mut self, bootstrap: &Bootstrap) -> Result<()> {
        if self.probed {
            return Ok(());
        }
        let probe = bootstrap.render_probe(&[Self::MODULE]);
        let output = run_script(&self.python, &probe, &[])
            .await
            .context("failed to probe for the ptvsd debugger package")?;
        if output.exit_code != Some(0) {
            bail!(
                "the ptvsd debugger package could not be imported\n{}",
                output.stderr.trim_end()
            );
        }
        self.probed = true;
        Ok(())
    }

    fn push_once(bootstrap: &mut Bootstrap, statement: &str) {
        if !bootstrap.debugger_statements().iter().any(|s| s == statement) {
            bootstrap.push_debugger(statement);
        }
    }
}

const IMPORT_PTVSD: &str = "import ptvsd";
const IMPORT_LEGACY: &str = "from ptvsd.debugger import DONT_DEBUG, DEBUG_ENTRYPOINTS, get_code";

#[async_trait]
impl Debugger for Ptvsd {
    async fn register_dont_debug(&mut self, bootstrap: &mut Bootstrap) -> Result<()> {
        self.ensure_importable(bootstrap).await?;
        Self::push_once(bootstrap, IMPORT_PTVSD);
        Self::push_once(bootstrap, IMPORT_LEGACY);
        bootstrap.push_debugger("DONT_DEBUG.append(os.path.normcase(__file__))");
        Ok(())
    }

    async fn register_entry_point(&mut self, bootstrap: &mut Bootstrap) -> Result<()> {
        self.ensure_importable(bootstrap).await?;
        Self::push_once(bootstrap, IMPORT_PTVSD);
        Self::push_once(bootstrap, IMPORT_LEGACY);
        bootstrap.push_debugger("DEBUG_ENTRYPOINTS.add(get_code(main))");
        Ok(())
    }

    async fn enable_attach(
        &mut self,
        bootstrap: &mut Bootstrap,
        secret: Option<&str>,
        address: SocketAddr,
    ) -> Result<()> {
        self.ensure_importable(bootstrap).await?;
        Self::push_once(bootstrap, IMPORT_PTVSD);
        let address = format!("({}, {})", py_str(&address.ip().to_string()), address.port());
        let call = match secret {
            Some(secret) => format!(
                "ptvsd.enable_attach({}, {address}, redirect_output=True)",
                py_str(secret)
            ),
            None => format!("ptvsd.enable_attach({address}, redirect_output=True)"),
        };
        bootstrap.push_debugger(call);
        Ok(())
    }

    async fn wait_for_attach(&mut self, bootstrap: &mut Bootstrap) -> Result<()> {
        bootstrap.push_debugger("ptvsd.wait_for_attach()");
        Ok(())
    }
}
