//! Configuration file management for testbridge.
//!
//! Provides an optional TOML config file at
//! `~/.config/testbridge/config.toml` and a resolution chain:
//! env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use testbridge_core::python::PythonConfig;

/// Overrides the Python interpreter.
pub const PYTHON_ENV: &str = "TESTBRIDGE_PYTHON";
/// Overrides the discovery timeout, in whole seconds.
pub const TIMEOUT_ENV: &str = "TESTBRIDGE_DISCOVERY_TIMEOUT";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub python: Option<PythonSection>,
    #[serde(default)]
    pub discovery: Option<DiscoverySection>,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
pub struct PythonSection {
    pub interpreter: PathBuf,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
pub struct DiscoverySection {
    pub timeout_secs: u64,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the testbridge config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/testbridge` or
/// `~/.config/testbridge`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("testbridge");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("testbridge")
}

/// Return the path to the testbridge config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read
// -----------------------------------------------------------------------

/// Parse config file contents.
pub fn parse_config(contents: &str) -> Result<ConfigFile> {
    toml::from_str(contents).context("failed to parse config file")
}

/// Load the config file. A missing file is `Ok(None)`; an unreadable or
/// malformed one is an error.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("invalid config file at {}", path.display()))
        .map(Some)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Resolve the interpreter settings from the environment and config file.
pub fn resolve() -> Result<PythonConfig> {
    let file = load_config()?;
    let config = resolve_from(|key| std::env::var(key).ok(), file.as_ref())?;
    tracing::debug!(
        interpreter = %config.interpreter.display(),
        timeout_secs = config.discovery_timeout.as_secs(),
        from_file = file.is_some(),
        "resolved python configuration"
    );
    Ok(config)
}

/// Resolve using the chain: env var > config file > default.
///
/// - Interpreter: `TESTBRIDGE_PYTHON` > `python.interpreter` > `PythonConfig::DEFAULT_INTERPRETER`
/// - Timeout: `TESTBRIDGE_DISCOVERY_TIMEOUT` > `discovery.timeout_secs` > `PythonConfig::DEFAULT_TIMEOUT`
pub fn resolve_from(
    env: impl Fn(&str) -> Option<String>,
    file: Option<&ConfigFile>,
) -> Result<PythonConfig> {
    let interpreter = if let Some(path) = env(PYTHON_ENV).filter(|p| !p.is_empty()) {
        PathBuf::from(path)
    } else if let Some(section) = file.and_then(|f| f.python.as_ref()) {
        section.interpreter.clone()
    } else {
        PathBuf::from(PythonConfig::DEFAULT_INTERPRETER)
    };

    let timeout = if let Some(raw) = env(TIMEOUT_ENV) {
        let secs: u64 = raw
            .trim()
            .parse()
            .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds, got {raw:?}"))?;
        Duration::from_secs(secs)
    } else if let Some(section) = file.and_then(|f| f.discovery.as_ref()) {
        Duration::from_secs(section.timeout_secs)
    } else {
        PythonConfig::DEFAULT_TIMEOUT
    };

    Ok(PythonConfig::new(interpreter).with_timeout(timeout))
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
