//! unittest discovery: runs `unittest.TestLoader().discover` and maps
//! dotted test ids onto the shared hierarchy.

use std::io::Write;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Arg, ArgMatches};
use serde::Deserialize;

use super::{DiscoveredTest, DiscoveryResult, NodeKind, Parents, normalize_relfile};
use crate::options::{AdapterOptions, CommandName};
use crate::python::{PythonConfig, RESULT_MARKER, run_script};
use crate::registry::{Discoverer, GrammarContributor};

pub const TOOL_NAME: &str = "unittest";

const COLLECT_SCRIPT: &str = include_str!("scripts/unittest_collect.py");

/// Loader settings accepted after `--`, mirroring `python -m unittest discover`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderArgs {
    pub start_directory: String,
    pub pattern: String,
    pub top_level_directory: Option<String>,
}

impl Default for LoaderArgs {
    fn default() -> Self {
        Self {
            start_directory: ".".to_owned(),
            pattern: "test*.py".to_owned(),
            top_level_directory: None,
        }
    }
}

impl LoaderArgs {
    fn command() -> clap::Command {
        clap::Command::new(TOOL_NAME)
            .no_binary_name(true)
            .disable_help_flag(true)
            .arg(Arg::new("start").short('s').long("start-directory").default_value("."))
            .arg(Arg::new("pattern").short('p').long("pattern").default_value("test*.py"))
            .arg(Arg::new("top").short('t').long("top-level-directory"))
    }

    /// Parse the pass-through arguments handed to the unittest handler.
    pub fn parse(args: &[String]) -> Result<Self> {
        let matches = Self::command()
            .try_get_matches_from(args)
            .context("invalid unittest discovery arguments")?;
        Ok(Self::from_matches(&matches))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let defaults = Self::default();
        Self {
            start_directory: matches
                .get_one::<String>("start")
                .cloned()
                .unwrap_or(defaults.start_directory),
            pattern: matches
                .get_one::<String>("pattern")
                .cloned()
                .unwrap_or(defaults.pattern),
            top_level_directory: matches.get_one::<String>("top").cloned(),
        }
    }
}

/// Payload printed by the collection script.
#[derive(Debug, Deserialize)]
pub struct Collection {
    pub root: String,
    pub items: Vec<CollectedItem>,
    #[serde(default)]
    pub errors: Vec<LoadError>,
}

#[derive(Debug, Deserialize)]
pub struct CollectedItem {
    /// Dotted id, e.g. `tests.test_spam.TestSpam.test_eggs`.
    pub id: String,
    pub relfile: Option<String>,
    pub lineno: Option<usize>,
    pub suite: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoadError {
    pub id: String,
    #[serde(default)]
    pub message: String,
}

/// Discovers tests with the standard library loader.
#[derive(Debug, Clone, Default)]
pub struct UnittestDiscoverer {
    python: PythonConfig,
}

impl UnittestDiscoverer {
    pub fn new(python: PythonConfig) -> Self {
        Self { python }
    }
}

#[async_trait]
impl Discoverer for UnittestDiscoverer {
    async fn discover(
        &self,
        args: &[String],
        options: &AdapterOptions,
    ) -> Result<(Parents, DiscoveryResult)> {
        let loader = LoaderArgs::parse(args)?;
        let script_args = vec![
            RESULT_MARKER.to_owned(),
            loader.start_directory,
            loader.pattern,
            loader.top_level_directory.unwrap_or_default(),
        ];

        let output = run_script(&self.python, COLLECT_SCRIPT, &script_args).await?;

        if !options.hidestdio {
            std::io::stderr()
                .write_all(output.framework_output().as_bytes())
                .context("failed to forward unittest output")?;
        }

        if output.exit_code != Some(0) {
            bail!(
                "unittest discovery failed (exit code {})\n{}",
                output.exit_code.map_or_else(|| "signal".to_owned(), |c| c.to_string()),
                output.framework_output()
            );
        }

        let (_, payload) = output.split_payload();
        let payload = payload.context("unittest finished without reporting discovered tests")?;
        let collection: Collection =
            serde_json::from_str(payload).context("malformed unittest collection payload")?;

        parse_collection(collection)
    }
}

/// Build the hierarchy and test list; loader errors fail the discovery.
pub fn parse_collection(collection: Collection) -> Result<(Parents, DiscoveryResult)> {
    if !collection.errors.is_empty() {
        let details: Vec<String> = collection
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.id, e.message))
            .collect();
        bail!("unittest could not load some tests:\n{}", details.join("\n"));
    }

    let mut parents = Parents::new();
    let mut result = DiscoveryResult::new(collection.root);

    for item in collection.items {
        let relfile = item
            .relfile
            .as_deref()
            .map(normalize_relfile)
            .unwrap_or_else(|| relfile_from_id(&item.id));
        let file_id = parents.add_file(&relfile);
        let parentid = parents.add_child(NodeKind::Suite, &file_id, &item.suite);

        result.tests.push(DiscoveredTest {
            testfunc: format!("{}.{}", item.suite, item.name),
            id: item.id,
            name: item.name,
            relfile,
            lineno: item.lineno,
            subtest: None,
            markers: Vec::new(),
            parentid,
        });
    }

    Ok((parents, result))
}

/// `pkg.test_spam.TestSpam.test_eggs` -> `pkg/test_spam.py`.
fn relfile_from_id(id: &str) -> String {
    let parts: Vec<&str> = id.split('.').collect();
    let module = if parts.len() > 2 {
        &parts[..parts.len() - 2]
    } else {
        &parts[..1]
    };
    format!("{}.py", module.join("/"))
}

/// CLI grammar for `discover unittest`. Loader flags go after `--`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnittestGrammar;

impl GrammarContributor for UnittestGrammar {
    fn subcommand(&self, command: CommandName, tool: &'static str) -> clap::Command {
        clap::Command::new(tool).about(format!("{command} tests using unittest"))
    }
}
