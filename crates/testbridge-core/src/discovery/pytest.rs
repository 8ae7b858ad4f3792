//! pytest discovery: runs `pytest --collect-only` with a collector plugin
//! and turns node ids into the shared hierarchy.

use std::io::Write;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;

use super::{DiscoveredTest, DiscoveryResult, NodeKind, Parents, normalize_relfile};
use crate::options::{AdapterOptions, CommandName};
use crate::python::{PythonConfig, RESULT_MARKER, run_script};
use crate::registry::{Discoverer, GrammarContributor};

pub const TOOL_NAME: &str = "pytest";

const COLLECT_SCRIPT: &str = include_str!("scripts/pytest_collect.py");

/// pytest exit code for "no tests were collected".
const EXIT_NO_TESTS_COLLECTED: i32 = 5;

/// Payload printed by the collection script.
#[derive(Debug, Deserialize)]
pub struct Collection {
    pub root: String,
    pub items: Vec<CollectedItem>,
}

#[derive(Debug, Deserialize)]
pub struct CollectedItem {
    pub nodeid: String,
    pub relfile: String,
    pub lineno: Option<usize>,
    #[serde(default)]
    pub markers: Vec<String>,
}

/// Discovers tests by running pytest's own collection.
#[derive(Debug, Clone, Default)]
pub struct PytestDiscoverer {
    python: PythonConfig,
}

impl PytestDiscoverer {
    pub fn new(python: PythonConfig) -> Self {
        Self { python }
    }
}

#[async_trait]
impl Discoverer for PytestDiscoverer {
    async fn discover(
        &self,
        args: &[String],
        options: &AdapterOptions,
    ) -> Result<(Parents, DiscoveryResult)> {
        let mut script_args = Vec::with_capacity(args.len() + 1);
        script_args.push(RESULT_MARKER.to_owned());
        script_args.extend_from_slice(args);

        let output = run_script(&self.python, COLLECT_SCRIPT, &script_args).await?;

        if !options.hidestdio {
            std::io::stderr()
                .write_all(output.framework_output().as_bytes())
                .context("failed to forward pytest output")?;
        }

        match output.exit_code {
            Some(0 | EXIT_NO_TESTS_COLLECTED) => {}
            code => bail!(
                "pytest discovery failed (exit code {})\n{}",
                code.map_or_else(|| "signal".to_owned(), |c| c.to_string()),
                output.framework_output()
            ),
        }

        let (_, payload) = output.split_payload();
        let payload = payload.context("pytest finished without reporting collected tests")?;
        let collection: Collection =
            serde_json::from_str(payload).context("malformed pytest collection payload")?;

        tracing::debug!(tests = collection.items.len(), root = %collection.root, "pytest collection finished");
        Ok(parse_collection(collection))
    }
}

/// Build the hierarchy and test list from a pytest collection.
pub fn parse_collection(collection: Collection) -> (Parents, DiscoveryResult) {
    let mut parents = Parents::new();
    let mut result = DiscoveryResult::new(collection.root);

    for item in collection.items {
        result.tests.push(parse_item(&mut parents, item));
    }

    (parents, result)
}

fn parse_item(parents: &mut Parents, item: CollectedItem) -> DiscoveredTest {
    // Parametrize ids may contain `::` or path separators; cut them off
    // before splitting the node path.
    let (path, subtest) = split_parametrization(&item.nodeid);
    let path = path.replace('\\', "/");
    let mut segments = path.split("::");
    let file_part = segments.next().unwrap_or_default();
    // Old pytest versions insert `()` instance segments.
    let rest: Vec<&str> = segments.filter(|s| *s != "()").collect();

    let relfile = if file_part.is_empty() {
        normalize_relfile(&item.relfile)
    } else {
        normalize_relfile(file_part)
    };
    let mut parentid = parents.add_file(&relfile);

    let (funcname, suites) = match rest.split_last() {
        Some((name, suites)) => (*name, suites),
        None => (relfile.rsplit('/').next().unwrap_or(&relfile), &[][..]),
    };
    for suite in suites {
        parentid = parents.add_child(NodeKind::Suite, &parentid, suite);
    }
    if subtest.is_some() {
        parentid = parents.add_child(NodeKind::Function, &parentid, funcname);
    }

    let mut testfunc: Vec<&str> = suites.to_vec();
    testfunc.push(funcname);
    let testfunc = testfunc.join(".");

    let suffix = subtest.map(|p| format!("[{p}]")).unwrap_or_default();
    let name = format!("{funcname}{suffix}");
    let id = if rest.is_empty() {
        format!("./{relfile}{suffix}")
    } else {
        format!("./{relfile}::{}{suffix}", rest.join("::"))
    };
    let subtest = subtest.map(str::to_owned);

    DiscoveredTest {
        id,
        name,
        relfile,
        lineno: item.lineno,
        testfunc,
        subtest,
        markers: item.markers,
        parentid,
    }
}

/// `test_eggs[1-2]` -> (`test_eggs`, Some(`1-2`)).
fn split_parametrization(name: &str) -> (&str, Option<&str>) {
    match name.find('[') {
        Some(open) if name.ends_with(']') => (&name[..open], Some(&name[open + 1..name.len() - 1])),
        _ => (name, None),
    }
}

/// CLI grammar for `discover pytest`. pytest's own flags go after `--`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PytestGrammar;

impl GrammarContributor for PytestGrammar {
    fn subcommand(&self, command: CommandName, tool: &'static str) -> clap::Command {
        clap::Command::new(tool).about(format!("{command} tests using pytest"))
    }
}
