//! JSON rendering of discovery results for the host.
//!
//! Full form:
//!
//! ```text
//! [{"rootid": ".", "root": "/proj", "parents": [...], "tests": [...]}]
//! ```
//!
//! Simple form (`--simple`) drops the hierarchy and emits one flat list of
//! tests with their file, line, and callable.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use crate::discovery::{DiscoveredTest, DiscoveryResult, ParentNode, Parents};
use crate::options::AdapterOptions;
use crate::registry::Reporter;

#[derive(Serialize)]
struct RootView<'a> {
    rootid: &'a str,
    root: &'a Path,
    parents: &'a [ParentNode],
    tests: Vec<TestView<'a>>,
}

#[derive(Serialize)]
struct TestView<'a> {
    id: &'a str,
    name: &'a str,
    source: String,
    markers: &'a [String],
    parentid: &'a str,
}

#[derive(Serialize)]
struct SimpleTestView<'a> {
    id: &'a str,
    name: &'a str,
    testroot: &'a Path,
    relfile: String,
    lineno: Option<usize>,
    testfunc: &'a str,
    subtest: Option<&'a str>,
    markers: &'a [String],
}

impl<'a> TestView<'a> {
    fn new(test: &'a DiscoveredTest) -> Self {
        Self {
            id: &test.id,
            name: &test.name,
            source: test.source(),
            markers: &test.markers,
            parentid: &test.parentid,
        }
    }
}

impl<'a> SimpleTestView<'a> {
    fn new(root: &'a Path, test: &'a DiscoveredTest) -> Self {
        Self {
            id: &test.id,
            name: &test.name,
            testroot: root,
            relfile: format!("./{}", test.relfile),
            lineno: test.lineno,
            testfunc: &test.testfunc,
            subtest: test.subtest.as_deref(),
            markers: &test.markers,
        }
    }
}

/// Either output form. Serialized straight from the views so fields keep
/// their declared order.
#[derive(Serialize)]
#[serde(untagged)]
enum Document<'a> {
    Full([RootView<'a>; 1]),
    Simple(Vec<SimpleTestView<'a>>),
}

impl<'a> Document<'a> {
    fn new(result: &'a DiscoveryResult, parents: &'a Parents, simple: bool) -> Self {
        if simple {
            Self::Simple(
                result
                    .tests
                    .iter()
                    .map(|test| SimpleTestView::new(&result.root, test))
                    .collect(),
            )
        } else {
            Self::Full([RootView {
                rootid: &result.rootid,
                root: &result.root,
                parents: parents.as_slice(),
                tests: result.tests.iter().map(TestView::new).collect(),
            }])
        }
    }
}

/// Render the JSON document for `result`: flat when `options.simple`,
/// indented when `options.pretty`.
pub fn render(
    result: &DiscoveryResult,
    parents: &Parents,
    options: &AdapterOptions,
) -> Result<String> {
    let document = Document::new(result, parents, options.simple);
    let rendered = if options.pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    };
    rendered.context("failed to serialize discovery result")
}

/// Writes discovery JSON to a sink (stdout unless told otherwise).
pub struct JsonReporter {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl JsonReporter {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl std::fmt::Debug for JsonReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonReporter").finish_non_exhaustive()
    }
}

impl Reporter for JsonReporter {
    fn report(
        &self,
        result: &DiscoveryResult,
        parents: &Parents,
        options: &AdapterOptions,
    ) -> Result<()> {
        let rendered = render(result, parents, options)?;
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| anyhow!("report sink lock poisoned"))?;

        writeln!(sink, "{rendered}").context("failed to write discovery result")?;
        sink.flush().context("failed to flush discovery result")?;
        Ok(())
    }
}
