//! Discovered-test data model shared by every framework collaborator.
//!
//! Ids are `./`-prefixed paths relative to the discovery root. Suites and
//! functions hang off their file id with `::`:
//!
//! ```text
//! .                                  (root)
//! ./tests                            folder
//! ./tests/test_spam.py               file
//! ./tests/test_spam.py::TestSpam     suite
//! ./tests/test_spam.py::TestSpam::test_eggs        function (parametrized)
//! ./tests/test_spam.py::TestSpam::test_eggs[1]     test
//! ```

pub mod pytest;
pub mod unittest;

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Id of the discovery root.
pub const ROOT_ID: &str = ".";

/// Kind of a parent node in the test hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
    Suite,
    Function,
}

/// A container of tests: folder, file, suite, or parametrized function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentNode {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub parentid: String,
}

/// Ordered, de-duplicated parent hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Parents(Vec<ParentNode>);

impl Parents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless one with the same id exists. Returns the id.
    pub fn insert(&mut self, kind: NodeKind, id: String, name: &str, parentid: &str) -> String {
        if self.get(&id).is_none() {
            self.0.push(ParentNode {
                id: id.clone(),
                kind,
                name: name.to_owned(),
                parentid: parentid.to_owned(),
            });
        }
        id
    }

    /// Add the folder chain and the file node for `relfile`; returns the
    /// file's id.
    pub fn add_file(&mut self, relfile: &str) -> String {
        let mut parentid = ROOT_ID.to_owned();
        let mut segments = relfile.split('/').filter(|s| !s.is_empty() && *s != ".").peekable();
        while let Some(segment) = segments.next() {
            let id = format!("{parentid}/{segment}");
            let kind = if segments.peek().is_some() {
                NodeKind::Folder
            } else {
                NodeKind::File
            };
            parentid = self.insert(kind, id, segment, &parentid);
        }
        parentid
    }

    /// Add a child node `name` below `parentid`, joined with `::`.
    pub fn add_child(&mut self, kind: NodeKind, parentid: &str, name: &str) -> String {
        self.insert(kind, format!("{parentid}::{name}"), name, parentid)
    }

    pub fn get(&self, id: &str) -> Option<&ParentNode> {
        self.0.iter().find(|node| node.id == id)
    }

    pub fn as_slice(&self) -> &[ParentNode] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParentNode> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One discovered test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTest {
    /// Identifier the framework accepts to select this test.
    pub id: String,
    pub name: String,
    /// Path relative to the root, `/`-separated, without a `./` prefix.
    pub relfile: String,
    /// 1-based line of the test definition, when the framework knows it.
    pub lineno: Option<usize>,
    /// Dotted `Suite.function` path of the test callable.
    pub testfunc: String,
    /// Parametrization id, if any.
    pub subtest: Option<String>,
    pub markers: Vec<String>,
    pub parentid: String,
}

impl DiscoveredTest {
    /// `./relfile:lineno`, the location string hosts use to jump to source.
    pub fn source(&self) -> String {
        match self.lineno {
            Some(lineno) => format!("./{}:{lineno}", self.relfile),
            None => format!("./{}", self.relfile),
        }
    }
}

/// Tests found under one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    pub root: PathBuf,
    pub rootid: String,
    pub tests: Vec<DiscoveredTest>,
}

impl DiscoveryResult {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rootid: ROOT_ID.to_owned(),
            tests: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Normalise a framework-reported relative path: `/` separators, no `./`.
pub(crate) fn normalize_relfile(relfile: &str) -> String {
    let relfile = relfile.replace('\\', "/");
    relfile.trim_start_matches("./").to_owned()
}
