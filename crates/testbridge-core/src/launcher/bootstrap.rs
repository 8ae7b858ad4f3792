//! Python prelude executed by the interpreter before the framework runs.
//!
//! The launcher records search-path edits and debugger calls here while it
//! walks its states; [`Bootstrap::render`] then produces one script that
//! applies them in order, calls the framework, and exits 0 on a normal
//! return. Attach failures inside the interpreter get the same
//! report-and-wait treatment as failures in the launcher itself.

use std::path::Path;

use super::Runner;
use super::failure::FAILURE_MESSAGE;

/// Ordered prelude statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bootstrap {
    search_path: Vec<String>,
    debugger: Vec<String>,
}

/// Quote `s` as a Python string literal.
pub fn py_str(s: &str) -> String {
    // JSON string syntax is a subset of Python's.
    serde_json::Value::String(s.to_owned()).to_string()
}

impl Bootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the first module search path entry.
    pub fn set_first_search_path(&mut self, path: &Path) {
        self.search_path.push(format!(
            "sys.path[0] = {}",
            py_str(&path.to_string_lossy())
        ));
    }

    /// Append an entry to the module search path.
    pub fn append_search_path(&mut self, path: &Path) {
        self.search_path.push(format!(
            "sys.path.append({})",
            py_str(&path.to_string_lossy())
        ));
    }

    /// Add a debugger statement; these run after the search path edits.
    pub fn push_debugger(&mut self, statement: impl Into<String>) {
        self.debugger.push(statement.into());
    }

    pub fn search_path_statements(&self) -> &[String] {
        &self.search_path
    }

    pub fn debugger_statements(&self) -> &[String] {
        &self.debugger
    }

    /// Python source that configures paths and imports only, used to probe
    /// the interpreter before committing to a launch.
    pub fn render_probe(&self, imports: &[&str]) -> String {
        let mut out = String::from("import sys\n");
        for line in &self.search_path {
            out.push_str(line);
            out.push('\n');
        }
        for module in imports {
            out.push_str(&format!("import {module}\n"));
        }
        out
    }

    /// The full launch script for `runner`. Framework arguments are read
    /// from `sys.argv[1:]`.
    pub fn render(&self, runner: Runner) -> String {
        let mut out = String::new();
        out.push_str("import os\nimport sys\nimport traceback\n\n\n");

        out.push_str("def main():\n");
        match runner {
            Runner::Pytest => out.push_str("    import pytest\n    pytest.main(sys.argv[1:])\n"),
            Runner::Nose => out.push_str("    import nose\n    nose.run(argv=sys.argv[1:])\n"),
        }
        out.push_str("\n\n");

        out.push_str("try:\n");
        let statements: Vec<&String> = self.search_path.iter().chain(&self.debugger).collect();
        if statements.is_empty() {
            out.push_str("    pass\n");
        }
        for line in statements {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("except:\n");
        out.push_str("    traceback.print_exc()\n");
        out.push_str(&format!("    print({})\n", py_str(FAILURE_MESSAGE)));
        out.push_str("    try:\n        raw_input()\n    except NameError:\n        input()\n");
        out.push_str("    sys.exit(1)\n\n");

        out.push_str("main()\nsys.exit(0)\n");
        out
    }
}
