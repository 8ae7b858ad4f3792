//! The built-in tool table.

use crate::discovery::pytest::{self, PytestDiscoverer, PytestGrammar};
use crate::discovery::unittest::{self, UnittestDiscoverer, UnittestGrammar};
use crate::options::CommandName;
use crate::python::PythonConfig;
use crate::registry::Registry;
use crate::report::JsonReporter;

/// Registry with pytest and unittest discovery, reporting to stdout.
pub fn default_registry(python: &PythonConfig) -> Registry {
    Registry::builder()
        .grammar(pytest::TOOL_NAME, PytestGrammar)
        .handler(
            pytest::TOOL_NAME,
            CommandName::Discover,
            PytestDiscoverer::new(python.clone()),
        )
        .reporter(pytest::TOOL_NAME, CommandName::Discover, JsonReporter::stdout())
        .grammar(unittest::TOOL_NAME, UnittestGrammar)
        .handler(
            unittest::TOOL_NAME,
            CommandName::Discover,
            UnittestDiscoverer::new(python.clone()),
        )
        .reporter(unittest::TOOL_NAME, CommandName::Discover, JsonReporter::stdout())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_pytest_and_unittest() {
        let registry = default_registry(&PythonConfig::default());
        assert_eq!(registry.tool_names().collect::<Vec<_>>(), vec!["pytest", "unittest"]);
        assert!(registry.lookup("pytest", CommandName::Discover).is_ok());
        assert!(registry.lookup("unittest", CommandName::Discover).is_ok());
        assert!(registry.lookup("nose", CommandName::Discover).is_err());
        assert!(registry.lookup("pytest", CommandName::Debug).is_err());
    }
}
