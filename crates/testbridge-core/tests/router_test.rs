//! Argument routing against the default tool registry.

use clap::error::ErrorKind;
use testbridge_core::python::PythonConfig;
use testbridge_core::tools::default_registry;
use testbridge_core::{AdapterOptions, CommandName, LookupError, Registry, dispatch, parse_invocation};

fn registry() -> Registry {
    default_registry(&PythonConfig::default())
}

#[test]
fn discover_with_defaults() {
    let inv = parse_invocation("testbridge", &["discover", "pytest"], &registry()).unwrap();
    assert_eq!(inv.tool, "pytest");
    assert_eq!(inv.command, CommandName::Discover);
    assert_eq!(inv.options, AdapterOptions::default());
    assert!(inv.args.is_empty());
}

#[test]
fn no_hide_stdio_flips_hidestdio_only() {
    let inv = parse_invocation(
        "testbridge",
        &["discover", "unittest", "--no-hide-stdio", "--pretty"],
        &registry(),
    )
    .unwrap();
    assert_eq!(
        inv.options,
        AdapterOptions {
            simple: false,
            hidestdio: false,
            pretty: true,
        }
    );
}

#[test]
fn pass_through_preserves_order_and_later_separators() {
    let inv = parse_invocation(
        "testbridge",
        &["discover", "unittest", "--", "-s", "tests", "--", "-p", "*_test.py"],
        &registry(),
    )
    .unwrap();
    assert_eq!(inv.args, vec!["-s", "tests", "--", "-p", "*_test.py"]);
}

#[test]
fn framework_flags_before_separator_are_rejected() {
    let err = parse_invocation("testbridge", &["discover", "pytest", "--maxfail=1"], &registry())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownArgument);
}

#[test]
fn missing_command_is_a_usage_error() {
    let err = parse_invocation::<&str>("testbridge", &[], &registry()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingSubcommand);
}

#[test]
fn missing_tool_is_a_usage_error() {
    let err = parse_invocation("testbridge", &["discover"], &registry()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingSubcommand);
}

#[test]
fn disabled_commands_are_not_in_the_grammar() {
    for command in ["run", "debug"] {
        let err = parse_invocation("testbridge", &[command, "pytest"], &registry()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand, "{command}");
    }
}

#[tokio::test]
async fn unknown_tool_parses_then_fails_lookup() {
    let registry = registry();
    let inv = parse_invocation("testbridge", &["discover", "nose"], &registry).unwrap();
    assert_eq!(inv.tool, "nose");

    let err = dispatch(&registry, &inv.tool, inv.command, &inv.options, &inv.args)
        .await
        .unwrap_err();
    assert_eq!(
        err.as_lookup(),
        Some(&LookupError::UnsupportedTool("nose".to_owned()))
    );
}
