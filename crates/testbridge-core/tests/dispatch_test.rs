//! Dispatch through a registry of recording collaborators.

use testbridge_core::{
    AdapterOptions, CommandName, DispatchError, LookupError, Registry, dispatch,
    dispatch::dispatch_invocation, parse_invocation,
};
use testbridge_test_utils::{
    Call, CallLog, RecordingDiscoverer, RecordingReporter, sample_discovery,
};

fn recording_registry(log: &CallLog) -> Registry {
    Registry::builder()
        .handler("pytest", CommandName::Discover, RecordingDiscoverer::new(log))
        .reporter("pytest", CommandName::Discover, RecordingReporter::new(log))
        .build()
}

#[tokio::test]
async fn handler_runs_before_reporter_with_its_exact_output() {
    let log = CallLog::new();
    let registry = recording_registry(&log);
    let options = AdapterOptions {
        simple: true,
        ..AdapterOptions::default()
    };
    let args = vec!["-k".to_owned(), "spam".to_owned()];

    dispatch(&registry, "pytest", CommandName::Discover, &options, &args)
        .await
        .unwrap();

    let (parents, result) = sample_discovery();
    assert_eq!(
        log.calls(),
        vec![
            Call::Discover {
                args,
                options,
            },
            Call::Report {
                result,
                parents,
                options,
            },
        ]
    );
}

#[tokio::test]
async fn unknown_tool_invokes_nothing() {
    let log = CallLog::new();
    let registry = recording_registry(&log);

    let err = dispatch(
        &registry,
        "nose",
        CommandName::Discover,
        &AdapterOptions::default(),
        &[],
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.as_lookup(),
        Some(&LookupError::UnsupportedTool("nose".to_owned()))
    );
    assert_eq!(err.to_string(), "unsupported tool: nose");
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn unknown_command_invokes_nothing() {
    let log = CallLog::new();
    let registry = recording_registry(&log);

    let err = dispatch(
        &registry,
        "pytest",
        CommandName::Run,
        &AdapterOptions::default(),
        &[],
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.as_lookup(),
        Some(&LookupError::UnsupportedCommand("run".to_owned()))
    );
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn handler_without_reporter_is_unsupported() {
    let log = CallLog::new();
    let registry = Registry::builder()
        .handler("pytest", CommandName::Discover, RecordingDiscoverer::new(&log))
        .build();

    let err = dispatch(
        &registry,
        "pytest",
        CommandName::Discover,
        &AdapterOptions::default(),
        &[],
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Lookup(LookupError::UnsupportedCommand(_))
    ));
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn discovery_failure_skips_reporter() {
    let log = CallLog::new();
    let registry = Registry::builder()
        .handler(
            "pytest",
            CommandName::Discover,
            RecordingDiscoverer::failing(&log, "collection exploded"),
        )
        .reporter("pytest", CommandName::Discover, RecordingReporter::new(&log))
        .build();

    let err = dispatch(
        &registry,
        "pytest",
        CommandName::Discover,
        &AdapterOptions::default(),
        &[],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DispatchError::Discovery { ref tool, .. } if tool == "pytest"));
    assert_eq!(err.to_string(), "pytest discovery failed");
    assert_eq!(log.calls().len(), 1);
    assert!(matches!(log.calls()[0], Call::Discover { .. }));
}

#[tokio::test]
async fn parsed_invocation_reaches_the_handler() {
    let log = CallLog::new();
    let registry = Registry::builder()
        .grammar("pytest", testbridge_core::discovery::pytest::PytestGrammar)
        .handler("pytest", CommandName::Discover, RecordingDiscoverer::new(&log))
        .reporter("pytest", CommandName::Discover, RecordingReporter::new(&log))
        .build();

    let invocation = parse_invocation(
        "testbridge",
        &["discover", "pytest", "--simple", "--", "--maxfail=1"],
        &registry,
    )
    .unwrap();
    dispatch_invocation(&registry, &invocation).await.unwrap();

    let calls = log.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        Call::Discover {
            args: vec!["--maxfail=1".to_owned()],
            options: AdapterOptions {
                simple: true,
                hidestdio: true,
                pretty: false,
            },
        }
    );
    match &calls[1] {
        Call::Report { options, .. } => assert!(options.simple),
        other => panic!("expected report, got {other:?}"),
    }
}
