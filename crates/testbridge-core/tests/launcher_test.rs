//! Launch sequences driven through fake host, debugger, and runner.

use std::path::PathBuf;

use testbridge_core::launcher::{
    LaunchError, LaunchState, Launcher, LauncherConfig, attach_address, launch,
};
use testbridge_test_utils::{DebuggerCall, FakeHost, RecordingDebugger, RecordingRunner};

fn config(secret: &str, port: u16, debugger_path: &str) -> LauncherConfig {
    LauncherConfig::from_positionals(
        "/work/proj",
        "pytest",
        secret,
        port,
        debugger_path,
        vec!["-x".to_owned(), "tests/test_spam.py".to_owned()],
    )
}

#[tokio::test]
async fn no_secret_and_no_port_runs_directly() {
    let mut host = FakeHost::new("/home/dev");
    let mut debugger = RecordingDebugger::new();
    let runner = RecordingRunner::new(0);

    let code = launch(config("", 0, ""), &mut host, &mut debugger, &runner)
        .await
        .unwrap();

    assert_eq!(code, 0);
    assert!(debugger.calls().is_empty());
    assert_eq!(host.changes, vec![PathBuf::from("/work/proj")]);

    let runs = runner.runs();
    assert_eq!(runs.len(), 1);
    let (script, args) = &runs[0];
    assert_eq!(args, &vec!["-x".to_owned(), "tests/test_spam.py".to_owned()]);
    assert!(script.contains("sys.path[0] = \"/home/dev\""));
    assert!(script.contains("pytest.main(sys.argv[1:])"));
}

#[tokio::test]
async fn port_alone_takes_the_modern_handshake_once() {
    let mut host = FakeHost::new("/home/dev");
    let mut debugger = RecordingDebugger::new();
    let runner = RecordingRunner::new(0);

    launch(config("", 5678, ""), &mut host, &mut debugger, &runner)
        .await
        .unwrap();

    assert_eq!(
        debugger.calls(),
        vec![
            DebuggerCall::EnableAttach {
                secret: None,
                address: attach_address(5678),
            },
            DebuggerCall::WaitForAttach,
        ]
    );

    // The handshake statements come before the framework call.
    let (script, _) = &runner.runs()[0];
    let attach = script.find("# EnableAttach").unwrap();
    let wait = script.find("# WaitForAttach").unwrap();
    let main = script.rfind("main()").unwrap();
    assert!(attach < wait && wait < main);
}

#[tokio::test]
async fn secret_and_port_take_the_legacy_handshake() {
    let mut host = FakeHost::new("/home/dev");
    let mut debugger = RecordingDebugger::new();
    let runner = RecordingRunner::new(3);

    let code = launch(config("s3cret", 5678, ""), &mut host, &mut debugger, &runner)
        .await
        .unwrap();

    assert_eq!(code, 3);
    assert_eq!(
        debugger.calls(),
        vec![
            DebuggerCall::DontDebug,
            DebuggerCall::EntryPoint,
            DebuggerCall::EnableAttach {
                secret: Some("s3cret".to_owned()),
                address: attach_address(5678),
            },
            DebuggerCall::WaitForAttach,
        ]
    );
}

#[tokio::test]
async fn secret_without_port_does_not_attach() {
    let mut host = FakeHost::new("/home/dev");
    let mut debugger = RecordingDebugger::new();
    let runner = RecordingRunner::new(0);

    launch(config("s3cret", 0, ""), &mut host, &mut debugger, &runner)
        .await
        .unwrap();

    assert!(debugger.calls().is_empty());
    assert_eq!(runner.runs().len(), 1);
}

#[tokio::test]
async fn debugger_path_is_appended_after_first_entry() {
    let mut host = FakeHost::new("/home/dev");
    let mut launcher = Launcher::new(config("", 0, "/opt/debugger"));

    launcher.configure_paths(&mut host).unwrap();

    assert_eq!(launcher.state(), LaunchState::PathConfigured);
    assert_eq!(
        launcher.bootstrap().search_path_statements(),
        &[
            "sys.path[0] = \"/home/dev\"".to_owned(),
            "sys.path.append(\"/opt/debugger\")".to_owned(),
        ]
    );
}

#[tokio::test]
async fn states_advance_in_order() {
    let mut host = FakeHost::new("/home/dev");
    let mut debugger = RecordingDebugger::new();
    let runner = RecordingRunner::new(0);
    let mut launcher = Launcher::new(config("", 5678, ""));

    assert_eq!(launcher.state(), LaunchState::Init);
    launcher.configure_paths(&mut host).unwrap();
    assert_eq!(launcher.state(), LaunchState::PathConfigured);
    launcher.attach(&mut debugger).await.unwrap();
    assert_eq!(launcher.state(), LaunchState::Attached);
    launcher.run(&runner).await.unwrap();
    assert_eq!(launcher.state(), LaunchState::Terminated);

    // The sequence runs once.
    assert!(launcher.configure_paths(&mut host).is_err());
    assert!(launcher.run(&runner).await.is_err());
}

#[tokio::test]
async fn running_before_attach_is_rejected() {
    let mut host = FakeHost::new("/home/dev");
    let runner = RecordingRunner::new(0);
    let mut launcher = Launcher::new(config("", 0, ""));

    launcher.configure_paths(&mut host).unwrap();
    let err = launcher.run(&runner).await.unwrap_err();

    assert!(err.to_string().contains("path_configured -> running"));
    assert!(runner.runs().is_empty());
}

#[tokio::test]
async fn attach_failure_is_a_bootstrap_error() {
    let mut host = FakeHost::new("/home/dev");
    let mut debugger = RecordingDebugger::failing_enable();
    let runner = RecordingRunner::new(0);

    let err = launch(config("", 5678, ""), &mut host, &mut debugger, &runner)
        .await
        .unwrap_err();

    assert!(matches!(err, LaunchError::Bootstrap(_)));
    assert!(runner.runs().is_empty());
}

#[tokio::test]
async fn bad_working_directory_is_a_bootstrap_error() {
    let mut host = FakeHost::failing_chdir("/home/dev");
    let mut debugger = RecordingDebugger::new();
    let runner = RecordingRunner::new(0);

    let err = launch(config("", 0, ""), &mut host, &mut debugger, &runner)
        .await
        .unwrap_err();

    let LaunchError::Bootstrap(source) = err else {
        panic!("expected a bootstrap error");
    };
    assert!(format!("{source:#}").contains("/work/proj"));
    assert!(runner.runs().is_empty());
}
