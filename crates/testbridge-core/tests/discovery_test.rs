//! Discovery against a fake interpreter that replays canned collection
//! output.
#![cfg(unix)]

use std::time::Duration;

use testbridge_core::AdapterOptions;
use testbridge_core::discovery::pytest::PytestDiscoverer;
use testbridge_core::discovery::unittest::UnittestDiscoverer;
use testbridge_core::discovery::{NodeKind, ROOT_ID};
use testbridge_core::python::{PythonConfig, RESULT_MARKER};
use testbridge_core::registry::Discoverer;
use testbridge_test_utils::FakePython;

const PYTEST_PAYLOAD: &str = r#"{
  "root": "/proj",
  "items": [
    {"nodeid": "tests/test_spam.py::test_ham", "relfile": "tests/test_spam.py", "lineno": 4, "markers": []},
    {"nodeid": "tests/test_spam.py::TestEggs::test_fry[2-3]", "relfile": "tests/test_spam.py", "lineno": 10, "markers": ["slow"]}
  ]
}"#;

fn python(fake: &FakePython) -> PythonConfig {
    PythonConfig::new(fake.path())
}

#[tokio::test]
async fn pytest_collection_builds_hierarchy() {
    let fake = FakePython::discovery("collected 2 items", PYTEST_PAYLOAD, 0);
    let discoverer = PytestDiscoverer::new(python(&fake));

    let (parents, result) = discoverer
        .discover(&["-k".to_owned(), "spam".to_owned()], &AdapterOptions::default())
        .await
        .unwrap();

    assert_eq!(fake.recorded_args(), vec![RESULT_MARKER, "-k", "spam"]);
    assert_eq!(result.root().to_str(), Some("/proj"));
    assert_eq!(result.tests.len(), 2);

    let ham = &result.tests[0];
    assert_eq!(ham.id, "./tests/test_spam.py::test_ham");
    assert_eq!(ham.parentid, "./tests/test_spam.py");
    assert_eq!(ham.lineno, Some(4));

    let fry = &result.tests[1];
    assert_eq!(fry.subtest.as_deref(), Some("2-3"));
    assert_eq!(fry.markers, vec!["slow".to_owned()]);
    assert_eq!(fry.testfunc, "TestEggs.test_fry");

    let folder = parents.get("./tests").unwrap();
    assert_eq!(folder.kind, NodeKind::Folder);
    assert_eq!(folder.parentid, ROOT_ID);
    assert_eq!(
        parents.get("./tests/test_spam.py::TestEggs").unwrap().kind,
        NodeKind::Suite
    );
}

#[tokio::test]
async fn pytest_no_tests_collected_is_not_an_error() {
    let fake = FakePython::discovery("no tests ran", r#"{"root": "/proj", "items": []}"#, 5);
    let discoverer = PytestDiscoverer::new(python(&fake));

    let (parents, result) = discoverer
        .discover(&[], &AdapterOptions::default())
        .await
        .unwrap();

    assert!(parents.is_empty());
    assert!(result.tests.is_empty());
}

#[tokio::test]
async fn pytest_usage_error_fails_with_framework_output() {
    let fake = FakePython::discovery("ERROR: unrecognized arguments: --bogus", "{}", 4);
    let discoverer = PytestDiscoverer::new(python(&fake));

    let err = discoverer
        .discover(&["--bogus".to_owned()], &AdapterOptions::default())
        .await
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("exit code 4"), "{message}");
    assert!(message.contains("unrecognized arguments"), "{message}");
}

#[tokio::test]
async fn missing_payload_is_an_error() {
    let fake = FakePython::with_body("echo 'pytest blew up before reporting'\nexit 0");
    let discoverer = PytestDiscoverer::new(python(&fake));

    let err = discoverer
        .discover(&[], &AdapterOptions::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("without reporting"));
}

#[tokio::test]
async fn slow_interpreter_times_out() {
    let fake = FakePython::with_body("sleep 5");
    let config = python(&fake).with_timeout(Duration::from_millis(200));
    let discoverer = PytestDiscoverer::new(config);

    let err = discoverer
        .discover(&[], &AdapterOptions::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn unittest_loader_flags_reach_the_script() {
    let payload = r#"{
      "root": "/proj",
      "items": [
        {"id": "tests.test_spam.TestSpam.test_eggs", "relfile": "tests/test_spam.py", "lineno": 7, "suite": "TestSpam", "name": "test_eggs"}
      ],
      "errors": []
    }"#;
    let fake = FakePython::discovery("", payload, 0);
    let discoverer = UnittestDiscoverer::new(python(&fake));

    let args: Vec<String> = ["-s", "tests", "-p", "*_test.py"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let (parents, result) = discoverer
        .discover(&args, &AdapterOptions::default())
        .await
        .unwrap();

    assert_eq!(fake.recorded_args(), vec![RESULT_MARKER, "tests", "*_test.py", ""]);
    assert_eq!(result.tests.len(), 1);
    let test = &result.tests[0];
    assert_eq!(test.id, "tests.test_spam.TestSpam.test_eggs");
    assert_eq!(test.parentid, "./tests/test_spam.py::TestSpam");
    assert_eq!(test.testfunc, "TestSpam.test_eggs");
    assert!(parents.get("./tests/test_spam.py").is_some());
}

#[tokio::test]
async fn unittest_import_errors_fail_discovery() {
    let payload = r#"{
      "root": "/proj",
      "items": [],
      "errors": [{"id": "unittest.loader._FailedTest.test_broken", "message": "ImportError: No module named spam"}]
    }"#;
    let fake = FakePython::discovery("", payload, 0);
    let discoverer = UnittestDiscoverer::new(python(&fake));

    let err = discoverer
        .discover(&[], &AdapterOptions::default())
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("No module named spam"));
}

#[tokio::test]
async fn unittest_rejects_unknown_loader_flags() {
    let fake = FakePython::discovery("", "{}", 0);
    let discoverer = UnittestDiscoverer::new(python(&fake));

    let result = discoverer
        .discover(&["--failfast".to_owned()], &AdapterOptions::default())
        .await;

    assert!(result.is_err());
    // The interpreter never ran.
    assert!(fake.recorded_args().is_empty());
}
