//! Build invoker tests against a rendered tree on disk.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use agentify_cli::application::services::build::{TAIL_LINES, build, build_plan};
use agentify_cli::application::services::render::{RenderedSourceTree, render_to_dir};
use agentify_cli::domain::catalog::ToolCatalog;
use agentify_cli::domain::error::BuildError;
use agentify_cli::domain::normalize::normalize;
use agentify_cli::domain::record::CompilationRecord;
use agentify_cli::domain::templates::TemplateSet;
use agentify_cli::infra::fs::StdFs;
use agentify_common::IsolationLimits;
use tokio::sync::watch;

use crate::mocks::{BuildScript, MockRunner, SeqIds, Toolchain, starbucks_helper};

fn rendered(root: &std::path::Path, target: &str) -> RenderedSourceTree {
    let d = normalize(
        &starbucks_helper(target),
        &ToolCatalog::builtin(),
        &SeqIds::new("agent"),
    )
    .expect("valid");
    render_to_dir(&StdFs, &d, &TemplateSet::builtin(), &root.join("work"), None).expect("render")
}

#[tokio::test]
async fn test_bytecode_build_returns_package_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tree = rendered(dir.path(), "bytecode-module");
    let plan = build_plan(&tree, &IsolationLimits::default(), 1);
    let runner = MockRunner::succeeding(Toolchain::full());
    let (_tx, rx) = watch::channel(false);
    let mut record = CompilationRecord::new("req-1");

    let artifact = build(&runner, &StdFs, &plan, rx, &mut record).await.expect("build");

    assert!(artifact.is_dir());
    assert!(record.log.iter().any(|e| e.message.starts_with("$ python3 -m compileall")));
}

#[tokio::test]
async fn test_exit_failure_tail_is_bounded_and_ends_with_last_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tree = rendered(dir.path(), "native-module");
    let plan = build_plan(&tree, &IsolationLimits::default(), 1);
    let lines: Vec<String> = (0..50).map(|i| format!("line {i}")).collect();
    let runner = MockRunner::new(Toolchain::full(), BuildScript::Fail { code: 2, lines });
    let (_tx, rx) = watch::channel(false);
    let mut record = CompilationRecord::new("req-1");

    let err = build(&runner, &StdFs, &plan, rx, &mut record).await.unwrap_err();

    let BuildError::Exit { code, tail } = err else {
        panic!("expected exit error");
    };
    assert_eq!(code, Some(2));
    assert_eq!(tail.len(), TAIL_LINES);
    assert_eq!(tail.last().map(String::as_str), Some("line 49"));
    // Every line still reaches the record.
    assert!(record.log.iter().any(|e| e.message == "line 0"));
}

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tree = rendered(dir.path(), "bytecode-module");
    let mut plan = build_plan(&tree, &IsolationLimits::default(), 1);
    plan.timeout = Duration::from_millis(100);
    let runner = MockRunner::new(Toolchain::full(), BuildScript::Hang);
    let (_tx, rx) = watch::channel(false);
    let mut record = CompilationRecord::new("req-1");

    let err = build(&runner, &StdFs, &plan, rx, &mut record).await.unwrap_err();

    assert!(matches!(err, BuildError::Timeout { .. }), "got {err}");
}
