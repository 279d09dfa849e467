//! Toolchain inspector and installer service tests.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use agentify_cli::application::services::toolchain::{
    InstallLocks, detect, detect_for, install_missing, probe,
};
use agentify_cli::domain::toolchain::{ToolchainCatalog, missing_for};
use agentify_common::BuildTarget;

use crate::mocks::{MockInstaller, MockRunner, Toolchain};

#[tokio::test]
async fn test_detect_reports_every_tool_in_catalog_order() {
    let runner = MockRunner::succeeding(Toolchain::with(&["cargo", "python3"]));
    let catalog = ToolchainCatalog::builtin();

    let statuses = detect(&runner, &catalog).await;

    let names: Vec<&str> = statuses.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["cargo", "rustc", "cc", "python3"]);
    assert!(statuses[0].available);
    assert_eq!(statuses[0].version.as_deref(), Some("1.80.0"));
    assert!(!statuses[1].available);
    assert!(statuses[1].detail.is_some());
}

#[tokio::test]
async fn test_detect_for_probes_only_target_tools() {
    let runner = MockRunner::succeeding(Toolchain::full());
    let catalog = ToolchainCatalog::builtin();

    let statuses = detect_for(&runner, &catalog, BuildTarget::BytecodeModule).await;

    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].name, "python3");
    assert_eq!(runner.probe_count(), 1);
}

#[tokio::test]
async fn test_spawn_failure_is_unavailable_not_error() {
    let runner = MockRunner::succeeding(Toolchain::default());
    let catalog = ToolchainCatalog::builtin();
    let req = catalog.get("rustc").expect("rustc");

    let status = probe(&runner, req).await;

    assert!(!status.available);
    assert!(status.detail.expect("detail").contains("No such file"));
}

#[tokio::test]
async fn test_install_missing_makes_tools_available() {
    let tc = Toolchain::default();
    let runner = MockRunner::succeeding(tc.clone());
    let installer = MockInstaller::working(&tc);
    let catalog = ToolchainCatalog::builtin();
    let missing = vec!["cargo".to_string(), "rustc".to_string()];

    install_missing(&runner, &installer, &InstallLocks::new(), &catalog, &missing)
        .await
        .expect("install");

    let mut calls = installer.calls();
    calls.sort();
    assert_eq!(calls, missing);
    let statuses = detect_for(&runner, &catalog, BuildTarget::NativeModule).await;
    assert_eq!(
        missing_for(&catalog, &statuses, BuildTarget::NativeModule),
        vec!["cc".to_string()]
    );
}

#[tokio::test]
async fn test_install_missing_reports_every_failure() {
    let tc = Toolchain::default();
    let runner = MockRunner::succeeding(tc.clone());
    let installer = MockInstaller::broken(&tc);
    let catalog = ToolchainCatalog::builtin();
    let missing = vec!["cc".to_string(), "no-such-tool".to_string()];

    let err = install_missing(&runner, &installer, &InstallLocks::new(), &catalog, &missing)
        .await
        .unwrap_err();

    let failed: Vec<&str> = err.failures.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(failed, vec!["cc", "no-such-tool"]);
    assert_eq!(installer.calls(), vec!["cc".to_string()]);
}

#[tokio::test]
async fn test_shared_locks_serialize_duplicate_installs() {
    let tc = Toolchain::default();
    let runner = MockRunner::succeeding(tc.clone());
    let installer = MockInstaller::working(&tc);
    let catalog = ToolchainCatalog::builtin();
    let locks = InstallLocks::new();
    let missing = vec!["python3".to_string()];

    let (a, b) = tokio::join!(
        install_missing(&runner, &installer, &locks, &catalog, &missing),
        install_missing(&runner, &installer, &locks, &catalog, &missing),
    );

    a.expect("first");
    b.expect("second");
    assert_eq!(installer.calls(), vec!["python3".to_string()]);
}

#[tokio::test]
async fn test_installs_of_different_tools_never_overlap() {
    let tc = Toolchain::default();
    let runner = MockRunner::succeeding(tc.clone());
    let installer = MockInstaller::working(&tc);
    let catalog = ToolchainCatalog::builtin();
    let missing = vec!["cargo".to_string(), "rustc".to_string(), "cc".to_string()];

    install_missing(&runner, &installer, &InstallLocks::new(), &catalog, &missing)
        .await
        .expect("install");

    assert_eq!(installer.calls().len(), 3);
    assert_eq!(installer.peak_concurrency(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_package_manager() {
    let tc = Toolchain::default();
    let runner = MockRunner::succeeding(tc.clone());
    let installer = MockInstaller::working(&tc);
    let catalog = ToolchainCatalog::builtin();
    let locks = InstallLocks::new();
    let native = vec!["cargo".to_string(), "cc".to_string()];
    let bytecode = vec!["python3".to_string()];

    let (a, b) = tokio::join!(
        install_missing(&runner, &installer, &locks, &catalog, &native),
        install_missing(&runner, &installer, &locks, &catalog, &bytecode),
    );

    a.expect("native");
    b.expect("bytecode");
    assert_eq!(installer.calls().len(), 3);
    assert_eq!(installer.peak_concurrency(), 1);
}
