//! Working-directory handling for rendered source trees.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;

use agentify_cli::application::services::render::{RenderedSourceTree, render_to_dir};
use agentify_cli::domain::catalog::ToolCatalog;
use agentify_cli::domain::error::TemplateError;
use agentify_cli::domain::normalize::normalize;
use agentify_cli::domain::render::MANIFEST_FILE;
use agentify_cli::domain::templates::TemplateSet;
use agentify_cli::infra::fs::StdFs;

use crate::mocks::{SeqIds, starbucks_helper};

fn render_into(dir: &Path) -> Result<RenderedSourceTree, TemplateError> {
    let d = normalize(
        &starbucks_helper("native-module"),
        &ToolCatalog::builtin(),
        &SeqIds::new("agent"),
    )
    .expect("valid");
    render_to_dir(&StdFs, &d, &TemplateSet::builtin(), dir, None)
}

#[test]
fn test_render_creates_missing_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("fresh");

    let rendered = render_into(&out).expect("render");

    assert!(out.join(MANIFEST_FILE).is_file());
    assert!(rendered.paths().iter().all(|p| p.is_file()));
}

#[test]
fn test_render_replaces_previous_generated_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("agent");
    render_into(&out).expect("first render");
    std::fs::write(out.join("stale.txt"), b"old").unwrap();

    render_into(&out).expect("second render");

    assert!(!out.join("stale.txt").exists());
    assert!(out.join(MANIFEST_FILE).is_file());
}

#[test]
fn test_render_reuses_empty_directory() {
    let dir = tempfile::tempdir().expect("tempdir");

    render_into(dir.path()).expect("render");

    assert!(dir.path().join(MANIFEST_FILE).is_file());
}

#[test]
fn test_render_refuses_to_clear_unrelated_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let keep = dir.path().join("notes.txt");
    std::fs::write(&keep, b"precious").unwrap();

    let err = render_into(dir.path()).unwrap_err();

    assert!(matches!(err, TemplateError::ForeignDir { .. }), "got {err}");
    assert_eq!(std::fs::read_to_string(&keep).unwrap(), "precious");
}
