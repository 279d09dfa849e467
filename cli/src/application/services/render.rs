//! Application service: write a rendered source tree into a working directory.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::{Path, PathBuf};

use agentify_common::AgentPluginDescriptor;
use chrono::{DateTime, Utc};

use crate::application::ports::LocalFs;
use crate::domain::error::TemplateError;
use crate::domain::render::{MANIFEST_FILE, SourceTree, render_tree};
use crate::domain::templates::TemplateSet;

/// A source tree that has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSourceTree {
    pub root: PathBuf,
    pub tree: SourceTree,
}

impl RenderedSourceTree {
    /// Absolute paths of every written file, in path order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.tree.files.keys().map(|rel| self.root.join(rel)).collect()
    }
}

/// Render `descriptor` and write it under `working_dir`, clearing any
/// previous content first.
///
/// An existing directory is only cleared when it is empty or holds a
/// previously generated tree (an `agent.manifest.json` at its root).
///
/// # Errors
///
/// Returns a [`TemplateError`] if rendering fails or the directory cannot be
/// prepared or written.
pub fn render_to_dir(
    fs: &impl LocalFs,
    descriptor: &AgentPluginDescriptor,
    templates: &TemplateSet,
    working_dir: &Path,
    generated_at: Option<DateTime<Utc>>,
) -> Result<RenderedSourceTree, TemplateError> {
    let tree = render_tree(descriptor, templates, generated_at)?;

    let dir_err = |e: anyhow::Error| TemplateError::WorkingDir {
        path: working_dir.to_path_buf(),
        message: format!("{e:#}"),
    };
    if fs.exists(working_dir) {
        let generated = fs.exists(&working_dir.join(MANIFEST_FILE));
        if !generated && !fs.is_empty_dir(working_dir).map_err(dir_err)? {
            return Err(TemplateError::ForeignDir {
                path: working_dir.to_path_buf(),
                manifest: MANIFEST_FILE,
            });
        }
        fs.remove_dir_all(working_dir).map_err(dir_err)?;
    }
    fs.create_dir_all(working_dir).map_err(dir_err)?;

    for (rel, content) in &tree.files {
        let path = rel.split('/').fold(working_dir.to_path_buf(), |p, part| p.join(part));
        if let Some(parent) = path.parent().filter(|p| *p != working_dir) {
            fs.create_dir_all(parent).map_err(|e| TemplateError::WorkingDir {
                path: parent.to_path_buf(),
                message: format!("{e:#}"),
            })?;
        }
        fs.write(&path, content).map_err(|e| TemplateError::Write {
            path: path.clone(),
            message: format!("{e:#}"),
        })?;
    }
    tracing::debug!(root = %working_dir.display(), files = tree.files.len(), "source tree written");

    Ok(RenderedSourceTree {
        root: working_dir.to_path_buf(),
        tree,
    })
}
