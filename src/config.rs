//! Run configuration.
//!
//! One `VendorConfig` is built per invocation and threaded explicitly
//! through the walker, resolver and synchronizer. Nothing here is process
//! global, so multiple projects can be resolved independently in tests.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct VendorConfig {
    /// Workspace root; external packages live under `<workspace>/src/`.
    pub workspace_root: PathBuf,
    /// Root directory of the project being vendored.
    pub project_root: PathBuf,
    /// Import path of the project itself, derived from its location under
    /// the workspace `src/` directory.
    pub project_import_path: String,
    /// Directory name that holds vendored trees (and that the walker must
    /// never descend into).
    pub vendor_dir_name: String,
    /// Manifest file name, relative to the project root.
    pub manifest_name: String,
    /// Strip the nested vendor directories of dependencies when copying.
    pub flatten: bool,
}

impl VendorConfig {
    /// Build a run configuration. The project must live under
    /// `<workspace>/src/`; its location below that directory is its import
    /// path.
    pub fn new(workspace_root: PathBuf, project_root: PathBuf) -> Result<Self> {
        let workspace_root = fs::canonicalize(&workspace_root)
            .with_context(|| format!("workspace root {} not found", workspace_root.display()))?;
        let project_root = fs::canonicalize(&project_root)
            .with_context(|| format!("project root {} not found", project_root.display()))?;

        let src_root = workspace_root.join("src");
        let Ok(rel) = project_root.strip_prefix(&src_root) else {
            bail!(
                "project {} is not under {}",
                project_root.display(),
                src_root.display()
            );
        };
        let project_import_path = rel
            .iter()
            .map(|c| c.to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if project_import_path.is_empty() {
            bail!(
                "project root must name a package below {}",
                src_root.display()
            );
        }

        Ok(Self {
            workspace_root,
            project_root,
            project_import_path,
            vendor_dir_name: "vendor".to_string(),
            manifest_name: "vendor.conf".to_string(),
            flatten: false,
        })
    }

    pub fn src_root(&self) -> PathBuf {
        self.workspace_root.join("src")
    }

    pub fn vendor_dir(&self) -> PathBuf {
        self.project_root.join(&self.vendor_dir_name)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_root.join(&self.manifest_name)
    }
}
