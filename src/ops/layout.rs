//! Output layout - the deterministic path scheme of the isolated tree.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::manifest::PACKAGE_MANIFEST;
use crate::core::workspace::{WorkspacePackage, WORKSPACE_MANIFEST, WORKSPACES_DIR};
use crate::lockfile::types::LOCKFILE_NAME;
use crate::util::fs;

/// Default name of the output folder inside the target workspace.
pub const DEFAULT_OUTPUT_FOLDER: &str = "_isolated_";

/// Subtree of manifest-only copies of every related workspace.
pub const SRC_LESS_DIR: &str = "workspaces-src-less";

/// Subtree of manifest-only copies of production-reachable workspaces.
pub const SRC_LESS_PROD_DIR: &str = "workspaces-src-less-prod";

/// Name of the production-only manifest emitted at the output root.
pub const PROD_MANIFEST: &str = "package-prod.json";

/// Companion config file copied from the repository root.
pub const NPMRC: &str = ".npmrc";

/// The planned layout of one isolation run.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    isolate_dir: PathBuf,
    output_folder: String,
}

impl OutputLayout {
    /// Plan the layout inside the target workspace.
    pub fn new(target_location: &Path, output_folder: &str) -> Self {
        OutputLayout {
            isolate_dir: target_location.join(output_folder),
            output_folder: output_folder.to_string(),
        }
    }

    /// The output root.
    pub fn isolate_dir(&self) -> &Path {
        &self.isolate_dir
    }

    /// The configured output folder name.
    pub fn output_folder(&self) -> &str {
        &self.output_folder
    }

    /// Root of the full workspace copies.
    pub fn workspaces_dir(&self) -> PathBuf {
        self.isolate_dir.join(WORKSPACES_DIR)
    }

    /// Root of the manifest-only copies.
    pub fn src_less_dir(&self) -> PathBuf {
        self.isolate_dir.join(SRC_LESS_DIR)
    }

    /// Root of the production-restricted manifest-only copies.
    pub fn src_less_prod_dir(&self) -> PathBuf {
        self.isolate_dir.join(SRC_LESS_PROD_DIR)
    }

    /// A workspace's directory under the full-copy subtree.
    pub fn workspace_dir(&self, workspace: &WorkspacePackage) -> PathBuf {
        self.workspaces_dir().join(&workspace.relative_path)
    }

    /// The emitted full manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.isolate_dir.join(PACKAGE_MANIFEST)
    }

    /// The emitted production-only manifest.
    pub fn prod_manifest_path(&self) -> PathBuf {
        self.isolate_dir.join(PROD_MANIFEST)
    }

    /// The emitted lockfile.
    pub fn lockfile_path(&self) -> PathBuf {
        self.isolate_dir.join(LOCKFILE_NAME)
    }

    /// The emitted workspace declaration.
    pub fn declaration_path(&self) -> PathBuf {
        self.isolate_dir.join(WORKSPACE_MANIFEST)
    }

    /// The copied companion config file.
    pub fn npmrc_path(&self) -> PathBuf {
        self.isolate_dir.join(NPMRC)
    }

    /// Delete any previous output and create the base directories.
    ///
    /// Every run regenerates the tree from scratch; there is no incremental
    /// mode, and a failed run's leftovers are removed here.
    pub fn reset(&self) -> Result<()> {
        fs::remove_dir_all_if_exists(&self.isolate_dir)?;
        fs::ensure_dir(&self.workspaces_dir())?;
        Ok(())
    }
}
