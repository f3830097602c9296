//! On-disk monorepo fixtures.

use std::path::Path;

use tempfile::TempDir;

use crate::core::manifest::PACKAGE_MANIFEST;
use crate::core::registry::WorkspaceRegistry;
use crate::core::workspace::WORKSPACE_MANIFEST;
use crate::lockfile::types::LOCKFILE_NAME;
use crate::ops::layout::{OutputLayout, DEFAULT_OUTPUT_FOLDER};

/// A scratch pnpm monorepo with a `packages/*` declaration.
pub struct MonorepoFixture {
    tmp: TempDir,
}

impl MonorepoFixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(WORKSPACE_MANIFEST),
            "packages:\n  - 'packages/*'\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join(PACKAGE_MANIFEST), r#"{ "name": "root" }"#).unwrap();
        MonorepoFixture { tmp }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Replace the repository root manifest.
    pub fn set_root_manifest(&self, json: &str) {
        std::fs::write(self.root().join(PACKAGE_MANIFEST), json).unwrap();
    }

    /// Add a workspace directory with the given manifest.
    pub fn add_workspace(&self, relative: &str, manifest_json: &str) {
        let dir = self.root().join(relative);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(PACKAGE_MANIFEST), manifest_json).unwrap();
    }

    /// Add an arbitrary file, creating parent directories.
    pub fn add_file(&self, relative: &str, contents: &str) {
        let path = self.root().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// Write a root lockfile.
    pub fn write_lockfile(&self, yaml: &str) {
        std::fs::write(self.root().join(LOCKFILE_NAME), yaml).unwrap();
    }

    /// Load the registry and plan a default-layout run for `target`.
    pub fn load(&self, target: &str) -> (WorkspaceRegistry, OutputLayout) {
        let registry = WorkspaceRegistry::load(self.root()).unwrap();
        let location = registry.get(target).unwrap().location.clone();
        let layout = OutputLayout::new(&location, DEFAULT_OUTPUT_FOLDER);
        (registry, layout)
    }
}

impl Default for MonorepoFixture {
    fn default() -> Self {
        Self::new()
    }
}
