//! Workspace model and repository-root discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::manifest::PackageManifest;
use crate::util::fs;

/// Name of the workspace declaration file marking the repository root.
pub const WORKSPACE_MANIFEST: &str = "pnpm-workspace.yaml";

/// Subdirectory of the output root that holds relocated workspaces.
pub const WORKSPACES_DIR: &str = "workspaces";

/// Default number of parent directories searched for the repository root.
pub const DEFAULT_MAX_DEPTH: u32 = 5;

/// Errors raised while locating the repository or the target workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("no pnpm workspace project found within {depth} parent directories of {}", start.display())]
    RootNotFound { start: PathBuf, depth: u32 },

    #[error("no such workspace or folder: {name}")]
    UnknownWorkspace { name: String },

    #[error("no workspace contains the directory {}; pass a workspace name", dir.display())]
    NoEnclosingWorkspace { dir: PathBuf },
}

/// One package of the monorepo.
#[derive(Debug, Clone)]
pub struct WorkspacePackage {
    /// Package name, unique across the repository
    pub name: String,

    /// Absolute location of the workspace directory
    pub location: PathBuf,

    /// Parsed manifest (the registry's own copy, safe to rewrite)
    pub manifest: PackageManifest,

    /// Slash-separated path relative to the repository root; doubles as the
    /// lockfile importer key
    pub relative_path: String,

    /// Absolute location under the output root, set once materialized
    pub new_location: Option<PathBuf>,
}

impl WorkspacePackage {
    /// The workspace's planned path relative to the output root.
    pub fn planned_path(&self) -> String {
        format!("{}/{}", WORKSPACES_DIR, self.relative_path)
    }
}

/// Find the repository root by searching upward for the workspace
/// declaration file.
///
/// `start` itself is checked first; at most `max_depth` parents are visited
/// afterwards.
pub fn find_workspace_root(start: &Path, max_depth: u32) -> Result<PathBuf, WorkspaceError> {
    let mut current = start.to_path_buf();
    let mut remaining = max_depth;

    loop {
        if current.join(WORKSPACE_MANIFEST).is_file() {
            return Ok(current);
        }
        if remaining == 0 || !current.pop() {
            return Err(WorkspaceError::RootNotFound {
                start: start.to_path_buf(),
                depth: max_depth,
            });
        }
        remaining -= 1;
    }
}

/// The parsed workspace declaration (`pnpm-workspace.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceDeclaration {
    /// Member glob patterns; `!`-prefixed patterns are exclusions
    #[serde(default)]
    pub packages: Vec<String>,

    /// All other declaration fields, preserved verbatim
    #[serde(flatten)]
    pub rest: IndexMap<String, serde_yaml::Value>,
}

impl WorkspaceDeclaration {
    /// Load the declaration from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse workspace declaration: {}", path.display()))
    }

    /// Write the declaration as YAML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("failed to serialize workspace declaration")?;
        fs::write_string(path, &yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_root_in_start_directory() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(WORKSPACE_MANIFEST), "packages: []\n").unwrap();

        let root = find_workspace_root(tmp.path(), 5).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn test_find_root_searches_upward() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(WORKSPACE_MANIFEST), "packages: []\n").unwrap();
        let nested = tmp.path().join("packages").join("app").join("src");
        std::fs::create_dir_all(&nested).unwrap();

        let root = find_workspace_root(&nested, 5).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn test_find_root_respects_max_depth() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(WORKSPACE_MANIFEST), "packages: []\n").unwrap();
        let nested = tmp.path().join("a").join("b").join("c");
        std::fs::create_dir_all(&nested).unwrap();

        let result = find_workspace_root(&nested, 2);
        assert!(matches!(result, Err(WorkspaceError::RootNotFound { .. })));

        assert!(find_workspace_root(&nested, 3).is_ok());
    }

    #[test]
    fn test_declaration_round_trips_unknown_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(WORKSPACE_MANIFEST);
        std::fs::write(
            &path,
            "packages:\n  - packages/*\nshared-workspace-lockfile: true\n",
        )
        .unwrap();

        let mut declaration = WorkspaceDeclaration::load(&path).unwrap();
        declaration.packages = vec!["workspaces/packages/app".to_string()];
        declaration.save(&path).unwrap();

        let reloaded = WorkspaceDeclaration::load(&path).unwrap();
        assert_eq!(reloaded.packages, ["workspaces/packages/app"]);
        assert_eq!(
            reloaded.rest.get("shared-workspace-lockfile"),
            Some(&serde_yaml::Value::Bool(true))
        );
    }

    #[test]
    fn test_planned_path() {
        let ws = WorkspacePackage {
            name: "app".to_string(),
            location: PathBuf::from("/repo/packages/app"),
            manifest: serde_json::from_str(r#"{ "name": "app" }"#).unwrap(),
            relative_path: "packages/app".to_string(),
            new_location: None,
        };
        assert_eq!(ws.planned_path(), "workspaces/packages/app");
    }
}
