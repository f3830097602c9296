//! Workspace registry - discovery and lookup.
//!
//! The registry expands the workspace declaration's member globs, loads every
//! member manifest, and answers name and path lookups for the rest of the
//! pipeline. It owns its manifest copies; the repository files are never
//! mutated.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;
use indexmap::IndexMap;
use tracing::debug;

use crate::core::manifest::{PackageManifest, PACKAGE_MANIFEST};
use crate::core::workspace::{
    WorkspaceDeclaration, WorkspaceError, WorkspacePackage, WORKSPACE_MANIFEST,
};
use crate::util::fs;

/// All packages declared by the repository's workspace declaration.
#[derive(Debug)]
pub struct WorkspaceRegistry {
    root: PathBuf,
    root_manifest: PackageManifest,
    declaration: WorkspaceDeclaration,
    packages: IndexMap<String, WorkspacePackage>,
}

impl WorkspaceRegistry {
    /// Load the registry for the repository rooted at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to resolve repository root: {}", root.display()))?;

        let declaration = WorkspaceDeclaration::load(&root.join(WORKSPACE_MANIFEST))?;
        let root_manifest = PackageManifest::load(&root.join(PACKAGE_MANIFEST))?;

        let mut packages = IndexMap::new();
        for dir in expand_member_globs(&root, &declaration.packages)? {
            let manifest_path = dir.join(PACKAGE_MANIFEST);
            if !manifest_path.is_file() {
                continue;
            }
            let manifest = PackageManifest::load(&manifest_path)?;
            let Some(name) = manifest.name.clone() else {
                debug!("skipping unnamed workspace at {}", dir.display());
                continue;
            };
            let relative_path = fs::to_slash(&fs::relative_path(&root, &dir));
            packages.insert(
                name.clone(),
                WorkspacePackage {
                    name,
                    location: dir,
                    manifest,
                    relative_path,
                    new_location: None,
                },
            );
        }

        Ok(WorkspaceRegistry {
            root,
            root_manifest,
            declaration,
            packages,
        })
    }

    /// The repository root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The repository root's own manifest.
    pub fn root_manifest(&self) -> &PackageManifest {
        &self.root_manifest
    }

    /// The parsed workspace declaration.
    pub fn declaration(&self) -> &WorkspaceDeclaration {
        &self.declaration
    }

    /// Look up a workspace by name.
    pub fn get(&self, name: &str) -> Option<&WorkspacePackage> {
        self.packages.get(name)
    }

    /// Look up a workspace by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut WorkspacePackage> {
        self.packages.get_mut(name)
    }

    /// Check whether a name belongs to a workspace of this repository.
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Iterate all workspaces in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkspacePackage> {
        self.packages.values()
    }

    /// Remove every dependency edge pointing at `target` from every
    /// workspace manifest.
    ///
    /// This covers self-references and sibling back-edges; the closure never
    /// traverses into the target itself.
    pub fn strip_target_edges(&mut self, target: &str) {
        for workspace in self.packages.values_mut() {
            workspace.manifest.strip_dependency(target);
        }
    }

    /// Resolve the target workspace from a name, a directory path, or - when
    /// nothing was given - the workspace containing `cwd`.
    pub fn resolve_target(
        &self,
        spec: Option<&str>,
        cwd: &Path,
    ) -> Result<String, WorkspaceError> {
        match spec {
            Some(spec) => {
                if self.packages.contains_key(spec) {
                    return Ok(spec.to_string());
                }

                let as_path = if Path::new(spec).is_absolute() {
                    PathBuf::from(spec)
                } else {
                    cwd.join(spec)
                };
                if let Ok(location) = as_path.canonicalize() {
                    if let Some(ws) =
                        self.packages.values().find(|ws| ws.location == location)
                    {
                        return Ok(ws.name.clone());
                    }
                }

                Err(WorkspaceError::UnknownWorkspace {
                    name: spec.to_string(),
                })
            }
            None => {
                let cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());
                self.packages
                    .values()
                    .filter(|ws| cwd.starts_with(&ws.location))
                    .max_by_key(|ws| ws.location.components().count())
                    .map(|ws| ws.name.clone())
                    .ok_or(WorkspaceError::NoEnclosingWorkspace { dir: cwd })
            }
        }
    }
}

/// Expand member globs into existing workspace directories.
///
/// Patterns prefixed with `!` exclude directories matched by earlier
/// patterns. Results are sorted within each pattern so discovery order is
/// reproducible.
fn expand_member_globs(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut excludes: Vec<Pattern> = Vec::new();

    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            excludes.push(
                Pattern::new(negated)
                    .with_context(|| format!("invalid exclusion pattern: {}", pattern))?,
            );
            continue;
        }

        let full_pattern = root.join(pattern);
        let mut matched: Vec<PathBuf> = glob::glob(&full_pattern.to_string_lossy())
            .with_context(|| format!("invalid member pattern: {}", pattern))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_dir())
            .filter_map(|path| path.canonicalize().ok())
            .collect();
        matched.sort();
        dirs.extend(matched);
    }

    dirs.dedup();
    dirs.retain(|dir| {
        let relative = fs::to_slash(&fs::relative_path(root, dir));
        !excludes.iter().any(|pattern| pattern.matches(&relative))
    });
    Ok(dirs)
}
