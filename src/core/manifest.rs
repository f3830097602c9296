//! package.json parsing and rewriting.
//!
//! Only the fields the isolation pipeline touches are modeled; everything
//! else round-trips untouched through `rest`.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::util::fs;

/// Name of the package manifest file.
pub const PACKAGE_MANIFEST: &str = "package.json";

/// A `name -> version/range` dependency mapping, in file order.
pub type DependencyMap = IndexMap<String, String>;

/// A parsed package.json manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Package name (root manifests may omit it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Production dependencies
    #[serde(default)]
    pub dependencies: DependencyMap,

    /// Development dependencies
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: DependencyMap,

    /// Shared pnpm configuration block (overrides, hooks, ...), kept opaque
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnpm: Option<serde_json::Value>,

    /// All other manifest fields, preserved verbatim
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl PackageManifest {
    /// Load a manifest from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }

    /// Write the manifest as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write_string(path, &self.render()?)
    }

    /// Write the manifest only if no file exists at the path yet.
    pub fn save_if_absent(&self, path: &Path) -> Result<bool> {
        fs::write_if_absent(path, &self.render()?)
    }

    fn render(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).context("failed to serialize manifest")?;
        json.push('\n');
        Ok(json)
    }

    /// Remove every dependency edge pointing at `name`.
    pub fn strip_dependency(&mut self, name: &str) {
        self.dependencies.shift_remove(name);
        self.dev_dependencies.shift_remove(name);
    }

    /// Merge another manifest's dependency maps underneath this one's.
    ///
    /// Default entries come first, in their own order; this manifest's
    /// entries overlay them and win on key collision.
    pub fn merge_default_dependencies(&mut self, defaults: &PackageManifest) {
        self.dependencies = merge_defaults(&defaults.dependencies, &self.dependencies);
        self.dev_dependencies = merge_defaults(&defaults.dev_dependencies, &self.dev_dependencies);
    }

    /// A production copy of this manifest: devDependencies forced to empty.
    pub fn production(&self) -> PackageManifest {
        let mut manifest = self.clone();
        manifest.dev_dependencies = DependencyMap::new();
        manifest
    }
}

fn merge_defaults(defaults: &DependencyMap, overlay: &DependencyMap) -> DependencyMap {
    let mut merged = defaults.clone();
    for (name, version) in overlay {
        merged.insert(name.clone(), version.clone());
    }
    merged
}
