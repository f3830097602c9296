//! Typed pnpm-lock.yaml model.
//!
//! Named fields exist only for what the transformer rewrites; every other
//! field round-trips through an opaque `rest` map. The schema follows the
//! v5-style lockfile layout: `importers` keyed by root-relative path (or
//! `.`), `packages` keyed by `/name/version`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::manifest::DependencyMap;

/// Base file name of the lockfile.
pub const LOCKFILE_NAME: &str = "pnpm-lock.yaml";

/// Prefix of a dependency value satisfied by a directory link.
pub const LINK_PREFIX: &str = "link:";

/// The importer key of the repository root.
pub const ROOT_IMPORTER: &str = ".";

/// A parsed lockfile document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lockfile_version: Option<serde_yaml::Value>,

    /// Per-workspace resolved dependency records, keyed by relative path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importers: Option<IndexMap<String, ImporterSnapshot>>,

    /// Externally-resolved packages, keyed by `/name/version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packages: Option<IndexMap<String, PackageSnapshot>>,

    /// All other document fields, preserved verbatim
    #[serde(flatten)]
    pub rest: IndexMap<String, serde_yaml::Value>,
}

/// One importer record: a workspace's (or the root's) resolved dependencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImporterSnapshot {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub specifiers: DependencyMap,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: DependencyMap,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dev_dependencies: DependencyMap,

    /// optionalDependencies and any future fields, preserved verbatim
    #[serde(flatten)]
    pub rest: IndexMap<String, serde_yaml::Value>,
}

impl ImporterSnapshot {
    /// Merge another importer's maps underneath this one's; this importer's
    /// entries win on key collision, defaults keep their leading position.
    pub fn merge_defaults(&mut self, defaults: &ImporterSnapshot) {
        self.specifiers = merged(&defaults.specifiers, &self.specifiers);
        self.dependencies = merged(&defaults.dependencies, &self.dependencies);
        self.dev_dependencies = merged(&defaults.dev_dependencies, &self.dev_dependencies);
    }
}

fn merged(defaults: &DependencyMap, overlay: &DependencyMap) -> DependencyMap {
    let mut out = defaults.clone();
    for (name, value) in overlay {
        out.insert(name.clone(), value.clone());
    }
    out
}

/// One resolved package record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSnapshot {
    /// Resolution metadata (integrity, tarball, ...), opaque and untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: DependencyMap,

    /// engines, dev, peerDependencies and the like, preserved verbatim
    #[serde(flatten)]
    pub rest: IndexMap<String, serde_yaml::Value>,
}

/// The package identifier for a `name -> version` dependency edge.
pub fn package_id(name: &str, version: &str) -> String {
    format!("/{}/{}", name, version)
}

/// A dependency value pointing at a directory link instead of a registry
/// version.
pub fn link_value(path: &str) -> String {
    format!("{}{}", LINK_PREFIX, path)
}

/// Check whether a dependency value is a directory link.
pub fn is_link(value: &str) -> bool {
    value.starts_with(LINK_PREFIX)
}
