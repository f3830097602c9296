//! Dependency closure resolution.
//!
//! Computes which sibling workspaces the target (transitively) depends on.
//! Two depth-first passes over an immutable registry: a production pass that
//! follows production edges only, and a development pass seeded from both
//! dependency kinds. Visited sets make diamonds and cycles terminate.

use indexmap::IndexSet;

use crate::core::registry::WorkspaceRegistry;

/// The ordered, deduplicated closure of workspaces related to the target.
#[derive(Debug, Clone, Default)]
pub struct DependencyClosure {
    /// Workspaces reachable through production dependencies, discovery order
    pub prod: Vec<String>,

    /// Dev-reachable workspaces not already in `prod`, discovery order
    pub dev_only: Vec<String>,
}

impl DependencyClosure {
    /// All related workspaces: production first, then dev-only.
    pub fn related(&self) -> impl Iterator<Item = &String> {
        self.prod.iter().chain(self.dev_only.iter())
    }

    /// Check whether a name is part of the closure.
    pub fn is_related(&self, name: &str) -> bool {
        self.prod.iter().any(|n| n == name) || self.dev_only.iter().any(|n| n == name)
    }
}

/// Resolve the closure for `target`.
///
/// With `deep_dev` enabled the development pass also follows each sibling's
/// own development dependencies; the production pass is unaffected.
///
/// Expects the registry to have the target's edges stripped already, so the
/// result can never contain the target itself.
pub fn resolve_closure(
    target: &str,
    registry: &WorkspaceRegistry,
    deep_dev: bool,
) -> DependencyClosure {
    let Some(target_ws) = registry.get(target) else {
        return DependencyClosure::default();
    };

    let mut prod = IndexSet::new();
    for name in target_ws.manifest.dependencies.keys() {
        visit(registry, name, false, &mut prod);
    }

    let mut dev = IndexSet::new();
    let dev_seeds = target_ws
        .manifest
        .dependencies
        .keys()
        .chain(target_ws.manifest.dev_dependencies.keys());
    for name in dev_seeds {
        visit(registry, name, deep_dev, &mut dev);
    }

    let dev_only = dev
        .into_iter()
        .filter(|name| !prod.contains(name))
        .collect();

    DependencyClosure {
        prod: prod.into_iter().collect(),
        dev_only,
    }
}

fn visit(
    registry: &WorkspaceRegistry,
    name: &str,
    follow_dev: bool,
    visited: &mut IndexSet<String>,
) {
    // External packages are not registry members; they stay in manifests and
    // the lockfile but never join the closure.
    let Some(workspace) = registry.get(name) else {
        return;
    };
    if !visited.insert(name.to_string()) {
        return;
    }

    for dep in workspace.manifest.dependencies.keys() {
        visit(registry, dep, follow_dev, visited);
    }
    if follow_dev {
        for dep in workspace.manifest.dev_dependencies.keys() {
            visit(registry, dep, follow_dev, visited);
        }
    }
}
