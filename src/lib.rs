//! pnpm-isolate - extract one workspace from a pnpm monorepo.
//!
//! This crate turns a single workspace of a multi-package repository into a
//! self-contained directory tree for isolated builds and container images:
//! the workspace's own files, the transitive closure of its sibling
//! dependencies, correctly-scoped manifests, and a pruned, link-rewritten
//! lockfile.

pub mod core;
pub mod lockfile;
pub mod ops;
pub mod util;

/// Test fixtures for pnpm-isolate unit tests.
///
/// Only available when compiling tests; provides scratch monorepos on disk.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    closure::{resolve_closure, DependencyClosure},
    manifest::PackageManifest,
    registry::WorkspaceRegistry,
    workspace::{find_workspace_root, WorkspaceError, WorkspacePackage},
};

pub use crate::ops::isolate::{isolate, IsolateOptions};
