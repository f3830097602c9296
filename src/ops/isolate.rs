//! Implementation of the isolation pipeline.
//!
//! Strictly sequential: resolve the repository and the target, compute the
//! dependency closure, materialize files and manifests, then rewrite the
//! lockfile against the new layout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::closure::{resolve_closure, DependencyClosure};
use crate::core::registry::WorkspaceRegistry;
use crate::core::workspace::{find_workspace_root, WorkspacePackage, DEFAULT_MAX_DEPTH};
use crate::lockfile::types::LOCKFILE_NAME;
use crate::lockfile::{load_lockfile, rewrite_lockfile, save_lockfile, RelocatedWorkspace, RewriteOptions};
use crate::ops::layout::{OutputLayout, DEFAULT_OUTPUT_FOLDER, NPMRC};
use crate::ops::materialize;
use crate::util::fs;

/// Options for an isolation run.
#[derive(Debug, Clone)]
pub struct IsolateOptions {
    /// Workspace name or directory path; defaults to the workspace
    /// containing the current directory
    pub workspace: Option<String>,

    /// Repository root search starts here instead of the current directory
    pub project_folder: Option<PathBuf>,

    /// Upward search depth for the repository root
    pub max_depth: u32,

    /// Output folder name inside the target workspace
    pub output_folder: String,

    /// Generate the pruned lockfile
    pub pnpm_lock_file: bool,

    /// Skip copying the root .npmrc
    pub pnpmrc_disable: bool,

    /// Skip the manifest-only workspace copies
    pub src_less_disable: bool,

    /// Extra files to copy into the manifest-only copies
    pub src_less_glob: Option<String>,

    /// Retain sibling devDependencies (and traverse them for the closure)
    pub src_less_sub_dev_deps: bool,

    /// Skip the production-restricted manifest-only copies
    pub src_less_prod_disable: bool,

    /// Extra files to copy into the production-restricted copies
    pub src_less_prod_glob: Option<String>,

    /// Skip writing the full manifest
    pub json_file_disable: bool,

    /// Skip writing the production-only manifest
    pub json_file_prod_disable: bool,

    /// Merge the root manifest's dependency maps under the target's
    pub include_root_deps: bool,

    /// Copy the target workspace's own files
    pub src_files_enable: bool,

    /// Copy only the target files matching this glob
    pub src_files_include_glob: Option<String>,

    /// Copy the target files except those matching this glob
    pub src_files_exclude_glob: Option<String>,

    /// Exclude glob applied when copying sibling workspaces
    pub workspaces_exclude_glob: Option<String>,

    /// Do not copy the root manifest's pnpm config block
    pub disable_root_config: bool,
}

impl Default for IsolateOptions {
    fn default() -> Self {
        IsolateOptions {
            workspace: None,
            project_folder: None,
            max_depth: DEFAULT_MAX_DEPTH,
            output_folder: DEFAULT_OUTPUT_FOLDER.to_string(),
            pnpm_lock_file: false,
            pnpmrc_disable: false,
            src_less_disable: false,
            src_less_glob: None,
            src_less_sub_dev_deps: false,
            src_less_prod_disable: false,
            src_less_prod_glob: None,
            json_file_disable: false,
            json_file_prod_disable: false,
            include_root_deps: false,
            src_files_enable: false,
            src_files_include_glob: None,
            src_files_exclude_glob: None,
            workspaces_exclude_glob: None,
            disable_root_config: false,
        }
    }
}

/// Run the pipeline.
pub fn isolate(opts: &IsolateOptions) -> Result<()> {
    let start = match &opts.project_folder {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    let root = find_workspace_root(&start, opts.max_depth)?;

    let mut registry = WorkspaceRegistry::load(&root)?;
    let target_name = registry.resolve_target(opts.workspace.as_deref(), &start)?;
    registry.strip_target_edges(&target_name);

    let closure = resolve_closure(&target_name, &registry, opts.src_less_sub_dev_deps);
    debug!(
        workspace = %target_name,
        prod = closure.prod.len(),
        dev_only = closure.dev_only.len(),
        "resolved workspace closure"
    );

    let target = registry
        .get(&target_name)
        .with_context(|| format!("workspace disappeared from registry: {}", target_name))?
        .clone();

    let layout = OutputLayout::new(&target.location, &opts.output_folder);
    layout.reset()?;

    materialize::materialize_target(&target, &layout, opts)?;
    materialize::materialize_workspaces(&mut registry, &closure, &layout, opts)?;
    if !opts.src_less_disable {
        materialize::materialize_src_less(&registry, &closure, &layout, opts)?;
    }
    if !opts.src_less_prod_disable {
        materialize::materialize_src_less_prod(&registry, &closure, &layout, opts)?;
    }

    write_target_manifests(&target, &registry, &layout, opts)?;
    write_workspace_declaration(&registry, &closure, &layout)?;
    if !opts.pnpmrc_disable {
        copy_root_npmrc(&registry, &layout)?;
    }
    if opts.pnpm_lock_file {
        write_lockfile(&registry, &target, &closure, &layout, opts)?;
    }

    Ok(())
}

/// Emit the target's full and production-only manifests at the output root.
fn write_target_manifests(
    target: &WorkspacePackage,
    registry: &WorkspaceRegistry,
    layout: &OutputLayout,
    opts: &IsolateOptions,
) -> Result<()> {
    let root_manifest = registry.root_manifest();

    let mut manifest = target.manifest.clone();
    if opts.include_root_deps {
        manifest.merge_default_dependencies(root_manifest);
    }
    if !opts.disable_root_config {
        if let Some(pnpm) = &root_manifest.pnpm {
            manifest.pnpm = Some(pnpm.clone());
        }
    }

    if !opts.json_file_prod_disable {
        manifest.production().save(&layout.prod_manifest_path())?;
    }
    if !opts.json_file_disable {
        manifest.save(&layout.manifest_path())?;
    }
    Ok(())
}

/// Emit the workspace declaration scoped to the related workspaces' planned
/// paths.
fn write_workspace_declaration(
    registry: &WorkspaceRegistry,
    closure: &DependencyClosure,
    layout: &OutputLayout,
) -> Result<()> {
    let mut declaration = registry.declaration().clone();
    declaration.packages = closure
        .related()
        .filter_map(|name| registry.get(name))
        .map(|ws| ws.planned_path())
        .collect();
    declaration.save(&layout.declaration_path())
}

/// Copy the root `.npmrc` next to the emitted manifests, when present.
fn copy_root_npmrc(registry: &WorkspaceRegistry, layout: &OutputLayout) -> Result<()> {
    let source = registry.root().join(NPMRC);
    if source.is_file() {
        fs::copy_file_preserving_mtime(&source, &layout.npmrc_path())?;
    }
    Ok(())
}

/// Prune and rewrite the root lockfile for the new layout.
///
/// A repository without a lockfile is not an error: the step is skipped with
/// a warning and the rest of the output stands.
fn write_lockfile(
    registry: &WorkspaceRegistry,
    target: &WorkspacePackage,
    closure: &DependencyClosure,
    layout: &OutputLayout,
    opts: &IsolateOptions,
) -> Result<()> {
    let path = registry.root().join(LOCKFILE_NAME);
    let Some(mut doc) = load_lockfile(&path)? else {
        warn!("no {} file on project root", LOCKFILE_NAME);
        return Ok(());
    };

    let related: Vec<RelocatedWorkspace> = closure
        .related()
        .filter_map(|name| registry.get(name))
        .map(|ws| RelocatedWorkspace {
            name: ws.name.clone(),
            old_path: ws.relative_path.clone(),
            new_path: ws.planned_path(),
        })
        .collect();

    rewrite_lockfile(
        &mut doc,
        &target.relative_path,
        &related,
        &RewriteOptions {
            include_root_deps: opts.include_root_deps,
            keep_sub_dev_deps: opts.src_less_sub_dev_deps,
        },
    )?;

    save_lockfile(&layout.lockfile_path(), &doc)
}
