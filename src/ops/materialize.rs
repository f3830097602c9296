//! File materialization - copying workspace trees into the planned layout.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::closure::DependencyClosure;
use crate::core::manifest::{PackageManifest, PACKAGE_MANIFEST};
use crate::core::registry::WorkspaceRegistry;
use crate::core::workspace::WorkspacePackage;
use crate::ops::isolate::IsolateOptions;
use crate::ops::layout::OutputLayout;
use crate::util::fs;

/// Entry names skipped at every level of every copy.
pub fn default_ignore(output_folder: &str) -> Vec<String> {
    vec![
        ".".to_string(),
        PACKAGE_MANIFEST.to_string(),
        "node_modules".to_string(),
        output_folder.to_string(),
    ]
}

/// Copy the target workspace's own files into the output root.
///
/// Exactly one policy applies: an exclude glob beats an include glob beats
/// the blanket enable; with none of the three set, nothing beyond the
/// generated manifests lands in the output root.
pub fn materialize_target(
    target: &WorkspacePackage,
    layout: &OutputLayout,
    opts: &IsolateOptions,
) -> Result<()> {
    let ignore = default_ignore(layout.output_folder());

    if let Some(pattern) = &opts.src_files_exclude_glob {
        let excluded = fs::glob_files(&target.location, pattern, &ignore)?;
        copy_tree(&target.location, layout.isolate_dir(), &ignore, &excluded)
    } else if let Some(pattern) = &opts.src_files_include_glob {
        let files = fs::glob_files(&target.location, pattern, &ignore)?;
        copy_selected(&target.location, layout.isolate_dir(), &files)
    } else if opts.src_files_enable {
        copy_tree(&target.location, layout.isolate_dir(), &ignore, &[])
    } else {
        Ok(())
    }
}

/// Copy every related workspace into the full-copy subtree, recording each
/// one's new location and writing its rewritten manifest.
pub fn materialize_workspaces(
    registry: &mut WorkspaceRegistry,
    closure: &DependencyClosure,
    layout: &OutputLayout,
    opts: &IsolateOptions,
) -> Result<()> {
    let ignore = default_ignore(layout.output_folder());
    let names: Vec<String> = closure.related().cloned().collect();

    for name in names {
        let workspace = registry
            .get_mut(&name)
            .with_context(|| format!("related workspace missing from registry: {}", name))?;

        let destination = layout.workspace_dir(workspace);
        fs::ensure_dir(&destination)?;
        workspace.new_location = Some(destination.clone());

        let manifest = sibling_manifest(workspace, opts.src_less_sub_dev_deps);
        manifest.save_if_absent(&destination.join(PACKAGE_MANIFEST))?;

        let excluded = match &opts.workspaces_exclude_glob {
            Some(pattern) => fs::glob_files(&workspace.location, pattern, &ignore)?,
            None => Vec::new(),
        };
        copy_tree(&workspace.location, &destination, &ignore, &excluded)?;
    }
    Ok(())
}

/// Write the manifest-only copy of every related workspace.
pub fn materialize_src_less(
    registry: &WorkspaceRegistry,
    closure: &DependencyClosure,
    layout: &OutputLayout,
    opts: &IsolateOptions,
) -> Result<()> {
    let names: Vec<&String> = closure.related().collect();
    materialize_manifest_variant(
        registry,
        &names,
        &layout.src_less_dir(),
        opts.src_less_glob.as_deref(),
        opts.src_less_sub_dev_deps,
        layout.output_folder(),
    )
}

/// Write the manifest-only copy of every production-reachable workspace.
pub fn materialize_src_less_prod(
    registry: &WorkspaceRegistry,
    closure: &DependencyClosure,
    layout: &OutputLayout,
    opts: &IsolateOptions,
) -> Result<()> {
    let names: Vec<&String> = closure.prod.iter().collect();
    materialize_manifest_variant(
        registry,
        &names,
        &layout.src_less_prod_dir(),
        opts.src_less_prod_glob.as_deref(),
        opts.src_less_sub_dev_deps,
        layout.output_folder(),
    )
}

fn materialize_manifest_variant(
    registry: &WorkspaceRegistry,
    names: &[&String],
    variant_root: &Path,
    extra_glob: Option<&str>,
    keep_sub_dev_deps: bool,
    output_folder: &str,
) -> Result<()> {
    let ignore = default_ignore(output_folder);
    fs::ensure_dir(variant_root)?;

    for name in names {
        let workspace = registry
            .get(name)
            .with_context(|| format!("related workspace missing from registry: {}", name))?;

        let destination = variant_root.join(&workspace.relative_path);
        fs::ensure_dir(&destination)?;

        let manifest = sibling_manifest(workspace, keep_sub_dev_deps);
        manifest.save_if_absent(&destination.join(PACKAGE_MANIFEST))?;

        if let Some(pattern) = extra_glob {
            let files = fs::glob_files(&workspace.location, pattern, &ignore)?;
            copy_selected(&workspace.location, &destination, &files)?;
        }
    }
    Ok(())
}

/// The manifest written for a related workspace: devDependencies cleared
/// unless they are explicitly retained. The content does not depend on which
/// closure path reached the workspace, so a duplicate write is harmless.
fn sibling_manifest(workspace: &WorkspacePackage, keep_sub_dev_deps: bool) -> PackageManifest {
    let mut manifest = workspace.manifest.clone();
    if !keep_sub_dev_deps {
        manifest.dev_dependencies.clear();
    }
    manifest
}

/// Copy a whole tree, skipping ignored names at every level and any file in
/// `excluded`. Timestamps are preserved.
fn copy_tree(src: &Path, dst: &Path, ignore: &[String], excluded: &[PathBuf]) -> Result<()> {
    let excluded: HashSet<&PathBuf> = excluded.iter().collect();

    for entry in WalkDir::new(src)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || e.file_name()
                    .to_str()
                    .is_none_or(|name| !ignore.iter().any(|i| i == name))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.into_path();
        if excluded.contains(&path) {
            continue;
        }
        let relative = fs::relative_path(src, &path);
        fs::copy_file_preserving_mtime(&path, &dst.join(relative))?;
    }
    Ok(())
}

/// Copy selected files, preserving their path relative to `base`.
fn copy_selected(base: &Path, dst: &Path, files: &[PathBuf]) -> Result<()> {
    for file in files {
        let relative = fs::relative_path(base, file);
        fs::copy_file_preserving_mtime(file, &dst.join(relative))?;
    }
    Ok(())
}
