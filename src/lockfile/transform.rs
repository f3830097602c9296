//! Lockfile pruning and link rewriting.
//!
//! Rewrites a full monorepo lockfile into one that is valid for the isolated
//! output tree: importers are pruned to the target and its related
//! workspaces, the target becomes the new root importer, workspace edges
//! become directory links against the relocated layout, and the package map
//! is reduced to the identifiers still reachable from a surviving importer.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexSet;

use crate::lockfile::types::{
    is_link, link_value, package_id, Lockfile, LINK_PREFIX, ROOT_IMPORTER,
};
use crate::util::fs;

/// A related workspace's old and new place in the layout.
#[derive(Debug, Clone)]
pub struct RelocatedWorkspace {
    /// Workspace name (the dependency key it appears under)
    pub name: String,

    /// Original path relative to the repository root (the importer key)
    pub old_path: String,

    /// Planned path relative to the output root
    pub new_path: String,
}

/// Policy knobs for the rewrite.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteOptions {
    /// Merge the original root importer's entries under the target's
    pub include_root_deps: bool,

    /// Keep (and link-rewrite) sibling devDependencies instead of clearing
    pub keep_sub_dev_deps: bool,
}

/// Rewrite `doc` in place for the relocated layout.
///
/// `target_path` is the target workspace's original root-relative path;
/// `related` lists every workspace in the closure, production members first.
pub fn rewrite_lockfile(
    doc: &mut Lockfile,
    target_path: &str,
    related: &[RelocatedWorkspace],
    opts: &RewriteOptions,
) -> Result<()> {
    let importers = doc
        .importers
        .as_mut()
        .context("lockfile has no importers map")?;

    // Step 1: drop importers outside the closure.
    importers.retain(|key, _| {
        key == ROOT_IMPORTER
            || key == target_path
            || related.iter().any(|ws| ws.old_path == *key)
    });

    // Step 2: the target importer becomes the new root, optionally merged
    // over the original root importer's entries.
    let mut new_root = importers.shift_remove(target_path).with_context(|| {
        format!("lockfile has no importer entry for {}", target_path)
    })?;
    if opts.include_root_deps {
        if let Some(original_root) = importers.get(ROOT_IMPORTER) {
            let defaults = original_root.clone();
            new_root.merge_defaults(&defaults);
        }
    }

    // Step 3: workspace edges in the new root point at planned paths.
    for map in [&mut new_root.dependencies, &mut new_root.dev_dependencies] {
        for (name, value) in map.iter_mut() {
            if let Some(ws) = by_name(related, name) {
                *value = link_value(&ws.new_path);
            }
        }
    }
    importers.insert(ROOT_IMPORTER.to_string(), new_root);

    // Steps 4 and 5: re-key sibling importers to their new paths, rewrite
    // workspace edges against the relocated layout, and apply the sibling
    // dev-dependency policy.
    let old_importers = std::mem::take(importers);
    for (key, mut snapshot) in old_importers {
        if key == ROOT_IMPORTER {
            importers.insert(key, snapshot);
            continue;
        }
        let importer_ws = related
            .iter()
            .find(|ws| ws.old_path == key)
            .with_context(|| format!("importer {} survived pruning but is not related", key))?;

        for (name, value) in snapshot.dependencies.iter_mut() {
            if let Some(dep_ws) = by_name(related, name) {
                *value = link_value(&sibling_link(importer_ws, dep_ws));
            }
        }

        if opts.keep_sub_dev_deps {
            for (name, value) in snapshot.dev_dependencies.iter_mut() {
                if let Some(dep_ws) = by_name(related, name) {
                    *value = link_value(&sibling_link(importer_ws, dep_ws));
                }
            }
        } else {
            let cleared: Vec<String> = snapshot.dev_dependencies.keys().cloned().collect();
            for name in cleared {
                if !snapshot.dependencies.contains_key(&name) {
                    snapshot.specifiers.shift_remove(&name);
                }
            }
            snapshot.dev_dependencies.clear();
        }

        importers.insert(importer_ws.new_path.clone(), snapshot);
    }

    // Step 6: fixed-point closure over the package map. Seeds are every
    // surviving importer's registry-resolved values; workspace edges inside
    // package records become empty link markers.
    let importers = doc
        .importers
        .as_ref()
        .context("lockfile has no importers map")?;
    let packages = doc
        .packages
        .as_mut()
        .context("lockfile has no packages map")?;

    let mut retained: IndexSet<String> = IndexSet::new();
    let mut worklist: Vec<String> = Vec::new();
    for snapshot in importers.values() {
        let entries = snapshot
            .dependencies
            .iter()
            .chain(snapshot.dev_dependencies.iter());
        for (name, value) in entries {
            if by_name(related, name).is_none() && !is_link(value) {
                let id = package_id(name, value);
                if retained.insert(id.clone()) {
                    worklist.push(id);
                }
            }
        }
    }

    while let Some(id) = worklist.pop() {
        let Some(snapshot) = packages.get_mut(&id) else {
            continue;
        };
        for (name, value) in snapshot.dependencies.iter_mut() {
            if by_name(related, name).is_some() {
                *value = LINK_PREFIX.to_string();
            }
        }
        for (name, value) in &snapshot.dependencies {
            if by_name(related, name).is_none() && !is_link(value) {
                let child = package_id(name, value);
                if retained.insert(child.clone()) {
                    worklist.push(child);
                }
            }
        }
    }

    // Step 7: everything not retained goes.
    packages.retain(|key, _| retained.contains(key));

    Ok(())
}

fn by_name<'a>(related: &'a [RelocatedWorkspace], name: &str) -> Option<&'a RelocatedWorkspace> {
    related.iter().find(|ws| ws.name == name)
}

/// Relative link from one relocated workspace to another, against the new
/// layout.
fn sibling_link(from: &RelocatedWorkspace, to: &RelocatedWorkspace) -> String {
    fs::to_slash(&fs::relative_path(
        Path::new(&from.new_path),
        Path::new(&to.new_path),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relocated(name: &str, old_path: &str) -> RelocatedWorkspace {
        RelocatedWorkspace {
            name: name.to_string(),
            old_path: old_path.to_string(),
            new_path: format!("workspaces/{}", old_path),
        }
    }

    /// Lockfile mirroring the spec scenario: target depends on `a` (prod)
    /// and `b` (dev); `a` depends on `c`; `other` is outside the closure.
    fn scenario_lockfile() -> Lockfile {
        serde_yaml::from_str(
            r#"
lockfileVersion: 5.4
importers:
  .:
    specifiers:
      root-tool: ^1.0.0
    dependencies:
      root-tool: 1.0.0
  packages/target:
    specifiers:
      a: workspace:*
      b: workspace:*
      ext: ^2.0.0
    dependencies:
      a: link:../a
      ext: 2.0.0
    devDependencies:
      b: link:../b
  packages/a:
    specifiers:
      c: workspace:*
      shared: ^1.0.0
    dependencies:
      c: link:../c
      shared: 1.0.0
  packages/b:
    specifiers:
      b-dev: ^4.0.0
    devDependencies:
      b-dev: 4.0.0
  packages/c:
    specifiers: {}
  packages/other:
    specifiers:
      unused: ^9.0.0
    dependencies:
      unused: 9.0.0
packages:
  /ext/2.0.0:
    resolution:
      integrity: sha512-ext
    dependencies:
      transitive: 5.0.0
  /transitive/5.0.0:
    resolution:
      integrity: sha512-transitive
  /shared/1.0.0:
    resolution:
      integrity: sha512-shared
  /b-dev/4.0.0:
    resolution:
      integrity: sha512-bdev
  /unused/9.0.0:
    resolution:
      integrity: sha512-unused
  /root-tool/1.0.0:
    resolution:
      integrity: sha512-root
"#,
        )
        .unwrap()
    }

    fn scenario_related() -> Vec<RelocatedWorkspace> {
        vec![
            relocated("a", "packages/a"),
            relocated("c", "packages/c"),
            relocated("b", "packages/b"),
        ]
    }

    #[test]
    fn test_importer_pruning_and_rekeying() {
        let mut doc = scenario_lockfile();
        rewrite_lockfile(
            &mut doc,
            "packages/target",
            &scenario_related(),
            &RewriteOptions::default(),
        )
        .unwrap();

        let importers = doc.importers.as_ref().unwrap();
        let keys: Vec<_> = importers.keys().cloned().collect();
        assert_eq!(
            keys,
            [
                ".",
                "workspaces/packages/a",
                "workspaces/packages/b",
                "workspaces/packages/c",
            ]
        );
    }

    #[test]
    fn test_root_importer_links() {
        let mut doc = scenario_lockfile();
        rewrite_lockfile(
            &mut doc,
            "packages/target",
            &scenario_related(),
            &RewriteOptions::default(),
        )
        .unwrap();

        let root = &doc.importers.as_ref().unwrap()[ROOT_IMPORTER];
        assert_eq!(root.dependencies["a"], "link:workspaces/packages/a");
        assert_eq!(root.dependencies["ext"], "2.0.0");
        assert_eq!(root.dev_dependencies["b"], "link:workspaces/packages/b");
        // without include_root_deps the original root entries are gone
        assert!(!root.dependencies.contains_key("root-tool"));
        assert_eq!(root.specifiers["a"], "workspace:*");
    }

    #[test]
    fn test_include_root_deps_merges_defaults() {
        let mut doc = scenario_lockfile();
        rewrite_lockfile(
            &mut doc,
            "packages/target",
            &scenario_related(),
            &RewriteOptions {
                include_root_deps: true,
                ..Default::default()
            },
        )
        .unwrap();

        let root = &doc.importers.as_ref().unwrap()[ROOT_IMPORTER];
        assert_eq!(root.dependencies["root-tool"], "1.0.0");
        assert_eq!(root.specifiers["root-tool"], "^1.0.0");
        // the target's own entries still win and are link-rewritten
        assert_eq!(root.dependencies["a"], "link:workspaces/packages/a");

        // the merged root entry's package survives the prune
        assert!(doc
            .packages
            .as_ref()
            .unwrap()
            .contains_key("/root-tool/1.0.0"));
    }

    #[test]
    fn test_sibling_links_use_new_layout() {
        let mut doc = scenario_lockfile();
        rewrite_lockfile(
            &mut doc,
            "packages/target",
            &scenario_related(),
            &RewriteOptions::default(),
        )
        .unwrap();

        let importers = doc.importers.as_ref().unwrap();
        let a = &importers["workspaces/packages/a"];
        assert_eq!(a.dependencies["c"], "link:../c");
        assert_eq!(a.dependencies["shared"], "1.0.0");
    }

    #[test]
    fn test_sibling_dev_dependencies_cleared_by_default() {
        let mut doc = scenario_lockfile();
        rewrite_lockfile(
            &mut doc,
            "packages/target",
            &scenario_related(),
            &RewriteOptions::default(),
        )
        .unwrap();

        let importers = doc.importers.as_ref().unwrap();
        let b = &importers["workspaces/packages/b"];
        assert!(b.dev_dependencies.is_empty());
        assert!(!b.specifiers.contains_key("b-dev"));

        // and the package only they referenced is pruned
        assert!(!doc.packages.as_ref().unwrap().contains_key("/b-dev/4.0.0"));
    }

    #[test]
    fn test_sibling_dev_dependencies_kept_on_request() {
        let mut doc = scenario_lockfile();
        rewrite_lockfile(
            &mut doc,
            "packages/target",
            &scenario_related(),
            &RewriteOptions {
                keep_sub_dev_deps: true,
                ..Default::default()
            },
        )
        .unwrap();

        let importers = doc.importers.as_ref().unwrap();
        let b = &importers["workspaces/packages/b"];
        assert_eq!(b.dev_dependencies["b-dev"], "4.0.0");
        assert_eq!(b.specifiers["b-dev"], "^4.0.0");
        assert!(doc.packages.as_ref().unwrap().contains_key("/b-dev/4.0.0"));
    }

    #[test]
    fn test_package_closure_retains_reachable_only() {
        let mut doc = scenario_lockfile();
        rewrite_lockfile(
            &mut doc,
            "packages/target",
            &scenario_related(),
            &RewriteOptions::default(),
        )
        .unwrap();

        let packages = doc.packages.as_ref().unwrap();
        // direct importer dependency
        assert!(packages.contains_key("/ext/2.0.0"));
        // reached through /ext/2.0.0's own dependencies
        assert!(packages.contains_key("/transitive/5.0.0"));
        // sibling a's production dependency
        assert!(packages.contains_key("/shared/1.0.0"));
        // referenced only by the pruned importer / the old root
        assert!(!packages.contains_key("/unused/9.0.0"));
        assert!(!packages.contains_key("/root-tool/1.0.0"));
    }

    #[test]
    fn test_workspace_edges_inside_packages_become_links() {
        let mut doc: Lockfile = serde_yaml::from_str(
            r#"
lockfileVersion: 5.4
importers:
  .: {}
  packages/target:
    specifiers:
      wrapper: ^1.0.0
    dependencies:
      wrapper: 1.0.0
  packages/a:
    specifiers: {}
packages:
  /wrapper/1.0.0:
    resolution:
      integrity: sha512-wrapper
    dependencies:
      a: 1.0.0
      inner: 3.0.0
  /inner/3.0.0:
    resolution:
      integrity: sha512-inner
"#,
        )
        .unwrap();

        rewrite_lockfile(
            &mut doc,
            "packages/target",
            &[relocated("a", "packages/a")],
            &RewriteOptions::default(),
        )
        .unwrap();

        let packages = doc.packages.as_ref().unwrap();
        let wrapper = &packages["/wrapper/1.0.0"];
        assert_eq!(wrapper.dependencies["a"], "link:");
        assert_eq!(wrapper.dependencies["inner"], "3.0.0");
        // the workspace edge contributed no /a/1.0.0 identifier
        assert_eq!(packages.len(), 2);
        assert!(packages.contains_key("/inner/3.0.0"));
    }

    #[test]
    fn test_missing_target_importer_is_fatal() {
        let mut doc: Lockfile =
            serde_yaml::from_str("importers:\n  .: {}\npackages: {}\n").unwrap();

        let err = rewrite_lockfile(
            &mut doc,
            "packages/target",
            &[],
            &RewriteOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("packages/target"));
    }
}
