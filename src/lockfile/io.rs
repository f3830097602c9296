//! Lockfile I/O.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::lockfile::types::Lockfile;
use crate::util::fs;

/// Load the lockfile at the given path.
///
/// Returns `None` when no file exists. A file that parses but lacks the
/// `importers` or `packages` map has an unusable shape and is an error.
pub fn load_lockfile(path: &Path) -> Result<Option<Lockfile>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let lockfile: Lockfile = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse lockfile: {}", path.display()))?;

    if lockfile.importers.is_none() {
        bail!("malformed lockfile (no importers map): {}", path.display());
    }
    if lockfile.packages.is_none() {
        bail!("malformed lockfile (no packages map): {}", path.display());
    }

    Ok(Some(lockfile))
}

/// Write a lockfile to the given path.
pub fn save_lockfile(path: &Path, lockfile: &Lockfile) -> Result<()> {
    let yaml = serde_yaml::to_string(lockfile).context("failed to serialize lockfile")?;
    fs::write_string(path, &yaml)
}
