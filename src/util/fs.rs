//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use filetime::FileTime;
use glob::glob;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Write a string to a file only if the file does not exist yet.
///
/// Returns `true` when the file was written, `false` when a file was already
/// present at the path. Already-exists is success, not an error: the same
/// content may be planned for the same path more than once, and the first
/// write is authoritative.
pub fn write_if_absent(path: &Path, contents: &str) -> Result<bool> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            use std::io::Write;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("failed to write file: {}", path.display()))?;
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => {
            Err(e).with_context(|| format!("failed to create file: {}", path.display()))
        }
    }
}

/// Copy a single file, preserving its modification timestamp.
pub fn copy_file_preserving_mtime(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dst).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dst.display())
    })?;

    let metadata = fs::metadata(src)
        .with_context(|| format!("failed to stat file: {}", src.display()))?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(dst, mtime)
        .with_context(|| format!("failed to set mtime on {}", dst.display()))?;
    Ok(())
}

/// Find files matching a glob pattern relative to a base directory.
///
/// Matched directories are expanded to the files they contain. Any path with
/// a component named in `ignore` is skipped.
pub fn glob_files(base: &Path, pattern: &str, ignore: &[String]) -> Result<Vec<PathBuf>> {
    let full_pattern = base.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let mut results = Vec::new();
    for entry in
        glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))?
    {
        match entry {
            Ok(path) => {
                if has_ignored_component(&path, base, ignore) {
                    continue;
                }
                if path.is_dir() {
                    for file in walkdir::WalkDir::new(&path)
                        .into_iter()
                        .filter_entry(|e| !is_ignored_name(e.file_name(), ignore))
                        .filter_map(|e| e.ok())
                        .filter(|e| e.file_type().is_file())
                    {
                        results.push(file.into_path());
                    }
                } else if path.is_file() {
                    results.push(path);
                }
            }
            Err(e) => {
                tracing::warn!("glob error: {}", e);
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

fn is_ignored_name(name: &std::ffi::OsStr, ignore: &[String]) -> bool {
    name.to_str().is_some_and(|n| ignore.iter().any(|i| i == n))
}

fn has_ignored_component(path: &Path, base: &Path, ignore: &[String]) -> bool {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .any(|c| is_ignored_name(c.as_os_str(), ignore))
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a relative path with forward-slash separators.
///
/// Lockfile importer keys and link values always use `/`, regardless of the
/// host platform.
pub fn to_slash(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}
