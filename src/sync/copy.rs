//! Filtered tree copy and atomic subtree replacement.

use crate::errors::VendoError;
use anyhow::Result;
use std::fs;
use std::path::{Component, Path};
use walkdir::WalkDir;

const VCS_DIRS: &[&str] = &[".git", ".hg", ".bzr", ".svn"];

/// Decide whether a path relative to a fetched package tree is copied into
/// the vendor directory. Pure over the relative path so the exclusion rules
/// are testable without touching a filesystem.
pub fn keep_path(rel: &Path, vendor_dir_name: &str, flatten: bool) -> bool {
    for component in rel.components() {
        let Component::Normal(name) = component else {
            continue;
        };
        let name = name.to_string_lossy();
        if VCS_DIRS.contains(&name.as_ref()) || name == "testdata" {
            return false;
        }
        if flatten && name == vendor_dir_name {
            return false;
        }
    }
    true
}

/// Copy `src` into `dst`, dropping excluded paths. Symlinks are not
/// vendored; a pinned tree must stand on its own.
pub fn copy_tree_filtered(
    src: &Path,
    dst: &Path,
    vendor_dir_name: &str,
    flatten: bool,
) -> Result<()> {
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        if !keep_path(rel, vendor_dir_name, flatten) {
            continue;
        }
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| write_failed(&target, e))?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| write_failed(parent, e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| write_failed(&target, e))?;
        }
    }
    Ok(())
}

/// Replace `dst` with `staged` through renames. Any previous tree is moved
/// aside first and only deleted after the staged tree is in place, so the
/// vendor directory never holds a half-written package.
pub fn swap_subtree(staged: &Path, dst: &Path) -> Result<()> {
    let Some(name) = dst.file_name() else {
        return Err(write_failed(
            dst,
            std::io::Error::other("destination has no file name"),
        ));
    };
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| write_failed(parent, e))?;
    }

    let displaced = dst.with_file_name(format!(".{}.vendo-old", name.to_string_lossy()));
    if displaced.exists() {
        fs::remove_dir_all(&displaced).map_err(|e| write_failed(&displaced, e))?;
    }

    let had_previous = dst.exists();
    if had_previous {
        fs::rename(dst, &displaced).map_err(|e| write_failed(dst, e))?;
    }
    if let Err(e) = fs::rename(staged, dst) {
        if had_previous {
            let _ = fs::rename(&displaced, dst);
        }
        return Err(write_failed(dst, e));
    }
    if had_previous {
        fs::remove_dir_all(&displaced).map_err(|e| write_failed(&displaced, e))?;
    }
    Ok(())
}

fn write_failed(path: &Path, source: std::io::Error) -> anyhow::Error {
    VendoError::WriteFailed {
        path: path.to_path_buf(),
        source,
    }
    .into()
}
