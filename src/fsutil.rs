//! Small on-disk filesystem helpers shared by steps and the merge engine.
//!
//! Everything here operates on real directories. Moves prefer `rename` and
//! fall back to copy-then-remove when the source and destination live on
//! different filesystems (workspaces under `/tmp` merging into a target on
//! another mount).

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Move a single file, creating destination parents as needed.
///
/// Falls back to copy-and-remove when `rename` fails with a cross-device
/// error, so move semantics hold across mount boundaries.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => copy_then_remove(src, dst),
        Err(e) => Err(Error::Io(e)),
    }
}

/// The cross-device half of [`move_file`]: copy the file, then remove the
/// source.
fn copy_then_remove(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)?;
    fs::remove_file(src)?;
    Ok(())
}

/// Copy one file into a directory, keeping its file name.
pub fn copy_file_into(src: &Path, dst_dir: &Path) -> Result<PathBuf> {
    let name = src.file_name().ok_or_else(|| Error::ContextValue {
        message: format!("'{}' has no file name component", src.display()),
    })?;
    fs::create_dir_all(dst_dir)?;
    let dst = dst_dir.join(name);
    fs::copy(src, &dst)?;
    Ok(dst)
}

/// Recursively copy a directory tree, preserving relative structure.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io_from_walkdir)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir yields paths under its root");
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
        // Symlinks and special files are not part of assembled artifacts.
    }
    Ok(())
}

/// List every regular file under `root` as a path relative to `root`,
/// in sorted order for deterministic processing.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io_from_walkdir)?;
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(root)
                .expect("walkdir yields paths under its root")
                .to_path_buf();
            files.push(rel);
        }
    }
    Ok(files)
}

/// Whether a directory exists and contains no entries.
pub fn dir_is_empty(path: &Path) -> Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

fn io_from_walkdir(e: walkdir::Error) -> Error {
    match e.into_io_error() {
        Some(io) => Error::Io(io),
        None => Error::ContextValue {
            message: "filesystem walk hit a cycle".to_string(),
        },
    }
}
