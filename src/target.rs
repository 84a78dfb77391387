//! # Target Safety Guard
//!
//! Determines whether a candidate target directory may be written to, and
//! marks a directory as tool-owned once approved. A directory is writable
//! when it does not exist yet, is empty, or carries the sentinel marker
//! file (directly inside it or inside the metadata subfolder).
//!
//! The guard is the documented boundary the external installer must
//! consult before permitting a merge into a persistent, non-ephemeral
//! location; the pipeline executor never invokes it on its own.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::Layout;
use crate::error::{Error, Result};
use crate::fsutil;

/// The persistent destination directory an assembled artifact is merged
/// into.
#[derive(Debug, Clone)]
pub struct TargetFolder {
    root: PathBuf,
}

impl TargetFolder {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    /// Whether the directory exists and contains no entries.
    pub fn is_empty(&self) -> Result<bool> {
        if !self.root.is_dir() {
            return Ok(false);
        }
        fsutil::dir_is_empty(&self.root)
    }

    /// Resolve a path relative to this target.
    pub fn full_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }
}

/// Whether `path` may be written to by the merge engine.
///
/// True when the path does not exist, is an empty directory, or is a
/// directory carrying the safety marker. False when the path exists but is
/// not a directory, or is a non-empty directory with no marker anywhere.
pub fn is_valid_target(path: &Path, layout: &Layout) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    if !path.is_dir() {
        debug!("{} exists and is not a directory", path.display());
        return Ok(false);
    }
    if fsutil::dir_is_empty(path)? {
        return Ok(true);
    }
    Ok(has_marker(path, layout))
}

/// Whether the directory carries the marker, directly or inside the
/// metadata subfolder.
fn has_marker(path: &Path, layout: &Layout) -> bool {
    path.join(&layout.marker_file).is_file()
        || path
            .join(&layout.metadata_dir)
            .join(&layout.marker_file)
            .is_file()
}

/// Idempotently bless `path` as tool-owned: create the metadata subfolder
/// and touch the marker file inside it.
pub fn mark_allowed(path: &Path, layout: &Layout) -> Result<()> {
    let meta = path.join(&layout.metadata_dir);
    fs::create_dir_all(&meta)?;
    let marker = meta.join(&layout.marker_file);
    if !marker.exists() {
        fs::write(&marker, "")?;
        debug!("marked {} as tool-owned", path.display());
    }
    Ok(())
}

/// Guard entry point for the external installer: error (rather than a
/// boolean) when the target is not safe to merge into.
pub fn ensure_valid_target(path: &Path, layout: &Layout) -> Result<()> {
    if is_valid_target(path, layout)? {
        return Ok(());
    }
    Err(Error::TargetSafety {
        path: path.display().to_string(),
        message: if path.is_dir() {
            "directory is not empty and carries no ownership marker".to_string()
        } else {
            "path exists and is not a directory".to_string()
        },
    })
}
