//! Default values for pkgsmith configuration.
//!
//! This module provides centralized default values used across the crate,
//! ensuring consistency and avoiding duplication. All of them can be
//! overridden by constructing a [`crate::config::Layout`] explicitly.

use std::path::PathBuf;

/// Name of the metadata subfolder created inside managed target
/// directories.
pub const METADATA_DIR: &str = ".pkgsmith";

/// Name of the sentinel marker file that blesses a directory as
/// tool-owned.
pub const MARKER_FILE: &str = "managed-by-pkgsmith";

/// Returns the default cache root directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/pkgsmith` (XDG Base Directory)
/// - macOS: `~/Library/Caches/pkgsmith`
/// - Windows: `{FOLDERID_LocalAppData}\pkgsmith`
///
/// Falls back to `.pkgsmith-cache` in the current directory if the
/// platform cache directory cannot be determined.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".pkgsmith-cache"))
        .join("pkgsmith")
}

/// Returns the default workspace root directory.
///
/// Workspaces are ephemeral and per-run, so they live under the system
/// temporary directory.
pub fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("pkgsmith")
}
