//! # Persistent Repository Cache
//!
//! A process-wide, on-disk cache of git clones keyed by source URL and
//! shared across pipeline runs. Entries persist indefinitely until
//! externally purged.
//!
//! ## Population protocol
//!
//! Population is optimistic and lock-free: clone into a uniquely named
//! scratch directory under the cache root, then rename it into the
//! canonical entry path. If the entry already exists by the time the
//! rename is attempted, a concurrent writer won and the redundant scratch
//! clone is discarded. The canonical path is therefore never partially
//! visible; the losing cloner's work is wasted but the final cache content
//! is always a complete clone.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::git::GitRunner;

/// On-disk cache of persistent git clones, keyed by source URL.
#[derive(Debug, Clone)]
pub struct RepoCache {
    root: PathBuf,
}

impl RepoCache {
    /// Create a cache rooted at `root`. The directory is created lazily on
    /// first population.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The canonical entry path for a source URL.
    pub fn entry_path(&self, url: &str) -> PathBuf {
        self.root.join(url_to_entry_name(url))
    }

    /// Whether a populated entry exists for this URL.
    pub fn contains(&self, url: &str) -> bool {
        self.entry_path(url).is_dir()
    }

    /// Ensure a persistent clone of `url` exists, returning its entry path.
    ///
    /// Concurrent callers for the same URL race benignly: each clones into
    /// its own scratch directory, exactly one rename lands, and losers
    /// discard their clone.
    pub async fn ensure(&self, url: &str, git: &dyn GitRunner) -> Result<PathBuf> {
        let entry = self.entry_path(url);
        if entry.is_dir() {
            debug!("cache hit for {}", url);
            return Ok(entry);
        }

        fs::create_dir_all(&self.root)?;
        let scratch = tempfile::Builder::new()
            .prefix(".populate-")
            .tempdir_in(&self.root)
            .map_err(|e| Error::Cache {
                message: format!("failed to create scratch clone directory: {}", e),
            })?;
        let scratch_clone = scratch.path().join("clone");

        info!("populating cache entry for {}", url);
        git.clone_repo(url, &scratch_clone).await?;

        if entry.exists() {
            // A concurrent writer populated the entry first; the scratch
            // TempDir cleans up the redundant clone on drop.
            debug!("lost cache population race for {}, discarding clone", url);
            return Ok(entry);
        }

        match fs::rename(&scratch_clone, &entry) {
            Ok(()) => Ok(entry),
            // Rename refused because the destination appeared between the
            // existence check and the rename: same lost race, same outcome.
            Err(_) if entry.exists() => {
                debug!("lost cache population race for {}, discarding clone", url);
                Ok(entry)
            }
            Err(e) => Err(Error::Cache {
                message: format!("failed to move clone of {} into cache: {}", url, e),
            }),
        }
    }

    /// Update an existing cache entry from its origin.
    pub async fn refresh(&self, url: &str, git: &dyn GitRunner) -> Result<()> {
        let entry = self.entry_path(url);
        if !entry.is_dir() {
            return Err(Error::Cache {
                message: format!("no cache entry to refresh for {}", url),
            });
        }
        git.fetch(&entry).await
    }

    /// List every populated entry path, skipping in-flight scratch
    /// directories.
    pub fn entries(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.file_type()?.is_dir() {
                out.push(entry.path());
            }
        }
        out.sort();
        Ok(out)
    }

    /// Remove the entry for one URL, if present.
    pub fn remove(&self, url: &str) -> Result<()> {
        let entry = self.entry_path(url);
        if entry.is_dir() {
            fs::remove_dir_all(&entry)?;
        }
        Ok(())
    }

    /// Remove every cache entry.
    pub fn purge(&self) -> Result<()> {
        for entry in self.entries()? {
            fs::remove_dir_all(&entry)?;
        }
        Ok(())
    }
}

/// Derive a filesystem-safe, deterministic entry name from a source URL:
/// the sanitized repository stem plus a hash of the full URL for
/// uniqueness.
fn url_to_entry_name(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    let digest = format!("{:x}", hasher.finish());

    // Prefer the parsed URL's last path segment; scp-style git addresses
    // and local paths fall back to plain string splitting.
    let stem_owned = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| {
            url.trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or("repo")
                .to_string()
        });
    let stem = stem_owned.trim_end_matches(".git");
    let safe: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if safe.is_empty() {
        format!("repo-{}", digest)
    } else {
        format!("{}-{}", safe, digest)
    }
}
