//! # Ephemeral Workspaces
//!
//! Steps stage intermediate artifact state in ephemeral directories called
//! workspaces. The executor owns every workspace created during a run,
//! tracked in an arena, and releases them on both the success and failure
//! paths. The one exception is the workspace the final context's
//! `folder_path` points into, whose ownership transfers out to the caller
//! as the assembled artifact.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};

use crate::error::{Error, Result};

/// Per-run arena of ephemeral workspace directories.
///
/// Each run gets a uniquely named directory under the workspace root;
/// individual workspaces are numbered subdirectories created on demand.
#[derive(Debug)]
pub struct WorkspaceArena {
    run_dir: PathBuf,
    counter: AtomicUsize,
    created: Mutex<Vec<PathBuf>>,
}

impl WorkspaceArena {
    /// Create the arena's run directory under `workspace_root`.
    pub fn new(workspace_root: &Path) -> Result<Self> {
        fs::create_dir_all(workspace_root)?;

        // Unique per-run directory name: pid plus a nanosecond timestamp,
        // retried on the (unlikely) collision.
        let mut attempt = 0u32;
        let run_dir = loop {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.subsec_nanos())
                .unwrap_or(0);
            let candidate =
                workspace_root.join(format!("run-{}-{:x}", std::process::id(), nanos));
            match fs::create_dir(&candidate) {
                Ok(()) => break candidate,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 16 => {
                    attempt += 1;
                }
                Err(e) => return Err(Error::Io(e)),
            }
        };

        debug!("workspace arena at {}", run_dir.display());
        Ok(Self {
            run_dir,
            counter: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
        })
    }

    /// The run directory all workspaces live under.
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Create a fresh, empty workspace directory owned by this arena.
    pub fn create(&self) -> Result<PathBuf> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self.run_dir.join(format!("ws-{}", n));
        fs::create_dir(&path)?;
        self.created
            .lock()
            .map_err(|_| Error::Workspace {
                message: "workspace arena lock poisoned".to_string(),
            })?
            .push(path.clone());
        debug!("created workspace {}", path.display());
        Ok(path)
    }

    /// Number of workspaces created so far.
    pub fn len(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every workspace, then the run directory itself.
    pub fn release_all(&self) -> Result<()> {
        self.release_except(None)
    }

    /// Release every workspace except the one containing `keep` (if any),
    /// removing the run directory when nothing is kept.
    ///
    /// `keep` is typically the final context's `folder_path`; when it
    /// points outside the arena (a merged target), everything is released.
    pub fn release_except(&self, keep: Option<&Path>) -> Result<()> {
        let created = self
            .created
            .lock()
            .map_err(|_| Error::Workspace {
                message: "workspace arena lock poisoned".to_string(),
            })?
            .clone();

        let mut kept_any = false;
        for ws in &created {
            if keep.map(|k| k.starts_with(ws)).unwrap_or(false) {
                debug!("keeping workspace {} (ownership transferred)", ws.display());
                kept_any = true;
                continue;
            }
            if ws.exists() {
                if let Err(e) = fs::remove_dir_all(ws) {
                    warn!("failed to release workspace {}: {}", ws.display(), e);
                }
            }
        }

        if !kept_any && self.run_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&self.run_dir) {
                warn!("failed to remove run directory {}: {}", self.run_dir.display(), e);
            }
        }
        Ok(())
    }
}
