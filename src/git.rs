//! # Git Collaborator
//!
//! The pipeline treats version control as an opaque asynchronous command
//! runner supporting `clone`, `fetch`, and `checkout` verbs against a
//! working directory, reporting success or failure via exit status.
//!
//! The trait-based design separates the pipeline from the concrete `git`
//! binary: `SystemGit` shells out to the system git command (which
//! automatically handles SSH keys, credential helpers, and personal access
//! tokens from the user's configuration), while tests substitute a mock
//! implementation that fabricates repository content without touching the
//! network.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Asynchronous version-control verbs the pipeline relies on.
///
/// All operations must be cancellable and timeout-bound; a hung remote
/// must not wedge unrelated concurrent pipeline runs.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Clone `url` (a remote URL or a local path) into `target_dir`.
    async fn clone_repo(&self, url: &str, target_dir: &Path) -> Result<()>;

    /// Update an existing clone in `workdir` from its origin.
    async fn fetch(&self, workdir: &Path) -> Result<()>;

    /// Check out `version` (branch, tag, or commit) in `workdir`.
    async fn checkout(&self, workdir: &Path, version: &str) -> Result<()>;
}

/// `GitRunner` implementation backed by the system `git` command.
pub struct SystemGit {
    timeout: Duration,
}

impl SystemGit {
    /// Create a runner with the default ten-minute per-command timeout.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(600),
        }
    }

    /// Override the per-command timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run_git(&self, args: &[&str], workdir: Option<&Path>) -> Result<()> {
        let pretty = format!("git {}", args.join(" "));
        debug!("running: {} (in {:?})", pretty, workdir);

        let mut cmd = Command::new("git");
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| Error::GitTimeout {
                command: pretty.clone(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| Error::GitCommand {
                command: pretty.clone(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::GitCommand {
                command: pretty,
                stderr: explain_stderr(&stderr),
            });
        }

        Ok(())
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand well-known authentication failures into an actionable message.
fn explain_stderr(stderr: &str) -> String {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        format!(
            "Authentication failed. Make sure you have access to the repository.\n\
            For private repos, ensure you have:\n\
            - SSH key added to ssh-agent\n\
            - Git credentials configured\n\
            - Personal access token set up\n\
            Error: {}",
            stderr
        )
    } else {
        stderr.to_string()
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn clone_repo(&self, url: &str, target_dir: &Path) -> Result<()> {
        if let Some(parent) = target_dir.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let target = target_dir.to_string_lossy();
        self.run_git(&["clone", url, target.as_ref()], None).await
    }

    async fn fetch(&self, workdir: &Path) -> Result<()> {
        self.run_git(&["fetch", "--all", "--tags", "--prune"], Some(workdir))
            .await
    }

    async fn checkout(&self, workdir: &Path, version: &str) -> Result<()> {
        self.run_git(&["checkout", version], Some(workdir)).await
    }
}
