//! The `git-clone` step: turn a repository URL and version into a
//! workspace folder holding a checkout.
//!
//! The step keeps a persistent clone per URL in the shared cache (see
//! [`crate::cache`] for the race-safe population protocol), refreshes it,
//! then clones from the cache into a fresh ephemeral workspace and checks
//! out the requested version there. The cache clone is never checked out
//! directly; every run gets its own disposable working copy.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::cache::RepoCache;
use crate::config::StepConfig;
use crate::context::{PipelineContext, ValueKind};
use crate::error::Result;
use crate::git::GitRunner;
use crate::steps::{resolve_text, Step, StepDeps, StepInput};

pub struct GitClone {
    url: Option<String>,
    version: Option<String>,
    git: Arc<dyn GitRunner>,
    cache: RepoCache,
}

impl GitClone {
    pub fn build(config: &StepConfig, deps: &StepDeps) -> Result<Box<dyn Step>> {
        Ok(Box::new(Self {
            url: config.get_str("url")?,
            version: config.get_str("version")?,
            git: Arc::clone(&deps.git),
            cache: deps.cache.clone(),
        }))
    }
}

#[async_trait]
impl Step for GitClone {
    fn requires(&self) -> &'static [(&'static str, ValueKind)] {
        &[("url", ValueKind::Text), ("version", ValueKind::Text)]
    }

    fn provides(&self) -> &'static [(&'static str, ValueKind)] {
        &[("folder_path", ValueKind::Path)]
    }

    fn config_satisfied(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.url.is_some() {
            keys.push("url");
        }
        if self.version.is_some() {
            keys.push("version");
        }
        keys
    }

    fn describe(&self) -> String {
        format!(
            "clone {} at {}",
            self.url.as_deref().unwrap_or("<url>"),
            self.version.as_deref().unwrap_or("<version>")
        )
    }

    async fn run(&self, input: StepInput<'_>) -> Result<PipelineContext> {
        let url = resolve_text(&self.url, &input, "url")?;
        let version = resolve_text(&self.version, &input, "version")?;

        let entry = self.cache.ensure(&url, &*self.git).await?;
        self.cache.refresh(&url, &*self.git).await?;

        // Fresh working copy per run; the cache clone stays pristine.
        let workspace = input.workspaces.create()?;
        let entry_str = entry.to_string_lossy();
        self.git.clone_repo(entry_str.as_ref(), &workspace).await?;
        self.git.checkout(&workspace, &version).await?;
        debug!("checked out {} at {} into {}", url, version, workspace.display());

        let mut out = PipelineContext::new();
        out.insert("folder_path", workspace);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Layout, StepDescriptor};
    use crate::git::SystemGit;
    use crate::workspace::WorkspaceArena;
    use async_trait::async_trait;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Fabricates repository content instead of shelling out to git.
    struct FakeGit;

    #[async_trait]
    impl GitRunner for FakeGit {
        async fn clone_repo(&self, url: &str, target_dir: &Path) -> Result<()> {
            fs::create_dir_all(target_dir)?;
            let source = Path::new(url);
            if source.is_dir() {
                // Clone from the local cache entry.
                crate::fsutil::copy_dir(source, target_dir)?;
            } else {
                fs::write(target_dir.join("README.md"), "# tool")?;
            }
            Ok(())
        }

        async fn fetch(&self, _workdir: &Path) -> Result<()> {
            Ok(())
        }

        async fn checkout(&self, workdir: &Path, version: &str) -> Result<()> {
            fs::write(workdir.join("VERSION"), version)?;
            Ok(())
        }
    }

    fn deps_in(tmp: &TempDir) -> StepDeps {
        let layout = Layout::new(tmp.path().join("cache"), tmp.path().join("ws"));
        StepDeps::new(layout, Arc::new(FakeGit))
    }

    #[tokio::test]
    async fn test_run_with_config_supplied_inputs() {
        let tmp = TempDir::new().unwrap();
        let deps = deps_in(&tmp);

        let descriptor = StepDescriptor::new("git-clone")
            .with("url", "https://example.com/tool.git")
            .with("version", "v1.0.0");
        let step = GitClone::build(&descriptor.config, &deps).unwrap();

        let arena = WorkspaceArena::new(&deps.layout.workspace_root).unwrap();
        let out = step
            .run(StepInput {
                values: PipelineContext::new(),
                workspaces: &arena,
            })
            .await
            .unwrap();

        let folder = out.path("folder_path").unwrap();
        assert!(folder.join("README.md").exists());
        assert_eq!(fs::read_to_string(folder.join("VERSION")).unwrap(), "v1.0.0");
        // Cache entry populated as a side effect.
        assert!(deps.cache.contains("https://example.com/tool.git"));
    }

    #[tokio::test]
    async fn test_run_with_context_supplied_inputs() {
        let tmp = TempDir::new().unwrap();
        let deps = deps_in(&tmp);

        let step = GitClone::build(&StepConfig::default(), &deps).unwrap();

        let mut values = PipelineContext::new();
        values.insert("url", "https://example.com/tool.git");
        values.insert("version", "v2.0.0");

        let arena = WorkspaceArena::new(&deps.layout.workspace_root).unwrap();
        let out = step
            .run(StepInput {
                values,
                workspaces: &arena,
            })
            .await
            .unwrap();

        let folder = out.path("folder_path").unwrap();
        assert_eq!(fs::read_to_string(folder.join("VERSION")).unwrap(), "v2.0.0");
    }

    #[test]
    fn test_describe_names_url_and_version() {
        let tmp = TempDir::new().unwrap();
        let deps = deps_in(&tmp);
        let descriptor = StepDescriptor::new("git-clone")
            .with("url", "https://example.com/tool.git")
            .with("version", "v1.0.0");
        let step = GitClone::build(&descriptor.config, &deps).unwrap();
        assert_eq!(step.describe(), "clone https://example.com/tool.git at v1.0.0");
    }

    #[test]
    fn test_build_with_system_git_default() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path().join("cache"), tmp.path().join("ws"));
        let deps = StepDeps::new(layout, Arc::new(SystemGit::new()));
        let step = GitClone::build(&StepConfig::default(), &deps).unwrap();
        assert_eq!(step.describe(), "clone <url> at <version>");
    }
}
