//! End-to-end pipeline tests: compile validation, execution, folder
//! merging, and target safety, driven through the public API with a mock
//! git runner so no network or git binary is needed.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use pkgsmith::config::{self, Layout, StepDescriptor};
use pkgsmith::context::PipelineContext;
use pkgsmith::error::{Error, Result};
use pkgsmith::git::GitRunner;
use pkgsmith::steps::StepDeps;
use pkgsmith::{pipeline, target};

/// Mock git runner that fabricates repository content.
///
/// `clone_repo` from a remote URL writes a small fake repository;
/// `clone_repo` from an existing local path (the cache entry) copies it.
/// `checkout` records the version in a `VERSION` file.
struct FakeGit;

#[async_trait]
impl GitRunner for FakeGit {
    async fn clone_repo(&self, url: &str, target_dir: &Path) -> Result<()> {
        fs::create_dir_all(target_dir)?;
        let local = Path::new(url);
        if local.is_dir() {
            copy_tree(local, target_dir)?;
        } else {
            fs::write(target_dir.join("README.md"), "# tool\n")?;
            fs::write(target_dir.join("CHANGELOG.md"), "changes\n")?;
            fs::create_dir_all(target_dir.join("src"))?;
            fs::write(target_dir.join("src/main.c"), "int main(){}\n")?;
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

/// Mock runner whose clone always fails, for abort-path tests.
struct BrokenGit;

#[async_trait]
impl GitRunner for BrokenGit {
    async fn clone_repo(&self, _url: &str, _target_dir: &Path) -> Result<()> {
        Err(Error::GitCommand {
            command: "git clone".to_string(),
            stderr: "fatal: repository not found".to_string(),
        })
    }

    async fn fetch(&self, _workdir: &Path) -> Result<()> {
        Ok(())
    }

    async fn checkout(&self, _workdir: &Path, _version: &str) -> Result<()> {
        Ok(())
    }
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in walk(src)? {
        let rel = entry.strip_prefix(src).unwrap();
        let target = dst.join(rel);
        fs::create_dir_all(target.parent().unwrap())?;
        fs::copy(&entry, &target)?;
    }
    Ok(())
}

fn walk(root: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            out.extend(walk(&entry.path())?);
        } else {
            out.push(entry.path());
        }
    }
    Ok(out)
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn deps_in(tmp: &TempDir, git: Arc<dyn GitRunner>) -> StepDeps {
    init_logging();
    let layout = Layout::new(tmp.path().join("cache"), tmp.path().join("ws"));
    StepDeps::new(layout, git)
}

fn pipeline_yaml() -> &'static str {
    r#"
- type: git-clone
  url: https://example.com/tool.git
- type: file_filter
  include:
    - "*.md"
- type: merge_into
"#
}

#[tokio::test]
async fn test_full_assembly_run() {
    let tmp = TempDir::new().unwrap();
    let deps = deps_in(&tmp, Arc::new(FakeGit));
    let install_target = tmp.path().join("installed");

    let descriptors = config::parse(pipeline_yaml()).unwrap();
    let mut initial = PipelineContext::new();
    initial.insert("version", "v1.0.0");
    initial.insert("target", install_target.clone());

    let result = pipeline::compile(&descriptors, initial, &deps)
        .unwrap()
        .run()
        .await
        .unwrap();

    // The final folder identity is the merge target.
    assert_eq!(result.path("folder_path").unwrap(), install_target);
    // Markdown files made it through the filter and the merge.
    assert_eq!(
        fs::read_to_string(install_target.join("README.md")).unwrap(),
        "# tool\n"
    );
    assert!(install_target.join("CHANGELOG.md").exists());
    // Non-matching files were filtered out.
    assert!(!install_target.join("src/main.c").exists());
    assert!(!install_target.join("VERSION").exists());
    // The cache entry persists for later runs.
    assert!(deps.cache.contains("https://example.com/tool.git"));
    // Every ephemeral workspace was released.
    assert_no_run_dirs(&tmp.path().join("ws"));
}

#[tokio::test]
async fn test_final_workspace_ownership_transfers_without_merge() {
    let tmp = TempDir::new().unwrap();
    let deps = deps_in(&tmp, Arc::new(FakeGit));

    // No merge step: the assembled artifact stays in a workspace, whose
    // ownership transfers out to the caller.
    let descriptors = vec![StepDescriptor::new("git-clone")
        .with("url", "https://example.com/tool.git")
        .with("version", "v2.0.0")];

    let result = pipeline::compile(&descriptors, PipelineContext::new(), &deps)
        .unwrap()
        .run()
        .await
        .unwrap();

    let artifact = result.path("folder_path").unwrap();
    assert!(artifact.join("README.md").exists());
    assert_eq!(
        fs::read_to_string(artifact.join("VERSION")).unwrap(),
        "v2.0.0"
    );
}

#[tokio::test]
async fn test_step_failure_aborts_and_names_the_step() {
    let tmp = TempDir::new().unwrap();
    let deps = deps_in(&tmp, Arc::new(BrokenGit));
    let install_target = tmp.path().join("installed");

    let descriptors = config::parse(pipeline_yaml()).unwrap();
    let mut initial = PipelineContext::new();
    initial.insert("version", "v1.0.0");
    initial.insert("target", install_target.clone());

    let err = pipeline::compile(&descriptors, initial, &deps)
        .unwrap()
        .run()
        .await
        .unwrap_err();

    match &err {
        Error::StepExecution { step, source } => {
            assert!(step.contains("clone https://example.com/tool.git"));
            assert!(format!("{}", source).contains("repository not found"));
        }
        other => panic!("expected StepExecution, got: {:?}", other),
    }
    // The merge never ran and workspaces were cleaned up on the failure path.
    assert!(!install_target.exists());
    assert_no_run_dirs(&tmp.path().join("ws"));
}

#[tokio::test]
async fn test_compile_failure_has_zero_side_effects() {
    let tmp = TempDir::new().unwrap();
    let deps = deps_in(&tmp, Arc::new(FakeGit));

    // merge_into first: nothing provides folder_path or target yet.
    let descriptors = vec![
        StepDescriptor::new("merge_into"),
        StepDescriptor::new("git-clone")
            .with("url", "https://example.com/tool.git")
            .with("version", "v1.0.0"),
    ];
    let err = pipeline::compile(&descriptors, PipelineContext::new(), &deps).unwrap_err();

    match err {
        Error::Compile { missing, .. } => {
            assert!(missing.contains(&"folder_path".to_string()));
            assert!(missing.contains(&"target".to_string()));
        }
        other => panic!("expected Compile, got: {:?}", other),
    }
    assert!(!tmp.path().join("cache").exists());
    assert!(!tmp.path().join("ws").exists());
}

#[tokio::test]
async fn test_file_source_pipeline_with_rename_and_mode() {
    let tmp = TempDir::new().unwrap();
    let deps = deps_in(&tmp, Arc::new(FakeGit));

    let script = tmp.path().join("tool-v3.sh");
    fs::write(&script, "#!/bin/sh\necho tool\n").unwrap();
    let install_target = tmp.path().join("installed");

    // file stages the script into a workspace; rename and set_mode operate
    // on it via the 'path' key bridged from the staged folder.
    let descriptors = vec![
        StepDescriptor::new("file").with("file_path", script.to_string_lossy().to_string()),
        StepDescriptor::new("merge_into")
            .with("target", install_target.to_string_lossy().to_string()),
        StepDescriptor::new("rename").with("rename", {
            let mut m = serde_yaml::Mapping::new();
            m.insert(
                serde_yaml::Value::String("tool-v3.sh".to_string()),
                serde_yaml::Value::String("bin/tool".to_string()),
            );
            serde_yaml::Value::Mapping(m)
        }),
        StepDescriptor::new("set_mode")
            .with("set_executable", true)
            .with(
                "include",
                serde_yaml::Value::Sequence(vec![serde_yaml::Value::String(
                    "bin/*".to_string(),
                )]),
            ),
    ];

    let mut initial = PipelineContext::new();
    initial.insert("path", install_target.clone());

    pipeline::compile(&descriptors, initial, &deps)
        .unwrap()
        .run()
        .await
        .unwrap();

    let tool = install_target.join("bin/tool");
    assert!(tool.exists());
    assert!(!install_target.join("tool-v3.sh").exists());
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&tool).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }
    // Original source file is untouched.
    assert!(script.exists());
}

#[tokio::test]
async fn test_default_merge_is_idempotent_and_overwrite_wins() {
    let tmp = TempDir::new().unwrap();
    let install_target = tmp.path().join("installed");

    let run = |version: &'static str, strategy: &'static str| {
        let descriptors = vec![
            StepDescriptor::new("git-clone")
                .with("url", "https://example.com/tool.git")
                .with("version", version),
            StepDescriptor::new("merge_into")
                .with("target", install_target.to_string_lossy().to_string())
                .with("merge_strategy", strategy),
        ];
        let deps = deps_in(&tmp, Arc::new(FakeGit));
        async move {
            pipeline::compile(&descriptors, PipelineContext::new(), &deps)
                .unwrap()
                .run()
                .await
                .unwrap()
        }
    };

    run("v1", "default").await;
    // VERSION reflects the first merge.
    assert_eq!(
        fs::read_to_string(install_target.join("VERSION")).unwrap(),
        "v1"
    );

    // Default strategy never overwrites: a second run leaves v1 in place.
    run("v2", "default").await;
    assert_eq!(
        fs::read_to_string(install_target.join("VERSION")).unwrap(),
        "v1"
    );

    // Overwrite strategy is last-write-wins.
    run("v3", "overwrite").await;
    assert_eq!(
        fs::read_to_string(install_target.join("VERSION")).unwrap(),
        "v3"
    );
}

#[tokio::test]
async fn test_installer_guard_flow() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let layout = Layout::new(tmp.path().join("cache"), tmp.path().join("ws"));
    let install_target = tmp.path().join("installed");

    // Fresh target: valid without any marker.
    assert!(target::is_valid_target(&install_target, &layout).unwrap());

    // Simulate a populated, unmarked directory: the guard refuses it.
    fs::create_dir_all(&install_target).unwrap();
    fs::write(install_target.join("user-data.txt"), "precious").unwrap();
    assert!(!target::is_valid_target(&install_target, &layout).unwrap());
    assert!(target::ensure_valid_target(&install_target, &layout).is_err());

    // Once blessed, merges are allowed again.
    target::mark_allowed(&install_target, &layout).unwrap();
    assert!(target::is_valid_target(&install_target, &layout).unwrap());

    let deps = StepDeps::new(layout, Arc::new(FakeGit));
    let descriptors = vec![
        StepDescriptor::new("git-clone")
            .with("url", "https://example.com/tool.git")
            .with("version", "v1.0.0"),
        StepDescriptor::new("merge_into")
            .with("target", install_target.to_string_lossy().to_string()),
    ];
    pipeline::compile(&descriptors, PipelineContext::new(), &deps)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(install_target.join("README.md").exists());
    assert!(install_target.join("user-data.txt").exists());
}

#[tokio::test]
async fn test_concurrent_runs_share_one_cache_entry() {
    let tmp = TempDir::new().unwrap();
    let url = "https://example.com/tool.git";

    let mut handles = Vec::new();
    for i in 0..4 {
        let deps = deps_in(&tmp, Arc::new(FakeGit));
        let descriptors = vec![StepDescriptor::new("git-clone")
            .with("url", url)
            .with("version", format!("v{}", i))];
        handles.push(tokio::spawn(async move {
            pipeline::compile(&descriptors, PipelineContext::new(), &deps)
                .unwrap()
                .run()
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Exactly one populated cache entry for the URL, no leftover scratch.
    let deps = deps_in(&tmp, Arc::new(FakeGit));
    let entries = deps.cache.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(deps.cache.contains(url));
}

/// Assert the workspace root holds no leftover run directories.
fn assert_no_run_dirs(ws_root: &Path) {
    if !ws_root.exists() {
        return;
    }
    let leftovers: Vec<_> = fs::read_dir(ws_root)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert!(leftovers.is_empty(), "leftover run dirs: {:?}", leftovers);
}
