//! # Folder Merge Engine
//!
//! Recursively merges one folder's file tree into a target folder under a
//! pluggable conflict policy. The engine walks every regular file under
//! the source, computes its source-relative path, and delegates each file
//! to the active [`MergeStrategy`].
//!
//! Merging uses move semantics: the source workspace is partially or fully
//! drained of files afterwards and must not be treated as reusable.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::fsutil;

/// Policy resolving file-path collisions during a merge.
///
/// `merge_source` is invoked once per regular file; `source_rel` and
/// `target_rel` are the file's path relative to the source and target
/// roots (identical for plain folder merges, split so a policy could remap
/// destinations).
pub trait MergeStrategy: Send + Sync {
    /// Stable policy name, as referenced from step config.
    fn name(&self) -> &'static str;

    /// Merge a single file from the source tree into the target tree.
    fn merge_source(
        &self,
        source_root: &Path,
        source_rel: &Path,
        target_root: &Path,
        target_rel: &Path,
    ) -> Result<()>;
}

/// Merge every regular file under `source` into `target` under `strategy`.
pub fn merge_folder(source: &Path, target: &Path, strategy: &dyn MergeStrategy) -> Result<()> {
    if !source.is_dir() {
        return Err(Error::ContextValue {
            message: format!("merge source '{}' is not a directory", source.display()),
        });
    }
    fs::create_dir_all(target)?;

    let files = fsutil::list_files(source)?;
    info!(
        "merging {} files from {} into {} ({})",
        files.len(),
        source.display(),
        target.display(),
        strategy.name()
    );
    for rel in files {
        strategy.merge_source(source, &rel, target, &rel)?;
    }
    Ok(())
}

/// The default policy: a file whose destination already exists is skipped
/// silently; otherwise it is moved into place. In strict mode an existing
/// destination raises a merge-conflict error instead of being skipped.
pub struct SkipExisting {
    strict: bool,
}

impl SkipExisting {
    pub fn new() -> Self {
        Self { strict: false }
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }
}

impl Default for SkipExisting {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeStrategy for SkipExisting {
    fn name(&self) -> &'static str {
        "default"
    }

    fn merge_source(
        &self,
        source_root: &Path,
        source_rel: &Path,
        target_root: &Path,
        target_rel: &Path,
    ) -> Result<()> {
        let src = source_root.join(source_rel);
        let dst = target_root.join(target_rel);

        if dst.exists() {
            if self.strict {
                return Err(Error::MergeConflict {
                    src: source_rel.display().to_string(),
                    dst: dst.display().to_string(),
                    message: "destination already exists".to_string(),
                });
            }
            debug!("skipping existing {}", dst.display());
            return Ok(());
        }

        fsutil::move_file(&src, &dst)
    }
}

/// Last-write-wins policy: any existing destination file is removed, then
/// the source file is moved into place.
pub struct Overwrite;

impl MergeStrategy for Overwrite {
    fn name(&self) -> &'static str {
        "overwrite"
    }

    fn merge_source(
        &self,
        source_root: &Path,
        source_rel: &Path,
        target_root: &Path,
        target_rel: &Path,
    ) -> Result<()> {
        let src = source_root.join(source_rel);
        let dst = target_root.join(target_rel);

        if dst.exists() {
            debug!("overwriting {}", dst.display());
            fs::remove_file(&dst)?;
        }
        fsutil::move_file(&src, &dst)
    }
}

/// Reserved placeholder for protected-path-aware conflict resolution.
///
/// The intended policy refuses to touch well-known user directories and
/// replaces everything else; it is not implemented. The current behavior
/// is a no-op per file: nothing is moved and nothing at the destination is
/// ever overwritten. Do not rely on this as a working policy.
pub struct Replace;

impl MergeStrategy for Replace {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn merge_source(
        &self,
        _source_root: &Path,
        _source_rel: &Path,
        _target_root: &Path,
        _target_rel: &Path,
    ) -> Result<()> {
        // Sketch of the eventual policy:
        //   if is_protected(target_root.join(target_rel)) {
        //       return Err(Error::MergeConflict { .. });
        //   }
        //   remove destination, move source into place
        // where is_protected would consult a list of well-known user
        // directories (Documents, Desktop, ...). Until that list exists,
        // doing nothing is the only safe behavior.
        Ok(())
    }
}

/// Resolve a strategy by its config name.
///
/// `strict` only affects the default policy.
pub fn strategy_for(name: &str, strict: bool) -> Result<Box<dyn MergeStrategy>> {
    match name {
        "default" => Ok(if strict {
            Box::new(SkipExisting::strict())
        } else {
            Box::new(SkipExisting::new())
        }),
        "overwrite" => Ok(Box::new(Overwrite)),
        "replace" => Ok(Box::new(Replace)),
        other => Err(Error::DescriptorParse {
            message: format!("unknown merge strategy '{}'", other),
            hint: Some("valid strategies: default, overwrite, replace".to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).unwrap()
    }

    #[test]
    fn test_default_moves_files_preserving_structure() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        let target = tmp.path().join("target");
        write(&source, "a.txt", "x");
        write(&source, "bin/tool", "t");

        merge_folder(&source, &target, &SkipExisting::new()).unwrap();

        assert_eq!(read(&target, "a.txt"), "x");
        assert_eq!(read(&target, "bin/tool"), "t");
        // Moved, not copied.
        assert!(!source.join("a.txt").exists());
        assert!(!source.join("bin/tool").exists());
    }

    #[test]
    fn test_default_never_overwrites_and_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        let target = tmp.path().join("target");
        write(&source, "a.txt", "new");
        write(&target, "a.txt", "old");

        merge_folder(&source, &target, &SkipExisting::new()).unwrap();
        assert_eq!(read(&target, "a.txt"), "old");
        // Skipped source file stays behind.
        assert_eq!(read(&source, "a.txt"), "new");

        // Re-running with the unchanged source changes nothing.
        merge_folder(&source, &target, &SkipExisting::new()).unwrap();
        assert_eq!(read(&target, "a.txt"), "old");
    }

    #[test]
    fn test_default_strict_raises_conflict() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        let target = tmp.path().join("target");
        write(&source, "a.txt", "new");
        write(&target, "a.txt", "old");

        let err = merge_folder(&source, &target, &SkipExisting::strict()).unwrap_err();
        match err {
            Error::MergeConflict { src, .. } => assert_eq!(src, "a.txt"),
            other => panic!("expected MergeConflict, got: {:?}", other),
        }
        assert_eq!(read(&target, "a.txt"), "old");
    }

    #[test]
    fn test_overwrite_is_last_write_wins() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("target");

        let first = tmp.path().join("first");
        write(&first, "a.txt", "A");
        merge_folder(&first, &target, &Overwrite).unwrap();

        let second = tmp.path().join("second");
        write(&second, "a.txt", "B");
        merge_folder(&second, &target, &Overwrite).unwrap();

        assert_eq!(read(&target, "a.txt"), "B");
        assert!(!second.join("a.txt").exists());
    }

    #[test]
    fn test_replace_is_a_no_op_placeholder() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        let target = tmp.path().join("target");
        write(&source, "a.txt", "new");
        write(&target, "a.txt", "old");

        merge_folder(&source, &target, &Replace).unwrap();
        // Nothing moved, nothing overwritten.
        assert_eq!(read(&target, "a.txt"), "old");
        assert_eq!(read(&source, "a.txt"), "new");
    }

    #[test]
    fn test_merge_empty_source_is_valid() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        let target = tmp.path().join("target");
        fs::create_dir_all(&source).unwrap();

        merge_folder(&source, &target, &SkipExisting::new()).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_merge_missing_source_fails() {
        let tmp = TempDir::new().unwrap();
        let err = merge_folder(
            &tmp.path().join("missing"),
            &tmp.path().join("target"),
            &SkipExisting::new(),
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("not a directory"));
    }

    #[test]
    fn test_strategy_for_names() {
        assert_eq!(strategy_for("default", false).unwrap().name(), "default");
        assert_eq!(strategy_for("overwrite", false).unwrap().name(), "overwrite");
        assert_eq!(strategy_for("replace", false).unwrap().name(), "replace");
        assert!(strategy_for("theirs", false).is_err());
    }
}
