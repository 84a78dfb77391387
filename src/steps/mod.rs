//! # Step Catalog
//!
//! The closed set of pipeline step variants. Each variant implements the
//! [`Step`] contract: declared required inputs, declared produced outputs,
//! a human-readable description, and an async execution operation.
//!
//! Variants are registered in the static [`CATALOG`] table mapping their
//! explicit string identifier to a constructor; there is no name-derived
//! or reflective registration. Constructors validate step config
//! up front so an invalid pipeline fails at compile time with zero side
//! effects.
//!
//! A declared input may be satisfied either by the step's own config or by
//! the pipeline context (initial variables plus earlier steps' outputs);
//! the `resolve_*` helpers below implement the config-first lookup.

pub mod file_filter;
pub mod git_clone;
pub mod merge_into;
pub mod rename;
pub mod set_mode;
pub mod source;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::RepoCache;
use crate::config::{Layout, StepConfig};
use crate::context::{PipelineContext, ValueKind};
use crate::error::{Error, Result};
use crate::git::GitRunner;
use crate::workspace::WorkspaceArena;

pub use file_filter::FileFilter;
pub use git_clone::GitClone;
pub use merge_into::MergeInto;
pub use rename::Rename;
pub use set_mode::SetMode;
pub use source::{FileSource, FolderSource};

/// Shared collaborators injected into step constructors.
///
/// Carrying these explicitly keeps the catalog free of ambient global
/// state: the cache root, workspace root, and git runner all arrive from
/// the caller.
pub struct StepDeps {
    pub layout: Arc<Layout>,
    pub git: Arc<dyn GitRunner>,
    pub cache: RepoCache,
}

impl StepDeps {
    pub fn new(layout: Layout, git: Arc<dyn GitRunner>) -> Self {
        let cache = RepoCache::new(layout.cache_root.clone());
        Self {
            layout: Arc::new(layout),
            git,
            cache,
        }
    }
}

/// What a step sees at run time: exactly its declared context inputs plus
/// the arena it may create workspaces in.
pub struct StepInput<'a> {
    /// The subset of the pipeline context named by `requires()`.
    pub values: PipelineContext,
    /// Arena for creating ephemeral workspace folders; the executor owns
    /// their lifecycle.
    pub workspaces: &'a WorkspaceArena,
}

/// One pipeline step variant.
///
/// Implementations are stateless across runs beyond their own config; the
/// same instance may be run repeatedly.
#[async_trait]
pub trait Step: Send + Sync {
    /// Declared required inputs as name/type-tag pairs.
    fn requires(&self) -> &'static [(&'static str, ValueKind)];

    /// Declared produced outputs as name/type-tag pairs.
    fn provides(&self) -> &'static [(&'static str, ValueKind)];

    /// The subset of `requires()` keys this step's own config already
    /// satisfies. The compiler counts only these as locally met; a stray
    /// config key never masks a genuinely missing input.
    fn config_satisfied(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Human-readable description used to localize failures.
    fn describe(&self) -> String;

    /// Execute the step, returning the context entries it provides.
    async fn run(&self, input: StepInput<'_>) -> Result<PipelineContext>;
}

impl std::fmt::Debug for dyn Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Step({})", self.describe())
    }
}

/// Constructor signature for catalog variants.
pub type StepConstructor = fn(&StepConfig, &StepDeps) -> Result<Box<dyn Step>>;

/// The closed registration table: explicit name to constructor.
pub const CATALOG: &[(&str, StepConstructor)] = &[
    ("git-clone", git_clone::GitClone::build),
    ("file", source::FileSource::build),
    ("folder", source::FolderSource::build),
    ("file_filter", file_filter::FileFilter::build),
    ("rename", rename::Rename::build),
    ("set_mode", set_mode::SetMode::build),
    ("merge_into", merge_into::MergeInto::build),
];

/// All registered step type names.
pub fn names() -> Vec<&'static str> {
    CATALOG.iter().map(|(name, _)| *name).collect()
}

/// Instantiate a catalog variant by its type name.
pub fn build(kind: &str, config: &StepConfig, deps: &StepDeps) -> Result<Box<dyn Step>> {
    match CATALOG.iter().find(|(name, _)| *name == kind) {
        Some((_, constructor)) => constructor(config, deps),
        None => Err(Error::UnknownStep {
            kind: kind.to_string(),
            hint: Some(format!("valid step types: {}", names().join(", "))),
        }),
    }
}

/// Look up a declared input first in the step's own config, then in the
/// context.
pub(crate) fn resolve_text(
    local: &Option<String>,
    input: &StepInput<'_>,
    key: &str,
) -> Result<String> {
    match local {
        Some(value) => Ok(value.clone()),
        None => Ok(input.values.text(key)?.to_string()),
    }
}

/// Path-valued variant of [`resolve_text`].
pub(crate) fn resolve_path(
    local: &Option<PathBuf>,
    input: &StepInput<'_>,
    key: &str,
) -> Result<PathBuf> {
    match local {
        Some(value) => Ok(value.clone()),
        None => input.values.path(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::SystemGit;
    use std::collections::BTreeSet;

    fn deps() -> StepDeps {
        StepDeps::new(Layout::default(), Arc::new(SystemGit::new()))
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let unique: BTreeSet<_> = CATALOG.iter().map(|(name, _)| *name).collect();
        assert_eq!(unique.len(), CATALOG.len());
    }

    #[test]
    fn test_catalog_covers_expected_variants() {
        let names = names();
        for expected in [
            "git-clone",
            "file",
            "folder",
            "file_filter",
            "rename",
            "set_mode",
            "merge_into",
        ] {
            assert!(names.contains(&expected), "missing variant: {}", expected);
        }
    }

    #[test]
    fn test_build_unknown_step_names_valid_types() {
        let err = build("git_clone", &StepConfig::default(), &deps()).unwrap_err();
        let display = format!("{}", err);
        assert!(display.contains("unknown step type 'git_clone'"));
        assert!(display.contains("git-clone"));
    }

    #[test]
    fn test_build_each_variant_with_minimal_config() {
        let deps = deps();
        // Variants whose config is entirely optional build from an empty map.
        for kind in ["git-clone", "file", "folder", "rename", "merge_into"] {
            build(kind, &StepConfig::default(), &deps)
                .unwrap_or_else(|e| panic!("{} failed to build: {}", kind, e));
        }
    }
}
