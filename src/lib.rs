//! # pkgsmith
//!
//! This library provides the core functionality for assembling software
//! packages on a local filesystem. It is designed to be driven by an
//! external resolver and CLI, but can be integrated into any application
//! that needs to turn a package source descriptor (a git URL, a local file
//! or folder) into an installed directory tree.
//!
//! ## Quick Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pkgsmith::config::{self, Layout};
//! use pkgsmith::context::PipelineContext;
//! use pkgsmith::git::SystemGit;
//! use pkgsmith::pipeline;
//! use pkgsmith::steps::StepDeps;
//!
//! # async fn example() -> pkgsmith::Result<()> {
//! let descriptors = config::parse(r#"
//! - type: git-clone
//!   url: https://example.com/tool.git
//! - type: file_filter
//!   include:
//!     - "bin/*"
//! - type: merge_into
//! "#)?;
//!
//! let mut initial = PipelineContext::new();
//! initial.insert("version", "v1.2.3");
//! initial.insert("target", "/opt/tool");
//!
//! let deps = StepDeps::new(Layout::default(), Arc::new(SystemGit::new()));
//! let result = pipeline::compile(&descriptors, initial, &deps)?.run().await?;
//! let installed = result.path("folder_path")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! The library is built around a few key concepts:
//!
//! - **Step Catalog (`steps`)**: A closed set of transformation step
//!   variants, each declaring the inputs it requires and the outputs it
//!   produces.
//! - **Pipeline (`pipeline`)**: A compiler that statically validates step
//!   ordering against the declared dataflow, and an executor that runs the
//!   validated sequence, threading a context of named values between steps.
//! - **Context (`context`)**: The insertion-ordered mapping of named values
//!   a pipeline run accumulates.
//! - **Folder Merging (`merge`)**: A recursive file-tree merge engine with
//!   pluggable conflict strategies and move semantics.
//! - **Target Safety (`target`)**: The guard that decides whether a
//!   persistent directory may be written to, based on a sentinel marker.
//! - **Source Management (`git`, `cache`, `workspace`)**: The async git
//!   collaborator, the race-safe persistent clone cache shared across runs,
//!   and the ephemeral workspace arena owned by the executor.
//!
//! ## Execution Flow
//!
//! 1. The external resolver produces an ordered step-descriptor list and
//!    initial variables (version, target, platform facts).
//! 2. `pipeline::compile` instantiates catalog variants and verifies every
//!    step's requirements are satisfiable; invalid pipelines fail here with
//!    zero side effects.
//! 3. `Pipeline::run` executes the steps strictly in order. Steps stage
//!    intermediate state in ephemeral workspaces and may populate the
//!    shared repository cache.
//! 4. A final `merge_into` step merges the staged folder into the target
//!    directory, which the external installer has vetted through the
//!    target safety guard.
//! 5. The final context is returned; `folder_path` points at the assembled
//!    artifact.

pub mod cache;
pub mod config;
pub mod context;
pub mod defaults;
pub mod error;
pub mod fsutil;
pub mod git;
pub mod merge;
pub mod pipeline;
pub mod steps;
pub mod target;
pub mod workspace;

pub use context::{PipelineContext, Value, ValueKind};
pub use error::{Error, Result};
pub use pipeline::{compile, Pipeline};
