//! # Error Handling
//!
//! Centralized error handling for `pkgsmith`, built on `thiserror`. The
//! `Error` enum covers every anticipated failure mode of the assembly
//! pipeline, from descriptor parsing through step execution to folder
//! merging, with enough context to localize a failure to a specific
//! pipeline stage.
//!
//! The taxonomy mirrors the pipeline's phases:
//!
//! - `Compile`: a step's declared inputs cannot be satisfied; raised before
//!   any side effect occurs.
//! - `StepExecution`: a step's `run` failed; carries the step's
//!   human-readable description alongside the root cause.
//! - `MergeConflict`: the strict skip-if-exists strategy found an existing
//!   destination file.
//! - `Unsupported`: a requested but unimplemented operation (e.g.
//!   `set_readable`).
//! - `TargetSafety`: an attempted merge into an unblessed non-empty
//!   directory.
//!
//! Plus wrapped failures for git subprocesses, cache operations, descriptor
//! parsing, and the usual I/O, glob, and YAML conversions.

use thiserror::Error;

/// Main error type for pkgsmith operations
#[derive(Error, Debug)]
pub enum Error {
    /// A step's declared inputs are not satisfiable from its config, the
    /// initial variables, or the outputs of earlier steps.
    ///
    /// Raised during pipeline compilation, before any step executes.
    #[error("Pipeline compile error: step '{step}' is missing required inputs: {}", missing.join(", "))]
    Compile { step: String, missing: Vec<String> },

    /// A step type name that does not exist in the catalog.
    #[error("Pipeline compile error: unknown step type '{kind}'{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    UnknownStep {
        kind: String,
        /// Optional hint listing valid step names
        hint: Option<String>,
    },

    /// A step's `run` failed. The remaining pipeline is aborted.
    ///
    /// Carries the failing step's `describe()` text so the user can tell
    /// which pipeline stage broke, and the underlying cause.
    #[error("Step failed ({step}): {source}")]
    StepExecution {
        step: String,
        #[source]
        source: Box<Error>,
    },

    /// An error occurred while parsing a step descriptor or step config.
    #[error("Descriptor parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    DescriptorParse {
        message: String,
        /// Optional hint for how to fix the descriptor
        hint: Option<String>,
    },

    /// An error occurred while executing a git command.
    #[error("Git command failed: {command} - {stderr}")]
    GitCommand { command: String, stderr: String },

    /// A git command exceeded its allotted time.
    #[error("Git command timed out after {seconds}s: {command}")]
    GitTimeout { command: String, seconds: u64 },

    /// An error occurred with a repository cache operation.
    #[error("Cache operation error: {message}")]
    Cache { message: String },

    /// A file at the destination path already exists and the active merge
    /// strategy refuses to overwrite it.
    #[error("Merge conflict: {src} -> {dst}: {message}")]
    MergeConflict {
        src: String,
        dst: String,
        message: String,
    },

    /// An attempted write into a directory the safety guard has not blessed.
    #[error("Target safety error for {path}: {message}")]
    TargetSafety { path: String, message: String },

    /// A requested operation that this tool deliberately does not implement.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// A context value was missing or had the wrong shape at run time.
    #[error("Context value error: {message}")]
    ContextValue { message: String },

    /// An error occurred with an ephemeral workspace.
    #[error("Workspace error: {message}")]
    Workspace { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
