//! # Pipeline Compiler and Executor
//!
//! The compiler turns an ordered list of step descriptors plus an initial
//! variable mapping into a validated [`Pipeline`]. Validation is a small
//! dataflow check: walking the descriptors in order, every step's declared
//! inputs must be satisfiable from its own config, the initial variables,
//! or the outputs of strictly earlier steps. Validation happens entirely
//! before any step executes, so an invalid pipeline has zero side effects.
//!
//! The executor runs the validated steps strictly in declaration order.
//! Declaration order *is* execution order: provides/requires encode a true
//! data dependency, so steps are never reordered or parallelized within a
//! run. Concurrency lives one level up, where many independent pipeline
//! runs share one scheduler and suspend at the I/O boundary.
//!
//! For each step the executor extracts exactly the declared `requires`
//! keys from the context, invokes the step, and merges the declared
//! `provides` keys back, overwriting same-named entries. The first failure
//! aborts the run; the resulting error wraps the step's `describe()` text
//! around the root cause. Every workspace created during the run is
//! released on both the success and failure paths, except the one the
//! final `folder_path` points into.

use std::collections::BTreeSet;
use std::path::PathBuf;

use log::{debug, info};

use crate::config::StepDescriptor;
use crate::context::PipelineContext;
use crate::error::{Error, Result};
use crate::steps::{self, Step, StepDeps, StepInput};
use crate::workspace::WorkspaceArena;

/// A validated, ready-to-run sequence of steps.
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
    context: PipelineContext,
    workspace_root: PathBuf,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "steps",
                &self.steps.iter().map(|s| s.describe()).collect::<Vec<_>>(),
            )
            .field("context", &self.context)
            .field("workspace_root", &self.workspace_root)
            .finish()
    }
}

/// Compile descriptors against initial variables into a runnable pipeline.
///
/// Fails with a compile error naming the step and its missing keys when
/// any step's declared inputs cannot be satisfied, and with a
/// descriptor-parse or unsupported-operation error when a step's config is
/// invalid. No filesystem side effects occur on failure.
pub fn compile(
    descriptors: &[StepDescriptor],
    initial: PipelineContext,
    deps: &StepDeps,
) -> Result<Pipeline> {
    let mut available: BTreeSet<String> = initial.keys().cloned().collect();
    let mut built: Vec<Box<dyn Step>> = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        let step = steps::build(&descriptor.kind, &descriptor.config, deps)?;

        // Only config keys the step actually reads count as locally
        // satisfied; a stray key in the descriptor cannot mask a missing
        // input.
        let local = step.config_satisfied();
        let mut missing: Vec<String> = Vec::new();
        for (key, _) in step.requires() {
            if !available.contains(*key) && !local.contains(key) {
                missing.push((*key).to_string());
            }
        }
        if !missing.is_empty() {
            return Err(Error::Compile {
                step: step.describe(),
                missing,
            });
        }

        for (key, _) in step.provides() {
            available.insert((*key).to_string());
        }
        built.push(step);
    }

    debug!("compiled pipeline with {} steps", built.len());
    Ok(Pipeline {
        steps: built,
        context: initial,
        workspace_root: deps.layout.workspace_root.clone(),
    })
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The human-readable descriptions of the steps, in execution order.
    pub fn describe_steps(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.describe()).collect()
    }

    /// Run every step in order, returning the final context.
    ///
    /// By convention the caller reads `folder_path` from the result as the
    /// assembled artifact location.
    pub async fn run(mut self) -> Result<PipelineContext> {
        let arena = WorkspaceArena::new(&self.workspace_root)?;
        let result = self.run_steps(&arena).await;

        // Release workspaces on both paths; on success the final artifact's
        // workspace (if the artifact still lives in one) transfers out.
        match &result {
            Ok(context) => {
                let keep = context.get("folder_path").and_then(|v| v.as_path());
                arena.release_except(keep.as_deref())?;
            }
            Err(_) => {
                arena.release_all()?;
            }
        }
        result
    }

    async fn run_steps(&mut self, arena: &WorkspaceArena) -> Result<PipelineContext> {
        for step in &self.steps {
            info!("running step: {}", step.describe());

            let required: Vec<&str> = step.requires().iter().map(|(key, _)| *key).collect();
            let input = StepInput {
                values: self.context.extract(&required),
                workspaces: arena,
            };

            let output = step.run(input).await.map_err(|e| Error::StepExecution {
                step: step.describe(),
                source: Box::new(e),
            })?;

            let provided: Vec<&str> = step.provides().iter().map(|(key, _)| *key).collect();
            self.context.merge(output.extract(&provided));
        }
        Ok(self.context.clone())
    }
}
