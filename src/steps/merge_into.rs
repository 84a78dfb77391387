//! The `merge_into` step: merge the staged workspace into the target
//! directory under the configured strategy.
//!
//! On success the step provides `folder_path` equal to the target, so
//! later steps chain off the merged location rather than the drained
//! workspace. The step itself does not consult the target safety guard;
//! that check is the external installer's responsibility before the
//! pipeline is permitted to run against a persistent target (see
//! [`crate::target`]).

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::StepConfig;
use crate::context::{PipelineContext, ValueKind};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::merge::{self, MergeStrategy};
use crate::steps::{resolve_path, Step, StepDeps, StepInput};

pub struct MergeInto {
    target: Option<PathBuf>,
    strategy: Box<dyn MergeStrategy>,
}

impl MergeInto {
    pub fn build(config: &StepConfig, _deps: &StepDeps) -> Result<Box<dyn Step>> {
        let name = config
            .get_str("merge_strategy")?
            .unwrap_or_else(|| "default".to_string());
        let strict = config.get_bool("strict")?.unwrap_or(false);
        Ok(Box::new(Self {
            target: config.get_str("target")?.map(PathBuf::from),
            strategy: merge::strategy_for(&name, strict)?,
        }))
    }
}

#[async_trait]
impl Step for MergeInto {
    fn requires(&self) -> &'static [(&'static str, ValueKind)] {
        &[("folder_path", ValueKind::Path), ("target", ValueKind::Path)]
    }

    fn provides(&self) -> &'static [(&'static str, ValueKind)] {
        &[("folder_path", ValueKind::Path)]
    }

    fn config_satisfied(&self) -> Vec<&'static str> {
        if self.target.is_some() {
            vec!["target"]
        } else {
            Vec::new()
        }
    }

    fn describe(&self) -> String {
        format!(
            "merge into {} ({})",
            self.target
                .as_ref()
                .map(|t| t.display().to_string())
                .unwrap_or_else(|| "<target>".to_string()),
            self.strategy.name()
        )
    }

    async fn run(&self, input: StepInput<'_>) -> Result<PipelineContext> {
        let source = input.values.path("folder_path")?;
        if !source.is_dir() {
            return Err(Error::ContextValue {
                message: format!("merge source '{}' is missing", source.display()),
            });
        }
        if fsutil::dir_is_empty(&source)? {
            return Err(Error::ContextValue {
                message: format!("merge source '{}' is empty", source.display()),
            });
        }

        let target = resolve_path(&self.target, &input, "target")?;
        merge::merge_folder(&source, &target, self.strategy.as_ref())?;

        // The merged location becomes the new folder identity.
        let mut out = PipelineContext::new();
        out.insert("folder_path", target);
        Ok(out)
    }
}
