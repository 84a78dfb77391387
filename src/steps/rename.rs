//! The `rename` step: move listed paths to new locations within the same
//! folder.
//!
//! The mapping is an exact relative-path to relative-path table; an empty
//! mapping is a no-op. The folder identity is unchanged, so the step
//! provides the same `path` it consumed.

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::debug;

use crate::config::StepConfig;
use crate::context::{PipelineContext, ValueKind};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::steps::{Step, StepDeps, StepInput};

pub struct Rename {
    mapping: BTreeMap<String, String>,
}

impl Rename {
    pub fn build(config: &StepConfig, _deps: &StepDeps) -> Result<Box<dyn Step>> {
        Ok(Box::new(Self {
            mapping: config.get_str_map("rename")?.unwrap_or_default(),
        }))
    }
}

#[async_trait]
impl Step for Rename {
    fn requires(&self) -> &'static [(&'static str, ValueKind)] {
        &[("path", ValueKind::Path)]
    }

    fn provides(&self) -> &'static [(&'static str, ValueKind)] {
        &[("path", ValueKind::Path)]
    }

    fn describe(&self) -> String {
        format!("rename {} paths", self.mapping.len())
    }

    async fn run(&self, input: StepInput<'_>) -> Result<PipelineContext> {
        let root = input.values.path("path")?;

        for (from, to) in &self.mapping {
            let src = root.join(from);
            if !src.exists() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("rename source '{}' does not exist", src.display()),
                )));
            }
            let dst = root.join(to);
            debug!("renaming {} -> {}", src.display(), dst.display());
            fsutil::move_file(&src, &dst)?;
        }

        let mut out = PipelineContext::new();
        out.insert("path", root);
        Ok(out)
    }
}
