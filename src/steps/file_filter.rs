//! The `file_filter` step: select paths matching glob patterns and
//! relocate them into a fresh workspace.
//!
//! Matching files are moved (not copied), preserving their relative
//! structure. An empty match set yields a valid, empty output folder
//! rather than an error, so pipelines can filter speculatively.

use async_trait::async_trait;
use glob::Pattern;
use log::debug;

use crate::config::StepConfig;
use crate::context::{PipelineContext, ValueKind};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::steps::{Step, StepDeps, StepInput};

pub struct FileFilter {
    include: Vec<Pattern>,
    raw_patterns: Vec<String>,
}

impl FileFilter {
    pub fn build(config: &StepConfig, _deps: &StepDeps) -> Result<Box<dyn Step>> {
        let raw_patterns = config
            .get_str_list("include")?
            .ok_or_else(|| Error::DescriptorParse {
                message: "file_filter requires an 'include' list".to_string(),
                hint: Some("add 'include:' with a list of glob patterns".to_string()),
            })?;
        // Compile patterns up front so bad globs fail before anything runs.
        let include = raw_patterns
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Box::new(Self {
            include,
            raw_patterns,
        }))
    }
}

#[async_trait]
impl Step for FileFilter {
    fn requires(&self) -> &'static [(&'static str, ValueKind)] {
        // 'include' is satisfied by step config, never by upstream context.
        &[("folder_path", ValueKind::Path)]
    }

    fn provides(&self) -> &'static [(&'static str, ValueKind)] {
        &[("folder_path", ValueKind::Path)]
    }

    fn describe(&self) -> String {
        format!("filter files matching [{}]", self.raw_patterns.join(", "))
    }

    async fn run(&self, input: StepInput<'_>) -> Result<PipelineContext> {
        let source = input.values.path("folder_path")?;
        if !source.is_dir() {
            return Err(Error::ContextValue {
                message: format!("'{}' is not a folder", source.display()),
            });
        }

        let workspace = input.workspaces.create()?;
        let mut moved = 0usize;
        for rel in fsutil::list_files(&source)? {
            if self.include.iter().any(|p| p.matches_path(&rel)) {
                fsutil::move_file(&source.join(&rel), &workspace.join(&rel))?;
                moved += 1;
            }
        }
        debug!(
            "filter moved {} files from {} into {}",
            moved,
            source.display(),
            workspace.display()
        );

        let mut out = PipelineContext::new();
        out.insert("folder_path", workspace);
        Ok(out)
    }
}
