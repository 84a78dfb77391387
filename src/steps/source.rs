//! The `file` and `folder` steps: turn a local source into a workspace
//! folder.
//!
//! `file` produces a folder-shaped artifact from a file-shaped source by
//! copying the single file into a fresh workspace. `folder` defensively
//! copies an existing folder, so later (destructive, move-based) steps
//! never touch the caller's original.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::StepConfig;
use crate::context::{PipelineContext, ValueKind};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::steps::{resolve_path, Step, StepDeps, StepInput};

pub struct FileSource {
    file_path: Option<PathBuf>,
}

impl FileSource {
    pub fn build(config: &StepConfig, _deps: &StepDeps) -> Result<Box<dyn Step>> {
        Ok(Box::new(Self {
            file_path: config.get_str("file_path")?.map(PathBuf::from),
        }))
    }
}

#[async_trait]
impl Step for FileSource {
    fn requires(&self) -> &'static [(&'static str, ValueKind)] {
        &[("file_path", ValueKind::Path)]
    }

    fn provides(&self) -> &'static [(&'static str, ValueKind)] {
        &[("folder_path", ValueKind::Path)]
    }

    fn config_satisfied(&self) -> Vec<&'static str> {
        if self.file_path.is_some() {
            vec!["file_path"]
        } else {
            Vec::new()
        }
    }

    fn describe(&self) -> String {
        match &self.file_path {
            Some(path) => format!("stage file {}", path.display()),
            None => "stage file".to_string(),
        }
    }

    async fn run(&self, input: StepInput<'_>) -> Result<PipelineContext> {
        let source = resolve_path(&self.file_path, &input, "file_path")?;
        if !source.is_file() {
            return Err(Error::ContextValue {
                message: format!("'{}' is not a file", source.display()),
            });
        }

        let workspace = input.workspaces.create()?;
        fsutil::copy_file_into(&source, &workspace)?;

        let mut out = PipelineContext::new();
        out.insert("folder_path", workspace);
        Ok(out)
    }
}

pub struct FolderSource {
    folder_path: Option<PathBuf>,
}

impl FolderSource {
    pub fn build(config: &StepConfig, _deps: &StepDeps) -> Result<Box<dyn Step>> {
        Ok(Box::new(Self {
            folder_path: config.get_str("folder_path")?.map(PathBuf::from),
        }))
    }
}

#[async_trait]
impl Step for FolderSource {
    fn requires(&self) -> &'static [(&'static str, ValueKind)] {
        &[("folder_path", ValueKind::Path)]
    }

    fn provides(&self) -> &'static [(&'static str, ValueKind)] {
        &[("folder_path", ValueKind::Path)]
    }

    fn config_satisfied(&self) -> Vec<&'static str> {
        if self.folder_path.is_some() {
            vec!["folder_path"]
        } else {
            Vec::new()
        }
    }

    fn describe(&self) -> String {
        match &self.folder_path {
            Some(path) => format!("stage folder {}", path.display()),
            None => "stage folder".to_string(),
        }
    }

    async fn run(&self, input: StepInput<'_>) -> Result<PipelineContext> {
        let source = resolve_path(&self.folder_path, &input, "folder_path")?;
        if !source.is_dir() {
            return Err(Error::ContextValue {
                message: format!("'{}' is not a folder", source.display()),
            });
        }

        let workspace = input.workspaces.create()?;
        fsutil::copy_dir(&source, &workspace)?;

        let mut out = PipelineContext::new();
        out.insert("folder_path", workspace);
        Ok(out)
    }
}
