//! The `set_mode` step: turn the executable bit on for matched files.
//!
//! Only `set_executable: true` is implemented. Requesting
//! `set_executable: false`, or any use of `set_readable` /
//! `set_writeable`, is an explicitly unsupported operation that fails at
//! step construction, never a silent no-op.

use async_trait::async_trait;
use glob::Pattern;
use log::debug;

use crate::config::StepConfig;
use crate::context::{PipelineContext, ValueKind};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::steps::{Step, StepDeps, StepInput};

pub struct SetMode {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl SetMode {
    pub fn build(config: &StepConfig, _deps: &StepDeps) -> Result<Box<dyn Step>> {
        for unsupported in ["set_readable", "set_writeable"] {
            if config.contains(unsupported) {
                return Err(Error::Unsupported {
                    operation: format!("set_mode with '{}'", unsupported),
                });
            }
        }
        match config.get_bool("set_executable")? {
            Some(true) => {}
            Some(false) => {
                return Err(Error::Unsupported {
                    operation: "set_mode with 'set_executable: false'".to_string(),
                })
            }
            None => {
                return Err(Error::Unsupported {
                    operation: "set_mode without 'set_executable: true'".to_string(),
                })
            }
        }

        let compile = |patterns: Option<Vec<String>>| -> Result<Vec<Pattern>> {
            patterns
                .unwrap_or_default()
                .iter()
                .map(|p| Pattern::new(p).map_err(Error::from))
                .collect()
        };
        Ok(Box::new(Self {
            include: compile(config.get_str_list("include")?)?,
            exclude: compile(config.get_str_list("exclude")?)?,
        }))
    }

    fn matches(&self, rel: &std::path::Path) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| p.matches_path(rel));
        included && !self.exclude.iter().any(|p| p.matches_path(rel))
    }
}

#[async_trait]
impl Step for SetMode {
    fn requires(&self) -> &'static [(&'static str, ValueKind)] {
        &[("path", ValueKind::Path)]
    }

    fn provides(&self) -> &'static [(&'static str, ValueKind)] {
        &[("path", ValueKind::Path)]
    }

    fn describe(&self) -> String {
        "set executable bit on matched files".to_string()
    }

    #[cfg(unix)]
    async fn run(&self, input: StepInput<'_>) -> Result<PipelineContext> {
        use std::os::unix::fs::PermissionsExt;

        let root = input.values.path("path")?;
        for rel in fsutil::list_files(&root)? {
            if !self.matches(&rel) {
                continue;
            }
            let full = root.join(&rel);
            let mut perms = std::fs::metadata(&full)?.permissions();
            perms.set_mode(perms.mode() | 0o111);
            std::fs::set_permissions(&full, perms)?;
            debug!("set executable bit on {}", full.display());
        }

        let mut out = PipelineContext::new();
        out.insert("path", root);
        Ok(out)
    }

    #[cfg(not(unix))]
    async fn run(&self, _input: StepInput<'_>) -> Result<PipelineContext> {
        Err(Error::Unsupported {
            operation: "set_mode on a non-unix platform".to_string(),
        })
    }
}
