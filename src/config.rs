//! # Step Descriptors and Layout Configuration
//!
//! This module defines the declarative format the external resolver hands
//! to the pipeline compiler: an ordered list of step descriptors, each a
//! `type` naming a catalog variant plus that variant's config keys. The
//! descriptors are plain data; all validation happens in the compiler and
//! the step constructors.
//!
//! It also defines `Layout`, the injected set of fixed filesystem
//! constants (cache root, workspace root, metadata subfolder name, marker
//! filename). These are passed explicitly to the compiler rather than read
//! from ambient global state.
//!
//! ## Descriptor format
//!
//! ```yaml
//! - type: git-clone
//!   url: https://example.com/tool.git
//! - type: file_filter
//!   include:
//!     - "bin/*"
//!     - "*.md"
//! - type: merge_into
//!   merge_strategy: default
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::defaults;
use crate::error::{Error, Result};

/// One declarative pipeline step: a catalog type name plus step-specific
/// config keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDescriptor {
    /// The catalog name of the step variant (e.g. `git-clone`).
    #[serde(rename = "type")]
    pub kind: String,
    /// All remaining keys, interpreted by the step variant itself.
    #[serde(flatten)]
    pub config: StepConfig,
}

impl StepDescriptor {
    /// Build a descriptor programmatically, mainly for tests and embedding
    /// callers that do not go through YAML.
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            config: StepConfig::default(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_yaml::Value>) -> Self {
        self.config
            .entries
            .insert(key.to_string(), value.into());
        self
    }
}

/// The config mapping of a single step descriptor.
///
/// Values stay as raw YAML until the owning step variant interprets them;
/// the typed getters below produce descriptor-parse errors with hints when
/// a key has the wrong shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepConfig {
    entries: BTreeMap<String, serde_yaml::Value>,
}

impl StepConfig {
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The config key names, used by the compiler when deciding whether a
    /// declared input is satisfied locally.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// An optional string-valued key.
    pub fn get_str(&self, key: &str) -> Result<Option<String>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(serde_yaml::Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.shape_error(key, "a string", other)),
        }
    }

    /// An optional boolean-valued key.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(serde_yaml::Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.shape_error(key, "a boolean", other)),
        }
    }

    /// An optional list-of-strings key.
    pub fn get_str_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(serde_yaml::Value::Sequence(seq)) => {
                let mut out = Vec::with_capacity(seq.len());
                for item in seq {
                    match item {
                        serde_yaml::Value::String(s) => out.push(s.clone()),
                        other => return Err(self.shape_error(key, "a list of strings", other)),
                    }
                }
                Ok(Some(out))
            }
            Some(other) => Err(self.shape_error(key, "a list of strings", other)),
        }
    }

    /// An optional string-to-string mapping key.
    pub fn get_str_map(&self, key: &str) -> Result<Option<BTreeMap<String, String>>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(serde_yaml::Value::Mapping(map)) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    match (k, v) {
                        (serde_yaml::Value::String(k), serde_yaml::Value::String(v)) => {
                            out.insert(k.clone(), v.clone());
                        }
                        _ => {
                            return Err(self.shape_error(key, "a string-to-string mapping", v));
                        }
                    }
                }
                Ok(Some(out))
            }
            Some(other) => Err(self.shape_error(key, "a string-to-string mapping", other)),
        }
    }

    /// A mandatory string-valued key.
    pub fn require_str(&self, key: &str) -> Result<String> {
        self.get_str(key)?.ok_or_else(|| Error::DescriptorParse {
            message: format!("missing required config key '{}'", key),
            hint: Some(format!("add '{}:' to the step block", key)),
        })
    }

    fn shape_error(&self, key: &str, expected: &str, got: &serde_yaml::Value) -> Error {
        Error::DescriptorParse {
            message: format!(
                "config key '{}' must be {}, got {}",
                key,
                expected,
                yaml_kind(got)
            ),
            hint: None,
        }
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a list",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

/// Parse a YAML document into an ordered list of step descriptors.
pub fn parse(content: &str) -> Result<Vec<StepDescriptor>> {
    let descriptors: Vec<StepDescriptor> =
        serde_yaml::from_str(content).map_err(|e| Error::DescriptorParse {
            message: e.to_string(),
            hint: Some(
                "expected a YAML list of steps, each with a 'type:' key".to_string(),
            ),
        })?;
    Ok(descriptors)
}

/// Fixed filesystem constants injected into the pipeline.
///
/// Everything the pipeline writes lives under these roots; the metadata
/// subfolder and marker names drive the target safety guard.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Root of the persistent, cross-run repository cache.
    pub cache_root: PathBuf,
    /// Root under which per-run ephemeral workspaces are created.
    pub workspace_root: PathBuf,
    /// Name of the metadata subfolder inside managed target directories.
    pub metadata_dir: String,
    /// Name of the sentinel marker file denoting a tool-owned directory.
    pub marker_file: String,
}

impl Layout {
    pub fn new(cache_root: PathBuf, workspace_root: PathBuf) -> Self {
        Self {
            cache_root,
            workspace_root,
            metadata_dir: defaults::METADATA_DIR.to_string(),
            marker_file: defaults::MARKER_FILE.to_string(),
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(defaults::default_cache_root(), defaults::default_workspace_root())
    }
}
