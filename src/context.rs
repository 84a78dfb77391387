//! # Pipeline Context
//!
//! The context is an insertion-ordered mapping from value name to value,
//! threaded step-to-step through a pipeline run. Steps declare which keys
//! they read (`requires`) and which they publish (`provides`); a later
//! step's published entries overwrite same-named keys from earlier steps.
//!
//! Values are deliberately simple: text, a filesystem path, or a nested
//! mapping. Type tags (`ValueKind`) document each step's contract; shape
//! checks happen when a step coerces a value, not at insertion.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Type tag for a declared step input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free-form text (URLs, version strings, variable values).
    Text,
    /// A filesystem path.
    Path,
    /// A nested name-to-value mapping.
    Map,
}

/// A single named value carried through the pipeline context.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Path(PathBuf),
    Map(IndexMap<String, Value>),
}

impl Value {
    /// The type tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Path(_) => ValueKind::Path,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// Borrow as text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce to a path. Text values are accepted as paths since initial
    /// variables arrive as plain strings from the external resolver.
    pub fn as_path(&self) -> Option<PathBuf> {
        match self {
            Value::Path(p) => Some(p.clone()),
            Value::Text(s) if !s.is_empty() => Some(PathBuf::from(s)),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl From<&Path> for Value {
    fn from(p: &Path) -> Self {
        Value::Path(p.to_path_buf())
    }
}

/// Insertion-ordered mapping of named values threaded between steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineContext {
    values: IndexMap<String, Value>,
}

impl PipelineContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, overwriting any existing entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// The names currently present, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a new context holding only the named keys that are present.
    ///
    /// Used by the executor to hand each step exactly its declared inputs
    /// and nothing else. Keys satisfied from step config rather than the
    /// context are simply absent from the extraction.
    pub fn extract(&self, names: &[&str]) -> PipelineContext {
        let mut subset = PipelineContext::new();
        for name in names {
            if let Some(value) = self.values.get(*name) {
                subset.insert(*name, value.clone());
            }
        }
        subset
    }

    /// Merge another context's entries into this one, overwriting
    /// same-named keys.
    pub fn merge(&mut self, other: PipelineContext) {
        for (name, value) in other.values {
            self.values.insert(name, value);
        }
    }

    /// Fetch a required text value, failing with a descriptive error.
    pub fn text(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(value) => value.as_text().ok_or_else(|| Error::ContextValue {
                message: format!("'{}' is not a text value", name),
            }),
            None => Err(Error::ContextValue {
                message: format!("missing context value '{}'", name),
            }),
        }
    }

    /// Fetch a required path value, failing with a descriptive error.
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        match self.values.get(name) {
            Some(value) => value.as_path().ok_or_else(|| Error::ContextValue {
                message: format!("'{}' is not a usable path", name),
            }),
            None => Err(Error::ContextValue {
                message: format!("missing context value '{}'", name),
            }),
        }
    }
}

impl FromIterator<(String, Value)> for PipelineContext {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
