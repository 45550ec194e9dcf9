//! Loading local task and service definitions.
//!
//! Files ending in `.yaml` or `.yml` are read as YAML, everything else as
//! JSON. All reads go through the `FileSystem` port.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::model::{Service, TaskDefinition};
use crate::ports::FileSystem;

/// Reads definitions from local files.
pub struct DefinitionLoader<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> DefinitionLoader<'a> {
    /// Creates a loader reading through `services.fs`.
    #[must_use]
    pub fn new(services: &'a ServiceContext) -> Self {
        Self { fs: services.fs.as_ref() }
    }

    /// Loads a task definition in its registrable form.
    ///
    /// A document wrapped as `{"taskDefinition": {...}}` is unwrapped, and
    /// server-assigned fields are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or is not a task
    /// definition.
    pub fn task_definition(&self, path: &Path) -> Result<TaskDefinition> {
        let mut doc = self.document(path)?;
        if let Some(inner) = doc.get_mut("taskDefinition").map(Value::take) {
            doc = inner;
        }
        let mut td: TaskDefinition = decode(path, doc)?;
        let tags = std::mem::take(&mut td.tags);
        Ok(td.into_register_input(tags))
    }

    /// Loads a service definition.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or is not a service
    /// definition.
    pub fn service(&self, path: &Path) -> Result<Service> {
        let doc = self.document(path)?;
        decode(path, doc)
    }

    fn document(&self, path: &Path) -> Result<Value> {
        let text = self
            .fs
            .read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), &e))?;
        let yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"));
        let parsed = if yaml {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }
}

fn decode<T: DeserializeOwned>(path: &Path, doc: Value) -> Result<T> {
    serde_json::from_value(doc)
        .map_err(|e| Error::Config(format!("invalid definition in {}: {e}", path.display())))
}
