//! The remote state served by the fixture adapter.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{Service, Tag, TaskDefinition};

/// A registered task definition revision.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredTaskDefinition {
    /// Full ARN, ending in `task-definition/<family>:<revision>`.
    pub arn: String,
    /// The definition as the describe API returns it.
    pub definition: TaskDefinition,
    /// Resource tags.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl RegisteredTaskDefinition {
    /// Returns `(family, revision)` parsed from the ARN.
    #[must_use]
    pub fn family_revision(&self) -> Option<(&str, u32)> {
        let tail = self.arn.rsplit_once("task-definition/").map_or(self.arn.as_str(), |(_, t)| t);
        let (family, revision) = tail.rsplit_once(':')?;
        Some((family, revision.parse().ok()?))
    }
}

/// A cluster and its services.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterState {
    /// Cluster ARN; derived from the name when omitted.
    pub arn: Option<String>,
    /// Services by name.
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

/// Everything the fixture knows about the remote side.
///
/// Loaded from YAML; every collection may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteState {
    /// Clusters by name.
    pub clusters: BTreeMap<String, ClusterState>,
    /// Registered task definition revisions.
    pub task_definitions: Vec<RegisteredTaskDefinition>,
    /// IAM role trust policies by role name, as plain JSON documents.
    pub roles: BTreeMap<String, Value>,
    /// Existing load balancer target group ARNs.
    pub target_groups: Vec<String>,
    /// Existing VPC Lattice target group identifiers.
    pub lattice_target_groups: Vec<String>,
    /// Secret string values by secret ARN or name.
    pub secrets: BTreeMap<String, String>,
    /// Existing Parameter Store names.
    pub parameters: Vec<String>,
    /// Existing S3 objects as `bucket/key`.
    pub objects: Vec<String>,
    /// Log groups and the streams in them.
    pub log_groups: BTreeMap<String, Vec<String>>,
    /// Image platforms (`os/arch`) by `host/name:tag`.
    pub images: BTreeMap<String, Vec<String>>,
    /// Images whose registry only serves schema 1 manifests.
    pub deprecated_images: Vec<String>,
    /// Refuse every role assumption.
    pub deny_assume_role: bool,
    /// Refuse log group creation.
    pub deny_create_log_group: bool,
}

impl RemoteState {
    /// Parses a YAML remote state document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the document does not parse.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::Config(format!("invalid remote state: {e}")))
    }

    /// Reads a YAML remote state file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be read, or
    /// [`Error::Config`] when it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), &e))?;
        Self::from_yaml(&text)
    }
}
