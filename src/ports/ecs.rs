//! Container service control-plane port.

use async_trait::async_trait;

use super::ApiError;
use crate::model::{Service, Tag, TaskDefinition};

/// A registered task definition together with its ARN and tags.
#[derive(Debug, Clone)]
pub struct DescribedTaskDefinition {
    /// `arn:...:task-definition/<family>:<revision>`.
    pub arn: String,
    /// The definition as returned by the API, server-assigned fields included.
    pub definition: TaskDefinition,
    /// Tags, which the API reports separately from the definition.
    pub tags: Vec<Tag>,
}

/// Read-only access to task definitions, services and clusters.
#[async_trait]
pub trait EcsApi: Send + Sync {
    /// Describes a task definition by ARN or `family:revision`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when no such revision exists.
    async fn describe_task_definition(&self, arn: &str)
        -> Result<DescribedTaskDefinition, ApiError>;

    /// Returns the ARN of the latest active revision of a family.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the family has no active revision.
    async fn latest_task_definition_arn(&self, family: &str) -> Result<String, ApiError>;

    /// Describes a service in a cluster.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the service does not exist or is inactive.
    async fn describe_service(&self, cluster: &str, service: &str) -> Result<Service, ApiError>;

    /// Returns the ARNs of the named clusters that exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    async fn describe_clusters(&self, names: &[String]) -> Result<Vec<String>, ApiError>;
}
