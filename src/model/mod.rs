//! Typed task and service definitions.
//!
//! The same types describe the locally authored definition and the one
//! returned by the describe APIs, so both sides can be canonicalized and
//! compared with the same code.

pub mod service;
pub mod task_definition;

use serde::{Deserialize, Serialize};

pub use service::{
    AssignPublicIp, AwsVpcConfiguration, CapacityProviderStrategyItem, DeploymentCircuitBreaker,
    DeploymentConfiguration, LaunchType, LoadBalancer, ManagedEbsVolume, NetworkConfiguration,
    PlacementStrategy, SchedulingStrategy, Service, ServiceVolumeConfiguration,
    VpcLatticeConfiguration,
};
pub use task_definition::{
    Compatibility, ContainerDefinition, CpuArchitecture, EnvironmentFile, KeyValuePair,
    LogConfiguration, MountPoint, NetworkMode, PlacementConstraint, PortMapping,
    ProxyConfiguration, RuntimePlatform, Secret, TaskDefinition, VolumeFrom,
};

/// A resource tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Tag value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Tag {
    /// Creates a tag from a key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: Some(key.into()), value: Some(value.into()) }
    }
}
