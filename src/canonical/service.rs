//! Service definition canonicalization rules.

use serde::Serialize;
use serde_json::Value;

use crate::model::{
    AssignPublicIp, CapacityProviderStrategyItem, DeploymentCircuitBreaker,
    DeploymentConfiguration, LaunchType, LoadBalancer, NetworkConfiguration, PlacementConstraint,
    PlacementStrategy, SchedulingStrategy, Service, ServiceVolumeConfiguration, Tag,
    VpcLatticeConfiguration,
};

use super::sort_key;

/// The declaration-controlled subset of a service, as compared by `diff`.
///
/// These are the fields an in-place service update can change, plus tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceForDiff {
    /// Capacity provider strategy.
    pub capacity_provider_strategy: Vec<CapacityProviderStrategyItem>,
    /// Deployment parameters.
    pub deployment_configuration: Option<DeploymentConfiguration>,
    /// Desired task count; cleared when the local side leaves it unset.
    pub desired_count: Option<i32>,
    /// Managed tags.
    #[serde(rename = "enableECSManagedTags")]
    pub enable_ecs_managed_tags: bool,
    /// ECS Exec.
    pub enable_execute_command: bool,
    /// Health check grace period.
    pub health_check_grace_period_seconds: Option<i32>,
    /// Load balancer bindings.
    pub load_balancers: Vec<LoadBalancer>,
    /// Network configuration.
    pub network_configuration: Option<NetworkConfiguration>,
    /// Placement constraints.
    pub placement_constraints: Vec<PlacementConstraint>,
    /// Placement strategies.
    pub placement_strategy: Vec<PlacementStrategy>,
    /// Platform version.
    pub platform_version: Option<String>,
    /// Tag propagation.
    pub propagate_tags: Option<String>,
    /// Service discovery registries.
    pub service_registries: Vec<Value>,
    /// Service connect settings.
    pub service_connect_configuration: Option<Value>,
    /// Deployment-time volumes.
    pub volume_configurations: Vec<ServiceVolumeConfiguration>,
    /// VPC Lattice registrations.
    pub vpc_lattice_configurations: Vec<VpcLatticeConfiguration>,
    /// Resource tags.
    pub tags: Vec<Tag>,
}

/// Canonicalizes a service in place and projects it to its diffable form.
///
/// Fills the defaults the API applies on creation (platform version,
/// scheduling strategy, deployment configuration, public IP assignment) and
/// sorts every order-insensitive collection.
pub fn canonicalize_service(sv: &mut Service) -> ServiceForDiff {
    sv.placement_constraints.sort_by_cached_key(sort_key);
    sv.placement_strategy.sort_by_cached_key(sort_key);
    sv.tags.sort_by(|a, b| a.key.cmp(&b.key));

    if sv.launch_type == Some(LaunchType::Fargate) && sv.platform_version.is_none() {
        sv.platform_version = Some("LATEST".to_string());
    }

    match sv.scheduling_strategy {
        None | Some(SchedulingStrategy::Replica) => {
            sv.scheduling_strategy = Some(SchedulingStrategy::Replica);
            match sv.deployment_configuration.as_mut() {
                None => {
                    sv.deployment_configuration = Some(DeploymentConfiguration {
                        deployment_circuit_breaker: Some(DeploymentCircuitBreaker::default()),
                        maximum_percent: Some(200),
                        minimum_healthy_percent: Some(100),
                        alarms: None,
                    });
                }
                Some(dc) if dc.deployment_circuit_breaker.is_none() => {
                    dc.deployment_circuit_breaker = Some(DeploymentCircuitBreaker::default());
                }
                Some(_) => {}
            }
        }
        Some(SchedulingStrategy::Daemon) => {
            if sv.deployment_configuration.is_none() {
                sv.deployment_configuration = Some(DeploymentConfiguration {
                    deployment_circuit_breaker: None,
                    maximum_percent: Some(100),
                    minimum_healthy_percent: Some(0),
                    alarms: None,
                });
            }
        }
    }

    if let Some(vpc) =
        sv.network_configuration.as_mut().and_then(|nc| nc.awsvpc_configuration.as_mut())
    {
        vpc.assign_public_ip.get_or_insert(AssignPublicIp::Disabled);
        vpc.security_groups.sort();
        vpc.subnets.sort();
    }

    ServiceForDiff {
        capacity_provider_strategy: sv.capacity_provider_strategy.clone(),
        deployment_configuration: sv.deployment_configuration.clone(),
        desired_count: sv.desired_count,
        enable_ecs_managed_tags: sv.enable_ecs_managed_tags.unwrap_or(false),
        enable_execute_command: sv.enable_execute_command.unwrap_or(false),
        health_check_grace_period_seconds: sv.health_check_grace_period_seconds,
        load_balancers: sv.load_balancers.clone(),
        network_configuration: sv.network_configuration.clone(),
        placement_constraints: sv.placement_constraints.clone(),
        placement_strategy: sv.placement_strategy.clone(),
        platform_version: sv.platform_version.clone(),
        propagate_tags: sv.propagate_tags.clone(),
        service_registries: sv.service_registries.clone(),
        service_connect_configuration: sv.service_connect_configuration.clone(),
        volume_configurations: sv.volume_configurations.clone(),
        vpc_lattice_configurations: sv.vpc_lattice_configurations.clone(),
        tags: sv.tags.clone(),
    }
}
