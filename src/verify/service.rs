//! The `ServiceDefinition` check subtree.

use super::checkers::{self, SERVICE_PRINCIPAL};
use super::{VerifyContext, VerifyTarget};
use crate::error::{Error, Result};
use crate::model::{LoadBalancer, NetworkMode, TaskDefinition};

pub(super) async fn verify_service_definition(
    cx: &VerifyContext<'_>,
    target: &VerifyTarget<'_>,
) -> Result<()> {
    let Some(sv) = target.service else {
        return Err(Error::SkipVerify("no ServiceDefinition".to_string()));
    };
    let td = target.task_definition;
    let services = cx.services();

    if td.network_mode == Some(NetworkMode::Awsvpc)
        && sv.network_configuration.as_ref().and_then(|n| n.awsvpc_configuration.as_ref()).is_none()
    {
        return Err(Error::Invalid(
            "networkConfiguration.awsvpcConfiguration required for the taskDefinition networkMode=awsvpc"
                .to_string(),
        ));
    }

    for (i, lb) in sv.load_balancers.iter().enumerate() {
        cx.run_check(&format!("LoadBalancer[{i}]"), move || async move {
            let arn = lb.target_group_arn.as_deref().unwrap_or_default();
            checkers::verify_target_group(services.elbv2.as_ref(), arn).await?;
            check_container_port(td, lb)
        })
        .await?;
    }
    if sv.load_balancers.is_empty() && sv.health_check_grace_period_seconds.is_some() {
        return Err(Error::Invalid(
            "service has no load balancers, but healthCheckGracePeriodSeconds is defined"
                .to_string(),
        ));
    }

    let iam = services.iam.as_ref();
    for (i, vc) in sv.volume_configurations.iter().enumerate() {
        let name = format!("VolumeConfigurations[{i}]");
        let label = name.as_str();
        cx.run_check(label, move || async move {
            let Some(ebs) = &vc.managed_ebs_volume else {
                return Ok(());
            };
            if ebs.tag_specifications.len() > 1 {
                tracing::warn!(
                    "{label} has more than one tag specifications. Only the first tag specification is used."
                );
            }
            let role = ebs.role_arn.as_deref().unwrap_or_default();
            cx.run_check(&format!("RoleArn[{role}]"), || {
                checkers::verify_role(iam, role, SERVICE_PRINCIPAL)
            })
            .await
        })
        .await?;
    }

    for (i, lc) in sv.vpc_lattice_configurations.iter().enumerate() {
        cx.run_check(&format!("VpcLatticeConfiguration[{i}]"), move || async move {
            let role = lc.role_arn.as_deref().unwrap_or_default();
            cx.run_check(&format!("RoleArn[{role}]"), || {
                checkers::verify_role(iam, role, SERVICE_PRINCIPAL)
            })
            .await?;

            let tg = lc.target_group_arn.as_deref().unwrap_or_default();
            cx.run_check(&format!("TargetGroup[{tg}]"), || {
                checkers::verify_lattice_target_group(services.lattice.as_ref(), tg)
            })
            .await?;

            let port_name = lc.port_name.as_deref().unwrap_or_default();
            cx.run_check(&format!("PortName[{port_name}]"), move || async move {
                check_port_name(td, port_name)
            })
            .await
        })
        .await?;
    }
    Ok(())
}

/// Requires the load balancer's container name and port to be declared by
/// one container of the task definition.
fn check_container_port(td: &TaskDefinition, lb: &LoadBalancer) -> Result<()> {
    let name = lb.container_name.as_deref().unwrap_or_default();
    let port = lb.container_port.unwrap_or_default();
    let declared = td.container_definitions.iter().any(|c| {
        c.name.as_deref() == Some(name)
            && c.port_mappings.iter().any(|pm| pm.container_port.unwrap_or_default() == port)
    });
    if declared {
        Ok(())
    } else {
        Err(Error::Invalid(format!(
            "container name {name} and port {port} is not defined in task definition"
        )))
    }
}

/// Resolves a port name against the port mappings of all containers.
fn check_port_name(td: &TaskDefinition, port_name: &str) -> Result<()> {
    if port_name.is_empty() {
        return Err(Error::Invalid("portName is required for vpcLatticeConfiguration".to_string()));
    }
    let found = td
        .container_definitions
        .iter()
        .flat_map(|c| &c.port_mappings)
        .any(|pm| pm.name.as_deref() == Some(port_name));
    if found {
        Ok(())
    } else {
        Err(Error::Invalid(format!("portName {port_name} is not found in any containerDefinitions")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_definition() -> TaskDefinition {
        serde_json::from_value(serde_json::json!({
            "family": "app",
            "containerDefinitions": [
                {"name": "web", "portMappings": [{"containerPort": 80, "name": "http"}]},
                {"name": "sidecar", "portMappings": [{"containerPort": 9000}]}
            ]
        }))
        .unwrap()
    }

    fn lb(name: &str, port: i32) -> LoadBalancer {
        LoadBalancer {
            target_group_arn: None,
            load_balancer_name: None,
            container_name: Some(name.to_string()),
            container_port: Some(port),
        }
    }

    #[test]
    fn load_balancer_binding_must_match_a_container_port() {
        let td = task_definition();
        check_container_port(&td, &lb("web", 80)).unwrap();
        let err = check_container_port(&td, &lb("web", 9000)).unwrap_err();
        assert_eq!(err.to_string(), "container name web and port 9000 is not defined in task definition");
    }

    #[test]
    fn port_names_resolve_across_containers() {
        let td = task_definition();
        check_port_name(&td, "http").unwrap();
        assert_eq!(
            check_port_name(&td, "grpc").unwrap_err().to_string(),
            "portName grpc is not found in any containerDefinitions"
        );
        assert_eq!(
            check_port_name(&td, "").unwrap_err().to_string(),
            "portName is required for vpcLatticeConfiguration"
        );
    }
}
