//! The `TaskDefinition` check subtree.

use std::collections::BTreeMap;

use super::checkers::{self, LogProbe, TASKS_PRINCIPAL};
use super::platform::normalize_platform;
use super::{VerifyContext, VerifyTarget};
use crate::error::{Error, Result};
use crate::model::{ContainerDefinition, NetworkMode};

pub(super) async fn verify_task_definition(
    cx: &VerifyContext<'_>,
    target: &VerifyTarget<'_>,
) -> Result<()> {
    let td = target.task_definition;
    let iam = cx.services().iam.as_ref();

    if let Some(role) = td.execution_role_arn.as_deref() {
        cx.run_check(&format!("ExecutionRole[{role}]"), || {
            checkers::verify_role(iam, role, TASKS_PRINCIPAL)
        })
        .await?;
    }
    if let Some(role) = td.task_role_arn.as_deref() {
        cx.run_check(&format!("TaskRole[{role}]"), || checkers::verify_role(iam, role, TASKS_PRINCIPAL))
            .await?;
    }

    for container in &td.container_definitions {
        let name = container.name.as_deref().unwrap_or_default();
        cx.run_check(&format!("ContainerDefinition[{name}]"), || {
            verify_container(cx, target, container)
        })
        .await?;
    }
    Ok(())
}

/// Renders log options as `k=v,...` with keys in order.
fn options_label(options: &BTreeMap<String, String>) -> String {
    options.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(",")
}

fn is_fargate(target: &VerifyTarget<'_>) -> bool {
    target.task_definition.is_fargate_only() || target.service.is_some_and(|s| s.is_fargate())
}

async fn verify_container(
    cx: &VerifyContext<'_>,
    target: &VerifyTarget<'_>,
    container: &ContainerDefinition,
) -> Result<()> {
    let td = target.task_definition;
    let services = cx.services();
    let session = cx.session();
    let options = cx.options();

    let image = container.image.as_deref().unwrap_or_default();
    cx.run_check(&format!("Image[{image}]"), move || async move {
        let platform = normalize_platform(td.runtime_platform.as_ref(), is_fargate(target));
        let ecr = match checkers::ecr_region(image) {
            Some(region) => {
                tracing::debug!(image, region = %region, "verify private registry image");
                Some(cx.ecr_client(&region))
            }
            None => {
                tracing::debug!(image, "verify registry image");
                None
            }
        };
        checkers::verify_image(services.registry.as_ref(), ecr.as_deref(), image, platform.as_ref())
            .await
    })
    .await?;

    for (i, secret) in container.secrets.iter().enumerate() {
        let name = secret.name.as_deref().unwrap_or_default();
        if name.is_empty() {
            return Err(Error::Invalid(format!("secrets[{i}] name is missing")));
        }
        let value_from = secret.value_from.as_deref().unwrap_or_default();
        if value_from.is_empty() {
            return Err(Error::Invalid(format!("secrets[{i}] {name} valueFrom is missing")));
        }
        cx.run_check(&format!("Secret {name}[{value_from}]"), || {
            checkers::verify_secret(
                session.secrets_manager.as_ref(),
                session.ssm.as_ref(),
                options.get_secrets,
                value_from,
            )
        })
        .await?;
    }

    if let Some(log) = container.log_configuration.as_ref().filter(|l| l.log_driver == "awslogs") {
        let probe = LogProbe {
            logs: session.logs.as_ref(),
            clock: services.clock.as_ref(),
            id_gen: services.id_gen.as_ref(),
            assumed: cx.identity().is_assumed(),
            put_logs: options.put_logs,
        };
        let container_name = container.name.as_deref().unwrap_or_default();
        cx.run_check(&format!("LogConfiguration[{}]", options_label(&log.options)), || {
            checkers::verify_log_configuration(&probe, container_name, &log.options)
        })
        .await?;
    }

    for file in &container.environment_files {
        cx.run_check(&format!("EnvironmentFile[{} {}]", file.file_type, file.value), || {
            checkers::verify_environment_file(services.s3.as_ref(), file)
        })
        .await?;
    }

    if td.network_mode == Some(NetworkMode::Awsvpc) {
        let mismatch = container
            .port_mappings
            .iter()
            .any(|pm| pm.host_port.is_some() && pm.host_port != pm.container_port);
        if mismatch {
            return Err(Error::Invalid(
                "hostPort must be same as containerPort for awsvpc networkMode".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_option_label_is_sorted() {
        let mut options = BTreeMap::new();
        options.insert("awslogs-region".to_string(), "us-east-1".to_string());
        options.insert("awslogs-group".to_string(), "/ecs/app".to_string());
        assert_eq!(options_label(&options), "awslogs-group=/ecs/app,awslogs-region=us-east-1");
    }
}
