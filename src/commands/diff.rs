//! `ecs-reconcile diff` command.

use std::io::Write;

use crate::cli::DiffArgs;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::diff::{DiffEngine, DiffOptions, DiffPresentation, DiffReport};
use crate::error::{Error, Result};
use crate::loader::DefinitionLoader;
use crate::model::Service;
use crate::ports::{ApiError, DescribedTaskDefinition};

fn presentation(args: &DiffArgs) -> DiffPresentation {
    match args.external.as_deref().map(str::trim) {
        Some(command) if !command.is_empty() => DiffPresentation::External(command.to_string()),
        _ if args.no_unified => DiffPresentation::Simple,
        _ => DiffPresentation::Unified,
    }
}

fn found<T>(result: std::result::Result<T, ApiError>, context: String) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::NotFound(_)) => Ok(None),
        Err(e) => Err(Error::api(context, e)),
    }
}

fn emit(out: &mut (dyn Write + Send), report: &DiffReport) -> Result<()> {
    if report.changed {
        out.write_all(report.text.as_bytes())
            .map_err(|e| Error::io("failed to write diff", &e))?;
    }
    Ok(())
}

/// Execute the `diff` command, writing any differences to `out`.
///
/// The service is compared first when a service definition is configured.
/// The task definition is then compared against the revision the service
/// runs, or the latest revision of its family when there is no service.
///
/// # Errors
///
/// Returns an error if a definition cannot be loaded, a remote lookup fails
/// for a reason other than absence, or rendering fails.
pub async fn run(
    services: &ServiceContext,
    config: &Config,
    args: &DiffArgs,
    color: bool,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    let engine = DiffEngine::new(services, DiffOptions { presentation: presentation(args), color });
    let loader = DefinitionLoader::new(services);
    let local_td = loader.task_definition(&config.task_definition)?;

    let mut deployed_td = None;
    if let Some(path) = &config.service_definition {
        let local_sv = loader.service(path)?;
        let name = service_name(config, &local_sv)?;
        tracing::info!(cluster = %config.cluster, service = %name, "comparing service");
        let remote_sv = found(
            services.ecs.describe_service(&config.cluster, &name).await,
            format!("failed to describe service {name}"),
        )?;
        deployed_td = remote_sv.as_ref().and_then(|s| s.task_definition.clone());
        let report = engine.services(local_sv, remote_sv, &path.display().to_string()).await?;
        emit(out, &report)?;
    }

    let remote_arn = match (deployed_td, local_td.family.as_deref()) {
        (Some(arn), _) => Some(arn),
        (None, Some(family)) => found(
            services.ecs.latest_task_definition_arn(family).await,
            format!("failed to list task definitions of {family}"),
        )?,
        (None, None) => None,
    };
    let remote_td: Option<DescribedTaskDefinition> = match remote_arn {
        Some(arn) => {
            tracing::info!(task_definition = %arn, "comparing task definition");
            found(
                services.ecs.describe_task_definition(&arn).await,
                format!("failed to describe task definition {arn}"),
            )?
        }
        None => None,
    };
    let label = config.task_definition.display().to_string();
    let report = engine.task_definitions(local_td, remote_td.as_ref(), &label).await?;
    emit(out, &report)
}

fn service_name(config: &Config, local: &Service) -> Result<String> {
    config.service.clone().or_else(|| local.service_name.clone()).ok_or_else(|| {
        Error::Config("service name is not defined in config or service definition".into())
    })
}
