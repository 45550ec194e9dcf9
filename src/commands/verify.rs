//! `ecs-reconcile verify` command.

use std::io::Write;

use crate::canonical::{canonicalize_service, canonicalize_task_definition};
use crate::cli::VerifyArgs;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::loader::DefinitionLoader;
use crate::model::{Service, TaskDefinition};
use crate::verify::{resolve_identity, verify, VerifyContext, VerifyOptions, VerifyTarget};

impl From<&VerifyArgs> for VerifyOptions {
    fn from(args: &VerifyArgs) -> Self {
        Self {
            get_secrets: !args.no_get_secrets,
            put_logs: !args.no_put_logs,
            cache: !args.no_cache,
        }
    }
}

/// Loads the configured definitions in the canonical form `diff` compares.
fn load_definitions(
    services: &ServiceContext,
    config: &Config,
) -> Result<(TaskDefinition, Option<Service>)> {
    let loader = DefinitionLoader::new(services);
    let mut task_definition = loader.task_definition(&config.task_definition)?;
    canonicalize_task_definition(&mut task_definition);
    let mut service =
        config.service_definition.as_deref().map(|p| loader.service(p)).transpose()?;
    if let Some(sv) = service.as_mut() {
        canonicalize_service(sv);
    }
    Ok((task_definition, service))
}

/// Execute the `verify` command, writing check lines to `out`.
///
/// # Errors
///
/// Returns an error if a definition cannot be loaded or a check fails.
pub async fn run(
    services: &ServiceContext,
    config: &Config,
    args: &VerifyArgs,
    color: bool,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    let (task_definition, service) = load_definitions(services, config)?;
    let execution_role = task_definition.execution_role_arn.as_deref();
    let identity = resolve_identity(services.sts.as_ref(), execution_role).await;
    let cx = VerifyContext::new(services, identity, args.into()).with_output(out, color);
    let target = VerifyTarget {
        task_definition: &task_definition,
        service: service.as_ref(),
        cluster: &config.cluster,
    };
    verify(&cx, &target).await
}
