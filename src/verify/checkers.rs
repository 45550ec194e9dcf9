//! Leaf resource checks.
//!
//! Each checker is a plain function over explicit inputs: the client
//! handles it probes with and the definition fragment it validates. None of
//! them know about caching or output; the engine in `verify::mod` wraps them.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::arn::{extract_role_name, Arn};
use super::platform::Platform;
use crate::error::{Error, Result};
use crate::model::EnvironmentFile;
use crate::ports::{
    ApiError, Clock, EcrApi, EcsApi, Elbv2Api, IamApi, IdGenerator, LatticeApi, LogEvent, LogsApi,
    RegistryApi, RegistryCredentials, Repository, S3Api, SecretsManagerApi, SsmApi,
};

/// Trust principal for task and execution roles.
pub const TASKS_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";
/// Trust principal for infrastructure roles (EBS volumes, VPC Lattice).
pub const SERVICE_PRINCIPAL: &str = "ecs.amazonaws.com";

// {account}.dkr.ecr.{region}.amazonaws.com/{repository}
static ECR_IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)\.dkr\.ecr\.([0-9a-zA-Z-]+)\.amazonaws\.com/.*").expect("valid regex")
});

/// Returns the region of a private registry image reference, if it is one.
#[must_use]
pub fn ecr_region(image: &str) -> Option<String> {
    ECR_IMAGE_URL.captures(image).map(|c| c[2].to_string())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn contains(&self, value: &str) -> bool {
        match self {
            Self::One(v) => v == value,
            Self::Many(vs) => vs.iter().any(|v| v == value),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Principal {
    #[serde(rename = "Service")]
    service: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
struct Statement {
    #[serde(rename = "Principal", default)]
    principal: Principal,
    #[serde(rename = "Action")]
    action: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
struct PolicyDocument {
    #[serde(rename = "Statement", default)]
    statement: Vec<Statement>,
}

fn parse_policy_document(encoded: &str) -> Result<PolicyDocument> {
    let decoded = urlencoding::decode(encoded)
        .map_err(|e| Error::Invalid(format!("failed to parse IAM policy document: {e}")))?;
    serde_json::from_str(&decoded)
        .map_err(|e| Error::Invalid(format!("failed to parse IAM policy document: {e}")))
}

/// Verifies that a role exists and trusts `principal` to assume it.
///
/// # Errors
///
/// Fails when the ARN is malformed, the role cannot be fetched, its trust
/// policy does not parse, or no statement grants `sts:AssumeRole` to the
/// principal.
pub async fn verify_role(iam: &dyn IamApi, role_arn: &str, principal: &str) -> Result<()> {
    let name = extract_role_name(role_arn)?;
    let role = iam
        .get_role(&name)
        .await
        .map_err(|e| Error::api(format!("failed to get role {name}"), e))?;
    let doc = parse_policy_document(&role.assume_role_policy_document)?;
    let trusted = doc.statement.iter().any(|st| {
        st.principal.service.as_ref().is_some_and(|s| s.contains(principal))
            && st.action.as_ref().is_some_and(|a| a.contains("sts:AssumeRole"))
    });
    if trusted {
        Ok(())
    } else {
        Err(Error::Invalid(format!("role {name} has not a valid policy document")))
    }
}

/// Verifies that a secret reference resolves.
///
/// Secrets Manager ARNs are truncated to the secret's own ARN; a JSON key
/// suffix must name a member of the secret's JSON value. Anything else is a
/// Parameter Store name or ARN.
///
/// # Errors
///
/// Skips when `enabled` is false; fails when the secret or key is missing.
pub async fn verify_secret(
    secrets_manager: &dyn SecretsManagerApi,
    ssm: &dyn SsmApi,
    enabled: bool,
    value_from: &str,
) -> Result<()> {
    if !enabled {
        return Err(Error::SkipVerify(format!("get a secret value for {value_from}")));
    }

    let arn = Arn::parse(value_from).ok();
    if arn.as_ref().is_some_and(|a| a.service == "secretsmanager") {
        let parts: Vec<&str> = value_from.split(':').collect();
        if parts.len() < 7 {
            return Err(Error::Invalid("invalid arn format".to_string()));
        }
        let secret_arn = parts[..7].join(":");
        let value = secrets_manager.get_secret_value(&secret_arn).await.map_err(|e| {
            Error::api(
                format!("failed to get secret value from {value_from} secret id {secret_arn}"),
                e,
            )
        })?;
        let key = parts.get(7).copied().unwrap_or_default();
        if key.is_empty() {
            return Ok(());
        }
        let Some(value) = value else {
            return Err(Error::Invalid(format!(
                "secret {secret_arn} has no string value to look up key {key}"
            )));
        };
        let members: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&value)
            .map_err(|e| {
                Error::Invalid(format!(
                    "failed to parse secret string from {value_from} secret id {secret_arn}: {e}"
                ))
            })?;
        if !members.contains_key(key) {
            return Err(Error::Invalid(format!(
                "failed to find key {key} on secret json value from {value_from} secret id {secret_arn}"
            )));
        }
        return Ok(());
    }

    let name = match arn {
        Some(arn) if arn.service == "ssm" => {
            let last = value_from.rsplit(':').next().unwrap_or_default();
            last.strip_prefix("parameter").unwrap_or(last).to_string()
        }
        _ => value_from.to_string(),
    };
    let out = ssm
        .get_parameters(std::slice::from_ref(&name))
        .await
        .map_err(|e| Error::api(format!("failed to get ssm parameters {name}"), e))?;
    if out.found.is_empty() || !out.invalid.is_empty() {
        return Err(Error::Invalid(format!("ssm parameter {name} is not found")));
    }
    Ok(())
}

/// Inputs of the log delivery probe.
pub struct LogProbe<'a> {
    /// Logs client under the verification identity.
    pub logs: &'a dyn LogsApi,
    /// Probe event timestamps.
    pub clock: &'a dyn Clock,
    /// Log stream suffixes.
    pub id_gen: &'a dyn IdGenerator,
    /// Whether the identity is an assumed execution-role session.
    pub assumed: bool,
    /// Whether the probe may write.
    pub put_logs: bool,
}

/// Verifies an `awslogs` log configuration by writing one probe event.
///
/// # Errors
///
/// Fails on missing required options or when the stream or event cannot be
/// written; skips when writing is disabled. A log group creation failure
/// is fatal only under an assumed identity.
pub async fn verify_log_configuration(
    probe: &LogProbe<'_>,
    container: &str,
    options: &BTreeMap<String, String>,
) -> Result<()> {
    let option = |k: &str| options.get(k).map(String::as_str).unwrap_or_default();
    let (group, region, prefix) =
        (option("awslogs-group"), option("awslogs-region"), option("awslogs-stream-prefix"));
    tracing::debug!(?options, "LogConfiguration[awslogs]");
    if group.is_empty() {
        return Err(Error::Invalid("awslogs-group is required".to_string()));
    }
    if region.is_empty() {
        return Err(Error::Invalid("awslogs-region is required".to_string()));
    }
    if !probe.put_logs {
        return Err(Error::SkipVerify(format!("putting logs to {group}")));
    }

    if option("awslogs-create-group") == "true" {
        match probe.logs.create_log_group(group).await {
            Ok(()) => tracing::info!(group, "created log group"),
            Err(ApiError::AlreadyExists(_)) => {
                tracing::debug!(group, "log group already exists, ignored");
            }
            Err(e) if probe.assumed => {
                return Err(Error::api(format!("failed to create log group {group}"), e));
            }
            Err(e) => tracing::warn!(group, error = %e, "failed to create log group"),
        }
    }

    let suffix = probe.id_gen.stream_suffix();
    let stream = if prefix.is_empty() {
        format!("{container}/ecs-reconcile-verify-{suffix}")
    } else {
        format!("{prefix}/{container}/ecs-reconcile-verify-{suffix}")
    };
    probe
        .logs
        .create_log_stream(group, &stream)
        .await
        .map_err(|e| Error::api(format!("failed to create log stream {stream} in {group}"), e))?;
    let event = LogEvent {
        message: "This is a verify message by ecs-reconcile".to_string(),
        timestamp: probe.clock.now().timestamp_millis(),
    };
    probe
        .logs
        .put_log_events(group, &stream, &[event])
        .await
        .map_err(|e| Error::api(format!("failed to put log events to {group} stream {stream}"), e))
}

/// Verifies that an S3-backed environment file exists.
///
/// # Errors
///
/// Skips non-S3 file types; fails on malformed ARNs or a missing object.
pub async fn verify_environment_file(s3: &dyn S3Api, file: &EnvironmentFile) -> Result<()> {
    if file.file_type != "s3" {
        return Err(Error::SkipVerify(format!(
            "unsupported environment file type: {}",
            file.file_type
        )));
    }
    let s3_arn = file.value.as_str();
    let arn = Arn::parse(s3_arn)
        .map_err(|e| Error::Invalid(format!("failed to parse s3 arn {s3_arn}: {e}")))?;
    if arn.service != "s3" {
        return Err(Error::Invalid(format!("invalid s3 arn {s3_arn}")));
    }
    let Some((bucket, key)) = arn.resource.split_once('/') else {
        return Err(Error::Invalid(format!("invalid s3 arn {s3_arn}")));
    };
    s3.head_object(bucket, key)
        .await
        .map_err(|e| Error::api(format!("failed to head s3 object {s3_arn}"), e))
}

/// Verifies that the cluster exists.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when no cluster matches.
pub async fn verify_cluster(ecs: &dyn EcsApi, cluster: &str) -> Result<()> {
    let found = ecs
        .describe_clusters(&[cluster.to_string()])
        .await
        .map_err(|e| Error::api(format!("failed to describe cluster {cluster}"), e))?;
    if found.is_empty() {
        return Err(Error::NotFound(format!("cluster {cluster} is not found")));
    }
    Ok(())
}

/// Verifies that a load balancer target group exists.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when the target group does not exist.
pub async fn verify_target_group(elbv2: &dyn Elbv2Api, arn: &str) -> Result<()> {
    let found = elbv2
        .describe_target_groups(&[arn.to_string()])
        .await
        .map_err(|e| Error::api(format!("failed to describe target group {arn}"), e))?;
    if found.is_empty() {
        return Err(Error::NotFound(format!("target group {arn} is not found")));
    }
    Ok(())
}

/// Verifies that a VPC Lattice target group exists.
///
/// # Errors
///
/// Propagates the lookup failure.
pub async fn verify_lattice_target_group(lattice: &dyn LatticeApi, id: &str) -> Result<()> {
    lattice
        .get_target_group(id)
        .await
        .map(|_| ())
        .map_err(|e| Error::api(format!("failed to get target group {id}"), e))
}

fn registry_error(err: ApiError, context: String) -> Error {
    match err {
        ApiError::DeprecatedManifest(_) | ApiError::RateLimited(_) => {
            Error::SkipVerify(err.to_string())
        }
        e => Error::api(context, e),
    }
}

/// Verifies that an image tag exists and, when the platform is known, that
/// it has a manifest for that platform.
///
/// `ecr` is the registry-auth client for the image's region when the image
/// lives in a private registry; otherwise access is anonymous.
///
/// # Errors
///
/// Fails when the image is empty, the tag or platform manifest is missing,
/// or the registry cannot be reached. Deprecated manifests and rate limiting
/// are skips.
pub async fn verify_image(
    registry: &dyn RegistryApi,
    ecr: Option<&dyn EcrApi>,
    image: &str,
    platform: Option<&Platform>,
) -> Result<()> {
    if image.is_empty() {
        return Err(Error::Invalid("image is not defined".to_string()));
    }
    let credentials = match ecr {
        Some(ecr) => {
            let token = ecr
                .get_authorization_token()
                .await
                .map_err(|e| Error::api("failed to get registry authorization token", e))?;
            RegistryCredentials::Encoded(token)
        }
        None => RegistryCredentials::Anonymous,
    };

    let (repo, tag) = Repository::parse(image);
    let name = image
        .strip_suffix(&format!("@{tag}"))
        .or_else(|| image.strip_suffix(&format!(":{tag}")))
        .unwrap_or(image);
    tracing::debug!(image = name, tag = %tag, "checking registry image");

    let found = registry
        .has_image(&repo, &credentials, &tag)
        .await
        .map_err(|e| registry_error(e, format!("failed to look up {name}:{tag}")))?;
    if !found {
        return Err(Error::Invalid(format!("{name}:{tag} is not found in Registry")));
    }

    let Some(platform) = platform else {
        return Ok(());
    };
    let found = registry
        .has_platform_image(&repo, &credentials, &tag, platform.arch, platform.os)
        .await
        .map_err(|e| registry_error(e, format!("failed to look up {name}:{tag}")))?;
    if found {
        Ok(())
    } else {
        Err(Error::Invalid(format!(
            "{name}:{tag} for arch={} os={} is not found in Registry",
            platform.arch, platform.os
        )))
    }
}
