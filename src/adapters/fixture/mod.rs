//! In-memory remote side backed by a YAML [`RemoteState`].
//!
//! [`FixtureAws`] implements every AWS-style port plus the session factory.
//! Each call it serves is appended to a shared log together with the
//! identity and region it was made under, so tests can assert probe counts
//! and routing. Log group and stream creation mutate the state the same way
//! the real service would.

mod state;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

pub use state::{ClusterState, RegisteredTaskDefinition, RemoteState};

use crate::config::DEFAULT_REGION;
use crate::model::Service;
use crate::ports::{
    ApiError, Credentials, DescribedTaskDefinition, EcrApi, EcsApi, Elbv2Api, IamApi, Identity,
    LatticeApi, LogEvent, LogsApi, Parameters, RegistryApi, RegistryCredentials, Repository, Role,
    S3Api, SecretsManagerApi, SessionClients, SessionFactory, SsmApi, StsApi,
};

// base64("AWS:fixture")
const ECR_TOKEN: &str = "QVdTOmZpeHR1cmU=";

/// One served call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Operation name, e.g. `GetParameters`.
    pub operation: &'static str,
    /// The resource the call was about.
    pub target: String,
    /// `caller`, the assumed role ARN, or for registry calls the credential kind.
    pub identity: String,
    /// Region the client was bound to; empty for registry calls.
    pub region: String,
}

struct Inner {
    state: Mutex<RemoteState>,
    calls: Mutex<Vec<Call>>,
    ecr_regions: Mutex<Vec<String>>,
    region: String,
}

/// Cheaply cloneable handle to the shared fixture.
#[derive(Clone)]
pub struct FixtureAws {
    inner: Arc<Inner>,
}

fn identity_label(identity: &Identity) -> String {
    match identity {
        Identity::Caller => "caller".to_string(),
        Identity::Assumed { role_arn, .. } => role_arn.clone(),
    }
}

impl FixtureAws {
    /// Serves `state` with clients bound to `us-east-1`.
    #[must_use]
    pub fn new(state: RemoteState) -> Self {
        Self::with_region(state, DEFAULT_REGION)
    }

    /// Serves `state` with clients bound to `region`.
    #[must_use]
    pub fn with_region(state: RemoteState, region: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                calls: Mutex::new(Vec::new()),
                ecr_regions: Mutex::new(Vec::new()),
                region: region.to_string(),
            }),
        }
    }

    /// Every call served so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().expect("fixture call log lock poisoned").clone()
    }

    /// Calls to one operation.
    #[must_use]
    pub fn calls_to(&self, operation: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.operation == operation).collect()
    }

    /// Regions for which a registry-auth client was created, in order.
    #[must_use]
    pub fn ecr_regions(&self) -> Vec<String> {
        self.inner.ecr_regions.lock().expect("fixture region lock poisoned").clone()
    }

    /// A snapshot of the current remote state.
    #[must_use]
    pub fn state(&self) -> RemoteState {
        self.state_lock().clone()
    }

    fn state_lock(&self) -> std::sync::MutexGuard<'_, RemoteState> {
        self.inner.state.lock().expect("fixture state lock poisoned")
    }

    fn record(&self, operation: &'static str, target: &str, identity: String, region: &str) {
        self.inner.calls.lock().expect("fixture call log lock poisoned").push(Call {
            operation,
            target: target.to_string(),
            identity,
            region: region.to_string(),
        });
    }

    fn record_caller(&self, operation: &'static str, target: &str) {
        self.record(operation, target, "caller".to_string(), &self.inner.region);
    }

    fn scoped(&self, identity: &Identity, region: &str) -> Arc<ScopedFixture> {
        Arc::new(ScopedFixture {
            aws: self.clone(),
            identity: identity_label(identity),
            region: region.to_string(),
        })
    }
}

#[async_trait]
impl EcsApi for FixtureAws {
    async fn describe_task_definition(
        &self,
        arn: &str,
    ) -> Result<DescribedTaskDefinition, ApiError> {
        self.record_caller("DescribeTaskDefinition", arn);
        let state = self.state_lock();
        let found = state.task_definitions.iter().find(|td| {
            td.arn == arn
                || td.family_revision().is_some_and(|(f, r)| format!("{f}:{r}") == arn)
        });
        found
            .map(|td| DescribedTaskDefinition {
                arn: td.arn.clone(),
                definition: td.definition.clone(),
                tags: td.tags.clone(),
            })
            .ok_or_else(|| ApiError::NotFound(format!("task definition {arn} is not found")))
    }

    async fn latest_task_definition_arn(&self, family: &str) -> Result<String, ApiError> {
        self.record_caller("ListTaskDefinitions", family);
        let state = self.state_lock();
        state
            .task_definitions
            .iter()
            .filter_map(|td| td.family_revision().filter(|(f, _)| *f == family).map(|(_, r)| (r, td)))
            .max_by_key(|(r, _)| *r)
            .map(|(_, td)| td.arn.clone())
            .ok_or_else(|| ApiError::NotFound(format!("task definition family {family} is not found")))
    }

    async fn describe_service(&self, cluster: &str, service: &str) -> Result<Service, ApiError> {
        self.record_caller("DescribeServices", &format!("{cluster}/{service}"));
        let state = self.state_lock();
        state
            .clusters
            .get(cluster)
            .and_then(|c| c.services.get(service))
            .cloned()
            .ok_or_else(|| {
                ApiError::NotFound(format!("service {service} is not found in cluster {cluster}"))
            })
    }

    async fn describe_clusters(&self, names: &[String]) -> Result<Vec<String>, ApiError> {
        self.record_caller("DescribeClusters", &names.join(","));
        let state = self.state_lock();
        let region = &self.inner.region;
        Ok(names
            .iter()
            .filter_map(|name| {
                state.clusters.get(name).map(|c| {
                    c.arn.clone().unwrap_or_else(|| {
                        format!("arn:aws:ecs:{region}:000000000000:cluster/{name}")
                    })
                })
            })
            .collect())
    }
}

#[async_trait]
impl IamApi for FixtureAws {
    async fn get_role(&self, name: &str) -> Result<Role, ApiError> {
        self.record_caller("GetRole", name);
        let state = self.state_lock();
        let document = state
            .roles
            .get(name)
            .ok_or_else(|| ApiError::NotFound(format!("role {name} cannot be found")))?;
        Ok(Role {
            arn: format!("arn:aws:iam::000000000000:role/{name}"),
            assume_role_policy_document: urlencoding::encode(&document.to_string()).into_owned(),
        })
    }
}

#[async_trait]
impl Elbv2Api for FixtureAws {
    async fn describe_target_groups(&self, arns: &[String]) -> Result<Vec<String>, ApiError> {
        self.record_caller("DescribeTargetGroups", &arns.join(","));
        let state = self.state_lock();
        if let Some(arn) = arns.iter().find(|a| !state.target_groups.contains(a)) {
            return Err(ApiError::NotFound(format!("One or more target groups not found: {arn}")));
        }
        Ok(arns.to_vec())
    }
}

#[async_trait]
impl LatticeApi for FixtureAws {
    async fn get_target_group(&self, identifier: &str) -> Result<String, ApiError> {
        self.record_caller("GetTargetGroup", identifier);
        if self.state_lock().lattice_target_groups.iter().any(|t| t == identifier) {
            Ok(identifier.to_string())
        } else {
            Err(ApiError::NotFound(format!("target group {identifier} is not found")))
        }
    }
}

#[async_trait]
impl S3Api for FixtureAws {
    async fn head_object(&self, bucket: &str, key: &str) -> Result<(), ApiError> {
        let object = format!("{bucket}/{key}");
        self.record_caller("HeadObject", &object);
        if self.state_lock().objects.contains(&object) {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("s3://{object} is not found")))
        }
    }
}

#[async_trait]
impl StsApi for FixtureAws {
    async fn assume_role(&self, role_arn: &str, session_name: &str) -> Result<Credentials, ApiError> {
        self.record_caller("AssumeRole", &format!("{role_arn} {session_name}"));
        if self.state_lock().deny_assume_role {
            return Err(ApiError::Service {
                code: "AccessDenied".into(),
                message: format!("not authorized to assume {role_arn}"),
            });
        }
        Ok(Credentials {
            access_key_id: "ASIAFIXTURE".into(),
            secret_access_key: "fixture-secret".into(),
            session_token: "fixture-token".into(),
        })
    }
}

#[async_trait]
impl RegistryApi for FixtureAws {
    async fn has_image(
        &self,
        repo: &Repository,
        credentials: &RegistryCredentials,
        tag: &str,
    ) -> Result<bool, ApiError> {
        let reference = format!("{}/{}:{tag}", repo.host, repo.name);
        self.record("HasImage", &reference, credential_label(credentials), "");
        let state = self.state_lock();
        Ok(state.images.contains_key(&reference) || state.deprecated_images.contains(&reference))
    }

    async fn has_platform_image(
        &self,
        repo: &Repository,
        credentials: &RegistryCredentials,
        tag: &str,
        arch: &str,
        os: &str,
    ) -> Result<bool, ApiError> {
        let reference = format!("{}/{}:{tag}", repo.host, repo.name);
        self.record("HasPlatformImage", &reference, credential_label(credentials), "");
        let state = self.state_lock();
        if state.deprecated_images.contains(&reference) {
            return Err(ApiError::DeprecatedManifest(reference));
        }
        let wanted = format!("{os}/{arch}");
        Ok(state.images.get(&reference).is_some_and(|platforms| platforms.contains(&wanted)))
    }
}

fn credential_label(credentials: &RegistryCredentials) -> String {
    match credentials {
        RegistryCredentials::Anonymous => "anonymous".to_string(),
        RegistryCredentials::Basic { username, .. } => username.clone(),
        RegistryCredentials::Encoded(_) => "ecr".to_string(),
    }
}

impl SessionFactory for FixtureAws {
    fn clients(&self, identity: &Identity) -> SessionClients {
        let scoped = self.scoped(identity, &self.inner.region);
        SessionClients { logs: scoped.clone(), secrets_manager: scoped.clone(), ssm: scoped }
    }

    fn ecr(&self, identity: &Identity, region: &str) -> Arc<dyn EcrApi> {
        self.inner
            .ecr_regions
            .lock()
            .expect("fixture region lock poisoned")
            .push(region.to_string());
        self.scoped(identity, region)
    }
}

/// Clients bound to one identity and region.
struct ScopedFixture {
    aws: FixtureAws,
    identity: String,
    region: String,
}

impl ScopedFixture {
    fn record(&self, operation: &'static str, target: &str) {
        self.aws.record(operation, target, self.identity.clone(), &self.region);
    }
}

#[async_trait]
impl LogsApi for ScopedFixture {
    async fn create_log_group(&self, group: &str) -> Result<(), ApiError> {
        self.record("CreateLogGroup", group);
        let mut state = self.aws.state_lock();
        if state.log_groups.contains_key(group) {
            return Err(ApiError::AlreadyExists(format!("log group {group} already exists")));
        }
        if state.deny_create_log_group {
            return Err(ApiError::Service {
                code: "AccessDeniedException".into(),
                message: format!("not authorized to create log group {group}"),
            });
        }
        state.log_groups.insert(group.to_string(), Vec::new());
        Ok(())
    }

    async fn create_log_stream(&self, group: &str, stream: &str) -> Result<(), ApiError> {
        self.record("CreateLogStream", &format!("{group} {stream}"));
        let mut state = self.aws.state_lock();
        let Some(streams) = state.log_groups.get_mut(group) else {
            return Err(ApiError::NotFound(format!("log group {group} does not exist")));
        };
        streams.push(stream.to_string());
        Ok(())
    }

    async fn put_log_events(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
    ) -> Result<(), ApiError> {
        self.record("PutLogEvents", &format!("{group} {stream} {}", events.len()));
        let state = self.aws.state_lock();
        if state.log_groups.get(group).is_some_and(|s| s.iter().any(|s| s == stream)) {
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("log stream {stream} does not exist in {group}")))
        }
    }
}

#[async_trait]
impl SecretsManagerApi for ScopedFixture {
    async fn get_secret_value(&self, secret_id: &str) -> Result<Option<String>, ApiError> {
        self.record("GetSecretValue", secret_id);
        self.aws
            .state_lock()
            .secrets
            .get(secret_id)
            .map(|v| Some(v.clone()))
            .ok_or_else(|| ApiError::NotFound(format!("secret {secret_id} can't be found")))
    }
}

#[async_trait]
impl SsmApi for ScopedFixture {
    async fn get_parameters(&self, names: &[String]) -> Result<Parameters, ApiError> {
        self.record("GetParameters", &names.join(","));
        let state = self.aws.state_lock();
        let (found, invalid): (Vec<String>, Vec<String>) =
            names.iter().cloned().partition(|n| state.parameters.contains(n));
        Ok(Parameters { found, invalid })
    }
}

#[async_trait]
impl EcrApi for ScopedFixture {
    async fn get_authorization_token(&self) -> Result<String, ApiError> {
        self.record("GetAuthorizationToken", "");
        Ok(ECR_TOKEN.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> FixtureAws {
        FixtureAws::new(
            RemoteState::from_yaml(
                r"
task_definitions:
  - arn: arn:aws:ecs:us-east-1:123:task-definition/web:2
    definition: {family: web}
  - arn: arn:aws:ecs:us-east-1:123:task-definition/web:10
    definition: {family: web}
log_groups:
  /ecs/web: []
",
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn latest_revision_is_numeric_max() {
        let aws = fixture();
        let arn = aws.latest_task_definition_arn("web").await.unwrap();
        assert!(arn.ends_with("web:10"));
        assert!(matches!(aws.latest_task_definition_arn("api").await, Err(ApiError::NotFound(_))));
        let td = aws.describe_task_definition("web:2").await.unwrap();
        assert!(td.arn.ends_with("web:2"));
    }

    #[tokio::test]
    async fn log_writes_mutate_state_and_record_identity() {
        let aws = fixture();
        let identity = Identity::Assumed {
            role_arn: "arn:aws:iam::123:role/exec".into(),
            credentials: Credentials {
                access_key_id: "a".into(),
                secret_access_key: "b".into(),
                session_token: "c".into(),
            },
        };
        let clients = aws.clients(&identity);
        assert!(matches!(
            clients.logs.create_log_group("/ecs/web").await,
            Err(ApiError::AlreadyExists(_))
        ));
        clients.logs.create_log_stream("/ecs/web", "s1").await.unwrap();
        clients.logs.put_log_events("/ecs/web", "s1", &[]).await.unwrap();
        assert_eq!(aws.state().log_groups["/ecs/web"], ["s1"]);
        let calls = aws.calls_to("PutLogEvents");
        assert_eq!(calls[0].identity, "arn:aws:iam::123:role/exec");
        assert_eq!(calls[0].region, "us-east-1");
    }

    #[tokio::test]
    async fn role_documents_are_url_encoded() {
        let mut state = RemoteState::default();
        state.roles.insert("exec".into(), serde_json::json!({"Statement": []}));
        let aws = FixtureAws::new(state);
        let role = aws.get_role("exec").await.unwrap();
        assert_eq!(role.assume_role_policy_document, "%7B%22Statement%22%3A%5B%5D%7D");
    }
}
