//! Comparison of local definitions against what is deployed.
//!
//! Both sides are canonicalized and marshaled to sorted JSON text; when the
//! texts differ they are rendered with the configured presentation.

pub mod external;
pub mod myers;
pub mod render;

use crate::canonical::{canonicalize_service, canonicalize_task_definition, marshal_for_diff};
use crate::context::ServiceContext;
use crate::error::Result;
use crate::model::{Service, TaskDefinition};
use crate::ports::{CommandRunner, DescribedTaskDefinition, FileSystem};

/// How a difference is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffPresentation {
    /// Hunked unified diff with three lines of context.
    Unified,
    /// Every line of both sides, marked, without hunks.
    Simple,
    /// Output of an operator-supplied command given both files.
    External(String),
}

/// Diff rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// Presentation mode.
    pub presentation: DiffPresentation,
    /// Colour removed and added lines. Ignored for external output.
    pub color: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { presentation: DiffPresentation::Unified, color: false }
    }
}

/// The result of one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    /// Whether the canonical texts differ. Never affected by colouring.
    pub changed: bool,
    /// Rendered diff; empty when nothing changed.
    pub text: String,
}

impl DiffReport {
    fn unchanged() -> Self {
        Self { changed: false, text: String::new() }
    }
}

/// Compares definitions using the context's process runner and filesystem.
pub struct DiffEngine<'a> {
    commands: &'a dyn CommandRunner,
    fs: &'a dyn FileSystem,
    options: DiffOptions,
}

impl<'a> DiffEngine<'a> {
    /// Creates an engine bound to `services`.
    #[must_use]
    pub fn new(services: &'a ServiceContext, options: DiffOptions) -> Self {
        Self { commands: services.commands.as_ref(), fs: services.fs.as_ref(), options }
    }

    /// Compares a local task definition with a registered revision.
    ///
    /// Server-assigned fields are dropped from the remote side and its tags
    /// are folded in. A missing remote diffs as every line added.
    ///
    /// # Errors
    ///
    /// Returns an error when marshaling fails or the external command fails.
    pub async fn task_definitions(
        &self,
        mut local: TaskDefinition,
        remote: Option<&DescribedTaskDefinition>,
        local_label: &str,
    ) -> Result<DiffReport> {
        canonicalize_task_definition(&mut local);
        let remote_label = remote.map_or("", |r| r.arn.as_str());
        let remote = remote.map(|r| {
            let mut td = r.definition.clone().into_register_input(r.tags.clone());
            canonicalize_task_definition(&mut td);
            td
        });
        let remote_text = marshal_for_diff(remote.as_ref())?;
        let local_text = marshal_for_diff(Some(&local))?;
        self.render("taskdef", remote_label, local_label, &remote_text, &local_text).await
    }

    /// Compares a local service declaration with the deployed service.
    ///
    /// When the local side leaves the desired count unset, the remote count
    /// is not compared.
    ///
    /// # Errors
    ///
    /// Returns an error when marshaling fails or the external command fails.
    pub async fn services(
        &self,
        mut local: Service,
        remote: Option<Service>,
        local_label: &str,
    ) -> Result<DiffReport> {
        let local_for_diff = canonicalize_service(&mut local);
        let remote_label = remote.as_ref().and_then(|r| r.service_arn.clone()).unwrap_or_default();
        let remote_for_diff = remote.map(|mut r| {
            let mut projected = canonicalize_service(&mut r);
            if local_for_diff.desired_count.is_none() {
                projected.desired_count = None;
            }
            projected
        });
        let remote_text = marshal_for_diff(remote_for_diff.as_ref())?;
        let local_text = marshal_for_diff(Some(&local_for_diff))?;
        self.render("service", &remote_label, local_label, &remote_text, &local_text).await
    }

    async fn render(
        &self,
        target: &str,
        remote_label: &str,
        local_label: &str,
        remote: &str,
        local: &str,
    ) -> Result<DiffReport> {
        if remote == local {
            tracing::debug!(target_kind = target, "no difference");
            return Ok(DiffReport::unchanged());
        }
        tracing::debug!(
            target_kind = target,
            remote = remote_label,
            local = local_label,
            "difference found"
        );
        let text = match &self.options.presentation {
            DiffPresentation::External(command) => {
                return Ok(DiffReport {
                    changed: true,
                    text: external::run(self.commands, self.fs, command, target, remote, local)
                        .await?,
                });
            }
            DiffPresentation::Unified => render::unified(remote_label, local_label, remote, local),
            DiffPresentation::Simple => render::simple(remote_label, local_label, remote, local),
        };
        let text = if self.options.color { render::colorize(&text) } else { text };
        Ok(DiffReport { changed: true, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fixture::{FixtureAws, RemoteState};

    fn services() -> ServiceContext {
        ServiceContext::fixture(FixtureAws::new(RemoteState::default()))
    }

    fn td(json: serde_json::Value) -> TaskDefinition {
        serde_json::from_value(json).unwrap()
    }

    fn registered(json: serde_json::Value) -> DescribedTaskDefinition {
        DescribedTaskDefinition {
            arn: "arn:aws:ecs:us-east-1:123456789012:task-definition/web:3".into(),
            definition: td(json),
            tags: Vec::new(),
        }
    }

    async fn diff_local(
        engine: &DiffEngine<'_>,
        remote: Option<&DescribedTaskDefinition>,
    ) -> DiffReport {
        engine.task_definitions(td(local_web()), remote, "web.json").await.unwrap()
    }

    fn local_web() -> serde_json::Value {
        serde_json::json!({
            "family": "web",
            "networkMode": "awsvpc",
            "cpu": "0.25 vCPU",
            "memory": "0.5 GB",
            "containerDefinitions": [{
                "name": "app",
                "image": "nginx:1.25",
                "portMappings": [{"containerPort": 80}],
                "environment": [{"name": "B", "value": "2"}, {"name": "A", "value": "1"}]
            }]
        })
    }

    fn remote_web(image: &str) -> serde_json::Value {
        serde_json::json!({
            "family": "web",
            "taskDefinitionArn": "arn:aws:ecs:us-east-1:123456789012:task-definition/web:3",
            "revision": 3,
            "status": "ACTIVE",
            "networkMode": "awsvpc",
            "cpu": "256",
            "memory": "512",
            "containerDefinitions": [{
                "name": "app",
                "image": image,
                "portMappings": [{"containerPort": 80, "hostPort": 80}],
                "environment": [{"name": "A", "value": "1"}, {"name": "B", "value": "2"}]
            }]
        })
    }

    #[tokio::test]
    async fn equivalent_definitions_do_not_differ() {
        let services = services();
        let engine = DiffEngine::new(&services, DiffOptions::default());
        let remote = registered(remote_web("nginx:1.25"));
        let report = diff_local(&engine, Some(&remote)).await;
        assert_eq!(report, DiffReport { changed: false, text: String::new() });
    }

    #[tokio::test]
    async fn describe_only_fields_do_not_differ() {
        let services = services();
        let engine = DiffEngine::new(&services, DiffOptions::default());
        let mut described = remote_web("nginx:1.25");
        described["registeredAt"] = "2024-05-01T10:00:00Z".into();
        described["registeredBy"] = "arn:aws:iam::123456789012:user/deployer".into();
        described["deregisteredAt"] = "2024-06-01T10:00:00Z".into();
        described["compatibilities"] = serde_json::json!(["EC2", "FARGATE"]);
        described["requiresAttributes"] = serde_json::json!([{"name": "ecs.capability.task-eni"}]);
        let report = diff_local(&engine, Some(&registered(described))).await;
        assert!(!report.changed, "{}", report.text);
    }

    #[tokio::test]
    async fn diff_against_itself_is_empty() {
        let services = services();
        let engine = DiffEngine::new(&services, DiffOptions::default());
        let described = registered(local_web());
        let report = diff_local(&engine, Some(&described)).await;
        assert!(!report.changed);
    }

    #[tokio::test]
    async fn one_changed_field_is_one_changed_line() {
        let services = services();
        let engine = DiffEngine::new(&services, DiffOptions::default());
        let remote = registered(remote_web("nginx:1.24"));
        let report = diff_local(&engine, Some(&remote)).await;
        assert!(report.changed);
        let removed: Vec<&str> =
            report.text.lines().filter(|l| l.starts_with('-') && !l.starts_with("---")).collect();
        let added: Vec<&str> =
            report.text.lines().filter(|l| l.starts_with('+') && !l.starts_with("+++")).collect();
        assert_eq!(removed, vec!["-      \"image\": \"nginx:1.24\","]);
        assert_eq!(added, vec!["+      \"image\": \"nginx:1.25\","]);
        assert!(report.text.starts_with(
            "--- arn:aws:ecs:us-east-1:123456789012:task-definition/web:3\n+++ web.json\n"
        ));
    }

    #[tokio::test]
    async fn mismatched_host_port_is_one_changed_field() {
        let services = services();
        let engine = DiffEngine::new(&services, DiffOptions::default());
        let mut remote = remote_web("nginx:1.25");
        remote["containerDefinitions"][0]["portMappings"][0]["hostPort"] = 8080.into();
        let report = diff_local(&engine, Some(&registered(remote))).await;
        let changed: Vec<&str> =
            report.text.lines().skip(2).filter(|l| !l.starts_with([' ', '@'])).collect();
        assert_eq!(changed, ["-          \"hostPort\": 8080", "+          \"hostPort\": 80"]);
    }

    #[tokio::test]
    async fn missing_remote_task_definition_is_all_added() {
        let services = services();
        let engine = DiffEngine::new(&services, DiffOptions::default());
        let report = diff_local(&engine, None).await;
        assert!(report.changed);
        assert!(report.text.starts_with("--- \n+++ web.json\n@@ -0,0 "));
        assert!(report.text.lines().skip(3).all(|l| l.starts_with('+')));
    }

    #[tokio::test]
    async fn unset_local_desired_count_ignores_remote_count() {
        let services = services();
        let engine = DiffEngine::new(&services, DiffOptions::default());
        let local: Service =
            serde_json::from_value(serde_json::json!({"serviceName": "web"})).unwrap();
        let remote: Service = serde_json::from_value(serde_json::json!({
            "serviceName": "web",
            "serviceArn": "arn:aws:ecs:us-east-1:123456789012:service/default/web",
            "desiredCount": 4,
            "schedulingStrategy": "REPLICA"
        }))
        .unwrap();
        let report =
            engine.services(local.clone(), Some(remote.clone()), "svc.json").await.unwrap();
        assert!(!report.changed);

        let mut counted = local;
        counted.desired_count = Some(2);
        let report = engine.services(counted, Some(remote), "svc.json").await.unwrap();
        assert!(report.changed);
        assert!(report.text.contains("-  \"desiredCount\": 4,"));
        assert!(report.text.contains("+  \"desiredCount\": 2,"));
    }

    #[tokio::test]
    async fn colour_does_not_change_the_verdict() {
        let services = services();
        let remote = registered(remote_web("nginx:1.24"));
        let plain = DiffEngine::new(&services, DiffOptions::default());
        let coloured = DiffEngine::new(
            &services,
            DiffOptions { presentation: DiffPresentation::Unified, color: true },
        );
        let a = diff_local(&plain, Some(&remote)).await;
        let b = diff_local(&coloured, Some(&remote)).await;
        assert_eq!(a.changed, b.changed);
    }

    #[tokio::test]
    async fn simple_presentation_shows_every_line() {
        let services = services();
        let engine = DiffEngine::new(
            &services,
            DiffOptions { presentation: DiffPresentation::Simple, color: false },
        );
        let remote = registered(remote_web("nginx:1.24"));
        let report = diff_local(&engine, Some(&remote)).await;
        assert!(!report.text.contains("@@"));
        assert!(report.text.contains("\n   \"family\": \"web\",\n"));
    }

    #[tokio::test]
    async fn external_presentation_runs_the_command() {
        let services = services();
        let engine = DiffEngine::new(
            &services,
            DiffOptions { presentation: DiffPresentation::External("echo".into()), color: true },
        );
        let remote = registered(remote_web("nginx:1.24"));
        let report = diff_local(&engine, Some(&remote)).await;
        assert_eq!(
            report,
            DiffReport { changed: true, text: "remote/taskdef.json local/taskdef.json\n".into() }
        );
    }
}
