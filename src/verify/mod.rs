//! Tree-shaped verification of the resources a deployment references.
//!
//! A [`VerifyContext`] is created once per run. It owns the outcome cache,
//! the nesting depth used for indentation, the per-region registry-auth
//! clients and the identity the probes run under. Every named check goes
//! through [`VerifyContext::run_check`], which prints one line for the
//! check, memoizes its outcome and classifies it as OK, NG or SKIP.

pub mod arn;
pub mod checkers;
pub mod platform;
mod service;
mod task;

use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use colored::{Color, Colorize};

use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::model::{Service, TaskDefinition};
use crate::ports::{EcrApi, Identity, SessionClients, StsApi};

/// Session name used when assuming the execution role.
pub const SESSION_NAME: &str = "ecs-reconcile-verifier";

/// Switches for the costly or side-effecting checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Fetch secret values from Secrets Manager and Parameter Store.
    pub get_secrets: bool,
    /// Write a probe event to each `awslogs` log group.
    pub put_logs: bool,
    /// Memoize outcomes by check name for the duration of the run.
    pub cache: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self { get_secrets: true, put_logs: true, cache: true }
    }
}

/// The classified result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The check passed.
    Ok,
    /// The check ran and failed.
    Failed(String),
    /// The check could not be performed.
    Skipped(String),
}

/// One reported check line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Nesting depth, 1 for top-level checks.
    pub depth: usize,
    /// The check name.
    pub name: String,
    /// The classified outcome.
    pub outcome: VerifyOutcome,
    /// Whether the outcome came from the cache.
    pub cached: bool,
}

/// The definitions under verification.
#[derive(Debug, Clone, Copy)]
pub struct VerifyTarget<'a> {
    /// The local task definition.
    pub task_definition: &'a TaskDefinition,
    /// The local service definition, when one is configured.
    pub service: Option<&'a Service>,
    /// The cluster the service runs in.
    pub cluster: &'a str,
}

struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Per-run verification state.
pub struct VerifyContext<'a> {
    services: &'a ServiceContext,
    options: VerifyOptions,
    identity: Identity,
    session: SessionClients,
    cache: Option<Mutex<HashMap<String, Result<()>>>>,
    depth: AtomicUsize,
    ecr_clients: Mutex<HashMap<String, Arc<dyn EcrApi>>>,
    reports: Mutex<Vec<CheckReport>>,
    out: Mutex<Box<dyn Write + Send + 'a>>,
    color: bool,
}

impl<'a> VerifyContext<'a> {
    /// Creates a context whose session clients act as `identity`.
    ///
    /// Check lines go to stdout, uncoloured, until [`Self::with_output`]
    /// says otherwise.
    #[must_use]
    pub fn new(services: &'a ServiceContext, identity: Identity, options: VerifyOptions) -> Self {
        let session = services.sessions.clients(&identity);
        Self {
            services,
            options,
            identity,
            session,
            cache: options.cache.then(|| Mutex::new(HashMap::new())),
            depth: AtomicUsize::new(0),
            ecr_clients: Mutex::new(HashMap::new()),
            reports: Mutex::new(Vec::new()),
            out: Mutex::new(Box::new(std::io::stdout())),
            color: false,
        }
    }

    /// Redirects check lines to `out`, coloured when `color` is set.
    #[must_use]
    pub fn with_output(mut self, out: impl Write + Send + 'a, color: bool) -> Self {
        self.out = Mutex::new(Box::new(out));
        self.color = color;
        self
    }

    /// The identity probes run under.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The options of this run.
    #[must_use]
    pub fn options(&self) -> VerifyOptions {
        self.options
    }

    /// Every check reported so far, in completion order.
    #[must_use]
    pub fn reports(&self) -> Vec<CheckReport> {
        self.reports.lock().expect("verify report lock poisoned").clone()
    }

    pub(crate) fn services(&self) -> &ServiceContext {
        self.services
    }

    pub(crate) fn session(&self) -> &SessionClients {
        &self.session
    }

    /// Returns the registry-auth client for `region`, creating it on first use.
    pub fn ecr_client(&self, region: &str) -> Arc<dyn EcrApi> {
        let mut clients = self.ecr_clients.lock().expect("ecr client lock poisoned");
        Arc::clone(
            clients
                .entry(region.to_string())
                .or_insert_with(|| self.services.sessions.ecr(&self.identity, region)),
        )
    }

    /// Runs one named check.
    ///
    /// A cached outcome for `name` is reused instead of calling `check`.
    /// Skips are reported and swallowed; any other error is reported and
    /// returned wrapped with the check name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CheckFailed`] when the check fails, or an I/O error
    /// when the check line cannot be written.
    pub async fn run_check<F, Fut>(&self, name: &str, check: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = DepthGuard(&self.depth);
        let indent = "  ".repeat(depth);
        self.print(&format!("{indent}{name}"))?;

        let (result, cached) = match self.cached(name) {
            Some(result) => (result, true),
            None => {
                let result = check().await;
                if let Some(cache) = &self.cache {
                    cache
                        .lock()
                        .expect("verify cache lock poisoned")
                        .insert(name.to_string(), result.clone());
                }
                (result, false)
            }
        };

        let marker = if cached { self.paint("(cached)", Color::Cyan) } else { String::new() };
        let (outcome, returned) = match result {
            Ok(()) => {
                self.print(&format!("{indent}--> [{}]{marker}", self.paint("OK", Color::Green)))?;
                (VerifyOutcome::Ok, Ok(()))
            }
            Err(err) if err.is_skip() => {
                let message = err.to_string();
                self.print(&format!(
                    "{indent}--> [{}]{marker} {}",
                    self.paint("SKIP", Color::Cyan),
                    self.paint(&message, Color::Cyan)
                ))?;
                (VerifyOutcome::Skipped(message), Ok(()))
            }
            Err(err) => {
                let message = err.to_string();
                self.print(&format!(
                    "{indent}--> [{}]{marker} {}",
                    self.paint("NG", Color::Red),
                    self.paint(&message, Color::Red)
                ))?;
                let failed = Error::CheckFailed { name: name.to_string(), source: Box::new(err) };
                (VerifyOutcome::Failed(message), Err(failed))
            }
        };
        self.reports.lock().expect("verify report lock poisoned").push(CheckReport {
            depth,
            name: name.to_string(),
            outcome,
            cached,
        });
        returned
    }

    fn cached(&self, name: &str) -> Option<Result<()>> {
        let cache = self.cache.as_ref()?;
        cache.lock().expect("verify cache lock poisoned").get(name).cloned()
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn print(&self, line: &str) -> Result<()> {
        let mut out = self.out.lock().expect("verify output lock poisoned");
        writeln!(out, "{line}").map_err(|e| Error::io("failed to write verify output", &e))
    }
}

/// Picks the identity verification runs under.
///
/// The execution role is assumed when one is declared, so that probes see
/// what the container agent would see. Assumption failure falls back to the
/// caller's own identity.
pub async fn resolve_identity(sts: &dyn StsApi, execution_role: Option<&str>) -> Identity {
    let Some(role_arn) = execution_role else {
        tracing::info!("executionRoleArn is not set. Continue to verify with current session.");
        return Identity::Caller;
    };
    match sts.assume_role(role_arn, SESSION_NAME).await {
        Ok(credentials) => {
            tracing::info!(role_arn, "success to assume role");
            Identity::Assumed { role_arn: role_arn.to_string(), credentials }
        }
        Err(e) => {
            tracing::info!(
                role_arn,
                error = %e,
                "failed to assume role to taskExecutionRole. Continue to verify with current session."
            );
            Identity::Caller
        }
    }
}

/// Verifies the task definition, the service definition and the cluster,
/// stopping at the first failure.
///
/// # Errors
///
/// Returns the first failing check's error, wrapped with every enclosing
/// check name.
pub async fn verify(cx: &VerifyContext<'_>, target: &VerifyTarget<'_>) -> Result<()> {
    tracing::info!("Starting verify");
    cx.run_check("TaskDefinition", || task::verify_task_definition(cx, target)).await?;
    cx.run_check("ServiceDefinition", || service::verify_service_definition(cx, target)).await?;
    cx.run_check("Cluster", || checkers::verify_cluster(cx.services().ecs.as_ref(), target.cluster))
        .await?;
    tracing::info!("Verify OK!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicU32;

    use crate::adapters::fixture::{FixtureAws, RemoteState};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn services() -> ServiceContext {
        ServiceContext::fixture(FixtureAws::new(RemoteState::default()))
    }

    #[tokio::test]
    async fn cached_outcome_is_reused() {
        let services = services();
        let buf = SharedBuf::default();
        let cx = VerifyContext::new(&services, Identity::Caller, VerifyOptions::default())
            .with_output(buf.clone(), false);
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let probe = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Invalid("boom".into()))
        };

        let first = cx.run_check("Probe", probe).await.unwrap_err();
        let second = cx.run_check("Probe", probe).await.unwrap_err();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(buf.text(), "  Probe\n  --> [NG] boom\n  Probe\n  --> [NG](cached) boom\n");
        let reports = cx.reports();
        assert!(!reports[0].cached);
        assert!(reports[1].cached);
        assert_eq!(reports[0].outcome, reports[1].outcome);
    }

    #[tokio::test]
    async fn disabled_cache_reexecutes() {
        let services = services();
        let options = VerifyOptions { cache: false, ..VerifyOptions::default() };
        let cx = VerifyContext::new(&services, Identity::Caller, options)
            .with_output(std::io::sink(), false);
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let probe = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        cx.run_check("Probe", probe).await.unwrap();
        cx.run_check("Probe", probe).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn nested_checks_indent_and_wrap() {
        let services = services();
        let buf = SharedBuf::default();
        let cx = VerifyContext::new(&services, Identity::Caller, VerifyOptions::default())
            .with_output(buf.clone(), false);
        let outer = &cx;
        let err = cx
            .run_check("Outer", move || async move {
                outer.run_check("Skipped", || async { Err(Error::SkipVerify("later".into())) })
                    .await?;
                outer.run_check("Inner", || async { Err(Error::Invalid("bad".into())) }).await
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "verify Outer failed: verify Inner failed: bad");
        assert_eq!(
            buf.text(),
            "  Outer\n    Skipped\n    --> [SKIP] later\n    Inner\n    --> [NG] bad\n  --> [NG] verify Inner failed: bad\n"
        );
        assert_eq!(cx.depth.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ecr_clients_are_created_once_per_region() {
        let aws = FixtureAws::new(RemoteState::default());
        let services = ServiceContext::fixture(aws.clone());
        let cx = VerifyContext::new(&services, Identity::Caller, VerifyOptions::default());
        let a = cx.ecr_client("us-east-1");
        let b = cx.ecr_client("us-east-1");
        cx.ecr_client("eu-west-1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(aws.ecr_regions(), ["us-east-1", "eu-west-1"]);
    }

    #[tokio::test]
    async fn assumption_failure_falls_back_to_caller() {
        let state = RemoteState { deny_assume_role: true, ..RemoteState::default() };
        let aws = FixtureAws::new(state);
        let identity = resolve_identity(&aws, Some("arn:aws:iam::123:role/exec")).await;
        assert_eq!(identity, Identity::Caller);
        assert_eq!(resolve_identity(&aws, None).await, Identity::Caller);

        let aws = FixtureAws::new(RemoteState::default());
        let identity = resolve_identity(&aws, Some("arn:aws:iam::123:role/exec")).await;
        assert!(identity.is_assumed());
    }
}
