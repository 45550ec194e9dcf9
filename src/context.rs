//! Service context bundling all port trait objects.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::fixture::{FixtureAws, RemoteState};
use crate::adapters::live::{LocalFileSystem, ProcessRunner, SystemClock, UuidGenerator};
use crate::error::Result;
use crate::ports::{
    Clock, CommandRunner, EcsApi, Elbv2Api, FileSystem, IamApi, IdGenerator, LatticeApi,
    RegistryApi, S3Api, SessionFactory, StsApi,
};

/// Bundles all port trait objects into a single context.
///
/// The remote-facing ports are shared handles because a single backend
/// usually serves several of them. Local ports are owned.
pub struct ServiceContext {
    /// Task definitions, services and clusters.
    pub ecs: Arc<dyn EcsApi>,
    /// Role lookups.
    pub iam: Arc<dyn IamApi>,
    /// Load balancer target groups.
    pub elbv2: Arc<dyn Elbv2Api>,
    /// VPC Lattice target groups.
    pub lattice: Arc<dyn LatticeApi>,
    /// Environment file objects.
    pub s3: Arc<dyn S3Api>,
    /// Execution role assumption.
    pub sts: Arc<dyn StsApi>,
    /// Identity-scoped clients.
    pub sessions: Arc<dyn SessionFactory>,
    /// Image manifest probes.
    pub registry: Arc<dyn RegistryApi>,
    /// Clock for log probe timestamps.
    pub clock: Box<dyn Clock>,
    /// ID generator for log stream suffixes.
    pub id_gen: Box<dyn IdGenerator>,
    /// Filesystem for definitions and diff scratch files.
    pub fs: Box<dyn FileSystem>,
    /// Runner for the external diff command.
    pub commands: Box<dyn CommandRunner>,
}

impl ServiceContext {
    /// Creates a context whose remote side is served by `aws`.
    ///
    /// Local ports use live adapters.
    #[must_use]
    pub fn fixture(aws: FixtureAws) -> Self {
        Self {
            ecs: Arc::new(aws.clone()),
            iam: Arc::new(aws.clone()),
            elbv2: Arc::new(aws.clone()),
            lattice: Arc::new(aws.clone()),
            s3: Arc::new(aws.clone()),
            sts: Arc::new(aws.clone()),
            sessions: Arc::new(aws.clone()),
            registry: Arc::new(aws),
            clock: Box::new(SystemClock),
            id_gen: Box::new(UuidGenerator),
            fs: Box::new(LocalFileSystem),
            commands: Box::new(ProcessRunner),
        }
    }

    /// Creates a fixture context from a YAML remote state file, with
    /// clients bound to `region`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_remote_state(path: &Path, region: &str) -> Result<Self> {
        let state = RemoteState::load(path)?;
        Ok(Self::fixture(FixtureAws::with_region(state, region)))
    }

    /// Replaces the image registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn RegistryApi>) -> Self {
        self.registry = registry;
        self
    }
}
