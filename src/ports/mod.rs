//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the reconciliation core and an
//! external system (the container service's control plane, IAM, the image
//! registry, secret stores, logging, the filesystem, processes, time, IDs).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod command;
pub mod ecs;
pub mod filesystem;
pub mod iam;
pub mod id_gen;
pub mod logs;
pub mod network;
pub mod registry;
pub mod secrets;
pub mod session;
pub mod storage;

use thiserror::Error;

pub use clock::Clock;
pub use command::{CommandOutput, CommandRunner};
pub use ecs::{DescribedTaskDefinition, EcsApi};
pub use filesystem::FileSystem;
pub use iam::{IamApi, Role};
pub use id_gen::IdGenerator;
pub use logs::{LogEvent, LogsApi};
pub use network::{Elbv2Api, LatticeApi};
pub use registry::{EcrApi, RegistryApi, RegistryCredentials, Repository};
pub use secrets::{Parameters, SecretsManagerApi, SsmApi};
pub use session::{Credentials, Identity, SessionClients, SessionFactory, StsApi};
pub use storage::S3Api;

/// Failure reported by a remote API behind a port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The resource to create already exists.
    #[error("{0}")]
    AlreadyExists(String),
    /// The registry only serves a deprecated manifest format.
    #[error("deprecated manifest format: {0}")]
    DeprecatedManifest(String),
    /// The registry rejected the request for rate limiting.
    #[error("pull rate limit exceeded: {0}")]
    RateLimited(String),
    /// The service returned an error response.
    #[error("{code}: {message}")]
    Service {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
    },
    /// The request could not be delivered or its response could not be read.
    #[error("transport error: {0}")]
    Transport(String),
}
