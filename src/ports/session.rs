//! Execution identity and the clients scoped to it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::{ApiError, EcrApi, LogsApi, SecretsManagerApi, SsmApi};

/// Temporary credentials returned by a role assumption.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token.
    pub session_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// The identity verification calls run under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The caller's own credentials.
    Caller,
    /// A session assumed from the task definition's execution role.
    Assumed {
        /// The assumed role.
        role_arn: String,
        /// Session credentials.
        credentials: Credentials,
    },
}

impl Identity {
    /// Returns `true` for an assumed execution-role session.
    #[must_use]
    pub fn is_assumed(&self) -> bool {
        matches!(self, Self::Assumed { .. })
    }
}

/// Security token service.
#[async_trait]
pub trait StsApi: Send + Sync {
    /// Assumes a role and returns session credentials.
    ///
    /// # Errors
    ///
    /// Returns an error when the caller may not assume the role.
    async fn assume_role(&self, role_arn: &str, session_name: &str)
        -> Result<Credentials, ApiError>;
}

/// Clients that act under the verification identity.
#[derive(Clone)]
pub struct SessionClients {
    /// Log delivery.
    pub logs: Arc<dyn LogsApi>,
    /// Secrets Manager.
    pub secrets_manager: Arc<dyn SecretsManagerApi>,
    /// Parameter Store.
    pub ssm: Arc<dyn SsmApi>,
}

/// Builds clients bound to an identity.
pub trait SessionFactory: Send + Sync {
    /// Clients for the default region.
    fn clients(&self, identity: &Identity) -> SessionClients;

    /// A registry-auth client for the given region.
    fn ecr(&self, identity: &Identity, region: &str) -> Arc<dyn EcrApi>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials {
            access_key_id: "ASIAEXAMPLE".into(),
            secret_access_key: "shh".into(),
            session_token: "tok".into(),
        };
        let out = format!("{creds:?}");
        assert!(out.contains("ASIAEXAMPLE"));
        assert!(!out.contains("shh"));
        assert!(!out.contains("tok\""));
    }
}
