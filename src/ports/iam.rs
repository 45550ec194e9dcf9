//! IAM port.

use async_trait::async_trait;

use super::ApiError;

/// An IAM role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Role ARN.
    pub arn: String,
    /// URL-encoded JSON trust policy.
    pub assume_role_policy_document: String,
}

/// Looks up IAM roles.
#[async_trait]
pub trait IamApi: Send + Sync {
    /// Fetches a role by name.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the role does not exist.
    async fn get_role(&self, name: &str) -> Result<Role, ApiError>;
}
