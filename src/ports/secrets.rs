//! Secret store ports.

use async_trait::async_trait;

use super::ApiError;

/// Secrets Manager.
#[async_trait]
pub trait SecretsManagerApi: Send + Sync {
    /// Fetches the current value of a secret.
    ///
    /// Returns `None` for binary secrets, which carry no string value.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the secret does not exist.
    async fn get_secret_value(&self, secret_id: &str) -> Result<Option<String>, ApiError>;
}

/// Result of a Parameter Store lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    /// Names that resolved.
    pub found: Vec<String>,
    /// Names that did not resolve.
    pub invalid: Vec<String>,
}

/// Systems Manager Parameter Store.
#[async_trait]
pub trait SsmApi: Send + Sync {
    /// Resolves parameters by name, decrypting secure strings.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    async fn get_parameters(&self, names: &[String]) -> Result<Parameters, ApiError>;
}
