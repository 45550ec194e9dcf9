//! Object storage port.

use async_trait::async_trait;

use super::ApiError;

/// S3 object metadata access.
#[async_trait]
pub trait S3Api: Send + Sync {
    /// Probes an object's existence.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the object does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<(), ApiError>;
}
