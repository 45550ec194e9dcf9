//! Load balancing and service networking ports.

use async_trait::async_trait;

use super::ApiError;

/// Elastic load balancing target groups.
#[async_trait]
pub trait Elbv2Api: Send + Sync {
    /// Returns the ARNs of the requested target groups that exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails; a missing target group may be
    /// reported either as an empty result or as [`ApiError::NotFound`].
    async fn describe_target_groups(&self, arns: &[String]) -> Result<Vec<String>, ApiError>;
}

/// VPC Lattice target groups.
#[async_trait]
pub trait LatticeApi: Send + Sync {
    /// Fetches a target group by ARN or ID, returning its ARN.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the target group does not exist.
    async fn get_target_group(&self, identifier: &str) -> Result<String, ApiError>;
}
