//! Container image registry ports.

use async_trait::async_trait;

use super::ApiError;

const DOCKER_HUB: &str = "registry-1.docker.io";

/// An image repository on a registry host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// Registry host, with port when one is given.
    pub host: String,
    /// Repository path on the host.
    pub name: String,
}

impl Repository {
    /// Splits an image reference into its repository and tag (or digest).
    ///
    /// References without a registry host resolve to Docker Hub, single
    /// component names gain the `library/` namespace, and a missing tag
    /// means `latest`.
    #[must_use]
    pub fn parse(image: &str) -> (Self, String) {
        let (name, tag) = if let Some((name, digest)) = image.split_once('@') {
            (name, digest.to_string())
        } else {
            let last_slash = image.rfind('/').map_or(0, |i| i + 1);
            match image[last_slash..].rfind(':') {
                Some(i) => (&image[..last_slash + i], image[last_slash + i + 1..].to_string()),
                None => (image, "latest".to_string()),
            }
        };

        let repo = match name.split_once('/') {
            Some((host, rest))
                if host.contains('.') || host.contains(':') || host == "localhost" =>
            {
                Self { host: host.to_string(), name: rest.to_string() }
            }
            Some(_) => Self { host: DOCKER_HUB.to_string(), name: name.to_string() },
            None => Self { host: DOCKER_HUB.to_string(), name: format!("library/{name}") },
        };
        (repo, tag)
    }
}

/// How to authenticate to a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCredentials {
    /// No credentials; token endpoints are still honoured.
    Anonymous,
    /// Username and password.
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// An already base64-encoded `user:password` pair, as issued by ECR.
    Encoded(String),
}

/// Registry authorization for the private container registry.
#[async_trait]
pub trait EcrApi: Send + Sync {
    /// Returns a base64-encoded `AWS:<password>` authorization token.
    ///
    /// # Errors
    ///
    /// Returns an error when the caller may not pull from the registry.
    async fn get_authorization_token(&self) -> Result<String, ApiError>;
}

/// Image manifest probes against an OCI / Docker registry.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Returns `true` when the tag exists in the repository.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RateLimited`] when the registry throttles the request.
    async fn has_image(
        &self,
        repo: &Repository,
        credentials: &RegistryCredentials,
        tag: &str,
    ) -> Result<bool, ApiError>;

    /// Returns `true` when the tag has a manifest for the given platform.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::DeprecatedManifest`] for schema 1 manifests and
    /// [`ApiError::RateLimited`] when throttled.
    async fn has_platform_image(
        &self,
        repo: &Repository,
        credentials: &RegistryCredentials,
        tag: &str,
        arch: &str,
        os: &str,
    ) -> Result<bool, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn official_image_defaults() {
        let (repo, tag) = Repository::parse("nginx");
        assert_eq!(repo.host, "registry-1.docker.io");
        assert_eq!(repo.name, "library/nginx");
        assert_eq!(tag, "latest");
    }

    #[test]
    fn namespaced_hub_image() {
        let (repo, tag) = Repository::parse("grafana/grafana:10.2.0");
        assert_eq!(repo.host, "registry-1.docker.io");
        assert_eq!(repo.name, "grafana/grafana");
        assert_eq!(tag, "10.2.0");
    }

    #[test]
    fn private_registry_with_port() {
        let (repo, tag) = Repository::parse("localhost:5000/team/app");
        assert_eq!(repo.host, "localhost:5000");
        assert_eq!(repo.name, "team/app");
        assert_eq!(tag, "latest");
    }

    #[test]
    fn ecr_image_and_digest() {
        let (repo, tag) =
            Repository::parse("123456789012.dkr.ecr.us-east-1.amazonaws.com/app:v1");
        assert_eq!(repo.host, "123456789012.dkr.ecr.us-east-1.amazonaws.com");
        assert_eq!(repo.name, "app");
        assert_eq!(tag, "v1");

        let (repo, tag) = Repository::parse("ghcr.io/o/app@sha256:abc");
        assert_eq!(repo.name, "o/app");
        assert_eq!(tag, "sha256:abc");
    }
}
