//! OCI / Docker registry client over HTTP.
//!
//! Requests start anonymous. A `401` challenge is answered once, either with
//! the caller's credentials directly (`Basic` realms, which is what the
//! private registry issues) or by fetching a bearer token from the realm
//! named in `WWW-Authenticate` (Docker Hub and most other registries).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::ports::{ApiError, RegistryApi, RegistryCredentials, Repository};

const MEDIA_TYPE_MANIFEST_V1: &str = "application/vnd.docker.distribution.manifest.v1+prettyjws";

const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.v2+json, \
    application/vnd.docker.distribution.manifest.list.v2+json, \
    application/vnd.oci.image.manifest.v1+json, \
    application/vnd.oci.image.index.v1+json, \
    application/vnd.docker.distribution.manifest.v1+prettyjws";

static CHALLENGE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Authorization {
    Anonymous,
    Basic { username: String, password: String },
    Encoded(String),
    Bearer(String),
}

impl Authorization {
    fn from_credentials(credentials: &RegistryCredentials) -> Self {
        match credentials {
            RegistryCredentials::Anonymous => Self::Anonymous,
            RegistryCredentials::Basic { username, password } => {
                Self::Basic { username: username.clone(), password: password.clone() }
            }
            RegistryCredentials::Encoded(token) => Self::Encoded(token.clone()),
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Anonymous => request,
            Self::Basic { username, password } => request.basic_auth(username, Some(password)),
            Self::Encoded(token) => request.header(AUTHORIZATION, format!("Basic {token}")),
            Self::Bearer(token) => request.bearer_auth(token),
        }
    }
}

/// A parsed `WWW-Authenticate` header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Challenge {
    scheme: String,
    realm: Option<String>,
    service: Option<String>,
    scope: Option<String>,
}

impl Challenge {
    fn parse(header: &str) -> Self {
        let (scheme, params) = header.trim().split_once(' ').unwrap_or((header.trim(), ""));
        let mut challenge =
            Self { scheme: scheme.to_ascii_lowercase(), realm: None, service: None, scope: None };
        for cap in CHALLENGE_PARAM.captures_iter(params) {
            let value = Some(cap[2].to_string());
            match &cap[1] {
                "realm" => challenge.realm = value,
                "service" => challenge.service = value,
                "scope" => challenge.scope = value,
                _ => {}
            }
        }
        challenge
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct Platform {
    architecture: String,
    os: String,
}

#[derive(Deserialize)]
struct Descriptor {
    digest: String,
    platform: Option<Platform>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    schema_version: Option<u32>,
    media_type: Option<String>,
    #[serde(default)]
    manifests: Vec<Descriptor>,
    config: Option<Descriptor>,
}

#[derive(Deserialize)]
struct ImageConfig {
    architecture: String,
    os: String,
}

fn transport(err: &reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

async fn status_error(response: Response, what: &str) -> ApiError {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ApiError::RateLimited(what.to_string());
    }
    let body = response.text().await.unwrap_or_default();
    ApiError::Service { code: status.as_u16().to_string(), message: format!("{what}: {body}") }
}

/// Registry client speaking the distribution API.
pub struct HttpRegistry {
    client: Client,
}

impl HttpRegistry {
    /// Creates a client with a default `reqwest` connection pool.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    fn base_url(repo: &Repository) -> String {
        let plain = repo.host.starts_with("localhost") || repo.host.starts_with("127.0.0.1");
        let scheme = if plain { "http" } else { "https" };
        format!("{scheme}://{}/v2/{}", repo.host, repo.name)
    }

    async fn fetch_token(
        &self,
        challenge: &Challenge,
        repo: &Repository,
        credentials: &Authorization,
    ) -> Result<Authorization, ApiError> {
        let Some(realm) = &challenge.realm else {
            return Err(ApiError::Service {
                code: "401".into(),
                message: format!("bearer challenge without realm for {}", repo.host),
            });
        };
        let scope =
            challenge.scope.clone().unwrap_or_else(|| format!("repository:{}:pull", repo.name));
        let mut query = vec![("scope", scope)];
        if let Some(service) = &challenge.service {
            query.push(("service", service.clone()));
        }
        let request = self.client.get(realm).query(&query);
        let response = credentials.apply(request).send().await.map_err(|e| transport(&e))?;
        if !response.status().is_success() {
            return Err(status_error(response, &format!("token request to {realm}")).await);
        }
        let body: TokenResponse = response.json().await.map_err(|e| transport(&e))?;
        body.token
            .or(body.access_token)
            .map(Authorization::Bearer)
            .ok_or_else(|| ApiError::Transport(format!("no token in response from {realm}")))
    }

    /// Sends a GET, answering one authentication challenge.
    async fn get(
        &self,
        url: &str,
        accept: &str,
        repo: &Repository,
        credentials: &RegistryCredentials,
    ) -> Result<Response, ApiError> {
        let send = |auth: &Authorization| {
            auth.apply(self.client.get(url).header(ACCEPT, accept)).send()
        };
        let response = send(&Authorization::Anonymous).await.map_err(|e| transport(&e))?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .map(Challenge::parse);
        let provided = Authorization::from_credentials(credentials);
        let auth = match challenge {
            Some(c) if c.scheme == "bearer" => self.fetch_token(&c, repo, &provided).await?,
            _ => provided,
        };
        tracing::debug!(url, "retrying registry request with credentials");
        send(&auth).await.map_err(|e| transport(&e))
    }

    async fn manifest(
        &self,
        repo: &Repository,
        credentials: &RegistryCredentials,
        reference: &str,
    ) -> Result<Option<(String, Manifest)>, ApiError> {
        let url = format!("{}/manifests/{reference}", Self::base_url(repo));
        let response = self.get(&url, MANIFEST_ACCEPT, repo, credentials).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let what = format!("{}/{}:{reference}", repo.host, repo.name);
            return Err(status_error(response, &what).await);
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let manifest: Manifest = response.json().await.map_err(|e| transport(&e))?;
        let media_type = manifest.media_type.clone().unwrap_or(content_type);
        Ok(Some((media_type, manifest)))
    }

    async fn image_config(
        &self,
        repo: &Repository,
        credentials: &RegistryCredentials,
        digest: &str,
    ) -> Result<ImageConfig, ApiError> {
        let url = format!("{}/blobs/{digest}", Self::base_url(repo));
        let response = self.get(&url, "*/*", repo, credentials).await?;
        if !response.status().is_success() {
            let what = format!("{}/{}@{digest}", repo.host, repo.name);
            return Err(status_error(response, &what).await);
        }
        response.json().await.map_err(|e| transport(&e))
    }
}

impl Default for HttpRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryApi for HttpRegistry {
    async fn has_image(
        &self,
        repo: &Repository,
        credentials: &RegistryCredentials,
        tag: &str,
    ) -> Result<bool, ApiError> {
        Ok(self.manifest(repo, credentials, tag).await?.is_some())
    }

    async fn has_platform_image(
        &self,
        repo: &Repository,
        credentials: &RegistryCredentials,
        tag: &str,
        arch: &str,
        os: &str,
    ) -> Result<bool, ApiError> {
        let Some((media_type, manifest)) = self.manifest(repo, credentials, tag).await? else {
            return Ok(false);
        };
        if manifest.schema_version == Some(1) || media_type.starts_with(MEDIA_TYPE_MANIFEST_V1) {
            return Err(ApiError::DeprecatedManifest(format!("{}/{}:{tag}", repo.host, repo.name)));
        }
        if !manifest.manifests.is_empty() {
            return Ok(manifest.manifests.iter().any(|m| {
                m.platform.as_ref().is_some_and(|p| p.architecture == arch && p.os == os)
            }));
        }
        let Some(config) = manifest.config else {
            return Ok(false);
        };
        let image = self.image_config(repo, credentials, &config.digest).await?;
        Ok(image.architecture == arch && image.os == os)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_challenge() {
        let c = Challenge::parse(
            r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/nginx:pull""#,
        );
        assert_eq!(c.scheme, "bearer");
        assert_eq!(c.realm.as_deref(), Some("https://auth.docker.io/token"));
        assert_eq!(c.service.as_deref(), Some("registry.docker.io"));
        assert_eq!(c.scope.as_deref(), Some("repository:library/nginx:pull"));
    }

    #[test]
    fn parses_basic_challenge() {
        let c = Challenge::parse(r#"Basic realm="https://123.dkr.ecr.us-east-1.amazonaws.com/""#);
        assert_eq!(c.scheme, "basic");
        assert_eq!(c.service, None);
    }

    #[test]
    fn base_url_uses_plain_http_for_local_registries() {
        let (repo, _) = Repository::parse("localhost:5000/app:v1");
        assert_eq!(HttpRegistry::base_url(&repo), "http://localhost:5000/v2/app");
        let (repo, _) = Repository::parse("nginx");
        assert_eq!(HttpRegistry::base_url(&repo), "https://registry-1.docker.io/v2/library/nginx");
    }

    #[test]
    fn index_manifest_deserializes_platforms() {
        let manifest: Manifest = serde_json::from_str(
            r#"{"schemaVersion":2,"mediaType":"application/vnd.oci.image.index.v1+json",
                "manifests":[{"digest":"sha256:a","platform":{"architecture":"arm64","os":"linux"}}]}"#,
        )
        .unwrap();
        assert_eq!(manifest.manifests.len(), 1);
        assert!(manifest.config.is_none());
    }
}
