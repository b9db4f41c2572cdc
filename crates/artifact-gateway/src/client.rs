//! Client for the upstream Jenkins API

use artifact_common::{Artifact, Build, BuildReference, CommitInfo, Error, GitData, Job, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const API_SUFFIX: &str = "api/json";

/// An upstream artifact response, ready to be relayed
pub struct ArtifactDownload {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Operations the gateway needs from the CI server
#[async_trait]
pub trait CiApi: Send + Sync {
    /// Build references of a project; `project` may name nested folders (`a/b`)
    async fn get_job(&self, project: &str) -> Result<Job>;

    async fn get_build(&self, reference: &BuildReference) -> Result<Build>;

    /// Commit the build was made from
    async fn get_commit(&self, build: &Build) -> Result<CommitInfo>;

    async fn open_artifact(&self, url: &str) -> Result<ArtifactDownload>;

    fn artifact_url(&self, build: &Build, artifact: &Artifact) -> String {
        format!(
            "{}/artifact/{}",
            build.url.trim_end_matches('/'),
            artifact.relative_path.trim_start_matches('/')
        )
    }
}

/// Jenkins client authenticated with a static user/token pair
pub struct JenkinsClient {
    server: Url,
    user: String,
    token: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl JenkinsClient {
    /// Create a new Jenkins client.
    ///
    /// API calls must complete within `timeout`. Artifact bodies may take
    /// longer as a whole but fail once the upstream stalls for `timeout`.
    pub fn new(server: &str, user: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| Error::Other(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        let mut server = server.to_string();
        if !server.ends_with('/') {
            server.push('/');
        }
        let server = Url::parse(&server)
            .map_err(|e| Error::Other(anyhow::anyhow!("Invalid Jenkins URL {}: {}", server, e)))?;
        if server.cannot_be_a_base() {
            return Err(Error::Other(anyhow::anyhow!(
                "Jenkins URL {} cannot carry a path",
                server
            )));
        }

        Ok(Self {
            server,
            user: user.to_string(),
            token: token.to_string(),
            timeout,
            client,
        })
    }

    /// `<server>/job/a/job/b/api/json` for project `a/b`
    fn job_url(&self, project: &str) -> String {
        let mut url = self.server.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for segment in project.split('/').filter(|s| !s.is_empty()) {
                segments.push("job").push(segment);
            }
            segments.extend(API_SUFFIX.split('/'));
        }
        url.into()
    }

    async fn send(&self, url: &str, deadline: Option<Duration>) -> Result<reqwest::Response> {
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(url)
            .basic_auth(&self.user, Some(&self.token));
        if let Some(deadline) = deadline {
            request = request.timeout(deadline);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::UpstreamTransport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        // The deadline covers reading the body as well
        let response = self.send(url, Some(self.timeout)).await?;

        let bytes = response.bytes().await.map_err(|e| Error::UpstreamTransport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        serde_json::from_slice(&bytes).map_err(|e| Error::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

fn resource_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

#[async_trait]
impl CiApi for JenkinsClient {
    async fn get_job(&self, project: &str) -> Result<Job> {
        self.get_json(&self.job_url(project)).await
    }

    async fn get_build(&self, reference: &BuildReference) -> Result<Build> {
        self.get_json(&resource_url(&reference.url, API_SUFFIX)).await
    }

    async fn get_commit(&self, build: &Build) -> Result<CommitInfo> {
        let git: GitData = self
            .get_json(&resource_url(&build.url, "git/api/json"))
            .await?;
        Ok(CommitInfo::from_git(&git))
    }

    async fn open_artifact(&self, url: &str) -> Result<ArtifactDownload> {
        let response = self.send(url, None).await?;

        Ok(ArtifactDownload {
            status: response.status(),
            headers: response.headers().clone(),
            body: Body::from_stream(response.bytes_stream()),
        })
    }
}
