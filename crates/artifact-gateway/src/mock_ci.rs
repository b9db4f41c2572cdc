//! In-memory CI server for unit tests

use artifact_common::{
    Artifact, Build, BuildReference, BuildResult, CommitInfo, Error, GitData, GitRevision, Job,
    Result,
};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::client::{ArtifactDownload, CiApi};

const BASE_URL: &str = "http://ci.test";

#[derive(Debug, Clone)]
pub struct MockBuild {
    number: i64,
    timestamp: i64,
    artifacts: Vec<String>,
    commit: Option<String>,
    failing: bool,
    failing_commit: bool,
}

impl MockBuild {
    pub fn new(number: i64, timestamp: i64) -> Self {
        Self {
            number,
            timestamp,
            artifacts: Vec::new(),
            commit: None,
            failing: false,
            failing_commit: false,
        }
    }

    pub fn artifacts(mut self, names: &[&str]) -> Self {
        self.artifacts = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn commit(mut self, sha: &str) -> Self {
        self.commit = Some(sha.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.failing_commit = true;
        self
    }
}

#[derive(Default)]
pub struct MockCi {
    projects: HashMap<String, Vec<String>>,
    builds: HashMap<String, MockBuild>,
    delay: Option<Duration>,
    job_fetches: AtomicUsize,
    build_fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockCi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, name: &str, builds: Vec<MockBuild>) -> Self {
        let mut urls = Vec::with_capacity(builds.len());
        for build in builds {
            let url = build_url(name, build.number);
            urls.push(url.clone());
            self.builds.insert(url, build);
        }
        self.projects.insert(name.to_string(), urls);
        self
    }

    /// Delay every job and build request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn job_fetches(&self) -> usize {
        self.job_fetches.load(Ordering::SeqCst)
    }

    /// `get_build` calls started so far
    pub fn build_fetches(&self) -> usize {
        self.build_fetches.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Counts a build request as in flight until dropped, even when aborted
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn build_url(project: &str, number: i64) -> String {
    format!("{}/job/{}/{}/", BASE_URL, project, number)
}

#[async_trait]
impl CiApi for MockCi {
    async fn get_job(&self, project: &str) -> Result<Job> {
        self.job_fetches.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        let urls = self.projects.get(project).ok_or_else(|| Error::UpstreamStatus {
            url: format!("{}/job/{}/api/json", BASE_URL, project),
            status: 404,
        })?;

        Ok(Job {
            builds: urls
                .iter()
                .map(|url| BuildReference { url: url.clone() })
                .collect(),
        })
    }

    async fn get_build(&self, reference: &BuildReference) -> Result<Build> {
        self.build_fetches.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlightGuard(&self.in_flight);
        self.pause().await;
        drop(guard);

        let mock = self
            .builds
            .get(&reference.url)
            .filter(|b| !b.failing)
            .ok_or_else(|| Error::UpstreamStatus {
                url: format!("{}api/json", reference.url),
                status: 500,
            })?;

        Ok(Build {
            url: reference.url.clone(),
            number: mock.number,
            result: BuildResult::Success,
            timestamp: mock.timestamp,
            artifacts: mock
                .artifacts
                .iter()
                .map(|name| Artifact {
                    file_name: name.clone(),
                    relative_path: format!("out/{}", name),
                })
                .collect(),
        })
    }

    async fn get_commit(&self, build: &Build) -> Result<CommitInfo> {
        let mock = self
            .builds
            .get(&build.url)
            .filter(|b| !b.failing_commit)
            .ok_or_else(|| Error::UpstreamStatus {
                url: format!("{}git/api/json", build.url),
                status: 404,
            })?;

        let git = GitData {
            last_built_revision: mock.commit.as_ref().map(|sha| GitRevision { sha1: sha.clone() }),
            remote_urls: vec!["https://github.com/dags-/demo.git".to_string()],
        };
        Ok(CommitInfo::from_git(&git))
    }

    async fn open_artifact(&self, url: &str) -> Result<ArtifactDownload> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/zip"),
        );

        Ok(ArtifactDownload {
            status: StatusCode::OK,
            headers,
            body: Body::from(format!("bytes of {}", url)),
        })
    }
}
