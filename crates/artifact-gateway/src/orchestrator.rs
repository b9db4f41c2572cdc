//! Listing and download entry points
//!
//! Composes the fetcher, snapshot cache and download registry. Concurrent
//! misses for one project share a single in-flight refresh.

use artifact_common::{
    ArtifactLink, BuildEntry, BuildSummary, Error, JobData, Token, MAX_ARTIFACTS_PER_BUILD,
};
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::Response;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use crate::client::CiApi;
use crate::download_registry::{DownloadDescriptor, DownloadRegistry};
use crate::fetcher::{BuildOutcome, Fetcher, ProjectSnapshot};
use crate::snapshot_cache::{CacheLookup, SnapshotCache};

/// Headers that describe the upstream connection rather than the artifact
const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
];

type InFlight = Arc<OnceCell<Option<Arc<JobData>>>>;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub snapshot_ttl: Duration,
    pub download_ttl: Duration,
    pub fetch_concurrency: usize,
}

pub struct Orchestrator {
    client: Arc<dyn CiApi>,
    fetcher: Fetcher,
    snapshots: SnapshotCache,
    downloads: Arc<DownloadRegistry>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn CiApi>,
        downloads: Arc<DownloadRegistry>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(Arc::clone(&client), settings.fetch_concurrency),
            client,
            snapshots: SnapshotCache::new(),
            downloads,
            in_flight: Mutex::new(HashMap::new()),
            settings,
        }
    }

    pub fn downloads(&self) -> &Arc<DownloadRegistry> {
        &self.downloads
    }

    /// Listing for `project`, or `None` when it cannot be produced.
    ///
    /// Failures are logged here; callers only learn that nothing was found.
    pub async fn list_artifacts(&self, project: &str) -> Option<Arc<JobData>> {
        let project = project.trim_matches('/');
        if project.is_empty() {
            return None;
        }

        if let CacheLookup::Fresh(data) = self.snapshots.get(project).await {
            return Some(data);
        }

        let cell = {
            let mut in_flight = self.in_flight.lock().await;
            Arc::clone(in_flight.entry(project.to_string()).or_default())
        };

        let result = cell.get_or_init(|| self.refresh(project)).await.clone();

        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .get(project)
            .is_some_and(|current| Arc::ptr_eq(current, &cell))
        {
            in_flight.remove(project);
        }

        result
    }

    async fn refresh(&self, project: &str) -> Option<Arc<JobData>> {
        // A refresh that finished just before this one started
        if let CacheLookup::Fresh(data) = self.snapshots.get(project).await {
            return Some(data);
        }

        let snapshot = match self.fetcher.fetch_project_snapshot(project).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Failed to fetch project {}: {}", project, e);
                return None;
            }
        };

        let (data, downloads) = self.publish(snapshot);
        let links = downloads.len();

        self.downloads
            .register_all(downloads, self.settings.download_ttl)
            .await;

        let data = Arc::new(data);
        self.snapshots
            .put(project, Arc::clone(&data), self.settings.snapshot_ttl)
            .await;

        info!(
            "Refreshed project {}: {} builds, {} download links",
            project,
            data.builds.len(),
            links
        );

        Some(data)
    }

    /// Assign tokens and build the client-facing listing
    fn publish(&self, snapshot: ProjectSnapshot) -> (JobData, Vec<(Token, DownloadDescriptor)>) {
        let mut downloads = Vec::new();
        let mut builds = Vec::with_capacity(snapshot.builds.len());

        for outcome in snapshot.builds {
            let (build, commit) = match outcome {
                BuildOutcome::Fetched { build, commit } => (build, commit),
                BuildOutcome::Failed { url, reason } => {
                    builds.push(BuildEntry::Failed { url, reason });
                    continue;
                }
            };

            if build.artifacts.len() > MAX_ARTIFACTS_PER_BUILD {
                let reason = Error::TooManyArtifacts {
                    count: build.artifacts.len(),
                    limit: MAX_ARTIFACTS_PER_BUILD,
                }
                .to_string();
                warn!("Rejecting build {} of {}: {}", build.number, snapshot.name, reason);
                builds.push(BuildEntry::Failed {
                    url: build.url,
                    reason,
                });
                continue;
            }

            let mut artifacts = Vec::with_capacity(build.artifacts.len());
            for (ordinal, artifact) in (0..=u8::MAX).zip(&build.artifacts) {
                let token = Token::encode(build.timestamp, ordinal);

                artifacts.push(ArtifactLink {
                    file_name: artifact.file_name.clone(),
                    path: token.download_path(),
                });
                downloads.push((
                    token,
                    DownloadDescriptor {
                        url: self.client.artifact_url(&build, artifact),
                        file_name: artifact.file_name.clone(),
                        project: snapshot.name.clone(),
                    },
                ));
            }

            builds.push(BuildEntry::Fetched(BuildSummary {
                number: build.number,
                result: build.result,
                timestamp: build.timestamp,
                artifacts,
                commit,
            }));
        }

        // Rejected builds move behind the fetched ones
        builds.sort_by(|a, b| b.number().cmp(&a.number()));

        let data = JobData {
            name: snapshot.name,
            builds,
        };
        (data, downloads)
    }

    /// Look a token up; expired bindings resolve until the next sweep
    pub async fn resolve(&self, token: &str) -> Option<DownloadDescriptor> {
        self.downloads.resolve(token).await
    }

    /// Relay the upstream artifact, forcing the original file name
    pub async fn stream(&self, download: &DownloadDescriptor) -> Option<Response> {
        let upstream = match self.client.open_artifact(&download.url).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!("Failed to open artifact {}: {}", download.url, e);
                return None;
            }
        };

        let mut response = Response::new(upstream.body);
        *response.status_mut() = upstream.status;

        let headers = response.headers_mut();
        for (name, value) in upstream.headers.iter() {
            if !HOP_BY_HOP.contains(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        headers.insert(
            header::CONTENT_DISPOSITION,
            attachment_header(&download.file_name),
        );

        Some(response)
    }
}

fn attachment_header(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();

    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
