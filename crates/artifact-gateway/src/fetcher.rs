//! Concurrent retrieval of a project's builds

use artifact_common::{Build, BuildReference, CommitInfo, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::client::CiApi;

/// Raw result of one refresh, before tokens are assigned
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    pub name: String,
    pub builds: Vec<BuildOutcome>,
}

#[derive(Debug, Clone)]
pub enum BuildOutcome {
    Fetched { build: Build, commit: CommitInfo },
    Failed { url: String, reason: String },
}

impl BuildOutcome {
    fn number(&self) -> Option<i64> {
        match self {
            BuildOutcome::Fetched { build, .. } => Some(build.number),
            BuildOutcome::Failed { .. } => None,
        }
    }
}

/// Fans build detail requests out over the tokio runtime.
///
/// At most `concurrency` builds are fetched at once. Dropping the future
/// returned by [`Fetcher::fetch_project_snapshot`] aborts outstanding requests.
pub struct Fetcher {
    client: Arc<dyn CiApi>,
    concurrency: usize,
}

impl Fetcher {
    pub fn new(client: Arc<dyn CiApi>, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn fetch_project_snapshot(&self, project: &str) -> Result<ProjectSnapshot> {
        let job = self.client.get_job(project).await?;
        let references = job.builds;

        info!(
            "Fetching {} builds for project {} ({} at a time)",
            references.len(),
            project,
            self.concurrency
        );

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, reference) in references.iter().cloned().enumerate() {
            let client = Arc::clone(&self.client);
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                (index, fetch_build(client.as_ref(), reference).await)
            });
        }

        let mut slots: Vec<Option<BuildOutcome>> = vec![None; references.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!("Build fetch task for project {} died: {}", project, e),
            }
        }

        let mut builds: Vec<BuildOutcome> = slots
            .into_iter()
            .zip(references)
            .map(|(slot, reference)| {
                slot.unwrap_or_else(|| BuildOutcome::Failed {
                    url: reference.url,
                    reason: "build fetch task did not complete".to_string(),
                })
            })
            .collect();

        // Newest first; failed entries keep their relative order at the end
        builds.sort_by(|a, b| b.number().cmp(&a.number()));

        Ok(ProjectSnapshot {
            name: project.to_string(),
            builds,
        })
    }
}

async fn fetch_build(client: &dyn CiApi, reference: BuildReference) -> BuildOutcome {
    let mut build = match client.get_build(&reference).await {
        Ok(build) => build,
        Err(e) => {
            warn!("Failed to fetch build {}: {}", reference.url, e);
            return BuildOutcome::Failed {
                url: reference.url,
                reason: e.to_string(),
            };
        }
    };

    build.artifacts.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    let commit = match client.get_commit(&build).await {
        Ok(commit) => commit,
        Err(e) => {
            debug!("No commit info for build {}: {}", build.url, e);
            CommitInfo::unknown()
        }
    };

    BuildOutcome::Fetched { build, commit }
}
