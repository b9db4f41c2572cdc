//! Client-facing view of a project's builds

use serde::Serialize;

use crate::upstream::{BuildResult, GitData};

/// Aggregated, point-in-time view of a project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobData {
    pub name: String,
    pub builds: Vec<BuildEntry>,
}

/// One entry per build reference of the job.
///
/// A build whose detail could not be fetched is kept as `Failed`
/// so the listing still accounts for every reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BuildEntry {
    Fetched(BuildSummary),
    Failed {
        url: String,
        #[serde(skip)]
        reason: String,
    },
}

impl BuildEntry {
    pub fn number(&self) -> Option<i64> {
        match self {
            BuildEntry::Fetched(build) => Some(build.number),
            BuildEntry::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BuildEntry::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSummary {
    pub number: i64,
    pub result: BuildResult,
    pub timestamp: i64,
    pub artifacts: Vec<ArtifactLink>,
    pub commit: CommitInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLink {
    #[serde(rename = "fileName")]
    pub file_name: String,
    /// `/file/<token>`
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub url: String,
}

impl CommitInfo {
    pub const UNKNOWN_HASH: &'static str = "unknown";

    pub fn unknown() -> Self {
        Self {
            hash: Self::UNKNOWN_HASH.to_string(),
            url: String::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.hash == Self::UNKNOWN_HASH
    }

    /// Resolve the commit a build was made from.
    ///
    /// Only a single remote can be turned into a web link; anything else is unknown.
    pub fn from_git(data: &GitData) -> Self {
        let (Some(revision), [remote]) = (&data.last_built_revision, data.remote_urls.as_slice())
        else {
            return Self::unknown();
        };

        Self {
            hash: revision.sha1.clone(),
            url: format!("{}/commit/{}", web_base(remote), revision.sha1),
        }
    }
}

/// Browser URL of a git remote, e.g. `git@github.com:o/r.git` -> `https://github.com/o/r`
fn web_base(remote: &str) -> String {
    let remote = remote.trim().trim_end_matches('/');
    let remote = remote.strip_suffix(".git").unwrap_or(remote);

    if let Some(rest) = remote.strip_prefix("ssh://") {
        let rest = rest.split_once('@').map_or(rest, |(_, host)| host);
        return format!("https://{}", rest);
    }

    if let Some(rest) = remote.strip_prefix("git@") {
        return format!("https://{}", rest.replacen(':', "/", 1));
    }

    remote.to_string()
}
