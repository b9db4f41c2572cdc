pub mod error;
pub mod snapshot;
pub mod token;
pub mod upstream;

pub use error::{Error, Result};
pub use snapshot::{ArtifactLink, BuildEntry, BuildSummary, CommitInfo, JobData};
pub use token::{Token, MAX_ARTIFACTS_PER_BUILD};
pub use upstream::{Artifact, Build, BuildReference, BuildResult, GitData, GitRevision, Job};
