use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Upstream request to {url} failed: {message}")]
    UpstreamTransport { url: String, message: String },

    #[error("Failed to decode upstream payload from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Build has {count} artifacts but only {limit} are addressable")]
    TooManyArtifacts { count: usize, limit: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
