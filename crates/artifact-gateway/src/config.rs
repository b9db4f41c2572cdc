//! Configuration management for the Artifact Gateway
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Public base URL the gateway is reachable at
    pub domain: String,

    /// Jenkins base URL
    pub jenkins_server: String,

    /// Jenkins user for basic auth
    pub jenkins_user: String,

    /// Jenkins API token for basic auth
    pub jenkins_token: String,

    /// How long a project listing is served from cache
    pub snapshot_ttl_secs: u64,

    /// How long a download link stays valid
    pub download_ttl_secs: u64,

    /// Period of the download link sweep
    pub sweep_interval_secs: u64,

    /// Maximum number of build fetches in flight per project refresh
    pub fetch_concurrency: usize,

    /// Deadline for every upstream request
    pub upstream_timeout_secs: u64,

    /// External login endpoint; when unset every caller is allowed
    pub login_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("GATEWAY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),

            port: env::var("GATEWAY_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid GATEWAY_PORT")?,

            domain: env::var("GATEWAY_DOMAIN")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            jenkins_server: env::var("JENKINS_SERVER").context("JENKINS_SERVER must be set")?,
            jenkins_user: env::var("JENKINS_USER").context("JENKINS_USER must be set")?,
            jenkins_token: env::var("JENKINS_TOKEN").context("JENKINS_TOKEN must be set")?,

            snapshot_ttl_secs: parse_var("SNAPSHOT_TTL_SECS", 300)?,
            download_ttl_secs: parse_var("DOWNLOAD_TTL_SECS", 3 * 24 * 60 * 60)?,
            sweep_interval_secs: parse_var("SWEEP_INTERVAL_SECS", 60 * 60)?,
            fetch_concurrency: parse_var("FETCH_CONCURRENCY", 16)?,
            upstream_timeout_secs: parse_var("UPSTREAM_TIMEOUT_SECS", 30)?,

            login_url: env::var("LOGIN_URL").ok().filter(|url| !url.trim().is_empty()),
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("GATEWAY_PORT must be greater than 0");
        }

        reqwest::Url::parse(&self.jenkins_server)
            .with_context(|| format!("Invalid JENKINS_SERVER: {}", self.jenkins_server))?;

        if let Some(login_url) = &self.login_url {
            reqwest::Url::parse(login_url)
                .with_context(|| format!("Invalid LOGIN_URL: {}", login_url))?;
        }

        if self.snapshot_ttl_secs == 0 {
            anyhow::bail!("SNAPSHOT_TTL_SECS must be greater than 0");
        }

        if self.download_ttl_secs <= self.snapshot_ttl_secs {
            anyhow::bail!("DOWNLOAD_TTL_SECS must be greater than SNAPSHOT_TTL_SECS");
        }

        if self.sweep_interval_secs == 0 {
            anyhow::bail!("SWEEP_INTERVAL_SECS must be greater than 0");
        }

        if self.fetch_concurrency == 0 {
            anyhow::bail!("FETCH_CONCURRENCY must be greater than 0");
        }

        if self.upstream_timeout_secs == 0 {
            anyhow::bail!("UPSTREAM_TIMEOUT_SECS must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    pub fn download_ttl(&self) -> Duration {
        Duration::from_secs(self.download_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}
