//! Artifact Gateway
//!
//! Serves build listings and expiring artifact downloads for a Jenkins server

use anyhow::{Context, Result};
use artifact_gateway::{
    create_router, AllowAll, AppState, AuthorizationGate, Config, CookieGate, DownloadRegistry,
    JenkinsClient, Orchestrator, OrchestratorSettings,
};
use std::future::IntoFuture;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artifact_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Artifact Gateway");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Configuration loaded");
    info!("  Jenkins server: {}", config.jenkins_server);
    info!("  Snapshot TTL: {}s", config.snapshot_ttl_secs);
    info!("  Download TTL: {}s", config.download_ttl_secs);
    info!("  Sweep interval: {}s", config.sweep_interval_secs);
    info!("  Fetch concurrency: {}", config.fetch_concurrency);

    let client = JenkinsClient::new(
        &config.jenkins_server,
        &config.jenkins_user,
        &config.jenkins_token,
        config.upstream_timeout(),
    )
    .context("Failed to create Jenkins client")?;

    let gate: Arc<dyn AuthorizationGate> = match &config.login_url {
        Some(login_url) => {
            info!("  Login URL: {}", login_url);
            Arc::new(CookieGate::new(login_url, &config.domain))
        }
        None => {
            warn!("LOGIN_URL not set, every caller is authorized");
            Arc::new(AllowAll)
        }
    };

    // Download links outlive listings and are swept in the background
    let downloads = Arc::new(DownloadRegistry::new());
    let sweeper = downloads.spawn_sweeper(config.sweep_interval());

    let orchestrator = Orchestrator::new(
        Arc::new(client),
        downloads,
        OrchestratorSettings {
            snapshot_ttl: config.snapshot_ttl(),
            download_ttl: config.download_ttl(),
            fetch_concurrency: config.fetch_concurrency,
        },
    );

    // Create router
    let app = create_router(AppState { orchestrator, gate });

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Artifact Gateway running on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app).into_future() => {
            if let Err(e) = result {
                error!("Server error: {:#}", e);
            }
        }
        _ = sweeper => {
            error!("Download sweeper terminated unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down Artifact Gateway");

    Ok(())
}
