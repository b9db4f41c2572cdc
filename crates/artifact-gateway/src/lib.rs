//! Artifact Gateway
//!
//! Browse a Jenkins project's build artifacts and download them through
//! expiring, unguessable links without handing out CI credentials.
//!
//! ## Architecture
//!
//! - `client`: Jenkins API client (basic auth, request deadlines)
//! - `fetcher`: capped concurrent fan-out over a project's builds
//! - `snapshot_cache`: per-project listing cache with lazy expiry
//! - `download_registry`: token bindings with a periodic sweep
//! - `orchestrator`: listing and download entry points, single-flight refresh
//! - `auth`: authorization gate seam
//!
//! ## Endpoints
//!
//! - `GET /data/{project}` - Build listing, artifact paths rewritten to `/file/{token}`
//! - `GET /file/{token}` - Artifact bytes, downloaded under the original name
//! - `GET /health` - Health check

pub mod auth;
pub mod client;
pub mod config;
pub mod download_registry;
pub mod fetcher;
pub mod handlers;
pub mod orchestrator;
pub mod snapshot_cache;

#[cfg(test)]
mod mock_ci;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use auth::{AllowAll, AuthorizationGate, CookieGate};
pub use client::{CiApi, JenkinsClient};
pub use config::Config;
pub use download_registry::DownloadRegistry;
pub use handlers::AppState;
pub use orchestrator::{Orchestrator, OrchestratorSettings};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/data/{*project}", get(handlers::project_data_handler))
        .route("/file/{token}", get(handlers::download_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
