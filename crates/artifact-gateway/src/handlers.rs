//! API request handlers for the Artifact Gateway

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{scope_for, AuthorizationGate};
use crate::orchestrator::Orchestrator;

/// Scope checked for tokens that resolve to nothing
const UNKNOWN_TOKEN_SCOPE: &str = "file";

/// Shared application state
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub gate: Arc<dyn AuthorizationGate>,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn not_found() -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: "Not found".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "artifact-gateway"
    }))
}

/// Build listing for a project
pub async fn project_data_handler(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if !state.gate.is_authorized(&headers, scope_for(&project)).await {
        debug!("Login required for project: {}", project);
        return Ok(state.gate.begin_login(&format!("/{}", project)));
    }

    info!("Listing artifacts for project: {}", project);

    match state.orchestrator.list_artifacts(&project).await {
        Some(data) => Ok(Json(data.as_ref()).into_response()),
        None => Err(ApiError::not_found()),
    }
}

/// Artifact download by token
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let download = state.orchestrator.resolve(&token).await;

    let scope = download
        .as_ref()
        .map_or(UNKNOWN_TOKEN_SCOPE, |d| scope_for(&d.project));
    if !state.gate.is_authorized(&headers, scope).await {
        return Ok(state.gate.begin_login(&format!("/file/{}", token)));
    }

    let Some(download) = download else {
        return Err(ApiError::not_found());
    };

    info!("Downloading {} from project: {}", download.file_name, download.project);

    state
        .orchestrator
        .stream(&download)
        .await
        .ok_or_else(ApiError::not_found)
}
