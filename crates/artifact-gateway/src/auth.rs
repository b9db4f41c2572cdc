//! Authorization gate consulted before serving listings or files
//!
//! The login flow itself lives elsewhere; the gateway only needs a yes/no
//! answer for a scope and a way to send the caller off to log in.

use async_trait::async_trait;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use tracing::{debug, error};

#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    async fn is_authorized(&self, headers: &HeaderMap, scope: &str) -> bool;

    /// Start a login that brings the caller back to `return_path`
    fn begin_login(&self, return_path: &str) -> Response;
}

/// Scope of a project path: its first segment
pub fn scope_for(path: &str) -> &str {
    let path = path.trim_start_matches('/');
    path.split('/').next().unwrap_or_default()
}

/// Lets everyone through
pub struct AllowAll;

#[async_trait]
impl AuthorizationGate for AllowAll {
    async fn is_authorized(&self, _headers: &HeaderMap, _scope: &str) -> bool {
        true
    }

    fn begin_login(&self, _return_path: &str) -> Response {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// Trusts a session cookie named after the scope, set by the external login flow
pub struct CookieGate {
    login_url: String,
    domain: String,
}

impl CookieGate {
    pub fn new(login_url: &str, domain: &str) -> Self {
        Self {
            login_url: login_url.to_string(),
            domain: domain.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AuthorizationGate for CookieGate {
    async fn is_authorized(&self, headers: &HeaderMap, scope: &str) -> bool {
        if scope.is_empty() {
            return false;
        }

        let found = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.split_once('='))
            .any(|(name, _)| name.trim().eq_ignore_ascii_case(scope));

        debug!("Session cookie for scope {}: {}", scope, found);
        found
    }

    fn begin_login(&self, return_path: &str) -> Response {
        let target = format!("{}{}", self.domain, return_path);

        match reqwest::Url::parse_with_params(&self.login_url, &[("return", target.as_str())]) {
            Ok(url) => Redirect::to(url.as_str()).into_response(),
            Err(e) => {
                error!("Invalid login URL {}: {}", self.login_url, e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
