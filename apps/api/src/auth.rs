//! Authentication gate.
//!
//! Protected routes require `Authorization: Bearer <token>`. Requests without a
//! valid token are redirected to `/auth?next=<original path>`; `/auth` sends an
//! authenticated caller on to `next`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> Option<AuthUser>;
}

/// Fixed token → user table, loaded from `AUTH_TOKENS` (`user:token,user:token`).
pub struct StaticTokenAuth {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuth {
    pub fn from_config(raw: &str) -> Result<Self> {
        let mut tokens = HashMap::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((user, token)) = pair.split_once(':') else {
                bail!("AUTH_TOKENS entry '{pair}' is not of the form user:token");
            };
            let (user, token) = (user.trim(), token.trim());
            if user.is_empty() || token.is_empty() {
                bail!("AUTH_TOKENS entry '{pair}' has an empty user or token");
            }
            tokens.insert(token.to_string(), user.to_string());
        }
        if tokens.is_empty() {
            bail!("AUTH_TOKENS defines no tokens");
        }
        Ok(Self { tokens })
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn authenticate(&self, token: &str) -> Option<AuthUser> {
        self.tokens
            .get(token)
            .map(|user| AuthUser { id: user.clone() })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn current_user(auth: &Arc<dyn AuthProvider>, headers: &HeaderMap) -> Option<AuthUser> {
    match bearer_token(headers) {
        Some(token) => auth.authenticate(token).await,
        None => None,
    }
}

/// Middleware for protected routes. Inserts `AuthUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user) = current_user(&state.auth, request.headers()).await {
        request.extensions_mut().insert(user);
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    warn!("Unauthenticated request to {target}, redirecting to login");
    Redirect::to(&login_redirect(&target)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub next: Option<String>,
}

/// GET /auth
///
/// Forwards an authenticated caller to `next` (default `/`).
pub async fn handle_auth(
    State(state): State<AppState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    match current_user(&state.auth, &headers).await {
        Some(_) => Ok(Redirect::to(&safe_next(query.next.as_deref()))),
        None => Err(AppError::Unauthorized),
    }
}

/// Accepts only local absolute paths so `next` cannot send users off-site.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.chars().any(|c| c.is_control()) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

fn login_redirect(target: &str) -> String {
    let Ok(mut url) = reqwest::Url::parse("http://localhost/auth") else {
        return "/auth".to_string();
    };
    url.query_pairs_mut().append_pair("next", target);
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    }
}
