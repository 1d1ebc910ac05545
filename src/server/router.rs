use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::auth::auth_router;
use super::catalog::catalog_router;
use super::organizations::organization_router;
use super::projects::project_router;
use super::stats::stats_router;
use super::users::user_router;
use crate::auth::TokenGenerator;
use crate::github::GithubClient;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub github: GithubClient,
    pub tokens: TokenGenerator,
    /// Email domain suffixes whose holders may sign in.
    pub allowed_domains: Vec<String>,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", auth_router())
        .nest("/api/v1", user_router())
        .nest("/api/v1", project_router())
        .nest("/api/v1", organization_router())
        .nest("/api/v1", stats_router())
        .nest("/api/v1", catalog_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
