//! API layer -- axum routes, handlers, and middleware.

mod routes;
pub mod state;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use self::state::AppState;

/// Build the application router with all API routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(fallback)
        .with_state(state)
}

/// CORS for the dashboard frontend: explicit origins from config, any
/// method/header. Origins that do not parse are skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let mut allowed: Vec<HeaderValue> = Vec::new();
    for origin in origins {
        match origin.parse::<HeaderValue>() {
            Ok(value) => allowed.push(value),
            Err(_) => warn!(%origin, "ignoring unparsable CORS origin"),
        }
    }
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn fallback() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::NOT_FOUND, "not found")
}
