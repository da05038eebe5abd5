use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// The body served by the health check.
pub const HEALTH_BODY: &str = "<p>Server is up!</p>";

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check() -> axum::response::Html<&'static str> {
    axum::response::Html(HEALTH_BODY)
}

/// Creates the Axum router with all the application routes.
pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
}
