use axum::{routing::get, Router};

use crate::server::AppState;

use super::health::health;
use super::metrics::prometheus_metrics;
use super::templates::list_course_templates;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        // Catalog endpoints
        .nest(
            "/api/v1",
            Router::new().route("/courses/{course_id}/templates", get(list_course_templates)),
        )
}
