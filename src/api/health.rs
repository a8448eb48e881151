//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub tier: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresHealthResponse>,
}

#[derive(Debug, Serialize)]
pub struct PostgresHealthResponse {
    pub connected: bool,
    pub pool_size: u32,
    pub idle_connections: u32,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = state.start_time.elapsed().as_secs();

    let postgres = state.postgres_pool.as_ref().map(|pool| {
        let inner = pool.pool();
        PostgresHealthResponse {
            connected: !inner.is_closed(),
            pool_size: inner.size(),
            idle_connections: inner.num_idle() as u32,
        }
    });

    let status = match &postgres {
        Some(p) if !p.connected => "degraded",
        _ => "healthy",
    };

    let tier = if state.settings.catalog.pro_enabled {
        "pro"
    } else {
        "free"
    };
    let backend = if state.postgres_pool.is_some() {
        "postgres"
    } else {
        "memory"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        tier: tier.to_string(),
        backend: backend.to_string(),
        postgres,
    })
}
