use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_LATENCY};

/// Record request count and latency per method / route / status.
///
/// Labels use the matched route pattern, not the raw URI, so path
/// parameters never explode label cardinality.
pub async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), &path, &status])
        .inc();
    HTTP_REQUEST_LATENCY
        .with_label_values(&[method.as_str(), &path])
        .observe(started.elapsed().as_secs_f64());

    response
}
