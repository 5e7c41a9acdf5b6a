//! Axum Handlers for the plain HTTP endpoints.

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
