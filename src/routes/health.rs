// src/routes/health.rs
//! Liveness endpoint for the flocksim control surface.
//!
//! Container orchestrators and the demo's deploy scripts poll `/health` to
//! check that the service is up. It follows the same gateway layout as the
//! other route modules: the handler stays private and only the subrouter is
//! exported to `mod.rs`.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Handle `GET /health`.
///
/// Does not touch the simulator lock, so it answers even while a tick is
/// in progress.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Create a subrouter containing the `/health` route.
///
/// Generic over the application state so it merges into the gateway router
/// whatever the state type is.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
