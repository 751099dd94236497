//! HTTP gateway for the operator control surface and on-demand detection.
//!
//! Each sibling module exports a subrouter; this gateway merges them and
//! attaches the shared simulator as state, so `main.rs` only needs
//! [`router`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;

use crate::{ControlError, SharedSimulator};

mod anomalies;
mod detect;
mod health;

pub use anomalies::InjectRequest;

// ---

pub fn router(simulator: SharedSimulator) -> Router {
    // ---
    Router::new()
        .merge(anomalies::router())
        .merge(detect::router())
        .merge(health::router())
        .with_state(simulator)
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        // ---
        let status = match self {
            ControlError::UnknownBuilding(_) => StatusCode::NOT_FOUND,
            ControlError::InvalidZone { .. } | ControlError::InvalidDuration { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        tracing::warn!(%status, error = %self, "Control command rejected");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
