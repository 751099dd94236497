//! `POST /detect`: run the rule engine over a snapshot supplied by any producer.

use axum::{routing::post, Json, Router};

use crate::{detect, AnomalyRecord, TelemetrySnapshot};

// ---

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/detect", post(handler))
}

async fn handler(Json(snapshot): Json<TelemetrySnapshot>) -> Json<Vec<AnomalyRecord>> {
    // ---
    tracing::info!(
        flock = %snapshot.flock_id,
        snapshot = %snapshot.snapshot_id,
        sensors = snapshot.sensors.len(),
        "POST /detect"
    );
    Json(detect(&snapshot))
}
