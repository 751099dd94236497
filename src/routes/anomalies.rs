//! Operator commands: inject a fault, reset everything, show status.
//!
//! All handlers lock the shared simulator, so they run strictly between
//! ticks and never see a half-updated anomaly list.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::anomaly::Injection;
use crate::lifecycle::{AnomalyStatus, BuildingStatus};
use crate::{ControlError, SharedSimulator};

// ---

pub fn router() -> Router<SharedSimulator> {
    // ---
    Router::new().route("/anomalies", get(status).post(inject).delete(reset))
}

/// Body of `POST /anomalies`, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InjectRequest {
    HeatStress {
        building: String,
        duration_minutes: i64,
    },
    DiseaseOutbreak {
        building: String,
        origin_zone: u8,
        duration_minutes: i64,
    },
    VentilationFailure {
        building: String,
        duration_minutes: i64,
    },
    HvacMalfunction {
        building: String,
        duration_minutes: i64,
    },
    EquipmentFailure {
        building: String,
        zone: u8,
    },
    ZoneSensorOutage {
        building: String,
        zone: u8,
        duration_minutes: i64,
    },
}

fn minutes(value: i64) -> Result<Duration, ControlError> {
    Duration::try_minutes(value).ok_or(ControlError::InvalidDuration { minutes: value })
}

impl InjectRequest {
    /// Split into the target building and the typed injection.
    pub fn into_parts(self) -> Result<(String, Injection), ControlError> {
        // ---
        Ok(match self {
            InjectRequest::HeatStress {
                building,
                duration_minutes,
            } => (
                building,
                Injection::HeatStress {
                    duration: minutes(duration_minutes)?,
                },
            ),
            InjectRequest::DiseaseOutbreak {
                building,
                origin_zone,
                duration_minutes,
            } => (
                building,
                Injection::DiseaseOutbreak {
                    origin_zone,
                    duration: minutes(duration_minutes)?,
                },
            ),
            InjectRequest::VentilationFailure {
                building,
                duration_minutes,
            } => (
                building,
                Injection::VentilationFailure {
                    duration: minutes(duration_minutes)?,
                },
            ),
            InjectRequest::HvacMalfunction {
                building,
                duration_minutes,
            } => (
                building,
                Injection::HvacMalfunction {
                    duration: minutes(duration_minutes)?,
                },
            ),
            InjectRequest::EquipmentFailure { building, zone } => {
                (building, Injection::EquipmentFailure { zone })
            }
            InjectRequest::ZoneSensorOutage {
                building,
                zone,
                duration_minutes,
            } => (
                building,
                Injection::ZoneSensorOutage {
                    zone,
                    duration: minutes(duration_minutes)?,
                },
            ),
        })
    }
}

async fn status(State(simulator): State<SharedSimulator>) -> Json<Vec<BuildingStatus>> {
    // ---
    let sim = simulator.lock().await;
    Json(sim.status(Utc::now()))
}

async fn inject(
    State(simulator): State<SharedSimulator>,
    Json(request): Json<InjectRequest>,
) -> Result<(StatusCode, Json<AnomalyStatus>), ControlError> {
    // ---
    let (building, injection) = request.into_parts()?;
    let now = Utc::now();
    let mut sim = simulator.lock().await;
    let anomaly = sim.inject(&building, injection, now)?;
    Ok((
        StatusCode::CREATED,
        Json(AnomalyStatus::new(&building, &anomaly, now)),
    ))
}

async fn reset(State(simulator): State<SharedSimulator>) -> StatusCode {
    // ---
    simulator.lock().await.reset_all();
    StatusCode::NO_CONTENT
}
