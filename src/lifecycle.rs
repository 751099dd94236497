//! Anomaly lifecycle manager.
//!
//! Owns the buildings and is the only code that adds or removes entries in
//! their active-anomaly lists. An anomaly has exactly one transition: it is
//! active while `now < end` and is removed by the first [`LifecycleManager::tick`]
//! at or after its end time. Expiry is evaluated lazily per tick.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::anomaly::{Anomaly, AnomalyKind, Injection};
use crate::error::ControlError;
use crate::topology::{zone_id, Building};

// ---

/// Read-only view of one active anomaly for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyStatus {
    // ---
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub affected_zones: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_zone: Option<String>,
    pub description: String,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub remaining_secs: i64,
}

impl AnomalyStatus {
    pub fn new(building_id: &str, anomaly: &Anomaly, now: DateTime<Utc>) -> Self {
        // ---
        Self {
            kind: anomaly.kind,
            affected_zones: anomaly
                .affected_zones
                .iter()
                .map(|&z| zone_id(building_id, z))
                .collect(),
            origin_zone: anomaly.origin_zone.map(|z| zone_id(building_id, z)),
            description: anomaly.description.clone(),
            started_at: anomaly.start,
            ends_at: anomaly.end,
            remaining_secs: anomaly.remaining(now).num_seconds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingStatus {
    // ---
    pub building_id: String,
    pub anomalies: Vec<AnomalyStatus>,
}

pub struct LifecycleManager {
    buildings: Vec<Building>,
}

impl LifecycleManager {
    pub fn new(buildings: Vec<Building>) -> Self {
        Self { buildings }
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn building(&self, building_id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == building_id)
    }

    pub(crate) fn buildings_mut(&mut self) -> &mut [Building] {
        &mut self.buildings
    }

    /// Start a new anomaly in `building_id` at `now`.
    ///
    /// Fails if the building is unknown or the injection parameters are out
    /// of range; the active lists are untouched in that case.
    pub fn inject(
        &mut self,
        building_id: &str,
        injection: Injection,
        now: DateTime<Utc>,
    ) -> Result<Anomaly, ControlError> {
        // ---
        let building = self
            .buildings
            .iter_mut()
            .find(|b| b.id == building_id)
            .ok_or_else(|| ControlError::UnknownBuilding(building_id.to_string()))?;

        let anomaly = injection.resolve(now)?;
        tracing::info!(
            building = %building.id,
            kind = %anomaly.kind,
            zones = ?anomaly.affected_zones,
            ends_at = %anomaly.end,
            "Anomaly injected"
        );
        building.anomalies.push(anomaly.clone());
        Ok(anomaly)
    }

    /// Drop every anomaly whose end time has been reached.
    ///
    /// Returns the number of anomalies removed across all buildings.
    pub fn tick(&mut self, now: DateTime<Utc>) -> usize {
        // ---
        let mut expired = 0;
        for building in &mut self.buildings {
            let building_id = &building.id;
            building.anomalies.retain(|anomaly| {
                let keep = anomaly.is_active(now);
                if !keep {
                    tracing::info!(
                        building = %building_id,
                        kind = %anomaly.kind,
                        "Anomaly expired"
                    );
                    expired += 1;
                }
                keep
            });
        }
        expired
    }

    pub fn reset_all(&mut self) {
        // ---
        let cleared: usize = self
            .buildings
            .iter_mut()
            .map(|b| {
                let n = b.anomalies.len();
                b.anomalies.clear();
                n
            })
            .sum();
        tracing::info!(cleared, "All anomalies reset");
    }

    pub fn active_anomalies(&self, building_id: &str) -> Result<&[Anomaly], ControlError> {
        self.building(building_id)
            .map(Building::anomalies)
            .ok_or_else(|| ControlError::UnknownBuilding(building_id.to_string()))
    }

    /// Per-building list of active anomalies with time remaining at `now`.
    pub fn status(&self, now: DateTime<Utc>) -> Vec<BuildingStatus> {
        // ---
        self.buildings
            .iter()
            .map(|building| BuildingStatus {
                building_id: building.id.clone(),
                anomalies: building
                    .anomalies
                    .iter()
                    .map(|a| AnomalyStatus::new(&building.id, a, now))
                    .collect(),
            })
            .collect()
    }
}
