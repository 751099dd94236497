//! Static facility model: buildings, zones, sensors and their baselines.
//!
//! Baselines are drawn once from the injected random source when the
//! topology is built and never change afterwards. The only per-tick state a
//! [`Building`] carries is its list of active anomalies (owned by the
//! lifecycle manager) and the derived current flock metrics.

use std::fmt;

use rand::Rng;
use serde::Serialize;

use crate::anomaly::Anomaly;

// ---

/// Number of zones in every building, numbered `1..=ZONES_PER_BUILDING`.
pub const ZONES_PER_BUILDING: u8 = 6;

/// Qualitative position of a zone along the airflow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZonePosition {
    Inlet,
    Middle,
    Exhaust,
}

impl ZonePosition {
    /// Ordinals 1-2 sit at the inlet, 5-6 at the exhaust end.
    pub fn from_ordinal(ordinal: u8) -> Self {
        if ordinal <= 2 {
            ZonePosition::Inlet
        } else if ordinal >= 5 {
            ZonePosition::Exhaust
        } else {
            ZonePosition::Middle
        }
    }
}

impl fmt::Display for ZonePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZonePosition::Inlet => write!(f, "inlet"),
            ZonePosition::Middle => write!(f, "middle"),
            ZonePosition::Exhaust => write!(f, "exhaust"),
        }
    }
}

/// Environmental sensor cluster with fixed baselines.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    // ---
    pub id: String,
    pub zone_id: String,
    pub kind: String,
    pub baseline_temperature_f: f64,
    pub baseline_humidity_percent: f64,
    pub baseline_co2_ppm: f64,
    pub baseline_nh3_ppm: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    // ---
    pub id: String,
    pub ordinal: u8,
    pub position: ZonePosition,
    pub building_id: String,
    pub sensors: Vec<Sensor>,
}

/// Building-level flock performance values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockMetrics {
    // ---
    pub mortality_percent: f64,
    pub feed_conversion_ratio: f64,
    pub average_weight_lbs: f64,
}

#[derive(Debug, Clone)]
pub struct Building {
    // ---
    pub id: String,
    pub bird_count: u32,
    pub zones: Vec<Zone>,
    pub baseline: FlockMetrics,
    pub current: FlockMetrics,
    pub(crate) anomalies: Vec<Anomaly>,
}

impl Building {
    /// Active anomalies as of the last lifecycle tick or injection.
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn zone(&self, ordinal: u8) -> Option<&Zone> {
        self.zones.iter().find(|z| z.ordinal == ordinal)
    }

    pub fn sensors(&self) -> impl Iterator<Item = (&Zone, &Sensor)> {
        self.zones
            .iter()
            .flat_map(|zone| zone.sensors.iter().map(move |sensor| (zone, sensor)))
    }
}

/// Zone id derived from building id and ordinal.
pub fn zone_id(building_id: &str, ordinal: u8) -> String {
    format!("{building_id}-z{ordinal}")
}

/// Build one [`Building`] per id, six zones each, one sensor per zone.
///
/// Deterministic for a given seeded `rng`.
pub fn build_topology<R: Rng + ?Sized>(building_ids: &[String], rng: &mut R) -> Vec<Building> {
    // ---
    building_ids
        .iter()
        .map(|id| build_building(id, rng))
        .collect()
}

fn build_building<R: Rng + ?Sized>(building_id: &str, rng: &mut R) -> Building {
    // ---
    let zones = (1..=ZONES_PER_BUILDING)
        .map(|ordinal| {
            let id = zone_id(building_id, ordinal);
            let sensor = Sensor {
                id: format!("{id}-env"),
                zone_id: id.clone(),
                kind: "environmental".to_string(),
                baseline_temperature_f: rng.gen_range(78.0..=82.0),
                baseline_humidity_percent: rng.gen_range(55.0..=65.0),
                baseline_co2_ppm: rng.gen_range(2500.0..=3000.0),
                baseline_nh3_ppm: rng.gen_range(15.0..=25.0),
            };
            Zone {
                id,
                ordinal,
                position: ZonePosition::from_ordinal(ordinal),
                building_id: building_id.to_string(),
                sensors: vec![sensor],
            }
        })
        .collect();

    let baseline = FlockMetrics {
        mortality_percent: rng.gen_range(0.5..=1.0),
        feed_conversion_ratio: rng.gen_range(1.7..=2.0),
        average_weight_lbs: rng.gen_range(4.5..=5.0),
    };

    Building {
        id: building_id.to_string(),
        bird_count: rng.gen_range(18_000..=22_000),
        zones,
        baseline,
        current: baseline,
        anomalies: Vec::new(),
    }
}
