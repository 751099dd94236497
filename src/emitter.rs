//! Building-level aggregation and snapshot assembly.
//!
//! Turns one building's synthesized readings into the outbound
//! [`TelemetrySnapshot`]. Current flock metrics are recomputed from the
//! baseline every tick, so nothing here accumulates state between ticks.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::anomaly::{Anomaly, AnomalyKind};
use crate::detection::TEMPERATURE_HIGH_F;
use crate::models::{
    SensorSample, SnapshotEvent, SnapshotMetrics, TelemetrySnapshot, SENSOR_TYPE_AUDIO,
    SENSOR_TYPE_ENVIRONMENTAL,
};
use crate::synthesis::{synthesize_audio, synthesize_reading, AudioSample, SensorReading};
use crate::topology::{zone_id, Building, FlockMetrics};

// ---

/// Value of the snapshot `source` field.
pub const SNAPSHOT_SOURCE: &str = "flocksim";

const WATER_LITERS_PER_BIRD: f64 = 0.25;
const FEED_KG_PER_BIRD: f64 = 0.12;
const HEAT_STRESS_WATER_FACTOR: f64 = 1.5;
const HEAT_STRESS_FEED_FACTOR: f64 = 0.7;

/// Full-progress effect of a fault on the flock performance numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FlockImpact {
    mortality_percent: f64,
    feed_conversion_ratio: f64,
    average_weight_lbs: f64,
}

/// Only these three faults move the flock rollups; climate-control and
/// sensor faults leave them at baseline.
fn flock_impact(kind: AnomalyKind) -> Option<FlockImpact> {
    match kind {
        AnomalyKind::HeatStress => Some(FlockImpact {
            mortality_percent: 1.5,
            feed_conversion_ratio: 0.15,
            average_weight_lbs: -0.25,
        }),
        AnomalyKind::DiseaseOutbreak => Some(FlockImpact {
            mortality_percent: 3.0,
            feed_conversion_ratio: 0.3,
            average_weight_lbs: -0.4,
        }),
        AnomalyKind::VentilationFailure => Some(FlockImpact {
            mortality_percent: 1.0,
            feed_conversion_ratio: 0.1,
            average_weight_lbs: -0.15,
        }),
        AnomalyKind::HvacMalfunction
        | AnomalyKind::EquipmentFailure
        | AnomalyKind::ZoneSensorOutage => None,
    }
}

/// Baseline plus the impact of each contributing fault type, scaled by the
/// furthest-progressed active anomaly of that type.
pub fn derive_flock_metrics(
    baseline: FlockMetrics,
    anomalies: &[Anomaly],
    now: DateTime<Utc>,
) -> FlockMetrics {
    // ---
    let mut current = baseline;
    for kind in AnomalyKind::ALL {
        let Some(impact) = flock_impact(kind) else {
            continue;
        };
        let dominant = anomalies
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.progress(now))
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |m| m.max(p))));
        if let Some(progress) = dominant {
            current.mortality_percent += impact.mortality_percent * progress;
            current.feed_conversion_ratio += impact.feed_conversion_ratio * progress;
            current.average_weight_lbs += impact.average_weight_lbs * progress;
        }
    }
    current
}

/// Mean of the present, non-zero values; `None` if there are none.
fn mean<I: IntoIterator<Item = Option<f64>>>(values: I) -> Option<f64> {
    // ---
    let (sum, count) = values
        .into_iter()
        .flatten()
        .filter(|v| *v != 0.0)
        .fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

fn environmental_sample(reading: &SensorReading) -> SensorSample {
    SensorSample {
        sensor_id: reading.sensor_id.clone(),
        zone: reading.zone_id.clone(),
        sensor_type: SENSOR_TYPE_ENVIRONMENTAL.to_string(),
        temperature_avg_f: reading.temperature_f,
        humidity_percent: reading.humidity_percent,
        co2_ppm: reading.co2_ppm,
        nh3_ppm: reading.nh3_ppm,
        ..Default::default()
    }
}

fn audio_sample(sample: &AudioSample) -> SensorSample {
    SensorSample {
        sensor_id: sample.sensor_id.clone(),
        zone: sample.zone_id.clone(),
        sensor_type: SENSOR_TYPE_AUDIO.to_string(),
        sound_db_avg: sample.sound_db,
        vocalization_rate_per_min: sample.vocalization_rate_per_min,
        bagok_stress_score: sample.stress_score,
        ..Default::default()
    }
}

fn event(building_id: &str, anomaly: &Anomaly) -> SnapshotEvent {
    // ---
    let zones: Vec<String> = anomaly
        .affected_zones
        .iter()
        .map(|&z| zone_id(building_id, z))
        .collect();
    SnapshotEvent {
        event_type: anomaly.kind.name().to_string(),
        severity: anomaly.kind.event_severity(),
        description: format!("{} (zones: {})", anomaly.description, zones.join(", ")),
        occurred_at: anomaly.start,
    }
}

/// Synthesize every reading of `building` at `now` and assemble its snapshot.
///
/// Also refreshes `building.current` from the active anomalies. The caller
/// is expected to have expired anomalies for `now` already.
pub fn build_snapshot<R: Rng + ?Sized>(
    building: &mut Building,
    tenant_id: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> TelemetrySnapshot {
    // ---
    building.current = derive_flock_metrics(building.baseline, &building.anomalies, now);

    let readings: Vec<SensorReading> = building
        .sensors()
        .map(|(zone, sensor)| synthesize_reading(zone, sensor, &building.anomalies, now, rng))
        .collect();
    let audio: Vec<AudioSample> = building
        .zones
        .iter()
        .map(|zone| synthesize_audio(zone, &building.anomalies, now, rng))
        .collect();

    let heat_stress = building
        .anomalies
        .iter()
        .any(|a| a.kind == AnomalyKind::HeatStress);
    let (water_factor, feed_factor) = if heat_stress {
        (HEAT_STRESS_WATER_FACTOR, HEAT_STRESS_FEED_FACTOR)
    } else {
        (1.0, 1.0)
    };
    let birds = f64::from(building.bird_count);

    let affected_zones: BTreeSet<u8> = building
        .anomalies
        .iter()
        .flat_map(|a| a.affected_zones.iter().copied())
        .collect();
    let spikes = readings
        .iter()
        .filter(|r| r.temperature_f.is_some_and(|t| t > TEMPERATURE_HIGH_F))
        .count();

    let metrics = SnapshotMetrics {
        temperature_avg_f: mean(readings.iter().map(|r| r.temperature_f)),
        humidity_percent: mean(readings.iter().map(|r| r.humidity_percent)),
        mortality_percent: Some(building.current.mortality_percent),
        feed_conversion_ratio: Some(building.current.feed_conversion_ratio),
        average_weight_lbs: Some(building.current.average_weight_lbs),
        water_intake_liters: Some(birds * WATER_LITERS_PER_BIRD * water_factor),
        feed_intake_kg: Some(birds * FEED_KG_PER_BIRD * feed_factor),
        temperature_spike_events: spikes as u32,
        co2_avg_ppm: mean(readings.iter().map(|r| r.co2_ppm)),
        nh3_avg_ppm: mean(readings.iter().map(|r| r.nh3_ppm)),
        affected_zone_count: affected_zones.len() as u32,
    };

    let sensors = readings
        .iter()
        .map(environmental_sample)
        .chain(audio.iter().map(audio_sample))
        .collect();
    let events = building
        .anomalies
        .iter()
        .map(|a| event(&building.id, a))
        .collect();

    tracing::debug!(
        building = %building.id,
        anomalies = building.anomalies.len(),
        spikes,
        temperature_avg_f = ?metrics.temperature_avg_f,
        "Snapshot assembled"
    );

    TelemetrySnapshot {
        snapshot_id: Uuid::new_v4().to_string(),
        captured_at: now,
        tenant_id: tenant_id.to_string(),
        flock_id: building.id.clone(),
        source: SNAPSHOT_SOURCE.to_string(),
        ingested_at: None,
        metrics,
        sensors,
        events,
    }
}
