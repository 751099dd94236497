//! Wire data models shared by the generator and the detector.
//!
//! Every type here serializes to the camelCase JSON shape the ingestion
//! endpoint accepts. Optional metric fields are `None` when a sensor had no
//! data that tick; they are omitted from the JSON rather than sent as zero.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// `sensorType` tag of an environmental cluster sample.
pub const SENSOR_TYPE_ENVIRONMENTAL: &str = "environmental";

/// `sensorType` tag of a per-zone bio-acoustic sample.
pub const SENSOR_TYPE_AUDIO: &str = "bagok_audio";

/// One telemetry payload for a building at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    // ---
    pub snapshot_id: String,
    pub captured_at: DateTime<Utc>,
    pub tenant_id: String,
    pub flock_id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: SnapshotMetrics,
    #[serde(default)]
    pub sensors: Vec<SensorSample>,
    #[serde(default)]
    pub events: Vec<SnapshotEvent>,
}

/// Building-level aggregate block of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotMetrics {
    // ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_avg_f: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mortality_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_conversion_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_weight_lbs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_intake_liters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_intake_kg: Option<f64>,
    pub temperature_spike_events: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2_avg_ppm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nh3_avg_ppm: Option<f64>,
    pub affected_zone_count: u32,
}

/// One entry of the snapshot's `sensors` array.
///
/// Environmental samples fill the climate fields, audio samples fill the
/// bio-acoustic ones. Consumers must tolerate any field being absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSample {
    // ---
    pub sensor_id: String,
    pub zone: String,
    pub sensor_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_avg_f: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2_ppm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nh3_ppm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_db_avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocalization_rate_per_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bagok_stress_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_intake_liters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_intake_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mortality_percent: Option<f64>,
}

/// Severity of an emitted snapshot event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Warning,
    Error,
}

/// An active fault reported alongside the readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEvent {
    // ---
    #[serde(rename = "type")]
    pub event_type: String,
    pub severity: EventSeverity,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// Severity of a detected anomaly. Ordered `Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Finding produced by the detection engine, one per anomaly type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyRecord {
    // ---
    /// `tenant:flock:snapshotId:anomalyType`
    pub id: String,
    pub tenant_id: String,
    pub flock_id: String,
    pub snapshot_id: String,
    pub anomaly_type: String,
    pub severity: Severity,
    pub summary: String,
    pub evidence: Vec<Evidence>,
}

/// A single sensor's offending values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    // ---
    pub sensor_id: String,
    pub zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_avg_f: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2_ppm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nh3_ppm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bagok_stress_score: Option<f64>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_json_is_camel_case_and_omits_nulls() {
        // ---
        let snapshot = TelemetrySnapshot {
            snapshot_id: "snap-1".to_string(),
            captured_at: Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap(),
            tenant_id: "tenant-demo".to_string(),
            flock_id: "building-a".to_string(),
            source: "flocksim".to_string(),
            ingested_at: None,
            metrics: SnapshotMetrics {
                temperature_avg_f: Some(80.5),
                ..Default::default()
            },
            sensors: vec![SensorSample {
                sensor_id: "building-a-z3-env".to_string(),
                zone: "building-a-z3".to_string(),
                sensor_type: SENSOR_TYPE_ENVIRONMENTAL.to_string(),
                temperature_avg_f: None,
                co2_ppm: Some(2800.0),
                ..Default::default()
            }],
            events: vec![SnapshotEvent {
                event_type: "VentilationFailure".to_string(),
                severity: EventSeverity::Error,
                description: "fans down".to_string(),
                occurred_at: Utc.with_ymd_and_hms(2025, 3, 26, 18, 0, 0).unwrap(),
            }],
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["snapshotId"], "snap-1");
        assert_eq!(json["flockId"], "building-a");
        assert!(json.get("ingestedAt").is_none());
        assert_eq!(json["metrics"]["temperatureAvgF"], 80.5);
        assert_eq!(json["metrics"]["temperatureSpikeEvents"], 0);
        assert!(json["metrics"].get("co2AvgPpm").is_none());
        assert_eq!(json["sensors"][0]["co2Ppm"], 2800.0);
        assert!(json["sensors"][0].get("temperatureAvgF").is_none());
        assert_eq!(json["events"][0]["type"], "VentilationFailure");
        assert_eq!(json["events"][0]["severity"], "error");
    }

    #[test]
    fn test_sparse_snapshot_deserializes() {
        // ---
        let raw = r#"{
            "snapshotId": "s",
            "capturedAt": "2025-03-26T18:45:00Z",
            "tenantId": "t",
            "flockId": "f",
            "sensors": [{ "sensorId": "x", "zone": "z", "sensorType": "environmental" }]
        }"#;
        let snapshot: TelemetrySnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.sensors.len(), 1);
        assert_eq!(snapshot.sensors[0].temperature_avg_f, None);
        assert_eq!(snapshot.metrics, SnapshotMetrics::default());
        assert!(snapshot.events.is_empty());
    }

    #[test]
    fn test_severity_ordering() {
        // ---
        assert!(Severity::High > Severity::Medium);
        assert_eq!(Severity::High.to_string(), "high");
        assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), "\"medium\"");
        assert!(serde_json::from_str::<Severity>("\"low\"").is_err());
    }
}
