//! Rule-based anomaly detection over an ingested snapshot.
//!
//! [`detect`] is a pure function: it evaluates a fixed table of threshold
//! rules against every sensor sample, merges the hits per anomaly type and
//! returns them in a deterministic order. The thresholds are the same public
//! limits the simulator's fault models are designed to cross.

use std::collections::BTreeMap;
use std::fmt;

use crate::models::{AnomalyRecord, Evidence, SensorSample, Severity, TelemetrySnapshot};

// ---

pub const TEMPERATURE_HIGH_F: f64 = 92.0;
pub const TEMPERATURE_LOW_F: f64 = 70.0;
pub const HUMIDITY_HIGH_PERCENT: f64 = 75.0;
pub const HUMIDITY_LOW_PERCENT: f64 = 40.0;
pub const CO2_HIGH_PPM: f64 = 3000.0;
pub const NH3_HIGH_PPM: f64 = 25.0;
pub const STRESS_HIGH_SCORE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    Temperature,
    Humidity,
    Co2,
    Nh3,
    Stress,
}

impl Metric {
    fn read(&self, sample: &SensorSample) -> Option<f64> {
        match self {
            Metric::Temperature => sample.temperature_avg_f,
            Metric::Humidity => sample.humidity_percent,
            Metric::Co2 => sample.co2_ppm,
            Metric::Nh3 => sample.nh3_ppm,
            Metric::Stress => sample.bagok_stress_score,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Co2 => "CO2",
            Metric::Nh3 => "NH3",
            Metric::Stress => "bagok stress score",
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°F",
            Metric::Humidity => "%",
            Metric::Co2 | Metric::Nh3 => "ppm",
            Metric::Stress => "",
        }
    }

    /// Evidence entry carrying only the offending value.
    fn evidence(&self, sample: &SensorSample, value: f64, reason: String) -> Evidence {
        // ---
        let mut evidence = Evidence {
            sensor_id: sample.sensor_id.clone(),
            zone: sample.zone.clone(),
            temperature_avg_f: None,
            humidity_percent: None,
            co2_ppm: None,
            nh3_ppm: None,
            bagok_stress_score: None,
            reason,
        };
        let slot = match self {
            Metric::Temperature => &mut evidence.temperature_avg_f,
            Metric::Humidity => &mut evidence.humidity_percent,
            Metric::Co2 => &mut evidence.co2_ppm,
            Metric::Nh3 => &mut evidence.nh3_ppm,
            Metric::Stress => &mut evidence.bagok_stress_score,
        };
        *slot = Some(value);
        evidence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    GreaterThan,
    LessThan,
    GreaterEqual,
}

impl CompareOp {
    fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::GreaterEqual => value >= threshold,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GreaterThan => write!(f, "above"),
            Self::LessThan => write!(f, "below"),
            Self::GreaterEqual => write!(f, "at or above"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    anomaly_type: &'static str,
    metric: Metric,
    op: CompareOp,
    threshold: f64,
    severity: Severity,
}

impl Rule {
    fn reason(&self, value: f64) -> String {
        let unit = self.metric.unit();
        format!(
            "{} {:.2}{} is {} the {}{} limit",
            self.metric.label(),
            value,
            unit,
            self.op,
            self.threshold,
            unit
        )
    }
}

const RULES: [Rule; 7] = [
    Rule {
        anomaly_type: "temperature_high",
        metric: Metric::Temperature,
        op: CompareOp::GreaterThan,
        threshold: TEMPERATURE_HIGH_F,
        severity: Severity::High,
    },
    Rule {
        anomaly_type: "temperature_low",
        metric: Metric::Temperature,
        op: CompareOp::LessThan,
        threshold: TEMPERATURE_LOW_F,
        severity: Severity::High,
    },
    Rule {
        anomaly_type: "humidity_high",
        metric: Metric::Humidity,
        op: CompareOp::GreaterThan,
        threshold: HUMIDITY_HIGH_PERCENT,
        severity: Severity::Medium,
    },
    Rule {
        anomaly_type: "humidity_low",
        metric: Metric::Humidity,
        op: CompareOp::LessThan,
        threshold: HUMIDITY_LOW_PERCENT,
        severity: Severity::Medium,
    },
    Rule {
        anomaly_type: "co2_high",
        metric: Metric::Co2,
        op: CompareOp::GreaterThan,
        threshold: CO2_HIGH_PPM,
        severity: Severity::High,
    },
    Rule {
        anomaly_type: "nh3_high",
        metric: Metric::Nh3,
        op: CompareOp::GreaterThan,
        threshold: NH3_HIGH_PPM,
        severity: Severity::High,
    },
    Rule {
        anomaly_type: "bagok_stress_high",
        metric: Metric::Stress,
        op: CompareOp::GreaterEqual,
        threshold: STRESS_HIGH_SCORE,
        severity: Severity::Medium,
    },
];

/// Scan every sensor of `snapshot` and return one record per fired rule.
///
/// Records are ordered by severity (highest first) then anomaly type;
/// evidence by zone then sensor id, both compared case-insensitively.
/// Samples missing a metric never fire the rules reading it.
pub fn detect(snapshot: &TelemetrySnapshot) -> Vec<AnomalyRecord> {
    // ---
    let mut hits: BTreeMap<&'static str, (Rule, Vec<Evidence>)> = BTreeMap::new();

    for sample in &snapshot.sensors {
        for rule in &RULES {
            let Some(value) = rule.metric.read(sample) else {
                continue;
            };
            if !rule.op.check(value, rule.threshold) {
                continue;
            }
            hits.entry(rule.anomaly_type)
                .or_insert_with(|| (*rule, Vec::new()))
                .1
                .push(rule.metric.evidence(sample, value, rule.reason(value)));
        }
    }

    let mut records: Vec<AnomalyRecord> = hits
        .into_values()
        .map(|(rule, mut evidence)| {
            evidence.sort_by_cached_key(|e| (e.zone.to_lowercase(), e.sensor_id.to_lowercase()));
            AnomalyRecord {
                id: format!(
                    "{}:{}:{}:{}",
                    snapshot.tenant_id, snapshot.flock_id, snapshot.snapshot_id, rule.anomaly_type
                ),
                tenant_id: snapshot.tenant_id.clone(),
                flock_id: snapshot.flock_id.clone(),
                snapshot_id: snapshot.snapshot_id.clone(),
                anomaly_type: rule.anomaly_type.to_string(),
                severity: rule.severity,
                summary: summarize(&rule, &evidence),
                evidence,
            }
        })
        .collect();

    records.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.anomaly_type.cmp(&b.anomaly_type))
    });

    if !records.is_empty() {
        tracing::debug!(
            flock = %snapshot.flock_id,
            snapshot = %snapshot.snapshot_id,
            records = records.len(),
            "Anomalies detected"
        );
    }
    records
}

fn summarize(rule: &Rule, evidence: &[Evidence]) -> String {
    // ---
    let mut zones: Vec<&str> = Vec::new();
    for e in evidence {
        if !zones.contains(&e.zone.as_str()) {
            zones.push(&e.zone);
        }
    }
    format!(
        "{} {} {}{} on {} sensor(s) in {}",
        rule.metric.label(),
        rule.op,
        rule.threshold,
        rule.metric.unit(),
        evidence.len(),
        zones.join(", ")
    )
}
