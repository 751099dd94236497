use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::{rngs::StdRng, SeedableRng};

use flocksim::detection::{
    CO2_HIGH_PPM, HUMIDITY_HIGH_PERCENT, HUMIDITY_LOW_PERCENT, NH3_HIGH_PPM, STRESS_HIGH_SCORE,
    TEMPERATURE_HIGH_F, TEMPERATURE_LOW_F,
};
use flocksim::models::SensorSample;
use flocksim::topology::Sensor;
use flocksim::{detect, Injection, Simulator, TelemetrySnapshot};

// ---

/// Largest absolute noise on temperature, plus float slack.
const TEMPERATURE_NOISE_BOUND: f64 = 0.75 + 1e-9;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn simulator(seed: u64) -> Simulator {
    let ids = vec!["building-a".to_string(), "building-b".to_string()];
    Simulator::new("tenant-demo", &ids, StdRng::seed_from_u64(seed))
}

fn baseline_sensor(sim: &Simulator, building: &str, zone: u8) -> Sensor {
    sim.lifecycle()
        .building(building)
        .and_then(|b| b.zone(zone))
        .map(|z| z.sensors[0].clone())
        .unwrap()
}

fn snapshot_for<'a>(snapshots: &'a [TelemetrySnapshot], building: &str) -> &'a TelemetrySnapshot {
    snapshots.iter().find(|s| s.flock_id == building).unwrap()
}

fn sample<'a>(snapshot: &'a TelemetrySnapshot, sensor_id: &str) -> &'a SensorSample {
    snapshot
        .sensors
        .iter()
        .find(|s| s.sensor_id == sensor_id)
        .unwrap()
}

#[test]
fn heat_stress_halfway_heats_exhaust_only() {
    // ---
    let mut sim = simulator(2024);
    sim.inject(
        "building-a",
        Injection::HeatStress { duration: Duration::minutes(30) },
        t0(),
    )
    .unwrap();

    let snapshots = sim.tick(t0() + Duration::minutes(15));
    let a = snapshot_for(&snapshots, "building-a");

    let z6 = baseline_sensor(&sim, "building-a", 6);
    let t6 = sample(a, &z6.id).temperature_avg_f.unwrap();
    assert!(
        (t6 - (z6.baseline_temperature_f + 6.0)).abs() <= TEMPERATURE_NOISE_BOUND,
        "zone 6 should be ~baseline+6°F, got {t6} vs baseline {}",
        z6.baseline_temperature_f
    );

    let z1 = baseline_sensor(&sim, "building-a", 1);
    let t1 = sample(a, &z1.id).temperature_avg_f.unwrap();
    assert!((t1 - z1.baseline_temperature_f).abs() <= TEMPERATURE_NOISE_BOUND);

    // Other building untouched
    let b = snapshot_for(&snapshots, "building-b");
    assert!(b.events.is_empty());
}

#[test]
fn zone_outage_nulls_zone_for_whole_duration() {
    // ---
    let mut sim = simulator(7);
    let duration = Duration::minutes(20);
    sim.inject(
        "building-a",
        Injection::ZoneSensorOutage { zone: 3, duration },
        t0(),
    )
    .unwrap();

    for offset in [0, 60, 300, 600, 1199] {
        let snapshots = sim.tick(t0() + Duration::seconds(offset));
        let a = snapshot_for(&snapshots, "building-a");

        let env = sample(a, "building-a-z3-env");
        assert_eq!(env.temperature_avg_f, None, "offset {offset}s");
        assert_eq!(env.humidity_percent, None);
        assert_eq!(env.co2_ppm, None);
        assert_eq!(env.nh3_ppm, None);

        let mic = sample(a, "building-a-z3-mic");
        assert_eq!(mic.sound_db_avg, None);
        assert_eq!(mic.vocalization_rate_per_min, None);
        assert_eq!(mic.bagok_stress_score, None);

        assert!(sample(a, "building-a-z2-env").temperature_avg_f.is_some());
        assert!(a.metrics.temperature_avg_f.is_some());
    }

    let snapshots = sim.tick(t0() + duration);
    let a = snapshot_for(&snapshots, "building-a");
    assert!(sample(a, "building-a-z3-env").temperature_avg_f.is_some());
    assert!(sample(a, "building-a-z3-mic").sound_db_avg.is_some());
    assert!(a.events.is_empty());
}

#[test]
fn reset_all_restores_baseline_plus_noise() {
    // ---
    let mut sim = simulator(99);
    let d = Duration::minutes(60);
    sim.inject("building-a", Injection::VentilationFailure { duration: d }, t0())
        .unwrap();
    sim.inject("building-b", Injection::HvacMalfunction { duration: d }, t0())
        .unwrap();
    sim.inject(
        "building-b",
        Injection::DiseaseOutbreak { origin_zone: 2, duration: d },
        t0(),
    )
    .unwrap();

    sim.reset_all();
    let snapshots = sim.tick(t0() + Duration::minutes(30));

    for snapshot in &snapshots {
        assert!(snapshot.events.is_empty());
        assert_eq!(snapshot.metrics.affected_zone_count, 0);

        let building = sim.lifecycle().building(&snapshot.flock_id).unwrap();
        assert!(building.anomalies().is_empty());
        assert_eq!(building.current, building.baseline);

        for (_, sensor) in building.sensors() {
            let s = sample(snapshot, &sensor.id);
            let dt = s.temperature_avg_f.unwrap() - sensor.baseline_temperature_f;
            let dh = s.humidity_percent.unwrap() - sensor.baseline_humidity_percent;
            let dc = s.co2_ppm.unwrap() - sensor.baseline_co2_ppm;
            let dn = s.nh3_ppm.unwrap() - sensor.baseline_nh3_ppm;
            assert!(dt.abs() <= TEMPERATURE_NOISE_BOUND);
            assert!(dh.abs() <= 1.5 + 1e-9);
            assert!(dc.abs() <= 100.0 + 1e-9);
            assert!(dn.abs() <= 1.5 + 1e-9);
        }
    }
}

/// `(anomalyType, fires)` for every detection rule, built from the public
/// thresholds rather than the engine's internals.
fn tripped(sample: &SensorSample) -> Vec<&'static str> {
    // ---
    let checks: [(&str, Option<f64>, fn(f64) -> bool); 7] = [
        ("temperature_high", sample.temperature_avg_f, |v| v > TEMPERATURE_HIGH_F),
        ("temperature_low", sample.temperature_avg_f, |v| v < TEMPERATURE_LOW_F),
        ("humidity_high", sample.humidity_percent, |v| v > HUMIDITY_HIGH_PERCENT),
        ("humidity_low", sample.humidity_percent, |v| v < HUMIDITY_LOW_PERCENT),
        ("co2_high", sample.co2_ppm, |v| v > CO2_HIGH_PPM),
        ("nh3_high", sample.nh3_ppm, |v| v > NH3_HIGH_PPM),
        ("bagok_stress_high", sample.bagok_stress_score, |v| v >= STRESS_HIGH_SCORE),
    ];
    checks
        .iter()
        .filter(|(_, value, fires)| value.is_some_and(fires))
        .map(|(name, _, _)| *name)
        .collect()
}

#[test]
fn every_tripped_value_reaches_detection_evidence() {
    // ---
    let mut sim = simulator(31337);
    let d = Duration::minutes(40);
    sim.inject("building-a", Injection::HeatStress { duration: d }, t0())
        .unwrap();
    sim.inject("building-a", Injection::VentilationFailure { duration: d }, t0())
        .unwrap();
    sim.inject("building-a", Injection::EquipmentFailure { zone: 1 }, t0())
        .unwrap();
    sim.inject("building-b", Injection::HvacMalfunction { duration: d }, t0())
        .unwrap();
    sim.inject(
        "building-b",
        Injection::DiseaseOutbreak { origin_zone: 5, duration: d },
        t0(),
    )
    .unwrap();
    sim.inject(
        "building-b",
        Injection::ZoneSensorOutage { zone: 2, duration: d },
        t0(),
    )
    .unwrap();

    let mut total_evidence = 0;
    for minute in (0..40).step_by(4) {
        let snapshots = sim.tick(t0() + Duration::minutes(minute));
        for snapshot in &snapshots {
            let records = detect(snapshot);
            for sensor in &snapshot.sensors {
                for anomaly_type in tripped(sensor) {
                    let record = records
                        .iter()
                        .find(|r| r.anomaly_type == anomaly_type)
                        .unwrap_or_else(|| panic!("no {anomaly_type} record at minute {minute}"));
                    assert!(
                        record.evidence.iter().any(|e| e.sensor_id == sensor.sensor_id),
                        "{} missing from {anomaly_type} evidence",
                        sensor.sensor_id
                    );
                    total_evidence += 1;
                }
            }
            let evidence_count: usize = records.iter().map(|r| r.evidence.len()).sum();
            let tripped_count: usize = snapshot.sensors.iter().map(|s| tripped(s).len()).sum();
            assert_eq!(evidence_count, tripped_count);
        }
    }
    assert!(total_evidence > 0, "scenario should trip at least one rule");
}

#[test]
fn full_ventilation_failure_is_detected() {
    // ---
    let mut sim = simulator(5);
    let d = Duration::minutes(30);
    sim.inject("building-a", Injection::VentilationFailure { duration: d }, t0())
        .unwrap();

    let snapshots = sim.tick(t0() + d - Duration::seconds(1));
    let records = detect(snapshot_for(&snapshots, "building-a"));
    let co2 = records.iter().find(|r| r.anomaly_type == "co2_high").unwrap();
    assert_eq!(co2.evidence.len(), 6);
    let nh3 = records.iter().find(|r| r.anomaly_type == "nh3_high").unwrap();
    assert_eq!(nh3.evidence.len(), 6);
}
