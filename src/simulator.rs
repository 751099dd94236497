//! The generator: shared simulator state and the periodic tick loop.
//!
//! [`Simulator`] bundles the lifecycle manager, the seeded random source and
//! the tenant id. It is shared between the tick loop and the control surface
//! as a [`SharedSimulator`]; holding the lock for a whole tick keeps operator
//! commands from observing or changing anomaly lists mid-tick.
//!
//! Snapshots are handed to the sink from spawned tasks after the lock is
//! released, so a slow or failing endpoint never stretches the tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};

use crate::anomaly::{Anomaly, Injection};
use crate::emitter::build_snapshot;
use crate::error::ControlError;
use crate::lifecycle::{BuildingStatus, LifecycleManager};
use crate::models::TelemetrySnapshot;
use crate::sink::SnapshotSink;
use crate::topology::build_topology;

// ---

pub type SharedSimulator = Arc<Mutex<Simulator>>;

pub struct Simulator {
    lifecycle: LifecycleManager,
    tenant_id: String,
    rng: StdRng,
}

impl Simulator {
    /// Build the topology for `building_ids` from `rng` and keep `rng` for
    /// noise, so one seed reproduces a whole run.
    pub fn new(tenant_id: &str, building_ids: &[String], mut rng: StdRng) -> Self {
        // ---
        let buildings = build_topology(building_ids, &mut rng);
        tracing::info!(
            buildings = buildings.len(),
            tenant = tenant_id,
            "Facility topology built"
        );
        Self {
            lifecycle: LifecycleManager::new(buildings),
            tenant_id: tenant_id.to_string(),
            rng,
        }
    }

    pub fn shared(self) -> SharedSimulator {
        Arc::new(Mutex::new(self))
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn inject(
        &mut self,
        building_id: &str,
        injection: Injection,
        now: DateTime<Utc>,
    ) -> Result<Anomaly, ControlError> {
        self.lifecycle.inject(building_id, injection, now)
    }

    pub fn reset_all(&mut self) {
        self.lifecycle.reset_all();
    }

    pub fn status(&self, now: DateTime<Utc>) -> Vec<BuildingStatus> {
        self.lifecycle.status(now)
    }

    /// Expire anomalies, then synthesize one snapshot per building.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<TelemetrySnapshot> {
        // ---
        self.lifecycle.tick(now);
        let Self {
            lifecycle,
            tenant_id,
            rng,
        } = self;
        let tenant_id = tenant_id.as_str();
        lifecycle
            .buildings_mut()
            .iter_mut()
            .map(|building| build_snapshot(building, tenant_id, now, rng))
            .collect()
    }
}

/// Run ticks every `period` until `shutdown` turns true or its sender is
/// dropped. Missed ticks are skipped, not made up.
pub async fn run(
    simulator: SharedSimulator,
    sink: Arc<dyn SnapshotSink>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    // ---
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(period_secs = period.as_secs_f64(), "Tick loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let snapshots = {
            let mut sim = simulator.lock().await;
            sim.tick(Utc::now())
        };
        tracing::debug!(snapshots = snapshots.len(), "Tick complete");

        for snapshot in snapshots {
            dispatch(Arc::clone(&sink), snapshot);
        }
    }

    tracing::info!("Tick loop stopped");
}

/// Fire-and-forget delivery; failures are logged and dropped.
fn dispatch(sink: Arc<dyn SnapshotSink>, snapshot: TelemetrySnapshot) {
    // ---
    tokio::spawn(async move {
        if let Err(e) = sink.send(&snapshot).await {
            tracing::warn!(
                flock = %snapshot.flock_id,
                snapshot = %snapshot.snapshot_id,
                error = %e,
                "Failed to deliver snapshot, dropping"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::sink::{RecordingSink, SinkError};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn simulator(seed: u64) -> Simulator {
        let ids = vec!["building-a".to_string(), "building-b".to_string()];
        Simulator::new("tenant-demo", &ids, StdRng::seed_from_u64(seed))
    }

    struct FailingSink {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotSink for FailingSink {
        async fn send(&self, _snapshot: &TelemetrySnapshot) -> Result<(), SinkError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SinkError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "down".to_string(),
            })
        }
    }

    #[test]
    fn test_tick_emits_one_snapshot_per_building() {
        // ---
        let mut sim = simulator(1);
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let snapshots = sim.tick(now);
        let flocks: Vec<_> = snapshots.iter().map(|s| s.flock_id.as_str()).collect();
        assert_eq!(flocks, vec!["building-a", "building-b"]);
        assert!(snapshots.iter().all(|s| s.tenant_id == "tenant-demo"));
    }

    #[test]
    fn test_same_seed_same_readings() {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let a = simulator(77).tick(now);
        let b = simulator(77).tick(now);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.sensors, y.sensors);
            assert_eq!(x.metrics, y.metrics);
        }
    }

    #[tokio::test]
    async fn test_loop_ticks_until_cancelled() {
        // ---
        let sink = RecordingSink::new();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            simulator(3).shared(),
            Arc::new(sink.clone()),
            Duration::from_millis(10),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(80)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop did not stop")
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let delivered = sink.len();
        assert!(delivered >= 4, "expected several ticks, got {delivered} snapshots");
        assert_eq!(delivered % 2, 0, "every tick covers both buildings");
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_ticks() {
        // ---
        let sink = RecordingSink::new();
        let (tx, rx) = watch::channel(true);
        run(
            simulator(3).shared(),
            Arc::new(sink.clone()),
            Duration::from_millis(10),
            rx,
        )
        .await;
        drop(tx);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_sink_failures_do_not_stop_loop() {
        // ---
        let sink = Arc::new(FailingSink {
            attempts: AtomicUsize::new(0),
        });
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            simulator(5).shared(),
            sink.clone(),
            Duration::from_millis(10),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(80)).await;
        tx.send(true).unwrap();
        tokio_test::assert_ok!(tokio::time::timeout(Duration::from_secs(1), handle).await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sink.attempts.load(Ordering::SeqCst) >= 4);
    }
}
