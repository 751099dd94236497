//! Poultry-house telemetry simulator and rule-based anomaly detector.
//!
//! The generator half builds a facility topology, tracks injected faults per
//! building and synthesizes one telemetry snapshot per building per tick.
//! The detector half is a pure function over any snapshot that reports the
//! threshold breaches the generator's faults produce.
//!
//! Modules follow the Explicit Module Boundary Pattern (EMBP): siblings
//! import shared types through this gateway rather than from each other's
//! internals where practical.

pub mod anomaly;
pub mod config;
pub mod detection;
pub mod emitter;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod simulator;
pub mod sink;
pub mod synthesis;
pub mod topology;

pub use anomaly::{Anomaly, AnomalyKind, Injection};
pub use config::Config;
pub use detection::detect;
pub use error::ControlError;
pub use lifecycle::{AnomalyStatus, BuildingStatus, LifecycleManager};
pub use models::{AnomalyRecord, Evidence, Severity, TelemetrySnapshot};
pub use simulator::{SharedSimulator, Simulator};
pub use sink::{HttpSink, RecordingSink, SinkError, SnapshotSink};
