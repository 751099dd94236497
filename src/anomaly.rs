//! Fault conditions the simulator can inject into a building.
//!
//! [`AnomalyKind`] is the closed set of fault types. An [`Injection`] is an
//! operator request for one of them; resolving it at a point in time yields
//! an immutable [`Anomaly`] with its affected-zone set fixed.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ControlError;
use crate::models::EventSeverity;
use crate::topology::ZONES_PER_BUILDING;

// ---

/// Lifetime of an equipment failure, which the operator cannot choose.
pub const EQUIPMENT_FAILURE_MINUTES: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnomalyKind {
    HeatStress,
    DiseaseOutbreak,
    VentilationFailure,
    HvacMalfunction,
    EquipmentFailure,
    ZoneSensorOutage,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 6] = [
        AnomalyKind::HeatStress,
        AnomalyKind::DiseaseOutbreak,
        AnomalyKind::VentilationFailure,
        AnomalyKind::HvacMalfunction,
        AnomalyKind::EquipmentFailure,
        AnomalyKind::ZoneSensorOutage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AnomalyKind::HeatStress => "HeatStress",
            AnomalyKind::DiseaseOutbreak => "DiseaseOutbreak",
            AnomalyKind::VentilationFailure => "VentilationFailure",
            AnomalyKind::HvacMalfunction => "HvacMalfunction",
            AnomalyKind::EquipmentFailure => "EquipmentFailure",
            AnomalyKind::ZoneSensorOutage => "ZoneSensorOutage",
        }
    }

    /// Failures are reported as errors, everything else as warnings.
    pub fn event_severity(&self) -> EventSeverity {
        if self.name().contains("Failure") {
            EventSeverity::Error
        } else {
            EventSeverity::Warning
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operator request to start a fault in one building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    HeatStress { duration: Duration },
    DiseaseOutbreak { origin_zone: u8, duration: Duration },
    VentilationFailure { duration: Duration },
    HvacMalfunction { duration: Duration },
    EquipmentFailure { zone: u8 },
    ZoneSensorOutage { zone: u8, duration: Duration },
}

impl Injection {
    pub fn kind(&self) -> AnomalyKind {
        match self {
            Injection::HeatStress { .. } => AnomalyKind::HeatStress,
            Injection::DiseaseOutbreak { .. } => AnomalyKind::DiseaseOutbreak,
            Injection::VentilationFailure { .. } => AnomalyKind::VentilationFailure,
            Injection::HvacMalfunction { .. } => AnomalyKind::HvacMalfunction,
            Injection::EquipmentFailure { .. } => AnomalyKind::EquipmentFailure,
            Injection::ZoneSensorOutage { .. } => AnomalyKind::ZoneSensorOutage,
        }
    }

    pub fn duration(&self) -> Duration {
        match *self {
            Injection::HeatStress { duration }
            | Injection::DiseaseOutbreak { duration, .. }
            | Injection::VentilationFailure { duration }
            | Injection::HvacMalfunction { duration }
            | Injection::ZoneSensorOutage { duration, .. } => duration,
            Injection::EquipmentFailure { .. } => Duration::minutes(EQUIPMENT_FAILURE_MINUTES),
        }
    }

    /// Evaluate the affected-zone rule and fix the time window at `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<Anomaly, ControlError> {
        // ---
        let duration = self.duration();
        if duration <= Duration::zero() {
            return Err(ControlError::InvalidDuration {
                minutes: duration.num_minutes(),
            });
        }
        let end = now
            .checked_add_signed(duration)
            .ok_or(ControlError::InvalidDuration {
                minutes: duration.num_minutes(),
            })?;

        let all_zones = 1..=ZONES_PER_BUILDING;
        let (affected_zones, origin_zone, description): (BTreeSet<u8>, Option<u8>, String) =
            match *self {
                Injection::HeatStress { .. } => (
                    all_zones.filter(|&z| z >= 5).collect(),
                    None,
                    "Heat stress building toward the exhaust end".to_string(),
                ),
                Injection::DiseaseOutbreak { origin_zone, .. } => {
                    check_zone(origin_zone)?;
                    (
                        all_zones.filter(|&z| z.abs_diff(origin_zone) <= 1).collect(),
                        Some(origin_zone),
                        format!("Respiratory disease spreading from zone {origin_zone}"),
                    )
                }
                Injection::VentilationFailure { .. } => (
                    all_zones.collect(),
                    None,
                    "Ventilation failure across the whole house".to_string(),
                ),
                Injection::HvacMalfunction { .. } => (
                    all_zones.filter(|&z| z >= 4).collect(),
                    None,
                    "HVAC controller oscillating in the rear zones".to_string(),
                ),
                Injection::EquipmentFailure { zone } => {
                    check_zone(zone)?;
                    (
                        BTreeSet::from([zone]),
                        None,
                        format!("Intermittent sensor equipment failure in zone {zone}"),
                    )
                }
                Injection::ZoneSensorOutage { zone, .. } => {
                    check_zone(zone)?;
                    (
                        BTreeSet::from([zone]),
                        None,
                        format!("Power or comms loss for every sensor in zone {zone}"),
                    )
                }
            };

        Ok(Anomaly {
            kind: self.kind(),
            start: now,
            end,
            affected_zones,
            origin_zone,
            description,
        })
    }
}

fn check_zone(ordinal: u8) -> Result<(), ControlError> {
    if (1..=ZONES_PER_BUILDING).contains(&ordinal) {
        Ok(())
    } else {
        Err(ControlError::InvalidZone { ordinal })
    }
}

/// An active fault instance. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Anomaly {
    // ---
    pub kind: AnomalyKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Zone ordinals within the owning building.
    pub affected_zones: BTreeSet<u8>,
    pub origin_zone: Option<u8>,
    pub description: String,
}

impl Anomaly {
    pub fn affects(&self, zone_ordinal: u8) -> bool {
        self.affected_zones.contains(&zone_ordinal)
    }

    /// Elapsed fraction of the lifetime, clamped to `[0, 1]`.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        // ---
        let total = (self.end - self.start).num_milliseconds();
        if total <= 0 {
            return 1.0;
        }
        let elapsed = (now - self.start).num_milliseconds();
        (elapsed as f64 / total as f64).clamp(0.0, 1.0)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.end
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.end - now).max(Duration::zero())
    }
}
