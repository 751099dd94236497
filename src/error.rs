//! Typed errors returned by the control surface.

use thiserror::Error;

use crate::topology::ZONES_PER_BUILDING;

/// Rejected operator command. Never fatal to the tick loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("unknown building '{0}'")]
    UnknownBuilding(String),

    #[error("zone ordinal {ordinal} is outside 1..={}", ZONES_PER_BUILDING)]
    InvalidZone { ordinal: u8 },

    #[error("duration must be positive, got {minutes} minute(s)")]
    InvalidDuration { minutes: i64 },
}
