//! Configuration loader for the `flocksim` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
use std::{env, time::Duration};

use anyhow::{anyhow, bail, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<u64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Ingestion endpoint the HTTP sink posts snapshots to.
    pub ingest_url: String,

    /// Optional API key sent as `x-api-key`.
    pub ingest_api_key: Option<String>,

    /// Per-request timeout for the ingestion sink.
    pub ingest_timeout: Duration,

    /// Tenant id stamped on every snapshot.
    pub tenant_id: String,

    /// Buildings the topology is built from.
    pub building_ids: Vec<String>,

    /// Generator tick period.
    pub tick_interval: Duration,

    /// Seed for the simulation random source. `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Port of the control/detection HTTP surface.
    pub control_port: u16,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `INGEST_URL` – ingestion endpoint for snapshots
///
/// Optional:
/// - `INGEST_API_KEY` – api key header value (default: none)
/// - `INGEST_TIMEOUT_SECS` – sink request timeout (default: 5)
/// - `TENANT_ID` – tenant id (default: `tenant-demo`)
/// - `BUILDING_IDS` – comma separated ids (default: `building-a,building-b`)
/// - `TICK_INTERVAL_SECS` – tick period (default: 15)
/// - `SIM_SEED` – random seed (default: entropy)
/// - `CONTROL_PORT` – control surface port (default: 8080)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let ingest_url = require_env!("INGEST_URL");
    let ingest_api_key = env::var("INGEST_API_KEY").ok().filter(|k| !k.is_empty());
    let ingest_timeout_secs = parse_env_u64!("INGEST_TIMEOUT_SECS", 5);
    let tick_interval_secs = parse_env_u64!("TICK_INTERVAL_SECS", 15);
    let control_port = parse_env_u64!("CONTROL_PORT", 8080);

    let seed = env::var("SIM_SEED")
        .ok()
        .map(|v| v.trim().parse::<u64>())
        .transpose()
        .map_err(|e| anyhow!("Invalid SIM_SEED: {}", e))?;

    let tenant_id = env::var("TENANT_ID").unwrap_or_else(|_| "tenant-demo".to_string());
    let building_ids = parse_building_ids(
        &env::var("BUILDING_IDS").unwrap_or_else(|_| "building-a,building-b".to_string()),
    )?;

    if tick_interval_secs == 0 {
        bail!("Invalid TICK_INTERVAL_SECS: must be greater than zero");
    }
    if ingest_timeout_secs == 0 {
        bail!("Invalid INGEST_TIMEOUT_SECS: must be greater than zero");
    }
    let control_port = u16::try_from(control_port)
        .map_err(|_| anyhow!("Invalid CONTROL_PORT: {} is out of range", control_port))?;

    Ok(Config {
        ingest_url,
        ingest_api_key,
        ingest_timeout: Duration::from_secs(ingest_timeout_secs),
        tenant_id,
        building_ids,
        tick_interval: Duration::from_secs(tick_interval_secs),
        seed,
        control_port,
    })
}

/// Split a comma separated id list, dropping blanks and duplicates.
fn parse_building_ids(raw: &str) -> Result<Vec<String>> {
    // ---
    let mut ids: Vec<String> = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    if ids.is_empty() {
        bail!("BUILDING_IDS must name at least one building");
    }
    Ok(ids)
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the ingestion API key while showing all other values.
    pub fn log_config(&self) {
        // ---
        let masked_key = match &self.ingest_api_key {
            Some(key) if key.chars().count() > 4 => {
                format!("{}****", key.chars().take(4).collect::<String>())
            }
            Some(_) => "****".to_string(),
            None => "(none)".to_string(),
        };
        let seed = self
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "(entropy)".to_string());

        tracing::info!("Configuration loaded:");
        tracing::info!("  INGEST_URL          : {}", self.ingest_url);
        tracing::info!("  INGEST_API_KEY      : {}", masked_key);
        tracing::info!("  INGEST_TIMEOUT_SECS : {}", self.ingest_timeout.as_secs());
        tracing::info!("  TENANT_ID           : {}", self.tenant_id);
        tracing::info!("  BUILDING_IDS        : {}", self.building_ids.join(","));
        tracing::info!("  TICK_INTERVAL_SECS  : {}", self.tick_interval.as_secs());
        tracing::info!("  SIM_SEED            : {}", seed);
        tracing::info!("  CONTROL_PORT        : {}", self.control_port);
    }
}
