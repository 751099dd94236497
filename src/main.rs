//! Application entry point for the `flocksim` service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Building the facility topology from a seeded random source
//! - Mounting the control/detection routes via the `routes` gateway (EMBP)
//! - Running the tick loop until Ctrl+C or SIGTERM
//!
//! # Environment Variables
//! - `INGEST_URL` (**required**) – ingestion endpoint for snapshots
//! - `FLOCKSIM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `FLOCKSIM_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the remaining simulation settings.
use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Result;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::watch;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use flocksim::{config, routes, simulator, HttpSink, Simulator, SnapshotSink};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let sim = Simulator::new(&cfg.tenant_id, &cfg.building_ids, rng).shared();

    let sink: Arc<dyn SnapshotSink> = Arc::new(
        HttpSink::new(&cfg.ingest_url, cfg.ingest_api_key.clone(), cfg.ingest_timeout)
            .map_err(|e| anyhow::anyhow!("Failed to build ingestion client: {}", e))?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.control_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Control surface listening on {}", addr);

    let app = routes::router(sim.clone());
    let mut server_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    let ticker = tokio::spawn(simulator::run(sim, sink, cfg.tick_interval, shutdown_rx));

    shutdown_signal().await;
    shutdown_tx.send_replace(true);

    ticker.await?;
    server.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}

// ---

/// Resolve on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    // ---
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

/// Level from `FLOCKSIM_LOG_LEVEL`, `debug` when unset or unrecognized.
fn log_level() -> &'static str {
    match env::var("FLOCKSIM_LOG_LEVEL").ok().as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => "debug",
    }
}

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `FLOCKSIM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `FLOCKSIM_LOG_LEVEL` env var
///
/// This should be called once at application startup, after `.env` has been
/// loaded and before any logging or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("FLOCKSIM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to FLOCKSIM_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("{},hyper=info,reqwest=info", log_level()))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
