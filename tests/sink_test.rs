use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use chrono::{DateTime, TimeZone, Utc};
use rand::{rngs::StdRng, SeedableRng};
use serde_json::Value;

use flocksim::{HttpSink, Simulator, SinkError, SnapshotSink, TelemetrySnapshot};

// ---

type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn ingest(
    State(captured): State<Captured>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    captured.lock().unwrap().push((key, body));
    StatusCode::ACCEPTED
}

async fn reject() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "ingestion paused")
}

async fn spawn_ingest() -> Result<(String, Captured)> {
    // ---
    let captured: Captured = Arc::default();
    let app = Router::new()
        .route("/ingest", post(ingest))
        .route("/paused", post(reject))
        .with_state(captured.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{}", addr), captured))
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn one_snapshot() -> TelemetrySnapshot {
    let ids = vec!["building-a".to_string()];
    let mut sim = Simulator::new("tenant-demo", &ids, StdRng::seed_from_u64(8));
    sim.tick(t0()).remove(0)
}

#[tokio::test]
async fn http_sink_posts_camel_case_json_with_key() -> Result<()> {
    // ---
    let (base, captured) = spawn_ingest().await?;
    let sink = HttpSink::new(
        &format!("{}/ingest", base),
        Some("secret-key".to_string()),
        Duration::from_secs(5),
    )?;

    let snapshot = one_snapshot();
    sink.send(&snapshot).await?;

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    let (key, body) = &captured[0];
    assert_eq!(key.as_deref(), Some("secret-key"));
    assert_eq!(body["snapshotId"], snapshot.snapshot_id.as_str());
    assert_eq!(body["tenantId"], "tenant-demo");
    assert_eq!(body["flockId"], "building-a");
    assert_eq!(body["source"], "flocksim");
    assert_eq!(body["sensors"].as_array().unwrap().len(), 12);
    assert!(body["metrics"]["temperatureAvgF"].is_number());

    let received: TelemetrySnapshot = serde_json::from_value(body.clone())?;
    assert_eq!(received.snapshot_id, snapshot.snapshot_id);
    assert_eq!(received.captured_at, snapshot.captured_at);
    assert_eq!(received.sensors.len(), snapshot.sensors.len());
    Ok(())
}

#[tokio::test]
async fn http_sink_surfaces_non_success_status() -> Result<()> {
    // ---
    let (base, _) = spawn_ingest().await?;
    let sink = HttpSink::new(&format!("{}/paused", base), None, Duration::from_secs(5))?;

    match sink.send(&one_snapshot()).await {
        Err(SinkError::Status { status, body }) => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body, "ingestion paused");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn http_sink_reports_unreachable_endpoint() -> Result<()> {
    // ---
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let sink = HttpSink::new(&format!("http://{}/ingest", addr), None, Duration::from_secs(2))?;
    let result = sink.send(&one_snapshot()).await;
    assert!(matches!(result, Err(SinkError::Transport(_))));
    Ok(())
}
