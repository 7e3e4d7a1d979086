//! API Integration Tests for Vitals
//!
//! Covers the HTTP endpoints end to end against a real server bound to a
//! random port, backed by an on-disk SQLite database in a temp directory.

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use vitals::server::{AppState, create_router};
use vitals::storage::{MetricStore, SqlitePool, schema};

// =============================================================================
// Test Helpers
// =============================================================================

/// Start a test server and return its base URL.
async fn start_test_server() -> (String, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("api.db").display());
    let pool = SqlitePool::connect(&url).await.expect("Failed to connect");
    schema::provision(&pool).await.expect("Failed to provision");

    let state = AppState {
        store: MetricStore::new(pool),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), dir)
}

async fn post_metric(client: &reqwest::Client, base_url: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{}/api/metrics", base_url))
        .json(&body)
        .send()
        .await
        .expect("Failed to send POST request")
}

// =============================================================================
// Health Probe Tests
// =============================================================================

#[tokio::test]
async fn test_home_and_health_probes() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(&base_url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("up and running"));

    let resp = client
        .get(format!("{}/healthz", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client
        .get(format!("{}/readyz", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "ready");
}

// =============================================================================
// Insert + Query Tests
// =============================================================================

#[tokio::test]
async fn test_insert_and_query_roundtrip() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = post_metric(
        &client,
        &base_url,
        json!({"key": "heartrate", "value": 72.5, "timestamp": 1000, "tags": ["bed-1", "icu"]}),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["key"], "heartrate");
    assert_eq!(created["timestamp"], 1000);

    let resp = post_metric(
        &client,
        &base_url,
        json!({"key": "heartrate", "value": 80.0, "timestamp": 2000, "tags": ["bed-1"]}),
    )
    .await;
    assert_eq!(resp.status(), 201);

    // tag=bed-1 returns both, ascending by timestamp
    let resp = client
        .get(format!("{}/api/metrics?tag=bed-1", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let metrics: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(metrics.len(), 2);
    assert_eq!(metrics[0]["value"], 72.5);
    assert_eq!(metrics[1]["value"], 80.0);

    // tag=icu returns only the first
    let resp = client
        .get(format!("{}/api/metrics?tag=icu", base_url))
        .send()
        .await
        .unwrap();
    let metrics: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0]["value"], 72.5);

    // key + minTimestamp (camelCase alias) returns only the second
    let resp = client
        .get(format!(
            "{}/api/metrics?key=heartrate&minTimestamp=1500",
            base_url
        ))
        .send()
        .await
        .unwrap();
    let metrics: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0]["value"], 80.0);
}

#[tokio::test]
async fn test_timestamp_assigned_when_omitted() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let before = chrono::Utc::now().timestamp_millis();
    let resp = post_metric(
        &client,
        &base_url,
        json!({"key": "temperature", "value": 37.2, "tags": []}),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    let assigned = created["timestamp"].as_i64().unwrap();
    assert!(assigned >= before);
}

#[tokio::test]
async fn test_tagless_metric_serializes_empty_list() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = post_metric(
        &client,
        &base_url,
        json!({"key": "spo2", "value": 97.0, "timestamp": 1000}),
    )
    .await;
    assert_eq!(resp.status(), 201);

    let resp = client
        .get(format!("{}/api/metrics?key=spo2", base_url))
        .send()
        .await
        .unwrap();
    let metrics: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0]["tags"], json!([]));
}

#[tokio::test]
async fn test_timestamp_range_via_query_string() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    for (value, ts) in [(1.0, 100), (2.0, 200)] {
        let resp = post_metric(
            &client,
            &base_url,
            json!({"key": "hr", "value": value, "timestamp": ts}),
        )
        .await;
        assert_eq!(resp.status(), 201);
    }

    let resp = client
        .get(format!(
            "{}/api/metrics?min_timestamp=100&max_timestamp=200",
            base_url
        ))
        .send()
        .await
        .unwrap();
    let metrics: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0]["timestamp"], 100);
}

// =============================================================================
// Validation Tests
// =============================================================================

#[tokio::test]
async fn test_rejects_invalid_metrics() {
    let (base_url, _dir) = start_test_server().await;
    let client = reqwest::Client::new();

    // Empty key
    let resp = post_metric(&client, &base_url, json!({"key": "", "value": 1.0})).await;
    assert_eq!(resp.status(), 400);

    // Too many tags
    let tags: Vec<String> = (0..51).map(|i| format!("tag-{i}")).collect();
    let resp = post_metric(
        &client,
        &base_url,
        json!({"key": "hr", "value": 1.0, "tags": tags}),
    )
    .await;
    assert_eq!(resp.status(), 400);

    // Missing value fails JSON binding
    let resp = post_metric(&client, &base_url, json!({"key": "hr"})).await;
    assert!(resp.status().is_client_error());

    // Zero is a valid value
    let resp = post_metric(&client, &base_url, json!({"key": "hr", "value": 0.0})).await;
    assert_eq!(resp.status(), 201);
}
