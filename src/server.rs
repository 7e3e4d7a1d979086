//! Web server module for Vitals.
//!
//! Provides the HTTP API over the storage core: metric ingestion,
//! filtered retrieval, and health probes. Request binding and validation
//! live here; the storage layer assumes validated input.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::storage::{Metric, MetricFilter, MetricStore, NewMetric};

// =============================================================================
// Constants
// =============================================================================

/// Maximum metric key length in bytes.
const MAX_KEY_LEN: usize = 5000;

/// Maximum number of tags per metric.
const MAX_TAGS: usize = 50;

/// Maximum tag text length in bytes.
const MAX_TAG_LEN: usize = 5000;

// =============================================================================
// Types
// =============================================================================

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: MetricStore,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    db: Option<String>,
}

/// A metric as it arrives through the API.
///
/// `timestamp` is optional; when omitted the server assigns its own clock
/// at ingestion. `value` is required but zero is a valid value.
#[derive(Debug, Deserialize)]
pub struct IncomingMetric {
    pub key: String,
    pub value: f64,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Query parameters for the metrics API.
///
/// All fields are optional; the camelCase aliases match the JSON field
/// names of the external contract.
#[derive(Debug, Deserialize)]
pub struct MetricsQueryParams {
    pub key: Option<String>,
    pub tag: Option<String>,
    #[serde(alias = "minTimestamp")]
    pub min_timestamp: Option<i64>,
    #[serde(alias = "maxTimestamp")]
    pub max_timestamp: Option<i64>,
}

// =============================================================================
// Validation
// =============================================================================

/// Validate an incoming metric against the API bounds.
fn validate_incoming(metric: &IncomingMetric) -> Result<(), String> {
    if metric.key.is_empty() {
        return Err("key must not be empty".to_string());
    }
    if metric.key.len() > MAX_KEY_LEN {
        return Err(format!("key exceeds {MAX_KEY_LEN} bytes"));
    }
    if metric.tags.len() > MAX_TAGS {
        return Err(format!("at most {MAX_TAGS} tags allowed"));
    }
    for tag in &metric.tags {
        if tag.is_empty() {
            return Err("tags must not be empty".to_string());
        }
        if tag.len() > MAX_TAG_LEN {
            return Err(format!("tag exceeds {MAX_TAG_LEN} bytes"));
        }
    }
    Ok(())
}

// =============================================================================
// Router
// =============================================================================

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/", get(home_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route(
            "/api/metrics",
            get(get_metrics_handler).post(add_metric_handler),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Homepage handler; serves a server-is-up message.
async fn home_handler() -> &'static str {
    "Welcome. The server is up and running!"
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        db: None,
    })
}

/// Readiness probe that checks database availability.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(HealthResponse {
            status: "ok".to_string(),
            db: Some("ready".to_string()),
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "not_ready".to_string(),
                    db: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// POST /api/metrics - insert one metric.
///
/// Returns the stored representation with 201 on success.
async fn add_metric_handler(
    State(state): State<Arc<AppState>>,
    Json(incoming): Json<IncomingMetric>,
) -> Response {
    if let Err(reason) = validate_incoming(&incoming) {
        return (StatusCode::BAD_REQUEST, reason).into_response();
    }

    let timestamp = incoming
        .timestamp
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    let metric = NewMetric {
        key: incoming.key,
        value: incoming.value,
        timestamp,
        tags: incoming.tags,
    };

    match state.store.insert(metric.clone()).await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(Metric {
                key: metric.key,
                value: metric.value,
                timestamp: metric.timestamp,
                tags: metric.tags,
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Metric insert failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {err}")).into_response()
        }
    }
}

/// GET /api/metrics - query metrics by key, tag, and timestamp range.
async fn get_metrics_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MetricsQueryParams>,
) -> Response {
    let filter = MetricFilter {
        key: params.key.filter(|s| !s.is_empty()),
        tag: params.tag.filter(|s| !s.is_empty()),
        min_timestamp: params.min_timestamp,
        max_timestamp: params.max_timestamp,
    };

    match state.store.query(filter).await {
        Ok(metrics) => Json(metrics).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Metric query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {err}")).into_response()
        }
    }
}
