//! Public probes for the orchestrator.
//!
//! - `/health/ping`: plain `pong`
//! - `/health/live`: the process is up
//! - `/health/ready`: the metrics source answers a ping
//!
//! None of them authenticate or use the response envelope, so load balancers
//! can read them as-is.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use icms_core::{HealthStatus, SystemHealth};
use serde::{Deserialize, Serialize};

use crate::services::DashboardService;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ProbeDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ProbeDetails {
    pub metrics_source: ProbeComponent,
    pub cache_entries: u64,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ProbeComponent {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<SystemHealth> for ProbeComponent {
    /// A slow source is still ready; only a failed or unknown ping is not.
    fn from(health: SystemHealth) -> Self {
        match health.status {
            HealthStatus::Unhealthy | HealthStatus::Unknown => ProbeComponent {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                error: Some(health.message),
            },
            status => ProbeComponent {
                status,
                latency_ms: health.database_latency_ms,
                error: None,
            },
        }
    }
}

/// GET /health/ping
#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses(
        (status = 200, description = "Service is responding", body = String),
    ),
)]
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = ProbeResponse),
    ),
)]
pub async fn liveness() -> impl IntoResponse {
    Json(ProbeResponse {
        status: HealthStatus::Healthy,
        message: Some("alive".to_string()),
        details: None,
    })
}

/// GET /health/ready
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Metrics source reachable", body = ProbeResponse),
        (status = 503, description = "Metrics source unreachable", body = ProbeResponse),
    ),
)]
pub async fn readiness(
    State(dashboard): State<DashboardService>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let metrics_source = ProbeComponent::from(dashboard.aggregator().get_system_health().await);
    let status = metrics_source.status;
    if status == HealthStatus::Unhealthy {
        tracing::warn!(error = ?metrics_source.error, "Readiness probe failing");
    }

    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    let body = ProbeResponse {
        status,
        message: None,
        details: Some(ProbeDetails {
            metrics_source,
            cache_entries: dashboard.cache_stats().entries,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    (code, Json(body))
}

/// Probe routes, mounted under `/health`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
