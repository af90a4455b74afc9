//! Prometheus Metrics Definitions
//!
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Aggregation latency buckets (seconds)
const AGGREGATION_LATENCY_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

/// Global metrics instance - initialized once at first use
pub static METRICS: Lazy<ApiResult<IcmsMetrics>> = Lazy::new(IcmsMetrics::new);

/// The registered metrics, or `None` if registration failed at startup.
pub fn metrics() -> Option<&'static IcmsMetrics> {
    METRICS.as_ref().ok()
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Container for all ICMS metrics.
#[derive(Clone)]
pub struct IcmsMetrics {
    /// labels: method, path, status
    pub http_requests_total: CounterVec,

    /// labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Dashboard cache lookups - labels: kind (overview/widget), result (hit/miss)
    pub dashboard_cache_requests_total: CounterVec,

    /// Leaf metric queries that failed and were replaced by zero - labels: metric
    pub leaf_metric_failures_total: CounterVec,

    /// labels: category
    pub aggregation_duration_seconds: HistogramVec,

    /// labels: format, status
    pub dashboard_exports_total: CounterVec,
}

impl IcmsMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "icms_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "icms_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            dashboard_cache_requests_total: register_counter_vec!(
                "icms_dashboard_cache_requests_total",
                "Dashboard cache lookups by kind and result",
                &["kind", "result"]
            )
            .map_err(|e| registration_error("dashboard_cache_requests_total", e))?,

            leaf_metric_failures_total: register_counter_vec!(
                "icms_leaf_metric_failures_total",
                "Leaf metric queries that failed and were reported as zero",
                &["metric"]
            )
            .map_err(|e| registration_error("leaf_metric_failures_total", e))?,

            aggregation_duration_seconds: register_histogram_vec!(
                "icms_dashboard_aggregation_duration_seconds",
                "Time spent aggregating one dashboard category",
                &["category"],
                AGGREGATION_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("aggregation_duration_seconds", e))?,

            dashboard_exports_total: register_counter_vec!(
                "icms_dashboard_exports_total",
                "Dashboard exports by format and outcome",
                &["format", "status"]
            )
            .map_err(|e| registration_error("dashboard_exports_total", e))?,
        })
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_cache_lookup(&self, kind: &str, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.dashboard_cache_requests_total
            .with_label_values(&[kind, result])
            .inc();
    }

    pub fn record_leaf_failure(&self, metric: &str) {
        self.leaf_metric_failures_total
            .with_label_values(&[metric])
            .inc();
    }

    pub fn record_aggregation(&self, category: &str, duration_secs: f64) {
        self.aggregation_duration_seconds
            .with_label_values(&[category])
            .observe(duration_secs);
    }

    pub fn record_export(&self, format: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.dashboard_exports_total
            .with_label_values(&[format, status])
            .inc();
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // Touch the registry so an idle process still exports the ICMS families
    let _ = metrics();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
