//! ICMS Telemetry - Observability Infrastructure
//!
//! OpenTelemetry tracing, JSON logs and Prometheus metrics for the API layer.
//! Everything works without an external collector.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics, metrics_handler, IcmsMetrics, METRICS};
pub use middleware::{normalize_path, observability_middleware};
pub use tracer::{init_tracer, TelemetryConfig, TracerGuard};
