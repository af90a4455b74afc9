//! ICMS API Server Entry Point
//!
//! Bootstraps configuration, wires the Postgres-backed metrics source into
//! the dashboard service, starts the cache sweeper and serves the Axum
//! router until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use icms_api::services::{AggregatorConfig, DashboardService, MetricsAggregator};
use icms_api::telemetry::{init_tracer, metrics, TelemetryConfig};
use icms_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, DashboardConfig,
    DbClient, DbConfig, MediaConfig, PgMediaRepository, PgMetricsSource, SignedUrlMediaService,
};
use icms_storage::TtlCache;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    let tracer = init_tracer(&telemetry_config)?;

    if telemetry_config.metrics_enabled && metrics().is_none() {
        tracing::warn!("Prometheus registry failed to initialize; /metrics will be empty");
    }

    let db_config = DbConfig::from_env();
    let db = DbClient::from_config(&db_config)?;
    match db.health_check().await {
        Ok(latency) => tracing::info!(
            latency_ms = latency.as_millis() as u64,
            pool_size = db.pool_size(),
            "Database reachable"
        ),
        Err(e) => tracing::warn!(error = %e, "Database not reachable at startup; serving degraded"),
    }

    let dashboard_config = DashboardConfig::from_env();
    let cache = Arc::new(TtlCache::new(dashboard_config.cache_config()));
    let aggregator = MetricsAggregator::new(
        Arc::new(PgMetricsSource::new(&db)),
        AggregatorConfig::from(&dashboard_config),
    );
    let dashboard = DashboardService::new(aggregator, Arc::clone(&cache), dashboard_config);

    let media_config = MediaConfig::from_env();
    let media_default_ttl_secs = media_config.default_ttl_secs;
    let media = Arc::new(SignedUrlMediaService::new(
        Arc::new(PgMediaRepository::new(&db)),
        media_config,
    ));

    let state = AppState::new(dashboard, media, media_default_ttl_secs);
    let app = create_api_router(state, ApiConfig::from_env(), AuthConfig::from_env())?;

    cache.start();

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting ICMS API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    cache.stop().await;
    tracer.shutdown();

    served.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("ICMS_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("ICMS_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
