//! ICMS API - Admin Dashboard REST Layer
//!
//! Axum service exposing the ICMS admin dashboard: aggregated metrics over
//! users, content, HR and marketing, served through a TTL cache, filtered by
//! role, exportable as JSON or CSV. Also issues presigned media URLs.
//!
//! Metrics are read from PostgreSQL through the [`icms_core::MetricsSource`]
//! port; tests swap in an in-memory source.

mod macros;

pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod envelope;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use auth::{
    authenticate, authenticate_api_key, authenticate_jwt, generate_jwt_token, validate_api_key,
    validate_jwt_token, AuthConfig, AuthContext, AuthMethod, Claims, JwtSecret,
};
pub use config::{ApiConfig, DashboardConfig, MediaConfig};
pub use db::{DbClient, DbConfig, PgMediaRepository, PgMetricsSource};
pub use envelope::{ApiEnvelope, Pagination, ResponseMeta};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, extract_auth_context, AuthExtractor, AuthMiddlewareState};
pub use openapi::ApiDoc;
pub use routes::{create_api_router, SecureRouterBuilder};
pub use services::{
    AggregatorConfig, DashboardService, MetricsAggregator, RoleDashboard, SignedUrlMediaService,
};
pub use state::AppState;
