//! Admin Dashboard REST Routes
//!
//! Everything under `/admin/dashboard` requires authentication; each handler
//! applies its own role guard.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Router,
};
use chrono::Utc;
use icms_core::{DashboardOverview, DashboardQuery, SystemHealth, UserRole};
use serde::{Deserialize, Serialize};

use crate::{
    constants::REDACTED_HEALTH_MESSAGE,
    envelope::ApiEnvelope,
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    services::{DashboardExport, DashboardService, RoleDashboard, WidgetData},
    state::AppState,
};

const OVERVIEW_ROLES: &[&str] = &["admin", "manager"];
const WIDGET_ROLES: &[&str] = &["admin", "manager", "editor"];
const EXPORT_ROLES: &[&str] = &["admin", "manager"];
const CACHE_ROLES: &[&str] = &["admin"];

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct ExportParams {
    /// `json` (default), `csv` or `pdf`.
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct ClearCacheParams {
    /// `overview` or `widget`; omit to clear everything.
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct WidgetResponse {
    pub widget_id: String,
    pub data: WidgetData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub hit_rate: f64,
    pub max_size: usize,
    pub overview_ttl_secs: u64,
    pub widget_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CacheClearResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub removed: usize,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /admin/dashboard/overview - Full dashboard overview
#[utoipa::path(
    get,
    path = "/admin/dashboard/overview",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard overview in the response envelope", body = DashboardOverview),
        (status = 400, description = "Invalid query", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Caller is not an admin or manager", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn get_overview(
    State(dashboard): State<DashboardService>,
    AuthExtractor(auth): AuthExtractor,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    auth.require_any_role(OVERVIEW_ROLES)?;
    let Query(query) = query?;

    let read = dashboard.get_dashboard_overview(&query).await?;
    Ok(ApiEnvelope::cached(Arc::unwrap_or_clone(read.value), read.cache_hit))
}

/// GET /admin/dashboard/role-based - Overview projected for the caller's role
#[utoipa::path(
    get,
    path = "/admin/dashboard/role-based",
    tag = "Dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Role-filtered overview", body = RoleDashboard),
        (status = 400, description = "Invalid query", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn get_role_based(
    State(dashboard): State<DashboardService>,
    AuthExtractor(auth): AuthExtractor,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let role = auth.highest_role();

    let read = dashboard
        .get_role_based_dashboard(role.as_str(), &query)
        .await?;
    Ok(ApiEnvelope::cached(read.value, read.cache_hit))
}

/// GET /admin/dashboard/widgets/{widget_id} - Single widget payload
#[utoipa::path(
    get,
    path = "/admin/dashboard/widgets/{widget_id}",
    tag = "Dashboard",
    params(
        ("widget_id" = String, Path, description = "system-health, content-stats, user-activity, hr-summary or marketing-performance"),
        DashboardQuery
    ),
    responses(
        (status = 200, description = "Widget payload", body = WidgetResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Caller lacks a dashboard role", body = ApiError),
        (status = 404, description = "Unknown widget", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn get_widget(
    State(dashboard): State<DashboardService>,
    AuthExtractor(auth): AuthExtractor,
    Path(widget_id): Path<String>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    auth.require_any_role(WIDGET_ROLES)?;
    let Query(query) = query?;

    let read = dashboard.get_widget_data(&widget_id, &query).await?;
    let data = Arc::unwrap_or_clone(read.value);
    let response = WidgetResponse {
        widget_id: data.widget_id().to_string(),
        data,
    };
    Ok(ApiEnvelope::cached(response, read.cache_hit))
}

/// GET /admin/dashboard/export - Export the overview as JSON or CSV
///
/// CSV is returned raw as an attachment; JSON uses the response envelope.
#[utoipa::path(
    get,
    path = "/admin/dashboard/export",
    tag = "Dashboard",
    params(ExportParams, DashboardQuery),
    responses(
        (status = 200, description = "Export payload (JSON envelope or text/csv attachment)", body = DashboardOverview),
        (status = 400, description = "Unknown export format", body = ApiError),
        (status = 403, description = "Caller is not an admin or manager", body = ApiError),
        (status = 501, description = "PDF export is not available", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn export_dashboard(
    State(dashboard): State<DashboardService>,
    AuthExtractor(auth): AuthExtractor,
    params: Result<Query<ExportParams>, QueryRejection>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> ApiResult<Response> {
    auth.require_any_role(EXPORT_ROLES)?;
    let Query(params) = params?;
    let Query(query) = query?;
    let format = params.format.as_deref().unwrap_or("json");

    let export = dashboard
        .export_dashboard(&query, format, &auth.user_id)
        .await?;

    Ok(match export {
        DashboardExport::Json(value) => ApiEnvelope::ok(value).into_response(),
        DashboardExport::Csv(body) => csv_attachment(body),
    })
}

fn csv_attachment(body: String) -> Response {
    let file_name = format!(
        "dashboard-export-{}.csv",
        Utc::now().format("%Y%m%d-%H%M%S")
    );
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// GET /admin/dashboard/cache/stats - Dashboard cache statistics
#[utoipa::path(
    get,
    path = "/admin/dashboard/cache/stats",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Cache statistics", body = CacheStatsResponse),
        (status = 403, description = "Caller is not an admin", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn get_cache_stats(
    State(dashboard): State<DashboardService>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    auth.require_any_role(CACHE_ROLES)?;

    let stats = dashboard.cache_stats();
    let config = dashboard.config();
    Ok(ApiEnvelope::ok(CacheStatsResponse {
        hits: stats.hits,
        misses: stats.misses,
        entries: stats.entries,
        evictions: stats.evictions,
        expirations: stats.expirations,
        hit_rate: stats.hit_rate,
        max_size: config.cache_max_size,
        overview_ttl_secs: config.overview_ttl.as_secs(),
        widget_ttl_secs: config.widget_ttl.as_secs(),
    }))
}

/// DELETE /admin/dashboard/cache - Clear cached dashboard entries
#[utoipa::path(
    delete,
    path = "/admin/dashboard/cache",
    tag = "Dashboard",
    params(ClearCacheParams),
    responses(
        (status = 200, description = "Entries removed", body = CacheClearResponse),
        (status = 403, description = "Caller is not an admin", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn clear_cache(
    State(dashboard): State<DashboardService>,
    AuthExtractor(auth): AuthExtractor,
    params: Result<Query<ClearCacheParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    auth.require_any_role(CACHE_ROLES)?;
    let Query(params) = params?;

    let removed = dashboard.clear_cache(params.category.as_deref())?;
    tracing::info!(user_id = %auth.user_id, removed, "Dashboard cache cleared by request");

    Ok(ApiEnvelope::ok(CacheClearResponse {
        category: params.category,
        removed,
    }))
}

/// GET /admin/dashboard/health - Database health as seen by the dashboard
#[utoipa::path(
    get,
    path = "/admin/dashboard/health",
    tag = "Dashboard",
    responses(
        (status = 200, description = "System health", body = SystemHealth),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn get_health(
    State(dashboard): State<DashboardService>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let mut health = dashboard.aggregator().get_system_health().await;
    if auth.highest_role() != UserRole::Admin {
        health.message = REDACTED_HEALTH_MESSAGE.to_string();
    }
    Ok(ApiEnvelope::ok(health))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Dashboard routes, mounted under `/admin/dashboard`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/overview", get(get_overview))
        .route("/role-based", get(get_role_based))
        .route("/widgets/:widget_id", get(get_widget))
        .route("/export", get(export_dashboard))
        .route("/cache/stats", get(get_cache_stats))
        .route("/cache", delete(clear_cache))
        .route("/health", get(get_health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_clear_response_omits_missing_category() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(CacheClearResponse {
            category: None,
            removed: 3,
        })?;
        assert_eq!(json, serde_json::json!({ "removed": 3 }));
        Ok(())
    }

    #[test]
    fn test_csv_attachment_headers() {
        let response = csv_attachment("a\n1\n".to_string());
        let headers = response.headers();

        assert_eq!(
            headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("text/csv; charset=utf-8")
        );
        let disposition = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(disposition.starts_with("attachment; filename=\"dashboard-export-"));
        assert!(disposition.ends_with(".csv\""));
    }
}
