//! OpenAPI Specification for the ICMS admin API
//!
//! Generated by utoipa from the route annotations and schema derives.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::envelope::{Pagination, ResponseMeta};
use crate::error::{ApiError, ErrorCode};
use crate::routes::{dashboard, health, media};
use crate::services::{RoleDashboard, WidgetData};

use icms_core::{
    ActiveUser, ContentOverview, DashboardOverview, DashboardQuery, ExportFormat, GrowthTrend,
    HealthStatus, HrOverview, LabeledCount, LinkSummary, MarketingOverview, MediaRecord,
    MediaUpload, Period, PresignOperation, PresignedUrl, RecentDocument, StorageUsage,
    SystemHealth, SystemOverview, TrendDirection, UploadedMedia, UserOverview, WidgetId,
};

/// OpenAPI document for the ICMS admin API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ICMS Admin API",
        version = "0.1.0",
        description = "Administrative dashboard and media endpoints for the ICMS content management system",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Dashboard", description = "Aggregated dashboard metrics, widgets, exports and cache control"),
        (name = "Media", description = "Media upload registration and presigned URLs"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics"),
    ),
    paths(
        dashboard::get_overview,
        dashboard::get_role_based,
        dashboard::get_widget,
        dashboard::export_dashboard,
        dashboard::get_cache_stats,
        dashboard::clear_cache,
        dashboard::get_health,
        media::upload_media,
        media::get_presigned_url,
        health::ping,
        health::liveness,
        health::readiness,
        crate::telemetry::metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError,
            ErrorCode,
            ResponseMeta,
            Pagination,
            DashboardQuery,
            Period,
            WidgetId,
            ExportFormat,
            DashboardOverview,
            SystemOverview,
            SystemHealth,
            HealthStatus,
            StorageUsage,
            ContentOverview,
            RecentDocument,
            UserOverview,
            ActiveUser,
            HrOverview,
            MarketingOverview,
            LinkSummary,
            LabeledCount,
            GrowthTrend,
            TrendDirection,
            RoleDashboard,
            WidgetData,
            dashboard::WidgetResponse,
            dashboard::CacheStatsResponse,
            dashboard::CacheClearResponse,
            media::UploadMediaRequest,
            MediaUpload,
            MediaRecord,
            PresignOperation,
            PresignedUrl,
            UploadedMedia,
            health::ProbeResponse,
            health::ProbeDetails,
            health::ProbeComponent,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security scheme modifier for OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );

            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token with a roles claim"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
