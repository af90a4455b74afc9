//! Dashboard Service
//!
//! Facade over the aggregator and the TTL cache. Overviews are cached per
//! query hash, widgets per (widget, query hash); role views and exports are
//! derived from the cached overview on every call.

use std::sync::Arc;

use icms_core::{
    ContentOverview, DashboardError, DashboardOverview, DashboardQuery, DashboardResult,
    ExportFormat, HrOverview, MarketingOverview, SystemOverview, UserOverview, UserRole, WidgetId,
};
use icms_storage::cache::{CacheOptions, CacheStats, TtlCache};
use regex::Regex;
use serde::Serialize;

use super::export::to_csv;
use super::metrics_aggregator::MetricsAggregator;
use super::role_filter::{filter_for_role, RoleDashboard};
use crate::config::DashboardConfig;
use crate::telemetry::metrics;

const KEY_PREFIX: &str = "dashboard";

/// Values stored in the dashboard cache.
#[derive(Debug, Clone)]
pub enum CachedDashboard {
    Overview(Arc<DashboardOverview>),
    Widget(Arc<WidgetData>),
}

/// Payload of a single widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum WidgetData {
    SystemHealth(SystemOverview),
    ContentStats(ContentOverview),
    UserActivity(UserOverview),
    HrSummary(HrOverview),
    MarketingPerformance(MarketingOverview),
}

impl WidgetData {
    pub fn widget_id(&self) -> WidgetId {
        match self {
            WidgetData::SystemHealth(_) => WidgetId::SystemHealth,
            WidgetData::ContentStats(_) => WidgetId::ContentStats,
            WidgetData::UserActivity(_) => WidgetId::UserActivity,
            WidgetData::HrSummary(_) => WidgetId::HrSummary,
            WidgetData::MarketingPerformance(_) => WidgetId::MarketingPerformance,
        }
    }
}

/// A value plus whether it came from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRead<T> {
    pub value: T,
    pub cache_hit: bool,
}

impl<T> CachedRead<T> {
    fn hit(value: T) -> Self {
        Self {
            value,
            cache_hit: true,
        }
    }

    fn miss(value: T) -> Self {
        Self {
            value,
            cache_hit: false,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CachedRead<U> {
        CachedRead {
            value: f(self.value),
            cache_hit: self.cache_hit,
        }
    }
}

/// Rendered export.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardExport {
    Json(serde_json::Value),
    Csv(String),
}

pub fn overview_cache_key(query: &DashboardQuery) -> String {
    format!("{}:overview:{}", KEY_PREFIX, query.cache_key())
}

pub fn widget_cache_key(widget: WidgetId, query: &DashboardQuery) -> String {
    format!("{}:widget:{}:{}", KEY_PREFIX, widget, query.cache_key())
}

fn record_lookup(kind: &str, hit: bool) {
    if let Some(registry) = metrics() {
        registry.record_cache_lookup(kind, hit);
    }
}

/// Dashboard facade used by the HTTP handlers.
#[derive(Debug, Clone)]
pub struct DashboardService {
    aggregator: MetricsAggregator,
    cache: Arc<TtlCache<CachedDashboard>>,
    config: DashboardConfig,
}

impl DashboardService {
    pub fn new(
        aggregator: MetricsAggregator,
        cache: Arc<TtlCache<CachedDashboard>>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            aggregator,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache<CachedDashboard>> {
        &self.cache
    }

    pub fn aggregator(&self) -> &MetricsAggregator {
        &self.aggregator
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    // ========================================================================
    // OVERVIEW
    // ========================================================================

    pub async fn get_dashboard_overview(
        &self,
        query: &DashboardQuery,
    ) -> DashboardResult<CachedRead<Arc<DashboardOverview>>> {
        let key = overview_cache_key(query);

        if let Some(CachedDashboard::Overview(overview)) = self.cache.get(&key) {
            record_lookup("overview", true);
            tracing::debug!(key = %key, "Dashboard overview served from cache");
            return Ok(CachedRead::hit(overview));
        }
        record_lookup("overview", false);

        let overview = Arc::new(self.aggregator.get_dashboard_overview(query).await?);
        self.cache.set(
            key,
            CachedDashboard::Overview(Arc::clone(&overview)),
            CacheOptions::ttl(self.config.overview_ttl),
        );
        Ok(CachedRead::miss(overview))
    }

    /// Overview projected for the caller's role name.
    pub async fn get_role_based_dashboard(
        &self,
        role: &str,
        query: &DashboardQuery,
    ) -> DashboardResult<CachedRead<RoleDashboard>> {
        let role = UserRole::parse(role);
        let read = self.get_dashboard_overview(query).await?;
        Ok(read.map(|overview| RoleDashboard {
            overview: filter_for_role(&overview, &role),
            role,
        }))
    }

    // ========================================================================
    // WIDGETS
    // ========================================================================

    /// Look up a widget by its string id.
    pub async fn get_widget_data(
        &self,
        widget_id: &str,
        query: &DashboardQuery,
    ) -> DashboardResult<CachedRead<Arc<WidgetData>>> {
        let widget: WidgetId = widget_id.parse()?;
        self.get_widget(widget, query).await
    }

    pub async fn get_widget(
        &self,
        widget: WidgetId,
        query: &DashboardQuery,
    ) -> DashboardResult<CachedRead<Arc<WidgetData>>> {
        let key = widget_cache_key(widget, query);

        if let Some(CachedDashboard::Widget(data)) = self.cache.get(&key) {
            record_lookup("widget", true);
            return Ok(CachedRead::hit(data));
        }
        record_lookup("widget", false);

        let data = Arc::new(self.produce_widget(widget, query).await?);
        self.cache.set(
            key,
            CachedDashboard::Widget(Arc::clone(&data)),
            CacheOptions::ttl(self.config.widget_ttl),
        );
        Ok(CachedRead::miss(data))
    }

    async fn produce_widget(
        &self,
        widget: WidgetId,
        query: &DashboardQuery,
    ) -> DashboardResult<WidgetData> {
        let aggregator = &self.aggregator;
        Ok(match widget {
            WidgetId::SystemHealth => {
                WidgetData::SystemHealth(aggregator.get_system_overview(query).await?)
            }
            WidgetId::ContentStats => {
                WidgetData::ContentStats(aggregator.get_content_overview(query).await?)
            }
            WidgetId::UserActivity => {
                WidgetData::UserActivity(aggregator.get_user_overview(query).await?)
            }
            WidgetId::HrSummary => WidgetData::HrSummary(aggregator.get_hr_overview(query).await?),
            WidgetId::MarketingPerformance => {
                WidgetData::MarketingPerformance(aggregator.get_marketing_overview(query).await?)
            }
        })
    }

    // ========================================================================
    // EXPORT
    // ========================================================================

    /// Export the overview. `format` is parsed here so unknown names fail
    /// with `InvalidExportFormat`.
    pub async fn export_dashboard(
        &self,
        query: &DashboardQuery,
        format: &str,
        user_id: &str,
    ) -> DashboardResult<DashboardExport> {
        let parsed = format.parse::<ExportFormat>();
        let result = match parsed {
            Ok(format) => self.render_export(query, format).await,
            Err(e) => Err(e),
        };

        if let Some(registry) = metrics() {
            registry.record_export(format, result.is_ok());
        }
        match &result {
            Ok(_) => tracing::info!(user_id, format, "Dashboard exported"),
            Err(e) => tracing::warn!(user_id, format, error = %e, "Dashboard export failed"),
        }
        result
    }

    async fn render_export(
        &self,
        query: &DashboardQuery,
        format: ExportFormat,
    ) -> DashboardResult<DashboardExport> {
        if format == ExportFormat::Pdf {
            return Err(DashboardError::UnsupportedExportFormat {
                format: format.to_string(),
            });
        }

        let overview = self.get_dashboard_overview(query).await?.value;
        let json = serde_json::to_value(overview.as_ref())?;

        Ok(match format {
            ExportFormat::Csv => DashboardExport::Csv(to_csv(&json)),
            _ => DashboardExport::Json(json),
        })
    }

    // ========================================================================
    // CACHE MANAGEMENT
    // ========================================================================

    /// Drop cached entries for one category (`overview`, `widget`) or all
    /// of them. Returns the number of entries removed.
    pub fn clear_cache(&self, category: Option<&str>) -> DashboardResult<usize> {
        let removed = match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(category) => {
                let pattern = Regex::new(&format!(
                    "^{}:{}(:|$)",
                    KEY_PREFIX,
                    regex::escape(category)
                ))
                .map_err(|e| DashboardError::InvalidQuery {
                    reason: e.to_string(),
                })?;
                self.cache.invalidate_pattern(&pattern)
            }
            None => {
                let removed = self.cache.len();
                self.cache.clear();
                removed
            }
        };

        tracing::info!(category = ?category, removed, "Dashboard cache cleared");
        Ok(removed)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
