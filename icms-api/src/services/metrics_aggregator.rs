//! Metrics Aggregator
//!
//! Builds the five dashboard categories from a [`MetricsSource`]. Every
//! source call is a leaf: a failed leaf is logged, counted and replaced by
//! its zero value, so one broken query never fails a category. A category
//! only fails when the query itself is invalid.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use icms_core::{
    Clock, ContentOverview, DashboardOverview, DashboardQuery, DashboardResult, DocumentStatus,
    GrowthTrend, HealthStatus, HrOverview, MarketingOverview, MetricValue, MetricsSource,
    MetricsSourceError, MetricsWindow, SourceResult, StorageUsage, SystemHealth, SystemOverview,
    SystemClock, UserOverview,
};

use crate::config::DashboardConfig;
use crate::telemetry::metrics;

// Fixed figures with no data source behind them yet.
const PLACEHOLDER_TOTAL_VIEWS: i64 = 15_420;
const PLACEHOLDER_USER_GROWTH_PERCENT: f64 = 12.5;
const PLACEHOLDER_CONTENT_GROWTH_PERCENT: f64 = 8.3;
const PLACEHOLDER_NEW_HIRES: i64 = 4;
const PLACEHOLDER_ATTENDANCE_RATE: f64 = 94.5;
const PLACEHOLDER_TURNOVER_RATE: f64 = 3.2;
const PLACEHOLDER_IMPRESSIONS: i64 = 115_700;
const PLACEHOLDER_CLICKS: i64 = 3_240;
const PLACEHOLDER_CLICK_THROUGH_RATE: f64 = 2.8;

/// Aggregation tuning.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub top_active_users: usize,
    pub recent_limit: usize,
    pub slow_database_threshold: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

impl From<&DashboardConfig> for AggregatorConfig {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            top_active_users: config.top_active_users,
            recent_limit: config.recent_limit,
            slow_database_threshold: config.slow_database_threshold,
        }
    }
}

/// Await one source query, degrading a failure to `T::default()`.
async fn leaf<T, F>(metric: &'static str, query: F) -> T
where
    T: Default,
    F: Future<Output = SourceResult<T>>,
{
    match query.await {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(metric, error = %error, "Leaf metric failed; reporting zero");
            if let Some(registry) = metrics() {
                registry.record_leaf_failure(metric);
            }
            T::default()
        }
    }
}

/// Map a ping outcome to a health figure.
pub fn classify_health(
    ping: Result<Duration, &MetricsSourceError>,
    slow_threshold: Duration,
    checked_at: DateTime<Utc>,
) -> SystemHealth {
    match ping {
        Ok(latency) => {
            let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
            let (status, message) = if latency < slow_threshold {
                (
                    HealthStatus::Healthy,
                    format!("Database responded in {}ms", latency_ms),
                )
            } else {
                (
                    HealthStatus::Degraded,
                    format!("Database is slow to respond ({}ms)", latency_ms),
                )
            };
            SystemHealth {
                status,
                message,
                database_latency_ms: Some(latency_ms),
                checked_at: Some(checked_at),
            }
        }
        Err(error) => SystemHealth {
            status: HealthStatus::Unhealthy,
            message: format!("Database unreachable: {}", error),
            database_latency_ms: None,
            checked_at: Some(checked_at),
        },
    }
}

/// Computes dashboard categories from a metrics source.
#[derive(Clone)]
pub struct MetricsAggregator {
    source: Arc<dyn MetricsSource>,
    clock: Arc<dyn Clock>,
    config: AggregatorConfig,
}

impl std::fmt::Debug for MetricsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsAggregator")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MetricsAggregator {
    pub fn new(source: Arc<dyn MetricsSource>, config: AggregatorConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn MetricsSource>,
        config: AggregatorConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            clock,
            config,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn window(&self, query: &DashboardQuery) -> DashboardResult<MetricsWindow> {
        query.window(self.clock.now())
    }

    fn observe(category: &str, started: Instant) {
        if let Some(registry) = metrics() {
            registry.record_aggregation(category, started.elapsed().as_secs_f64());
        }
    }

    /// Ping the source and classify the round-trip.
    pub async fn get_system_health(&self) -> SystemHealth {
        let started = Instant::now();
        let ping = self.source.ping().await;
        let latency = started.elapsed();
        classify_health(
            ping.as_ref().map(|_| latency),
            self.config.slow_database_threshold,
            self.clock.now(),
        )
    }

    // ========================================================================
    // CATEGORIES
    // ========================================================================

    pub async fn get_system_overview(&self, query: &DashboardQuery) -> DashboardResult<SystemOverview> {
        self.window(query)?;
        let started = Instant::now();
        let source = &self.source;

        let (
            total_users,
            total_documents,
            total_media,
            used_bytes,
            total_departments,
            total_employees,
            office_settings_configured,
            system_health,
        ) = tokio::join!(
            leaf("count_users", source.count_users()),
            leaf("count_documents", source.count_documents()),
            leaf("count_media", source.count_media()),
            leaf("total_media_bytes", source.total_media_bytes()),
            leaf("count_departments", source.count_departments()),
            leaf("count_employees", source.count_employees(None)),
            leaf(
                "office_settings_configured",
                source.office_settings_configured()
            ),
            self.get_system_health(),
        );

        Self::observe("system", started);
        Ok(SystemOverview {
            total_users,
            total_documents,
            total_media,
            total_departments,
            total_employees,
            office_settings_configured,
            storage: StorageUsage {
                total_files: total_media,
                used_bytes,
            },
            system_health,
            total_views: MetricValue::placeholder(PLACEHOLDER_TOTAL_VIEWS),
        })
    }

    pub async fn get_content_overview(
        &self,
        query: &DashboardQuery,
    ) -> DashboardResult<ContentOverview> {
        let window = self.window(query)?;
        let started = Instant::now();
        let source = &self.source;

        let (
            total_documents,
            published_documents,
            draft_documents,
            new_documents,
            header_configurations,
            total_important_links,
            active_important_links,
            documents_by_category,
            recent_documents,
        ) = tokio::join!(
            leaf("count_documents", source.count_documents()),
            leaf(
                "count_published_documents",
                source.count_documents_by_status(DocumentStatus::Published)
            ),
            leaf(
                "count_draft_documents",
                source.count_documents_by_status(DocumentStatus::Draft)
            ),
            leaf("count_new_documents", source.count_new_documents(&window)),
            leaf("count_header_configs", source.count_header_configs()),
            leaf("count_important_links", source.count_important_links(false)),
            leaf(
                "count_active_important_links",
                source.count_important_links(true)
            ),
            leaf("documents_by_category", source.documents_by_category()),
            leaf(
                "recent_documents",
                source.recent_documents(self.config.recent_limit)
            ),
        );

        Self::observe("content", started);
        Ok(ContentOverview {
            total_documents,
            published_documents,
            draft_documents,
            new_documents,
            header_configurations,
            total_important_links,
            active_important_links,
            documents_by_category,
            recent_documents,
            growth: MetricValue::placeholder(GrowthTrend::from_percent(
                PLACEHOLDER_CONTENT_GROWTH_PERCENT,
            )),
        })
    }

    pub async fn get_user_overview(&self, query: &DashboardQuery) -> DashboardResult<UserOverview> {
        let window = self.window(query)?;
        let started = Instant::now();
        let source = &self.source;

        let (total_users, active_users, new_users, users_by_role, top_active_users) = tokio::join!(
            leaf("count_users", source.count_users()),
            leaf("count_active_users", source.count_active_users(&window)),
            leaf("count_new_users", source.count_new_users(&window)),
            leaf("users_by_role", source.users_by_role()),
            leaf(
                "top_active_users",
                source.top_active_users(&window, self.config.top_active_users)
            ),
        );

        Self::observe("users", started);
        Ok(UserOverview {
            total_users,
            active_users,
            new_users,
            users_by_role,
            top_active_users,
            growth: MetricValue::placeholder(GrowthTrend::from_percent(
                PLACEHOLDER_USER_GROWTH_PERCENT,
            )),
        })
    }

    pub async fn get_hr_overview(&self, query: &DashboardQuery) -> DashboardResult<HrOverview> {
        self.window(query)?;
        let started = Instant::now();
        let source = &self.source;

        let (total_employees, total_departments, employees_by_department) = tokio::join!(
            leaf("count_employees", source.count_employees(query.department_id)),
            leaf("count_departments", source.count_departments()),
            leaf("employees_by_department", source.employees_by_department()),
        );

        Self::observe("hr", started);
        Ok(HrOverview {
            total_employees,
            total_departments,
            employees_by_department,
            new_hires: MetricValue::placeholder(PLACEHOLDER_NEW_HIRES),
            attendance_rate: MetricValue::placeholder(PLACEHOLDER_ATTENDANCE_RATE),
            turnover_rate: MetricValue::placeholder(PLACEHOLDER_TURNOVER_RATE),
        })
    }

    pub async fn get_marketing_overview(
        &self,
        query: &DashboardQuery,
    ) -> DashboardResult<MarketingOverview> {
        self.window(query)?;
        let started = Instant::now();
        let source = &self.source;

        let (active_links, recent_links) = tokio::join!(
            leaf("count_active_important_links", source.count_important_links(true)),
            leaf(
                "recent_important_links",
                source.recent_important_links(self.config.recent_limit)
            ),
        );

        Self::observe("marketing", started);
        Ok(MarketingOverview {
            active_links,
            recent_links,
            impressions: MetricValue::placeholder(PLACEHOLDER_IMPRESSIONS),
            clicks: MetricValue::placeholder(PLACEHOLDER_CLICKS),
            click_through_rate: MetricValue::placeholder(PLACEHOLDER_CLICK_THROUGH_RATE),
        })
    }

    /// All five categories, computed concurrently. Any category error fails
    /// the whole overview.
    pub async fn get_dashboard_overview(
        &self,
        query: &DashboardQuery,
    ) -> DashboardResult<DashboardOverview> {
        let (system, content, users, hr, marketing) = tokio::try_join!(
            self.get_system_overview(query),
            self.get_content_overview(query),
            self.get_user_overview(query),
            self.get_hr_overview(query),
            self.get_marketing_overview(query),
        )?;

        Ok(DashboardOverview {
            system,
            content,
            users,
            hr,
            marketing,
            generated_at: self.clock.now(),
        })
    }
}
