//! ICMS Test Utilities
//!
//! Shared test infrastructure for the ICMS workspace:
//! - An in-memory metrics source with per-query failure injection
//! - An in-memory media repository
//! - Proptest generators for dashboard types
//! - Fixtures for common scenarios

pub use icms_core::{
    ActiveUser, ContentOverview, DashboardOverview, DashboardQuery, DocumentStatus, GrowthTrend,
    HealthStatus, HrOverview, LabeledCount, LinkSummary, MarketingOverview, MediaError,
    MediaRecord, MediaRepository, MediaResult, MetricValue, MetricsSource, MetricsSourceError,
    MetricsWindow, Period, RecentDocument, SourceResult, StorageUsage, SystemHealth,
    SystemOverview, Timestamp, UserOverview,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

// ============================================================================
// MOCK METRICS SOURCE
// ============================================================================

/// Values served by [`MockMetricsSource`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockMetrics {
    pub users: i64,
    pub active_users: i64,
    pub new_users: i64,
    pub users_by_role: Vec<LabeledCount>,
    pub top_active_users: Vec<ActiveUser>,
    pub documents: i64,
    pub published_documents: i64,
    pub draft_documents: i64,
    pub archived_documents: i64,
    pub new_documents: i64,
    pub documents_by_category: Vec<LabeledCount>,
    pub recent_documents: Vec<RecentDocument>,
    pub header_configs: i64,
    pub important_links: i64,
    pub active_important_links: i64,
    pub recent_links: Vec<LinkSummary>,
    pub media: i64,
    pub media_bytes: i64,
    pub office_settings_configured: bool,
    pub departments: i64,
    pub employees: i64,
    pub employees_by_department: Vec<LabeledCount>,
    /// Per-department employee counts used when a department filter is given.
    pub department_employees: HashMap<Uuid, i64>,
}

/// In-memory [`MetricsSource`].
///
/// Every query can be made to fail by name (the trait method name, e.g.
/// `"count_documents"`), and every call is counted so tests can assert that
/// a cached read did not reach the source.
#[derive(Debug, Clone, Default)]
pub struct MockMetricsSource {
    metrics: MockMetrics,
    failing: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl MockMetricsSource {
    pub fn new(metrics: MockMetrics) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    /// Source populated with [`fixtures::sample_metrics`].
    pub fn sample() -> Self {
        Self::new(fixtures::sample_metrics())
    }

    pub fn metrics(&self) -> &MockMetrics {
        &self.metrics
    }

    /// Make the named query fail from now on.
    pub fn fail(&self, query: &str) -> &Self {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(query.to_string());
        self
    }

    /// Make every query, including `ping`, fail.
    pub fn fail_all(&self) -> &Self {
        let mut failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        for query in QUERY_NAMES {
            failing.insert((*query).to_string());
        }
        self
    }

    /// Clear all injected failures.
    pub fn recover(&self) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of times the named query was called.
    pub fn calls_for(&self, query: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(query)
            .copied()
            .unwrap_or(0)
    }

    /// Total number of queries issued against this source.
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }

    fn check(&self, query: &str) -> SourceResult<()> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(query.to_string())
            .or_insert(0) += 1;

        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(query) {
            return Err(MetricsSourceError::query(query, "injected failure"));
        }
        Ok(())
    }
}

/// Names of every [`MetricsSource`] query, as accepted by [`MockMetricsSource::fail`].
pub const QUERY_NAMES: &[&str] = &[
    "ping",
    "count_users",
    "count_active_users",
    "count_new_users",
    "users_by_role",
    "top_active_users",
    "count_documents",
    "count_documents_by_status",
    "count_new_documents",
    "documents_by_category",
    "recent_documents",
    "count_header_configs",
    "count_important_links",
    "recent_important_links",
    "count_media",
    "total_media_bytes",
    "office_settings_configured",
    "count_departments",
    "count_employees",
    "employees_by_department",
];

#[async_trait]
impl MetricsSource for MockMetricsSource {
    async fn ping(&self) -> SourceResult<()> {
        self.check("ping")
    }

    async fn count_users(&self) -> SourceResult<i64> {
        self.check("count_users")?;
        Ok(self.metrics.users)
    }

    async fn count_active_users(&self, _window: &MetricsWindow) -> SourceResult<i64> {
        self.check("count_active_users")?;
        Ok(self.metrics.active_users)
    }

    async fn count_new_users(&self, _window: &MetricsWindow) -> SourceResult<i64> {
        self.check("count_new_users")?;
        Ok(self.metrics.new_users)
    }

    async fn users_by_role(&self) -> SourceResult<Vec<LabeledCount>> {
        self.check("users_by_role")?;
        Ok(self.metrics.users_by_role.clone())
    }

    async fn top_active_users(
        &self,
        _window: &MetricsWindow,
        limit: usize,
    ) -> SourceResult<Vec<ActiveUser>> {
        self.check("top_active_users")?;
        Ok(self.metrics.top_active_users.iter().take(limit).cloned().collect())
    }

    async fn count_documents(&self) -> SourceResult<i64> {
        self.check("count_documents")?;
        Ok(self.metrics.documents)
    }

    async fn count_documents_by_status(&self, status: DocumentStatus) -> SourceResult<i64> {
        self.check("count_documents_by_status")?;
        Ok(match status {
            DocumentStatus::Published => self.metrics.published_documents,
            DocumentStatus::Draft => self.metrics.draft_documents,
            DocumentStatus::Archived => self.metrics.archived_documents,
        })
    }

    async fn count_new_documents(&self, _window: &MetricsWindow) -> SourceResult<i64> {
        self.check("count_new_documents")?;
        Ok(self.metrics.new_documents)
    }

    async fn documents_by_category(&self) -> SourceResult<Vec<LabeledCount>> {
        self.check("documents_by_category")?;
        Ok(self.metrics.documents_by_category.clone())
    }

    async fn recent_documents(&self, limit: usize) -> SourceResult<Vec<RecentDocument>> {
        self.check("recent_documents")?;
        Ok(self.metrics.recent_documents.iter().take(limit).cloned().collect())
    }

    async fn count_header_configs(&self) -> SourceResult<i64> {
        self.check("count_header_configs")?;
        Ok(self.metrics.header_configs)
    }

    async fn count_important_links(&self, active_only: bool) -> SourceResult<i64> {
        self.check("count_important_links")?;
        Ok(if active_only {
            self.metrics.active_important_links
        } else {
            self.metrics.important_links
        })
    }

    async fn recent_important_links(&self, limit: usize) -> SourceResult<Vec<LinkSummary>> {
        self.check("recent_important_links")?;
        Ok(self.metrics.recent_links.iter().take(limit).cloned().collect())
    }

    async fn count_media(&self) -> SourceResult<i64> {
        self.check("count_media")?;
        Ok(self.metrics.media)
    }

    async fn total_media_bytes(&self) -> SourceResult<i64> {
        self.check("total_media_bytes")?;
        Ok(self.metrics.media_bytes)
    }

    async fn office_settings_configured(&self) -> SourceResult<bool> {
        self.check("office_settings_configured")?;
        Ok(self.metrics.office_settings_configured)
    }

    async fn count_departments(&self) -> SourceResult<i64> {
        self.check("count_departments")?;
        Ok(self.metrics.departments)
    }

    async fn count_employees(&self, department_id: Option<Uuid>) -> SourceResult<i64> {
        self.check("count_employees")?;
        Ok(match department_id {
            Some(id) => self
                .metrics
                .department_employees
                .get(&id)
                .copied()
                .unwrap_or(0),
            None => self.metrics.employees,
        })
    }

    async fn employees_by_department(&self) -> SourceResult<Vec<LabeledCount>> {
        self.check("employees_by_department")?;
        Ok(self.metrics.employees_by_department.clone())
    }
}

// ============================================================================
// MOCK MEDIA REPOSITORY
// ============================================================================

/// Media repository backed by a shared map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMediaRepository {
    records: Arc<Mutex<HashMap<Uuid, MediaRecord>>>,
}

impl InMemoryMediaRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MediaRepository for InMemoryMediaRepository {
    async fn insert_media(&self, record: &MediaRecord) -> MediaResult<()> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.contains_key(&record.id) {
            return Err(MediaError::Repository {
                reason: format!("duplicate media id {}", record.id),
            });
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_media(&self, media_id: Uuid) -> MediaResult<Option<MediaRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&media_id)
            .cloned())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for dashboard types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Timestamps between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64)
            .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now))
    }

    pub fn arb_count() -> impl Strategy<Value = i64> {
        0i64..1_000_000
    }

    pub fn arb_labeled_count() -> impl Strategy<Value = LabeledCount> {
        ("[A-Za-z ]{1,16}", arb_count()).prop_map(|(label, count)| LabeledCount::new(label, count))
    }

    pub fn arb_labeled_counts() -> impl Strategy<Value = Vec<LabeledCount>> {
        prop::collection::vec(arb_labeled_count(), 0..6)
    }

    pub fn arb_growth() -> impl Strategy<Value = MetricValue<GrowthTrend>> {
        (-100.0f64..100.0, any::<bool>()).prop_map(|(pct, placeholder)| {
            let trend = GrowthTrend::from_percent(pct);
            if placeholder {
                MetricValue::placeholder(trend)
            } else {
                MetricValue::live(trend)
            }
        })
    }

    pub fn arb_health_status() -> impl Strategy<Value = HealthStatus> {
        prop_oneof![
            Just(HealthStatus::Healthy),
            Just(HealthStatus::Degraded),
            Just(HealthStatus::Unhealthy),
            Just(HealthStatus::Unknown),
        ]
    }

    pub fn arb_active_user() -> impl Strategy<Value = ActiveUser> {
        (
            arb_uuid(),
            "[a-z]{3,10}",
            prop_oneof![Just("admin"), Just("editor"), Just("user")],
            proptest::option::of(arb_timestamp()),
            arb_count(),
        )
            .prop_map(|(id, name, role, last_login_at, activity_count)| ActiveUser {
                id,
                email: format!("{}@example.org", name),
                name,
                role: role.to_string(),
                last_login_at,
                activity_count,
            })
    }

    pub fn arb_system_overview() -> impl Strategy<Value = SystemOverview> {
        (
            (arb_count(), arb_count(), arb_count(), arb_count(), arb_count()),
            any::<bool>(),
            (arb_count(), arb_count()),
            (arb_health_status(), "[ -~]{0,40}", proptest::option::of(0u64..5_000)),
            arb_count(),
        )
            .prop_map(
                |(
                    (users, documents, media, departments, employees),
                    office,
                    (files, bytes),
                    (status, message, latency),
                    views,
                )| SystemOverview {
                    total_users: users,
                    total_documents: documents,
                    total_media: media,
                    total_departments: departments,
                    total_employees: employees,
                    office_settings_configured: office,
                    storage: StorageUsage {
                        total_files: files,
                        used_bytes: bytes,
                    },
                    system_health: SystemHealth {
                        status,
                        message,
                        database_latency_ms: latency,
                        checked_at: None,
                    },
                    total_views: MetricValue::placeholder(views),
                },
            )
    }

    pub fn arb_content_overview() -> impl Strategy<Value = ContentOverview> {
        (
            (arb_count(), arb_count(), arb_count(), arb_count()),
            (arb_count(), arb_count(), arb_count()),
            arb_labeled_counts(),
            arb_growth(),
        )
            .prop_map(
                |((total, published, draft, new), (headers, links, active), by_category, growth)| {
                    ContentOverview {
                        total_documents: total,
                        published_documents: published,
                        draft_documents: draft,
                        new_documents: new,
                        header_configurations: headers,
                        total_important_links: links,
                        active_important_links: active,
                        documents_by_category: by_category,
                        recent_documents: Vec::new(),
                        growth,
                    }
                },
            )
    }

    pub fn arb_user_overview() -> impl Strategy<Value = UserOverview> {
        (
            (arb_count(), arb_count(), arb_count()),
            arb_labeled_counts(),
            prop::collection::vec(arb_active_user(), 0..5),
            arb_growth(),
        )
            .prop_map(|((total, active, new), by_role, top, growth)| UserOverview {
                total_users: total,
                active_users: active,
                new_users: new,
                users_by_role: by_role,
                top_active_users: top,
                growth,
            })
    }

    pub fn arb_hr_overview() -> impl Strategy<Value = HrOverview> {
        (
            (arb_count(), arb_count()),
            arb_labeled_counts(),
            (arb_count(), 0.0f64..100.0, 0.0f64..100.0),
        )
            .prop_map(|((employees, departments), by_department, (hires, attendance, turnover))| {
                HrOverview {
                    total_employees: employees,
                    total_departments: departments,
                    employees_by_department: by_department,
                    new_hires: MetricValue::placeholder(hires),
                    attendance_rate: MetricValue::placeholder(attendance),
                    turnover_rate: MetricValue::placeholder(turnover),
                }
            })
    }

    pub fn arb_marketing_overview() -> impl Strategy<Value = MarketingOverview> {
        (arb_count(), arb_count(), arb_count(), 0.0f64..100.0).prop_map(
            |(active, impressions, clicks, ctr)| MarketingOverview {
                active_links: active,
                recent_links: Vec::new(),
                impressions: MetricValue::placeholder(impressions),
                clicks: MetricValue::placeholder(clicks),
                click_through_rate: MetricValue::placeholder(ctr),
            },
        )
    }

    pub fn arb_dashboard_overview() -> impl Strategy<Value = DashboardOverview> {
        (
            arb_system_overview(),
            arb_content_overview(),
            arb_user_overview(),
            arb_hr_overview(),
            arb_marketing_overview(),
            arb_timestamp(),
        )
            .prop_map(|(system, content, users, hr, marketing, generated_at)| {
                DashboardOverview {
                    system,
                    content,
                    users,
                    hr,
                    marketing,
                    generated_at,
                }
            })
    }

    /// Role names as they arrive from a token: known roles in any case, plus
    /// arbitrary strings.
    pub fn arb_role_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("admin".to_string()),
            Just("ADMIN".to_string()),
            Just("Manager".to_string()),
            Just("editor".to_string()),
            Just("user".to_string()),
            "[a-zA-Z]{0,12}",
        ]
    }

    pub fn arb_period() -> impl Strategy<Value = Period> {
        prop_oneof![
            Just(Period::Day),
            Just(Period::Week),
            Just(Period::Month),
            Just(Period::Quarter),
            Just(Period::Year),
        ]
    }

    pub fn arb_dashboard_query() -> impl Strategy<Value = DashboardQuery> {
        (
            proptest::option::of(arb_period()),
            proptest::option::of(arb_uuid()),
        )
            .prop_map(|(period, department_id)| DashboardQuery {
                start_date: None,
                end_date: None,
                period,
                department_id,
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// 2024-03-15T12:00:00Z.
    pub fn fixed_time() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// A small but fully populated CMS.
    pub fn sample_metrics() -> MockMetrics {
        let now = fixed_time();
        let engineering = Uuid::from_u128(0x0001);

        MockMetrics {
            users: 42,
            active_users: 17,
            new_users: 5,
            users_by_role: vec![
                LabeledCount::new("admin", 2),
                LabeledCount::new("editor", 8),
                LabeledCount::new("user", 32),
            ],
            top_active_users: vec![ActiveUser {
                id: Uuid::from_u128(0x1001),
                name: "Ada Admin".to_string(),
                email: "ada@example.org".to_string(),
                role: "admin".to_string(),
                last_login_at: Some(now),
                activity_count: 31,
            }],
            documents: 120,
            published_documents: 90,
            draft_documents: 25,
            archived_documents: 5,
            new_documents: 11,
            documents_by_category: vec![
                LabeledCount::new("Policy", 40),
                LabeledCount::new("News", 80),
            ],
            recent_documents: vec![RecentDocument {
                id: Uuid::from_u128(0x2001),
                title: "Quarterly report".to_string(),
                category: Some("News".to_string()),
                status: DocumentStatus::Published.as_str().to_string(),
                created_at: now,
            }],
            header_configs: 3,
            important_links: 9,
            active_important_links: 7,
            recent_links: vec![LinkSummary {
                id: Uuid::from_u128(0x3001),
                title: "Intranet".to_string(),
                url: "https://intranet.example.org".to_string(),
                is_active: true,
                created_at: now,
            }],
            media: 64,
            media_bytes: 52_428_800,
            office_settings_configured: true,
            departments: 4,
            employees: 37,
            employees_by_department: vec![
                LabeledCount::new("Engineering", 20),
                LabeledCount::new("Sales", 17),
            ],
            department_employees: HashMap::from([(engineering, 20)]),
        }
    }

    /// An overview with every category non-zero, for role and export tests.
    pub fn sample_overview() -> DashboardOverview {
        let mut overview = DashboardOverview::empty(fixed_time());
        overview.system = SystemOverview {
            total_users: 42,
            total_documents: 120,
            total_media: 64,
            total_departments: 4,
            total_employees: 37,
            office_settings_configured: true,
            storage: StorageUsage {
                total_files: 64,
                used_bytes: 52_428_800,
            },
            system_health: SystemHealth {
                status: HealthStatus::Healthy,
                message: "Database responded in 3ms".to_string(),
                database_latency_ms: Some(3),
                checked_at: Some(fixed_time()),
            },
            total_views: MetricValue::placeholder(15_420),
        };
        overview.content.total_documents = 120;
        overview.content.published_documents = 90;
        overview.users.total_users = 42;
        overview.users.top_active_users = sample_metrics().top_active_users;
        overview.hr.total_employees = 37;
        overview.hr.total_departments = 4;
        overview.marketing.active_links = 7;
        overview
    }
}
