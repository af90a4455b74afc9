//! Dashboard overview model.
//!
//! A [`DashboardOverview`] is built once per cache miss and never mutated
//! afterwards; role views are fresh filtered copies. Every type here
//! implements `Default` as its zero value, which is what both failed leaf
//! metrics and role redaction fall back to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// METRIC VALUES
// ============================================================================

/// A figure that may not come from a real data source.
///
/// Placeholder values are fixed constants kept for parity with the dashboard
/// layout; `is_placeholder` lets clients render them as "sample data".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MetricValue<T> {
    pub value: T,
    pub is_placeholder: bool,
}

impl<T> MetricValue<T> {
    /// A value computed from real data.
    pub fn live(value: T) -> Self {
        Self {
            value,
            is_placeholder: false,
        }
    }

    /// A fixed stand-in value with no data source behind it.
    pub fn placeholder(value: T) -> Self {
        Self {
            value,
            is_placeholder: true,
        }
    }
}

/// Direction of a growth trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    #[default]
    Flat,
}

/// Period-over-period growth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct GrowthTrend {
    pub percent_change: f64,
    pub direction: TrendDirection,
}

impl GrowthTrend {
    pub fn from_percent(percent_change: f64) -> Self {
        let direction = if percent_change > 0.0 {
            TrendDirection::Up
        } else if percent_change < 0.0 {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        };
        Self {
            percent_change,
            direction,
        }
    }
}

// ============================================================================
// LIST ROWS
// ============================================================================

/// A label with a count, used for breakdowns (by role, category, department).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LabeledCount {
    pub label: String,
    pub count: i64,
}

impl LabeledCount {
    pub fn new(label: impl Into<String>, count: i64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// A user ranked by recent activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub activity_count: i64,
}

/// A recently created document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RecentDocument {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// An important link shown on the marketing panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LinkSummary {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// SYSTEM
// ============================================================================

/// Health status of the backing services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub message: String,
    pub database_latency_ms: Option<u64>,
    pub checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub total_files: i64,
    pub used_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SystemOverview {
    pub total_users: i64,
    pub total_documents: i64,
    pub total_media: i64,
    pub total_departments: i64,
    pub total_employees: i64,
    pub office_settings_configured: bool,
    pub storage: StorageUsage,
    pub system_health: SystemHealth,
    pub total_views: MetricValue<i64>,
}

// ============================================================================
// CONTENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ContentOverview {
    pub total_documents: i64,
    pub published_documents: i64,
    pub draft_documents: i64,
    /// Documents created inside the query window.
    pub new_documents: i64,
    pub header_configurations: i64,
    pub total_important_links: i64,
    pub active_important_links: i64,
    pub documents_by_category: Vec<LabeledCount>,
    pub recent_documents: Vec<RecentDocument>,
    pub growth: MetricValue<GrowthTrend>,
}

// ============================================================================
// USERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UserOverview {
    pub total_users: i64,
    /// Users who logged in inside the query window.
    pub active_users: i64,
    pub new_users: i64,
    pub users_by_role: Vec<LabeledCount>,
    pub top_active_users: Vec<ActiveUser>,
    pub growth: MetricValue<GrowthTrend>,
}

// ============================================================================
// HR
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct HrOverview {
    pub total_employees: i64,
    pub total_departments: i64,
    pub employees_by_department: Vec<LabeledCount>,
    pub new_hires: MetricValue<i64>,
    pub attendance_rate: MetricValue<f64>,
    pub turnover_rate: MetricValue<f64>,
}

// ============================================================================
// MARKETING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MarketingOverview {
    pub active_links: i64,
    pub recent_links: Vec<LinkSummary>,
    pub impressions: MetricValue<i64>,
    pub clicks: MetricValue<i64>,
    pub click_through_rate: MetricValue<f64>,
}

// ============================================================================
// OVERVIEW
// ============================================================================

/// Aggregate dashboard snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub system: SystemOverview,
    pub content: ContentOverview,
    pub users: UserOverview,
    pub hr: HrOverview,
    pub marketing: MarketingOverview,
    pub generated_at: DateTime<Utc>,
}

impl DashboardOverview {
    /// An overview with every category zeroed.
    pub fn empty(generated_at: DateTime<Utc>) -> Self {
        Self {
            system: SystemOverview::default(),
            content: ContentOverview::default(),
            users: UserOverview::default(),
            hr: HrOverview::default(),
            marketing: MarketingOverview::default(),
            generated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_overview_serializes_camel_case() -> Result<(), serde_json::Error> {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut overview = DashboardOverview::empty(at);
        overview.hr.total_employees = 12;

        let json = serde_json::to_value(&overview)?;
        assert_eq!(json["hr"]["totalEmployees"], 12);
        assert!(json.get("generatedAt").is_some());
        assert_eq!(json["system"]["systemHealth"]["status"], "unknown");
        Ok(())
    }

    #[test]
    fn test_placeholder_flag_serialized() -> Result<(), serde_json::Error> {
        let value = MetricValue::placeholder(2.8_f64);
        let json = serde_json::to_value(value)?;
        assert_eq!(json["isPlaceholder"], true);
        assert_eq!(json["value"], 2.8);
        Ok(())
    }

    #[test]
    fn test_growth_direction() {
        assert_eq!(GrowthTrend::from_percent(4.2).direction, TrendDirection::Up);
        assert_eq!(GrowthTrend::from_percent(-1.0).direction, TrendDirection::Down);
        assert_eq!(GrowthTrend::from_percent(0.0).direction, TrendDirection::Flat);
    }
}
