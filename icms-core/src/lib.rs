//! ICMS Core - Dashboard Types
//!
//! Pure data structures and capability traits shared by the cache, the
//! aggregator and the HTTP layer. No I/O lives here.

pub mod clock;
pub mod dashboard;
pub mod error;
pub mod media;
pub mod query;
pub mod role;
pub mod source;
pub mod widget;

use chrono::{DateTime, Utc};
use uuid::Uuid;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier. New ids are UUIDv7 so they sort by creation time.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 EntityId.
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

pub use clock::{Clock, ManualClock, SystemClock};
pub use dashboard::{
    ActiveUser, ContentOverview, DashboardOverview, GrowthTrend, HealthStatus, HrOverview,
    LabeledCount, LinkSummary, MarketingOverview, MetricValue, RecentDocument, StorageUsage,
    SystemHealth, SystemOverview, TrendDirection, UserOverview,
};
pub use error::{
    DashboardError, DashboardResult, MediaError, MediaResult, MetricsSourceError, SourceResult,
};
pub use media::{
    MediaRecord, MediaRepository, MediaService, MediaUpload, PresignOperation, PresignedUrl,
    UploadedMedia,
};
pub use query::{DashboardQuery, MetricsWindow, Period};
pub use role::UserRole;
pub use source::{DocumentStatus, MetricsSource};
pub use widget::{ExportFormat, WidgetId};
