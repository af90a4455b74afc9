//! Capability interface the metrics aggregator reads through.
//!
//! Each method is one independent query against the CMS entities (users,
//! documents, media, employees, departments, header configuration, office
//! settings, important links). Implementations must not retry; the
//! aggregator decides what a failure means.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::dashboard::{ActiveUser, LabeledCount, LinkSummary, RecentDocument};
use crate::error::SourceResult;
use crate::query::MetricsWindow;

/// Publication state of a CMS document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    Published,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Published => "PUBLISHED",
            DocumentStatus::Archived => "ARCHIVED",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only access to the counts and lists the dashboard aggregates.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Round-trip to the backing store; used for the system health figure.
    async fn ping(&self) -> SourceResult<()>;

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    async fn count_users(&self) -> SourceResult<i64>;

    /// Users whose last login falls inside the window.
    async fn count_active_users(&self, window: &MetricsWindow) -> SourceResult<i64>;

    /// Users created inside the window.
    async fn count_new_users(&self, window: &MetricsWindow) -> SourceResult<i64>;

    async fn users_by_role(&self) -> SourceResult<Vec<LabeledCount>>;

    async fn top_active_users(
        &self,
        window: &MetricsWindow,
        limit: usize,
    ) -> SourceResult<Vec<ActiveUser>>;

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    async fn count_documents(&self) -> SourceResult<i64>;

    async fn count_documents_by_status(&self, status: DocumentStatus) -> SourceResult<i64>;

    /// Documents created inside the window.
    async fn count_new_documents(&self, window: &MetricsWindow) -> SourceResult<i64>;

    async fn documents_by_category(&self) -> SourceResult<Vec<LabeledCount>>;

    async fn recent_documents(&self, limit: usize) -> SourceResult<Vec<RecentDocument>>;

    async fn count_header_configs(&self) -> SourceResult<i64>;

    async fn count_important_links(&self, active_only: bool) -> SourceResult<i64>;

    async fn recent_important_links(&self, limit: usize) -> SourceResult<Vec<LinkSummary>>;

    // ------------------------------------------------------------------
    // Media and settings
    // ------------------------------------------------------------------

    async fn count_media(&self) -> SourceResult<i64>;

    async fn total_media_bytes(&self) -> SourceResult<i64>;

    async fn office_settings_configured(&self) -> SourceResult<bool>;

    // ------------------------------------------------------------------
    // HR
    // ------------------------------------------------------------------

    async fn count_departments(&self) -> SourceResult<i64>;

    /// Employee count, optionally restricted to one department.
    async fn count_employees(&self, department_id: Option<Uuid>) -> SourceResult<i64>;

    async fn employees_by_department(&self) -> SourceResult<Vec<LabeledCount>>;
}
