//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use icms_core::MediaService;

use crate::services::DashboardService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: DashboardService,
    pub media: Arc<dyn MediaService>,
    /// TTL applied when a presigned URL request does not name one.
    pub media_default_ttl_secs: u64,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        dashboard: DashboardService,
        media: Arc<dyn MediaService>,
        media_default_ttl_secs: u64,
    ) -> Self {
        Self {
            dashboard,
            media,
            media_default_ttl_secs,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(DashboardService, dashboard);
crate::impl_from_ref!(Arc<dyn MediaService>, media);
crate::impl_from_ref!(Instant, start_time);
