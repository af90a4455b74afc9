//! Constants for the ICMS API
//!
//! Centralized so the defaults used by config, routes and tests agree.

use std::time::Duration;

// ============================================================================
// AUTHENTICATION
// ============================================================================

/// Default JWT token expiration time in seconds (1 hour)
pub const DEFAULT_JWT_EXPIRATION_SECS: i64 = 3600;

/// Minimum required length for JWT secret keys
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

// ============================================================================
// CORS
// ============================================================================

/// Default CORS max age in seconds (24 hours)
pub const DEFAULT_CORS_MAX_AGE_SECS: u64 = 86400;

// ============================================================================
// RATE LIMITING
// ============================================================================

/// Default rate limit for unauthenticated requests (per minute)
pub const DEFAULT_RATE_LIMIT_UNAUTHENTICATED: u32 = 100;

/// Default rate limit for authenticated requests (per minute)
pub const DEFAULT_RATE_LIMIT_AUTHENTICATED: u32 = 1000;

/// Default burst size for rate limiting
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

// ============================================================================
// DASHBOARD
// ============================================================================

/// Lifetime of a cached dashboard overview.
pub const OVERVIEW_CACHE_TTL: Duration = Duration::from_secs(120);

/// Lifetime of a cached widget payload.
pub const WIDGET_CACHE_TTL: Duration = Duration::from_secs(60);

/// Number of most active users listed in the user overview.
pub const DEFAULT_TOP_ACTIVE_USERS: usize = 10;

/// Number of recent documents and links listed.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Database round-trip above which the system is reported degraded.
pub const SLOW_DATABASE_THRESHOLD: Duration = Duration::from_millis(1000);

/// Text that replaces the system health message for restricted roles.
pub const REDACTED_HEALTH_MESSAGE: &str = "Restricted";

// ============================================================================
// MEDIA
// ============================================================================

/// Default lifetime of a presigned URL (15 minutes).
pub const DEFAULT_PRESIGNED_TTL_SECS: u64 = 900;

/// Longest lifetime a presigned URL may be issued for (7 days).
pub const MAX_PRESIGNED_TTL_SECS: u64 = 604_800;
