//! API Configuration Module
//!
//! Configuration for CORS, rate limiting, the dashboard cache and the media
//! signer. Everything is loaded from environment variables with defaults
//! suitable for development.

use secrecy::SecretString;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CORS_MAX_AGE_SECS, DEFAULT_PRESIGNED_TTL_SECS, DEFAULT_RATE_LIMIT_AUTHENTICATED,
    DEFAULT_RATE_LIMIT_BURST, DEFAULT_RATE_LIMIT_UNAUTHENTICATED, DEFAULT_RECENT_LIMIT,
    DEFAULT_TOP_ACTIVE_USERS, OVERVIEW_CACHE_TTL, SLOW_DATABASE_THRESHOLD, WIDGET_CACHE_TTL,
};

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1"))
        .unwrap_or(default)
}

/// Check if running in a production environment (`ICMS_ENVIRONMENT`).
pub fn is_production_environment() -> bool {
    std::env::var("ICMS_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS and rate limiting.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Rate Limiting Configuration
    // ========================================================================
    pub rate_limit_enabled: bool,

    /// Requests per minute per client IP.
    pub rate_limit_unauthenticated: u32,

    /// Requests per minute per authenticated user.
    pub rate_limit_authenticated: u32,

    /// Burst capacity beyond the steady rate.
    pub rate_limit_burst: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: DEFAULT_CORS_MAX_AGE_SECS,
            rate_limit_enabled: true,
            rate_limit_unauthenticated: DEFAULT_RATE_LIMIT_UNAUTHENTICATED,
            rate_limit_authenticated: DEFAULT_RATE_LIMIT_AUTHENTICATED,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `ICMS_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `ICMS_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `ICMS_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `ICMS_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `ICMS_RATE_LIMIT_UNAUTHENTICATED`: Requests per minute per IP (default: 100)
    /// - `ICMS_RATE_LIMIT_AUTHENTICATED`: Requests per minute per user (default: 1000)
    /// - `ICMS_RATE_LIMIT_BURST`: Burst capacity (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("ICMS_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            cors_origins,
            cors_allow_credentials: env_flag("ICMS_CORS_ALLOW_CREDENTIALS", false),
            cors_max_age_secs: env_parse("ICMS_CORS_MAX_AGE_SECS")
                .unwrap_or(defaults.cors_max_age_secs),
            rate_limit_enabled: std::env::var("ICMS_RATE_LIMIT_ENABLED")
                .ok()
                .map(|s| s.to_lowercase() != "false")
                .unwrap_or(true),
            rate_limit_unauthenticated: env_parse("ICMS_RATE_LIMIT_UNAUTHENTICATED")
                .unwrap_or(defaults.rate_limit_unauthenticated),
            rate_limit_authenticated: env_parse("ICMS_RATE_LIMIT_AUTHENTICATED")
                .unwrap_or(defaults.rate_limit_authenticated),
            rate_limit_burst: env_parse("ICMS_RATE_LIMIT_BURST")
                .unwrap_or(defaults.rate_limit_burst),
        }
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.example.org
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern));
                }
            }
            false
        })
    }
}

// ============================================================================
// DASHBOARD CONFIGURATION
// ============================================================================

/// Dashboard cache and aggregation settings.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub overview_ttl: Duration,
    pub widget_ttl: Duration,
    pub cache_max_size: usize,
    pub sweep_interval: Duration,
    /// Rows in the "top active users" list.
    pub top_active_users: usize,
    /// Rows in the recent documents and recent links lists.
    pub recent_limit: usize,
    /// Ping latency at or above which the system is reported degraded.
    pub slow_database_threshold: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            overview_ttl: OVERVIEW_CACHE_TTL,
            widget_ttl: WIDGET_CACHE_TTL,
            cache_max_size: icms_storage::cache::DEFAULT_MAX_SIZE,
            sweep_interval: icms_storage::cache::DEFAULT_SWEEP_INTERVAL,
            top_active_users: DEFAULT_TOP_ACTIVE_USERS,
            recent_limit: DEFAULT_RECENT_LIMIT,
            slow_database_threshold: SLOW_DATABASE_THRESHOLD,
        }
    }
}

impl DashboardConfig {
    /// Environment variables:
    /// - `ICMS_DASHBOARD_OVERVIEW_TTL_SECS` (default: 120)
    /// - `ICMS_DASHBOARD_WIDGET_TTL_SECS` (default: 60)
    /// - `ICMS_CACHE_MAX_SIZE` (default: 1000)
    /// - `ICMS_CACHE_SWEEP_INTERVAL_SECS` (default: 60)
    /// - `ICMS_DASHBOARD_TOP_USERS` (default: 10)
    /// - `ICMS_DASHBOARD_RECENT_LIMIT` (default: 5)
    /// - `ICMS_SLOW_DB_THRESHOLD_MS` (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            overview_ttl: env_parse("ICMS_DASHBOARD_OVERVIEW_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.overview_ttl),
            widget_ttl: env_parse("ICMS_DASHBOARD_WIDGET_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.widget_ttl),
            cache_max_size: env_parse("ICMS_CACHE_MAX_SIZE").unwrap_or(defaults.cache_max_size),
            sweep_interval: env_parse("ICMS_CACHE_SWEEP_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            top_active_users: env_parse("ICMS_DASHBOARD_TOP_USERS")
                .unwrap_or(defaults.top_active_users),
            recent_limit: env_parse("ICMS_DASHBOARD_RECENT_LIMIT")
                .unwrap_or(defaults.recent_limit),
            slow_database_threshold: env_parse("ICMS_SLOW_DB_THRESHOLD_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.slow_database_threshold),
        }
    }

    /// Cache configuration derived from these settings.
    pub fn cache_config(&self) -> icms_storage::CacheConfig {
        icms_storage::CacheConfig::default()
            .with_ttl(self.overview_ttl)
            .with_max_size(self.cache_max_size)
            .with_sweep_interval(self.sweep_interval)
    }
}

// ============================================================================
// MEDIA CONFIGURATION
// ============================================================================

/// Settings for presigned media URLs.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Public base URL of the object store, e.g. `https://media.example.org`.
    pub base_url: String,
    /// Key prefix for uploaded objects.
    pub key_prefix: String,
    /// HMAC key used to sign URLs.
    pub signing_key: SecretString,
    pub default_ttl_secs: u64,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: i64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/icms-media".to_string(),
            key_prefix: "media".to_string(),
            signing_key: SecretString::from("dev-media-signing-key-change-me".to_string()),
            default_ttl_secs: DEFAULT_PRESIGNED_TTL_SECS,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

impl MediaConfig {
    /// Environment variables:
    /// - `ICMS_MEDIA_BASE_URL`
    /// - `ICMS_MEDIA_KEY_PREFIX` (default: "media")
    /// - `ICMS_MEDIA_SIGNING_KEY`
    /// - `ICMS_MEDIA_URL_TTL_SECS` (default: 900)
    /// - `ICMS_MEDIA_MAX_UPLOAD_BYTES` (default: 100 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ICMS_MEDIA_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            key_prefix: std::env::var("ICMS_MEDIA_KEY_PREFIX")
                .map(|s| s.trim_matches('/').to_string())
                .unwrap_or(defaults.key_prefix),
            signing_key: std::env::var("ICMS_MEDIA_SIGNING_KEY")
                .map(SecretString::from)
                .unwrap_or(defaults.signing_key),
            default_ttl_secs: env_parse("ICMS_MEDIA_URL_TTL_SECS")
                .unwrap_or(defaults.default_ttl_secs),
            max_upload_bytes: env_parse("ICMS_MEDIA_MAX_UPLOAD_BYTES")
                .unwrap_or(defaults.max_upload_bytes),
        }
    }
}
