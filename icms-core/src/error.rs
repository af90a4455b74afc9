//! Error types for ICMS dashboard operations

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by a metrics source when a single query fails.
///
/// These never escape the aggregator: each leaf metric catches them and
/// falls back to a zero value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetricsSourceError {
    #[error("Query for {metric} failed: {reason}")]
    Query { metric: String, reason: String },

    #[error("Metrics source unavailable: {reason}")]
    Unavailable { reason: String },
}

impl MetricsSourceError {
    /// Shorthand for a failed query on a named metric.
    pub fn query(metric: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Query {
            metric: metric.into(),
            reason: reason.into(),
        }
    }
}

/// Dashboard facade and aggregation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("Invalid dashboard query: {reason}")]
    InvalidQuery { reason: String },

    #[error("Unknown widget: {widget_id}")]
    UnknownWidget { widget_id: String },

    #[error("Invalid export format: {format}")]
    InvalidExportFormat { format: String },

    #[error("Export format {format} is not supported yet")]
    UnsupportedExportFormat { format: String },

    #[error("Aggregation of {category} failed: {reason}")]
    Aggregation { category: String, reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Serialization {
            reason: err.to_string(),
        }
    }
}

/// Media collaborator errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("Media {media_id} not found")]
    NotFound { media_id: Uuid },

    #[error("Invalid media upload: {reason}")]
    InvalidUpload { reason: String },

    #[error("Presigned URL TTL {ttl_seconds}s outside 1..={max_seconds}s")]
    InvalidTtl { ttl_seconds: u64, max_seconds: u64 },

    #[error("Presigned URL signature is invalid")]
    InvalidSignature,

    #[error("Presigned URL has expired")]
    Expired,

    #[error("Media repository error: {reason}")]
    Repository { reason: String },
}

/// Result type for dashboard operations.
pub type DashboardResult<T> = Result<T, DashboardError>;

/// Result type for metrics source queries.
pub type SourceResult<T> = Result<T, MetricsSourceError>;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_widget_names_the_widget() {
        let err = DashboardError::UnknownWidget {
            widget_id: "nonexistent".to_string(),
        };
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn test_source_error_shorthand() {
        let err = MetricsSourceError::query("count_documents", "relation does not exist");
        assert_eq!(
            err.to_string(),
            "Query for count_documents failed: relation does not exist"
        );
    }
}
