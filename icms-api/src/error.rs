//! API errors.
//!
//! Handlers return [`ApiResult`]; an [`ApiError`] renders as a failed
//! envelope whose HTTP status comes from its [`ErrorCode`]. Core dashboard and
//! media errors, Postgres errors and axum extractor rejections all convert
//! into it.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use icms_core::{DashboardError, MediaError};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::envelope::ApiEnvelope;

pub type ApiResult<T> = Result<T, ApiError>;

/// Machine-readable error code, serialized as `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 401 / 403
    Unauthorized,
    Forbidden,
    InvalidToken,
    TokenExpired,

    // 400
    ValidationFailed,
    InvalidInput,
    InvalidRange,
    InvalidFormat,

    // 404
    WidgetNotFound,
    MediaNotFound,

    // 429
    TooManyRequests,

    // 5xx
    InternalError,
    DatabaseError,
    /// PDF export and any other advertised-but-unbuilt operation.
    NotImplemented,
    ServiceUnavailable,
    ConnectionPoolExhausted,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        use ErrorCode::*;
        match self {
            Unauthorized | InvalidToken | TokenExpired => StatusCode::UNAUTHORIZED,
            Forbidden => StatusCode::FORBIDDEN,
            ValidationFailed | InvalidInput | InvalidRange | InvalidFormat => {
                StatusCode::BAD_REQUEST
            }
            WidgetNotFound | MediaNotFound => StatusCode::NOT_FOUND,
            TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            InternalError | DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            NotImplemented => StatusCode::NOT_IMPLEMENTED,
            ServiceUnavailable | ConnectionPoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message used when the caller supplies none.
    pub fn default_message(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            Unauthorized => "Authentication required",
            Forbidden => "Role not allowed for this resource",
            InvalidToken => "Invalid authentication token",
            TokenExpired => "Authentication token has expired",
            ValidationFailed => "Request validation failed",
            InvalidInput => "Invalid input",
            InvalidRange => "Value out of range",
            InvalidFormat => "Invalid format",
            WidgetNotFound => "Unknown dashboard widget",
            MediaNotFound => "Media not found",
            TooManyRequests => "Rate limit exceeded",
            InternalError => "Internal server error",
            DatabaseError => "Database operation failed",
            NotImplemented => "Not implemented",
            ServiceUnavailable => "Service temporarily unavailable",
            ConnectionPoolExhausted => "Database connection pool exhausted",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The `error` member of a failed envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ------------------------------------------------------------------------
    // auth
    // ------------------------------------------------------------------------

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    // ------------------------------------------------------------------------
    // input
    // ------------------------------------------------------------------------

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn invalid_range(field: &str, min: impl fmt::Display, max: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidRange,
            format!("'{}' must be within {}..={}", field, min, max),
        )
    }

    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("'{}' must be {}", field, expected),
        )
    }

    // ------------------------------------------------------------------------
    // lookups
    // ------------------------------------------------------------------------

    /// The message names the widget so clients can see what they asked for.
    pub fn widget_not_found(widget_id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::WidgetNotFound,
            format!("Unknown widget: {}", widget_id),
        )
    }

    pub fn media_not_found(media_id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::MediaNotFound, format!("Media {} not found", media_id))
    }

    // ------------------------------------------------------------------------
    // server side
    // ------------------------------------------------------------------------

    pub fn too_many_requests(retry_after_secs: Option<u64>) -> Self {
        match retry_after_secs {
            Some(secs) => Self::new(
                ErrorCode::TooManyRequests,
                format!("Rate limit exceeded, retry in {}s", secs),
            ),
            None => Self::from_code(ErrorCode::TooManyRequests),
        }
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotImplemented, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn connection_pool_exhausted() -> Self {
        Self::from_code(ErrorCode::ConnectionPoolExhausted)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "Admin request failed");
        }
        ApiEnvelope::err(self).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match &err {
            DashboardError::InvalidQuery { .. } => ApiError::validation_failed(err.to_string()),
            DashboardError::UnknownWidget { widget_id } => ApiError::widget_not_found(widget_id),
            DashboardError::InvalidExportFormat { format } => {
                ApiError::invalid_format("format", "one of json, csv, pdf")
                    .with_details(serde_json::json!({ "format": format }))
            }
            DashboardError::UnsupportedExportFormat { .. } => {
                ApiError::not_implemented(err.to_string())
            }
            DashboardError::Aggregation { .. } | DashboardError::Serialization { .. } => {
                ApiError::internal_error(err.to_string())
            }
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match &err {
            MediaError::NotFound { media_id } => ApiError::media_not_found(media_id),
            MediaError::InvalidUpload { .. } => ApiError::validation_failed(err.to_string()),
            MediaError::InvalidTtl { max_seconds, .. } => {
                ApiError::invalid_range("ttl", 1, max_seconds)
            }
            MediaError::InvalidSignature | MediaError::Expired => {
                ApiError::forbidden(err.to_string())
            }
            MediaError::Repository { reason } => {
                tracing::error!(reason = %reason, "Media repository error");
                ApiError::database_error("Media repository operation failed")
            }
        }
    }
}

/// Driver details are logged, never returned.
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        tracing::error!(error = ?err, "Postgres error");
        ApiError::from_code(ErrorCode::DatabaseError)
    }
}

impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!(error = ?err, "Postgres pool error");
        match err {
            deadpool_postgres::PoolError::Timeout(_) => ApiError::connection_pool_exhausted(),
            deadpool_postgres::PoolError::Closed => {
                ApiError::service_unavailable("Database connection pool is closed")
            }
            _ => ApiError::database_error("Failed to acquire database connection"),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}
