//! Admin Media Routes
//!
//! Upload registration and presigned URL issuance. Bytes never pass through
//! this service; clients PUT them to the returned URL.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use icms_core::{MediaUpload, PresignOperation, PresignedUrl, UploadedMedia};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    envelope::ApiEnvelope,
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
};

const MEDIA_ROLES: &[&str] = &["admin", "manager", "editor"];

// ============================================================================
// REQUEST TYPES
// ============================================================================

/// Body of `POST /admin/media/uploads`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UploadMediaRequest {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Free-form JSON object stored with the media row.
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct PresignParams {
    /// `get` (default), `put` or `delete`.
    pub operation: Option<String>,
    /// Lifetime in seconds, 1 to 604800.
    pub ttl: Option<u64>,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /admin/media/uploads - Register an upload and get a PUT URL
#[utoipa::path(
    post,
    path = "/admin/media/uploads",
    tag = "Media",
    request_body = UploadMediaRequest,
    responses(
        (status = 201, description = "Media registered", body = UploadedMedia),
        (status = 400, description = "Invalid upload description", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Caller cannot upload media", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn upload_media(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    body: Result<Json<UploadMediaRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    auth.require_any_role(MEDIA_ROLES)?;
    let Json(req) = body?;

    let file = MediaUpload {
        file_name: req.file_name,
        mime_type: req.mime_type,
        size_bytes: req.size_bytes,
    };
    let metadata = req.metadata.unwrap_or(serde_json::Value::Null);

    let uploaded = state
        .media
        .upload_media(file, metadata, &auth.user_id)
        .await?;

    Ok((StatusCode::CREATED, ApiEnvelope::ok(uploaded)))
}

/// GET /admin/media/{media_id}/presigned-url - Sign a URL for an existing object
#[utoipa::path(
    get,
    path = "/admin/media/{media_id}/presigned-url",
    tag = "Media",
    params(
        ("media_id" = Uuid, Path, description = "Media ID"),
        PresignParams
    ),
    responses(
        (status = 200, description = "Presigned URL", body = PresignedUrl),
        (status = 400, description = "Invalid operation or TTL", body = ApiError),
        (status = 404, description = "Media not found", body = ApiError),
    ),
    security(
        ("api_key" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn get_presigned_url(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Path(media_id): Path<String>,
    params: Result<Query<PresignParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    auth.require_any_role(MEDIA_ROLES)?;
    let Query(params) = params?;

    let media_id = Uuid::parse_str(&media_id)
        .map_err(|_| ApiError::invalid_format("media_id", "UUID"))?;
    let operation = match params.operation.as_deref() {
        Some(op) => op.parse::<PresignOperation>()?,
        None => PresignOperation::Get,
    };
    let ttl = params.ttl.unwrap_or(state.media_default_ttl_secs);

    let url = state
        .media
        .generate_presigned_url(media_id, operation, ttl)
        .await?;

    Ok(ApiEnvelope::ok(url))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Media routes, mounted under `/admin/media`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/uploads", post(upload_media))
        .route("/:media_id/presigned-url", get(get_presigned_url))
}
