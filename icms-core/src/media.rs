//! Media collaborator contracts.
//!
//! The dashboard core never touches object storage directly. Uploads are
//! registered through a [`MediaService`], which stores a [`MediaRecord`] and
//! hands back a presigned URL the client uses to move the bytes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// Operation a presigned URL grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum PresignOperation {
    #[default]
    Get,
    Put,
    Delete,
}

impl PresignOperation {
    /// HTTP method the URL is valid for.
    pub fn method(&self) -> &'static str {
        match self {
            PresignOperation::Get => "GET",
            PresignOperation::Put => "PUT",
            PresignOperation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for PresignOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

impl FromStr for PresignOperation {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(PresignOperation::Get),
            "put" => Ok(PresignOperation::Put),
            "delete" => Ok(PresignOperation::Delete),
            other => Err(MediaError::InvalidUpload {
                reason: format!("unknown presign operation '{}'", other),
            }),
        }
    }
}

/// File description supplied by the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MediaUpload {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Stored media row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: Uuid,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Key of the object inside the storage bucket.
    pub object_key: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub metadata: serde_json::Value,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

/// A time-limited signed URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrl {
    pub url: String,
    pub method: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of registering an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub media: MediaRecord,
    pub upload: PresignedUrl,
}

/// Persistence for media rows.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn insert_media(&self, record: &MediaRecord) -> MediaResult<()>;

    async fn get_media(&self, media_id: Uuid) -> MediaResult<Option<MediaRecord>>;
}

/// Media service used by the admin surface.
#[async_trait]
pub trait MediaService: Send + Sync {
    async fn upload_media(
        &self,
        file: MediaUpload,
        metadata: serde_json::Value,
        user_id: &str,
    ) -> MediaResult<UploadedMedia>;

    async fn generate_presigned_url(
        &self,
        media_id: Uuid,
        operation: PresignOperation,
        ttl_seconds: u64,
    ) -> MediaResult<PresignedUrl>;
}
