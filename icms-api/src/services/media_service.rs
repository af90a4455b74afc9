//! Media Service
//!
//! Registers uploads and issues presigned URLs for the object store. URLs
//! carry an HMAC-SHA256 signature over `"{METHOD}\n{object_key}\n{expires}"`
//! that the store (or [`SignedUrlMediaService::verify_presigned_url`])
//! checks before serving the object.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use icms_core::{
    Clock, MediaError, MediaRecord, MediaRepository, MediaResult, MediaService, MediaUpload,
    PresignOperation, PresignedUrl, SystemClock, UploadedMedia,
};
use secrecy::ExposeSecret;
use sha2::Sha256;
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::constants::MAX_PRESIGNED_TTL_SECS;

type HmacSha256 = Hmac<Sha256>;

pub const METHOD_PARAM: &str = "X-Icms-Method";
pub const EXPIRES_PARAM: &str = "X-Icms-Expires";
pub const SIGNATURE_PARAM: &str = "X-Icms-Signature";

/// [`MediaService`] that signs URLs with a shared HMAC key.
pub struct SignedUrlMediaService {
    repository: Arc<dyn MediaRepository>,
    config: MediaConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SignedUrlMediaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedUrlMediaService")
            .field("base_url", &self.config.base_url)
            .field("key_prefix", &self.config.key_prefix)
            .finish_non_exhaustive()
    }
}

/// Keep object keys to a safe character set.
fn sanitize_file_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

fn encode_key(object_key: &str) -> String {
    object_key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl SignedUrlMediaService {
    pub fn new(repository: Arc<dyn MediaRepository>, config: MediaConfig) -> Self {
        Self::with_clock(repository, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<dyn MediaRepository>,
        config: MediaConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            config,
            clock,
        }
    }

    fn mac(&self, method: &str, object_key: &str, expires: i64) -> MediaResult<HmacSha256> {
        let mut mac =
            HmacSha256::new_from_slice(self.config.signing_key.expose_secret().as_bytes())
                .map_err(|_| MediaError::InvalidSignature)?;
        mac.update(method.as_bytes());
        mac.update(b"\n");
        mac.update(object_key.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }

    fn validate_ttl(ttl_seconds: u64) -> MediaResult<ChronoDuration> {
        if ttl_seconds == 0 || ttl_seconds > MAX_PRESIGNED_TTL_SECS {
            return Err(MediaError::InvalidTtl {
                ttl_seconds,
                max_seconds: MAX_PRESIGNED_TTL_SECS,
            });
        }
        // Bounded above, so the cast cannot wrap
        Ok(ChronoDuration::seconds(ttl_seconds as i64))
    }

    fn validate_upload(&self, file: &MediaUpload) -> MediaResult<()> {
        let reason = if file.file_name.trim().is_empty() {
            Some("file name is required".to_string())
        } else if file.mime_type.trim().is_empty() || !file.mime_type.contains('/') {
            Some(format!("invalid mime type '{}'", file.mime_type))
        } else if file.size_bytes <= 0 {
            Some("file size must be positive".to_string())
        } else if file.size_bytes > self.config.max_upload_bytes {
            Some(format!(
                "file size {} exceeds the {} byte limit",
                file.size_bytes, self.config.max_upload_bytes
            ))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(MediaError::InvalidUpload { reason }),
            None => Ok(()),
        }
    }

    /// Sign a URL for `object_key`, valid for `ttl_seconds` from now.
    pub fn presign(
        &self,
        object_key: &str,
        operation: PresignOperation,
        ttl_seconds: u64,
    ) -> MediaResult<PresignedUrl> {
        let ttl = Self::validate_ttl(ttl_seconds)?;
        let expires_at: DateTime<Utc> = self.clock.now() + ttl;
        let expires = expires_at.timestamp();
        let method = operation.method();

        let signature = hex::encode(self.mac(method, object_key, expires)?.finalize().into_bytes());

        let url = format!(
            "{}/{}?{}={}&{}={}&{}={}",
            self.config.base_url,
            encode_key(object_key),
            METHOD_PARAM,
            method,
            EXPIRES_PARAM,
            expires,
            SIGNATURE_PARAM,
            signature
        );

        Ok(PresignedUrl {
            url,
            method: method.to_string(),
            expires_at,
        })
    }

    /// Check a signature produced by [`presign`](Self::presign).
    pub fn verify_presigned_url(
        &self,
        method: &str,
        object_key: &str,
        expires: i64,
        signature_hex: &str,
    ) -> MediaResult<()> {
        let expected = hex::decode(signature_hex).map_err(|_| MediaError::InvalidSignature)?;
        self.mac(&method.to_ascii_uppercase(), object_key, expires)?
            .verify_slice(&expected)
            .map_err(|_| MediaError::InvalidSignature)?;

        if self.clock.now().timestamp() > expires {
            return Err(MediaError::Expired);
        }
        Ok(())
    }
}

#[async_trait]
impl MediaService for SignedUrlMediaService {
    async fn upload_media(
        &self,
        file: MediaUpload,
        metadata: serde_json::Value,
        user_id: &str,
    ) -> MediaResult<UploadedMedia> {
        self.validate_upload(&file)?;

        let metadata = match metadata {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            value @ serde_json::Value::Object(_) => value,
            _ => {
                return Err(MediaError::InvalidUpload {
                    reason: "metadata must be a JSON object".to_string(),
                })
            }
        };

        let id = Uuid::now_v7();
        let created_at = self.clock.now();
        let object_key = format!(
            "{}/{}/{}-{}",
            self.config.key_prefix,
            created_at.format("%Y/%m"),
            id,
            sanitize_file_name(&file.file_name)
        );

        let record = MediaRecord {
            id,
            file_name: file.file_name,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
            object_key,
            metadata,
            uploaded_by: user_id.to_string(),
            created_at,
        };
        self.repository.insert_media(&record).await?;

        let upload = self.presign(
            &record.object_key,
            PresignOperation::Put,
            self.config.default_ttl_secs,
        )?;

        tracing::info!(
            media_id = %record.id,
            user_id,
            size_bytes = record.size_bytes,
            "Media upload registered"
        );

        Ok(UploadedMedia {
            media: record,
            upload,
        })
    }

    async fn generate_presigned_url(
        &self,
        media_id: Uuid,
        operation: PresignOperation,
        ttl_seconds: u64,
    ) -> MediaResult<PresignedUrl> {
        Self::validate_ttl(ttl_seconds)?;

        let record = self
            .repository
            .get_media(media_id)
            .await?
            .ok_or(MediaError::NotFound { media_id })?;

        self.presign(&record.object_key, operation, ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icms_core::ManualClock;
    use icms_test_utils::{fixtures, InMemoryMediaRepository};
    use serde_json::json;

    fn service() -> (SignedUrlMediaService, ManualClock) {
        let clock = ManualClock::new(fixtures::fixed_time());
        let service = SignedUrlMediaService::with_clock(
            Arc::new(InMemoryMediaRepository::new()),
            MediaConfig::default(),
            Arc::new(clock.clone()),
        );
        (service, clock)
    }

    fn upload(name: &str, size: i64) -> MediaUpload {
        MediaUpload {
            file_name: name.to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: size,
        }
    }

    fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
        url.split_once('?')?
            .1
            .split('&')
            .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
    }

    #[tokio::test]
    async fn test_upload_registers_record_and_put_url() -> MediaResult<()> {
        let (service, _) = service();
        let uploaded = service
            .upload_media(upload("Team Photo.png", 2048), json!({"alt": "team"}), "user-1")
            .await?;

        assert_eq!(uploaded.upload.method, "PUT");
        assert_eq!(uploaded.media.uploaded_by, "user-1");
        assert!(uploaded.media.object_key.starts_with("media/2024/03/"));
        assert!(uploaded.media.object_key.ends_with("-Team_Photo.png"));
        assert_eq!(
            uploaded.upload.expires_at,
            fixtures::fixed_time() + ChronoDuration::seconds(900)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let (service, _) = service();
        for file in [upload("", 10), upload("a.png", 0), upload("a.png", i64::MAX)] {
            let result = service.upload_media(file, json!({}), "u").await;
            assert!(matches!(result, Err(MediaError::InvalidUpload { .. })));
        }
        let result = service.upload_media(upload("a.png", 1), json!([1]), "u").await;
        assert!(matches!(result, Err(MediaError::InvalidUpload { .. })));
    }

    #[tokio::test]
    async fn test_presigned_url_round_trips_through_verify() -> MediaResult<()> {
        let (service, clock) = service();
        let uploaded = service.upload_media(upload("doc.pdf", 10), json!(null), "u").await?;

        let presigned = service
            .generate_presigned_url(uploaded.media.id, PresignOperation::Get, 60)
            .await?;
        let expires: i64 = query_param(&presigned.url, EXPIRES_PARAM)
            .and_then(|v| v.parse().ok())
            .ok_or(MediaError::InvalidSignature)?;
        let signature =
            query_param(&presigned.url, SIGNATURE_PARAM).ok_or(MediaError::InvalidSignature)?;
        let key = &uploaded.media.object_key;

        service.verify_presigned_url("GET", key, expires, signature)?;
        assert_eq!(
            service.verify_presigned_url("PUT", key, expires, signature),
            Err(MediaError::InvalidSignature)
        );
        assert_eq!(
            service.verify_presigned_url("GET", key, expires + 1, signature),
            Err(MediaError::InvalidSignature)
        );

        clock.advance(std::time::Duration::from_secs(61));
        assert_eq!(
            service.verify_presigned_url("GET", key, expires, signature),
            Err(MediaError::Expired)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_presign_rejects_bad_ttl_and_unknown_media() {
        let (service, _) = service();
        let unknown = Uuid::from_u128(99);

        assert_eq!(
            service
                .generate_presigned_url(unknown, PresignOperation::Get, 0)
                .await,
            Err(MediaError::InvalidTtl {
                ttl_seconds: 0,
                max_seconds: MAX_PRESIGNED_TTL_SECS
            })
        );
        assert!(matches!(
            service
                .generate_presigned_url(unknown, PresignOperation::Get, MAX_PRESIGNED_TTL_SECS + 1)
                .await,
            Err(MediaError::InvalidTtl { .. })
        ));
        assert_eq!(
            service
                .generate_presigned_url(unknown, PresignOperation::Get, 60)
                .await,
            Err(MediaError::NotFound { media_id: unknown })
        );
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my report (v2).docx"), "my_report__v2_.docx");
        assert_eq!(sanitize_file_name(".."), "file");
    }
}
