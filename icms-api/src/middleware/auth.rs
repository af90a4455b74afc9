//! Credential check for `/admin/*`.
//!
//! The middleware resolves `X-API-Key` or `Authorization: Bearer` into an
//! [`AuthContext`] and parks it in the request extensions; handlers pull it
//! back out with [`AuthExtractor`] and apply their own role guard through
//! [`AuthContext::require_any_role`]. Failures render the error envelope.

use crate::auth::{authenticate, AuthConfig, AuthContext};
use crate::envelope::ApiEnvelope;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

const API_KEY_HEADER: &str = "x-api-key";

// ============================================================================
// MIDDLEWARE
// ============================================================================

#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    pub fn new(auth_config: AuthConfig) -> Self {
        Self {
            auth_config: Arc::new(auth_config),
        }
    }

    fn authenticate_headers(&self, headers: &HeaderMap) -> ApiResult<AuthContext> {
        let header = |name: &str| headers.get(name).and_then(|h| h.to_str().ok());
        authenticate(
            &self.auth_config,
            header(API_KEY_HEADER),
            header(axum::http::header::AUTHORIZATION.as_str()),
        )
    }
}

/// Reject the request with 401 unless it carries a valid API key or JWT.
///
/// ```ignore
/// let admin = Router::new()
///     .route("/dashboard/overview", get(get_overview))
///     .layer(middleware::from_fn_with_state(
///         AuthMiddlewareState::new(AuthConfig::from_env()),
///         auth_middleware,
///     ));
/// ```
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let caller = match state.authenticate_headers(request.headers()) {
        Ok(caller) => caller,
        Err(e) => {
            tracing::debug!(path = %request.uri().path(), reason = %e.message, "Admin request rejected");
            return Err(AuthMiddlewareError(e));
        }
    };

    tracing::debug!(
        user_id = %caller.user_id,
        method = ?caller.auth_method,
        role = %caller.highest_role(),
        "Admin request authenticated"
    );
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

/// Auth failure rendered as the standard error envelope.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        ApiEnvelope::err(self.0).into_response()
    }
}

// ============================================================================
// EXTRACTOR
// ============================================================================

/// The caller resolved by [`auth_middleware`].
///
/// Using it on a route without the middleware is a wiring bug and answers
/// 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthContext>() {
            Some(caller) => Ok(AuthExtractor(caller.clone())),
            None => Err(AuthMiddlewareError(ApiError::internal_error(
                "Route is missing auth_middleware",
            ))),
        }
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Caller attached to `request`, for code working on a raw [`Request`].
pub fn extract_auth_context(request: &Request) -> ApiResult<&AuthContext> {
    request
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::unauthorized("Request was not authenticated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt_token, JwtSecret};
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    const KEY: &str = "icms_mw_key_0001";

    fn config() -> AuthConfig {
        let mut config = AuthConfig::default();
        config.add_api_key(KEY.to_string());
        config.jwt_secret = JwtSecret::new("middleware_test_secret_long_enough_for_hs256".to_string());
        config
    }

    async fn whoami(AuthExtractor(caller): AuthExtractor) -> String {
        format!("{}|{}", caller.user_id, caller.highest_role())
    }

    fn admin_app() -> Router {
        Router::new()
            .route("/admin/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(
                AuthMiddlewareState::new(config()),
                auth_middleware,
            ))
    }

    async fn call(app: Router, headers: &[(&str, &str)]) -> Result<(StatusCode, Vec<u8>), String> {
        let mut builder = axum::http::Request::builder().uri("/admin/whoami");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::empty()).map_err(|e| e.to_string())?;

        let response = app.oneshot(request).await.map_err(|e| format!("{:?}", e))?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| format!("{:?}", e))?;
        Ok((status, body.to_vec()))
    }

    #[tokio::test]
    async fn test_api_key_caller_is_admin() -> Result<(), String> {
        let (status, body) = call(admin_app(), &[("x-api-key", KEY)]).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"api_key_icms_mw_|admin");
        Ok(())
    }

    #[tokio::test]
    async fn test_jwt_caller_keeps_highest_role() -> Result<(), String> {
        let token = generate_jwt_token(
            &config(),
            "editor-7".to_string(),
            vec!["user".to_string(), "editor".to_string()],
        )
        .map_err(|e| e.message)?;
        let bearer = format!("Bearer {}", token);

        let (status, body) = call(admin_app(), &[("authorization", bearer.as_str())]).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"editor-7|editor");
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_credentials_are_unauthorized() -> Result<(), String> {
        for headers in [
            vec![],
            vec![("x-api-key", "wrong")],
            vec![("authorization", "Bearer not.a.jwt")],
            vec![("authorization", "Basic dXNlcjpwYXNz")],
        ] {
            let (status, body) = call(admin_app(), &headers).await?;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "headers: {:?}", headers);

            let json: serde_json::Value = serde_json::from_slice(&body).map_err(|e| e.to_string())?;
            assert_eq!(json["success"], false);
            assert!(json["error"]["code"].is_string());
        }

        let (_, body) = call(admin_app(), &[]).await?;
        let json: serde_json::Value = serde_json::from_slice(&body).map_err(|e| e.to_string())?;
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");
        Ok(())
    }

    #[tokio::test]
    async fn test_raw_request_sees_caller() -> Result<(), String> {
        async fn raw(request: Request) -> ApiResult<String> {
            Ok(format!("{:?}", extract_auth_context(&request)?.auth_method))
        }

        let app = Router::new()
            .route("/admin/whoami", get(raw))
            .layer(middleware::from_fn_with_state(
                AuthMiddlewareState::new(config()),
                auth_middleware,
            ));

        let (status, body) = call(app, &[("x-api-key", KEY)]).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ApiKey");
        Ok(())
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_is_server_error() -> Result<(), String> {
        let app = Router::new().route("/admin/whoami", get(whoami));
        let (status, _) = call(app, &[("x-api-key", KEY)]).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }
}
