//! Shared fixtures for router-level tests.
//!
//! Builds the full router over an in-memory metrics source and media
//! repository, with credentials known to the tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use icms_api::{
    auth::{generate_jwt_token, AuthConfig, JwtSecret},
    services::{AggregatorConfig, DashboardService, MetricsAggregator, SignedUrlMediaService},
    ApiConfig, AppState, DashboardConfig, MediaConfig, SecureRouterBuilder,
};
use icms_storage::TtlCache;
use icms_test_utils::{InMemoryMediaRepository, MockMetricsSource};
use tower::ServiceExt;

pub const TEST_API_KEY: &str = "icms_test_api_key_0123456789";

pub fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.add_api_key(TEST_API_KEY.to_string());
    config.jwt_secret = JwtSecret::new("router_test_secret_that_is_long_enough".to_string());
    config
}

/// Generous quotas so multi-request tests never trip the limiter.
pub fn test_api_config() -> ApiConfig {
    ApiConfig {
        rate_limit_burst: 1_000,
        ..ApiConfig::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub source: MockMetricsSource,
    pub media: InMemoryMediaRepository,
    pub dashboard: DashboardService,
}

pub fn test_app_with(api_config: ApiConfig) -> TestApp {
    let source = MockMetricsSource::sample();
    let media = InMemoryMediaRepository::new();

    let dashboard_config = DashboardConfig::default();
    let aggregator = MetricsAggregator::new(
        Arc::new(source.clone()),
        AggregatorConfig::from(&dashboard_config),
    );
    let cache = Arc::new(TtlCache::new(dashboard_config.cache_config()));
    let dashboard = DashboardService::new(aggregator, cache, dashboard_config);

    let media_config = MediaConfig::default();
    let default_ttl = media_config.default_ttl_secs;
    let media_service = Arc::new(SignedUrlMediaService::new(
        Arc::new(media.clone()),
        media_config,
    ));

    let state = AppState::new(dashboard.clone(), media_service, default_ttl);
    let router = match SecureRouterBuilder::new(state, api_config, test_auth_config()) {
        Ok(builder) => builder.build(),
        Err(e) => panic!("router construction failed: {}", e),
    };

    TestApp {
        router,
        source,
        media,
        dashboard,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(test_api_config())
}

/// `Authorization` header value for a JWT carrying `roles`.
pub fn bearer(user_id: &str, roles: &[&str]) -> String {
    let token = generate_jwt_token(
        &test_auth_config(),
        user_id.to_string(),
        roles.iter().map(|r| r.to_string()).collect(),
    )
    .unwrap_or_else(|e| panic!("token generation failed: {}", e));
    format!("Bearer {}", token)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|e| match e {});
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map(|b| b.to_vec())
        .unwrap_or_default();

    TestResponse {
        status,
        headers,
        body,
    }
}

/// GET `uri` as a JWT user holding `roles`.
pub async fn get_as(router: &Router, uri: &str, roles: &[&str]) -> TestResponse {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", bearer("test-user", roles))
        .body(Body::empty())
        .unwrap_or_else(|e| panic!("bad request: {}", e));
    send(router, request).await
}
