//! Router tests for the admin dashboard and media surface.
//!
//! Each test drives the complete router (CORS, request id, observability,
//! auth, rate limiting) with `tower::ServiceExt::oneshot`.

mod test_support;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use test_support::{get_as, send, test_app, test_app_with, test_api_config, TEST_API_KEY};

// ============================================================================
// AUTHENTICATION AND ROLE GUARDS
// ============================================================================

#[tokio::test]
async fn unauthenticated_request_gets_error_envelope() {
    let app = test_app();
    let request = Request::builder()
        .uri("/admin/dashboard/overview")
        .body(Body::empty())
        .unwrap();

    let response = send(&app.router, request).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let body = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(
        body["meta"]["requestId"].as_str(),
        response.header("x-request-id")
    );
}

#[tokio::test]
async fn api_key_acts_as_admin() {
    let app = test_app();
    let request = Request::builder()
        .uri("/admin/dashboard/cache/stats")
        .header("x-api-key", TEST_API_KEY)
        .body(Body::empty())
        .unwrap();

    let response = send(&app.router, request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["maxSize"], 1000);
}

#[tokio::test]
async fn overview_is_limited_to_admins_and_managers() {
    let app = test_app();

    for (roles, expected) in [
        (&["admin"][..], StatusCode::OK),
        (&["Manager"][..], StatusCode::OK),
        (&["editor"][..], StatusCode::FORBIDDEN),
        (&["user"][..], StatusCode::FORBIDDEN),
        (&[][..], StatusCode::FORBIDDEN),
    ] {
        let response = get_as(&app.router, "/admin/dashboard/overview", roles).await;
        assert_eq!(response.status, expected, "roles {:?}", roles);
    }
}

// ============================================================================
// OVERVIEW AND CACHING
// ============================================================================

#[tokio::test]
async fn overview_reports_cache_state() {
    let app = test_app();

    let first = get_as(&app.router, "/admin/dashboard/overview", &["admin"]).await;
    assert_eq!(first.status, StatusCode::OK);
    let body = first.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["meta"]["cached"], false);
    assert_eq!(body["data"]["users"]["totalUsers"], 42);
    assert_eq!(body["data"]["content"]["publishedDocuments"], 90);

    let calls_after_first = app.source.total_calls();

    let second = get_as(&app.router, "/admin/dashboard/overview", &["admin"]).await;
    assert_eq!(second.json()["meta"]["cached"], true);
    assert_eq!(app.source.total_calls(), calls_after_first);
}

#[tokio::test]
async fn distinct_queries_are_cached_separately() {
    let app = test_app();

    get_as(&app.router, "/admin/dashboard/overview?period=week", &["admin"]).await;
    let other = get_as(&app.router, "/admin/dashboard/overview?period=year", &["admin"]).await;

    assert_eq!(other.json()["meta"]["cached"], false);
    assert_eq!(app.dashboard.cache().len(), 2);
}

#[tokio::test]
async fn malformed_query_renders_validation_envelope() {
    let app = test_app();
    let response = get_as(
        &app.router,
        "/admin/dashboard/overview?period=fortnight",
        &["admin"],
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn inverted_date_range_is_rejected() {
    let app = test_app();
    let response = get_as(
        &app.router,
        "/admin/dashboard/overview?startDate=2024-03-10T00:00:00Z&endDate=2024-03-01T00:00:00Z",
        &["admin"],
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["error"]["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn end_date_at_the_calendar_floor_is_a_bad_request() {
    let app = test_app();
    let response = get_as(
        &app.router,
        "/admin/dashboard/overview?endDate=-262143-01-05T00:00:00Z",
        &["admin"],
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["success"], false);
    assert_eq!(response.json()["error"]["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn leaf_failures_do_not_fail_the_overview() {
    let app = test_app();
    app.source.fail("count_users");

    let response = get_as(&app.router, "/admin/dashboard/overview", &["admin"]).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["data"]["users"]["totalUsers"], 0);
    assert_eq!(body["data"]["content"]["totalDocuments"], 120);
}

// ============================================================================
// ROLE-BASED VIEW
// ============================================================================

#[tokio::test]
async fn role_based_view_uses_highest_role() {
    let app = test_app();

    let response = get_as(
        &app.router,
        "/admin/dashboard/role-based",
        &["user", "editor"],
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["data"]["role"], "editor");
    assert_eq!(body["data"]["overview"]["hr"]["totalEmployees"], 0);
    assert_eq!(body["data"]["overview"]["users"]["totalUsers"], 42);
    assert_eq!(
        body["data"]["overview"]["system"]["systemHealth"]["message"],
        "Restricted"
    );
}

#[tokio::test]
async fn role_based_view_for_unknown_role_is_empty() {
    let app = test_app();

    let response = get_as(&app.router, "/admin/dashboard/role-based", &["guest"]).await;
    assert_eq!(response.status, StatusCode::OK);

    let overview = &response.json()["data"]["overview"];
    assert_eq!(overview["content"]["totalDocuments"], 0);
    assert_eq!(overview["marketing"]["activeLinks"], 0);
}

// ============================================================================
// WIDGETS
// ============================================================================

#[tokio::test]
async fn widget_lookup_by_id() {
    let app = test_app();

    let response = get_as(
        &app.router,
        "/admin/dashboard/widgets/hr-summary",
        &["editor"],
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["data"]["widgetId"], "hr-summary");
    assert_eq!(body["data"]["data"]["totalEmployees"], 37);
    assert_eq!(body["meta"]["cached"], false);

    let again = get_as(
        &app.router,
        "/admin/dashboard/widgets/hr-summary",
        &["editor"],
    )
    .await;
    assert_eq!(again.json()["meta"]["cached"], true);
}

#[tokio::test]
async fn unknown_widget_is_not_found() {
    let app = test_app();

    let response = get_as(
        &app.router,
        "/admin/dashboard/widgets/weather",
        &["admin"],
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"]["code"], "WIDGET_NOT_FOUND");
}

#[tokio::test]
async fn widgets_are_closed_to_plain_users() {
    let app = test_app();

    let response = get_as(
        &app.router,
        "/admin/dashboard/widgets/content-stats",
        &["user"],
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

// ============================================================================
// EXPORT
// ============================================================================

#[tokio::test]
async fn json_export_uses_envelope() {
    let app = test_app();

    let response = get_as(&app.router, "/admin/dashboard/export", &["manager"]).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["hr"]["totalEmployees"], 37);
}

#[tokio::test]
async fn csv_export_is_a_raw_attachment() {
    let app = test_app();

    let response = get_as(
        &app.router,
        "/admin/dashboard/export?format=csv&period=week",
        &["admin"],
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.header("content-type"),
        Some("text/csv; charset=utf-8")
    );
    assert!(response
        .header("content-disposition")
        .is_some_and(|v| v.starts_with("attachment;")));

    let text = response.text();
    let mut lines = text.lines();
    let header = lines.next().unwrap_or_default();
    let row = lines.next().unwrap_or_default();
    assert!(header.split(',').any(|column| column == "users.totalUsers"));
    assert!(header.contains("hr.employeesByDepartment[0].label"));
    assert!(!row.is_empty());
    assert_eq!(text.lines().count(), 2);
}

#[tokio::test]
async fn pdf_export_is_not_implemented() {
    let app = test_app();

    let response = get_as(&app.router, "/admin/dashboard/export?format=pdf", &["admin"]).await;
    assert_eq!(response.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(response.json()["error"]["code"], "NOT_IMPLEMENTED");
}

#[tokio::test]
async fn unknown_export_format_is_rejected() {
    let app = test_app();

    let response = get_as(&app.router, "/admin/dashboard/export?format=xlsx", &["admin"]).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let body = response.json();
    assert_eq!(body["error"]["code"], "INVALID_FORMAT");
    assert_eq!(body["error"]["details"], json!({ "format": "xlsx" }));
}

// ============================================================================
// CACHE MANAGEMENT
// ============================================================================

#[tokio::test]
async fn clearing_one_category_keeps_the_other() {
    let app = test_app();

    get_as(&app.router, "/admin/dashboard/overview", &["admin"]).await;
    get_as(&app.router, "/admin/dashboard/widgets/user-activity", &["admin"]).await;
    assert_eq!(app.dashboard.cache().len(), 2);

    let request = Request::builder()
        .method("DELETE")
        .uri("/admin/dashboard/cache?category=widget")
        .header("x-api-key", TEST_API_KEY)
        .body(Body::empty())
        .unwrap();
    let response = send(&app.router, request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json()["data"],
        json!({ "category": "widget", "removed": 1 })
    );
    assert_eq!(app.dashboard.cache().len(), 1);
}

#[tokio::test]
async fn cache_routes_are_admin_only() {
    let app = test_app();

    let stats = get_as(&app.router, "/admin/dashboard/cache/stats", &["manager"]).await;
    assert_eq!(stats.status, StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("DELETE")
        .uri("/admin/dashboard/cache")
        .header("authorization", test_support::bearer("m1", &["manager"]))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app.router, request).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn cache_stats_count_hits_and_misses() {
    let app = test_app();

    get_as(&app.router, "/admin/dashboard/overview", &["admin"]).await;
    get_as(&app.router, "/admin/dashboard/overview", &["admin"]).await;

    let stats = get_as(&app.router, "/admin/dashboard/cache/stats", &["admin"]).await;
    let data = &stats.json()["data"];
    assert_eq!(data["hits"], 1);
    assert_eq!(data["misses"], 1);
    assert_eq!(data["entries"], 1);
    assert_eq!(data["overviewTtlSecs"], 120);
    assert_eq!(data["widgetTtlSecs"], 60);
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn dashboard_health_redacts_message_for_non_admins() {
    let app = test_app();

    let admin = get_as(&app.router, "/admin/dashboard/health", &["admin"]).await;
    assert_eq!(admin.status, StatusCode::OK);
    assert_eq!(admin.json()["data"]["status"], "healthy");
    assert_ne!(admin.json()["data"]["message"], "Restricted");

    let editor = get_as(&app.router, "/admin/dashboard/health", &["editor"]).await;
    assert_eq!(editor.json()["data"]["message"], "Restricted");
}

#[tokio::test]
async fn readiness_follows_the_metrics_source() {
    let app = test_app();
    let ready = |router: axum::Router| async move {
        let request = Request::builder()
            .uri("/health/ready")
            .body(Body::empty())
            .unwrap();
        send(&router, request).await
    };

    let response = ready(app.router.clone()).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "healthy");

    app.source.fail("ping");
    let response = ready(app.router.clone()).await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json()["details"]["metricsSource"]["status"], "unhealthy");
}

#[tokio::test]
async fn public_routes_need_no_credentials() {
    let app = test_app();

    for uri in ["/health/ping", "/health/live", "/openapi.json", "/metrics"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = send(&app.router, request).await;
        assert_eq!(response.status, StatusCode::OK, "{}", uri);
    }
}

// ============================================================================
// MEDIA
// ============================================================================

#[tokio::test]
async fn upload_then_presign() {
    let app = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/admin/media/uploads")
        .header("authorization", test_support::bearer("editor-1", &["editor"]))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "fileName": "Quarterly Report.pdf",
                "mimeType": "application/pdf",
                "sizeBytes": 2048,
                "metadata": { "folder": "reports" }
            })
            .to_string(),
        ))
        .unwrap();
    let response = send(&app.router, request).await;
    assert_eq!(response.status, StatusCode::CREATED);

    let body = response.json();
    assert_eq!(body["data"]["upload"]["method"], "PUT");
    assert_eq!(body["data"]["media"]["uploadedBy"], "editor-1");
    assert_eq!(app.media.len(), 1);

    let media_id = body["data"]["media"]["id"].as_str().unwrap_or_default().to_string();
    let response = get_as(
        &app.router,
        &format!("/admin/media/{}/presigned-url?operation=get&ttl=60", media_id),
        &["editor"],
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let url = &response.json()["data"];
    assert_eq!(url["method"], "GET");
    assert!(url["url"]
        .as_str()
        .is_some_and(|u| u.contains("X-Icms-Signature=")));
}

#[tokio::test]
async fn presign_rejects_bad_input() {
    let app = test_app();

    let not_a_uuid = get_as(&app.router, "/admin/media/abc/presigned-url", &["admin"]).await;
    assert_eq!(not_a_uuid.status, StatusCode::BAD_REQUEST);

    let missing = get_as(
        &app.router,
        "/admin/media/00000000-0000-0000-0000-000000000001/presigned-url",
        &["admin"],
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json()["error"]["code"], "MEDIA_NOT_FOUND");

    let too_long = get_as(
        &app.router,
        "/admin/media/00000000-0000-0000-0000-000000000001/presigned-url?ttl=604801",
        &["admin"],
    )
    .await;
    assert_eq!(too_long.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn media_routes_reject_plain_users() {
    let app = test_app();

    let response = get_as(
        &app.router,
        "/admin/media/00000000-0000-0000-0000-000000000001/presigned-url",
        &["user"],
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

// ============================================================================
// REQUEST ID AND RATE LIMITING
// ============================================================================

#[tokio::test]
async fn incoming_request_id_is_echoed() {
    let app = test_app();
    let request = Request::builder()
        .uri("/admin/dashboard/overview")
        .header("x-request-id", "trace-abc-123")
        .header("x-api-key", TEST_API_KEY)
        .body(Body::empty())
        .unwrap();

    let response = send(&app.router, request).await;
    assert_eq!(response.header("x-request-id"), Some("trace-abc-123"));
    assert_eq!(response.json()["meta"]["requestId"], "trace-abc-123");
}

#[tokio::test]
async fn authenticated_quota_is_per_user() {
    let mut config = test_api_config();
    config.rate_limit_authenticated = 1;
    config.rate_limit_burst = 2;
    let app = test_app_with(config);

    for _ in 0..2 {
        let ok = get_as(&app.router, "/admin/dashboard/health", &["admin"]).await;
        assert_eq!(ok.status, StatusCode::OK);
    }

    let limited = get_as(&app.router, "/admin/dashboard/health", &["admin"]).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.header("retry-after").is_some());

    let request = Request::builder()
        .uri("/admin/dashboard/health")
        .header("authorization", test_support::bearer("someone-else", &["admin"]))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app.router, request).await.status, StatusCode::OK);
}

#[tokio::test]
async fn cors_admits_configured_subdomains_only() {
    let mut config = test_api_config();
    config.cors_origins = vec![
        "https://admin.icms.local".to_string(),
        "*.icms.example".to_string(),
    ];
    let app = test_app_with(config);

    let allow_origin = |origin: &'static str| {
        let router = app.router.clone();
        async move {
            let request = Request::builder()
                .uri("/health/ping")
                .header("origin", origin)
                .body(Body::empty())
                .unwrap();
            send(&router, request)
                .await
                .header("access-control-allow-origin")
                .map(str::to_string)
        }
    };

    assert_eq!(
        allow_origin("https://admin.icms.local").await.as_deref(),
        Some("https://admin.icms.local")
    );
    assert_eq!(
        allow_origin("https://reports.icms.example").await.as_deref(),
        Some("https://reports.icms.example")
    );
    assert_eq!(allow_origin("https://icms.example.evil.com").await, None);
}
