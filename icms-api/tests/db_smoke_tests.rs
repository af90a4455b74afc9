//! End-to-end smoke tests against a live ICMS database.
//!
//! Run with `--features db-tests` and `ICMS_DB_*` pointing at a migrated
//! database.

#![cfg(feature = "db-tests")]

use std::sync::Arc;

use chrono::Utc;
use icms_api::services::{AggregatorConfig, MetricsAggregator};
use icms_api::{ApiResult, DashboardConfig, DbClient, DbConfig, PgMediaRepository, PgMetricsSource};
use icms_core::{DashboardQuery, HealthStatus, MediaRecord, MediaRepository, MetricsSource};
use uuid::Uuid;

fn test_db() -> ApiResult<DbClient> {
    DbClient::from_config(&DbConfig::from_env())
}

#[tokio::test]
async fn smoke_test_database_reachable() -> ApiResult<()> {
    let db = test_db()?;
    db.health_check().await?;

    let source = PgMetricsSource::new(&db);
    assert!(source.ping().await.is_ok());
    Ok(())
}

#[tokio::test]
async fn smoke_test_overview_aggregates_from_postgres() -> ApiResult<()> {
    let db = test_db()?;
    let aggregator = MetricsAggregator::new(
        Arc::new(PgMetricsSource::new(&db)),
        AggregatorConfig::from(&DashboardConfig::default()),
    );

    let overview = aggregator
        .get_dashboard_overview(&DashboardQuery::default())
        .await?;

    assert!(overview.users.total_users >= overview.users.active_users);
    assert!(overview.content.total_documents >= 0);
    assert_ne!(overview.system.system_health.status, HealthStatus::Unknown);
    Ok(())
}

#[tokio::test]
async fn smoke_test_media_row_round_trip() -> ApiResult<()> {
    let db = test_db()?;
    let repository = PgMediaRepository::new(&db);

    let record = MediaRecord {
        id: Uuid::new_v4(),
        file_name: "smoke-test.png".to_string(),
        mime_type: "image/png".to_string(),
        size_bytes: 128,
        object_key: format!("smoke/{}", Uuid::new_v4()),
        metadata: serde_json::json!({ "source": "smoke-test" }),
        uploaded_by: "smoke-test".to_string(),
        created_at: Utc::now(),
    };

    repository.insert_media(&record).await?;
    let stored = repository.get_media(record.id).await?;

    let stored = stored.unwrap_or_else(|| panic!("media row {} not found", record.id));
    assert_eq!(stored.object_key, record.object_key);
    assert_eq!(stored.uploaded_by, "smoke-test");
    Ok(())
}
