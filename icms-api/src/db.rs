//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, plus the two
//! adapters the dashboard reads and writes through:
//! - [`PgMetricsSource`]: one query per [`MetricsSource`] method
//! - [`PgMediaRepository`]: persistence for uploaded media rows
//!
//! Table layout expected by the queries:
//!
//! | table | columns used |
//! |-------|--------------|
//! | `users` | id, name, email, role, last_login_at, created_at |
//! | `documents` | id, title, category, status, created_by, created_at |
//! | `media` | id, file_name, mime_type, size_bytes, object_key, metadata, uploaded_by, created_at |
//! | `departments` | id, name |
//! | `employees` | id, department_id |
//! | `important_links` | id, title, url, is_active, created_at |
//! | `header_configs` | id |
//! | `office_settings` | id |

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use icms_core::{
    ActiveUser, DocumentStatus, LabeledCount, LinkSummary, MediaError, MediaRecord,
    MediaRepository, MediaResult, MetricsSource, MetricsSourceError, MetricsWindow,
    RecentDocument, SourceResult,
};
use std::time::{Duration, Instant};
use tokio_postgres::{types::ToSql, NoTls, Row};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Wait/create timeout for pool checkouts
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "icms".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Environment variables: `ICMS_DB_HOST`, `ICMS_DB_PORT`, `ICMS_DB_NAME`,
    /// `ICMS_DB_USER`, `ICMS_DB_PASSWORD`, `ICMS_DB_POOL_SIZE`,
    /// `ICMS_DB_TIMEOUT` (seconds).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("ICMS_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("ICMS_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("ICMS_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("ICMS_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("ICMS_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("ICMS_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("ICMS_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration.
    ///
    /// Connections are opened lazily, so this succeeds without a reachable
    /// server.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Thin wrapper over the pool shared by the adapters and health routes.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    async fn get_conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Health check - verifies connectivity and reports the round-trip time.
    pub async fn health_check(&self) -> ApiResult<Duration> {
        let started = Instant::now();
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await?;
        Ok(started.elapsed())
    }
}

// ============================================================================
// METRICS SOURCE ADAPTER
// ============================================================================

/// [`MetricsSource`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgMetricsSource {
    pool: Pool,
}

impl PgMetricsSource {
    pub fn new(db: &DbClient) -> Self {
        Self {
            pool: db.pool.clone(),
        }
    }

    async fn rows(
        &self,
        metric: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> SourceResult<Vec<Row>> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| MetricsSourceError::Unavailable {
                reason: e.to_string(),
            })?;
        conn.query(sql, params)
            .await
            .map_err(|e| MetricsSourceError::query(metric, e.to_string()))
    }

    /// Run a query returning a single BIGINT in column 0.
    async fn scalar(
        &self,
        metric: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> SourceResult<i64> {
        let rows = self.rows(metric, sql, params).await?;
        let row = rows
            .first()
            .ok_or_else(|| MetricsSourceError::query(metric, "query returned no rows"))?;
        row.try_get::<_, i64>(0)
            .map_err(|e| MetricsSourceError::query(metric, e.to_string()))
    }

    async fn labeled_counts(&self, metric: &str, sql: &str) -> SourceResult<Vec<LabeledCount>> {
        self.rows(metric, sql, &[])
            .await?
            .iter()
            .map(|row| {
                Ok(LabeledCount::new(
                    row.try_get::<_, String>(0)
                        .map_err(|e| MetricsSourceError::query(metric, e.to_string()))?,
                    row.try_get::<_, i64>(1)
                        .map_err(|e| MetricsSourceError::query(metric, e.to_string()))?,
                ))
            })
            .collect()
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn column<'a, T>(row: &'a Row, metric: &str, idx: usize) -> SourceResult<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(idx)
        .map_err(|e| MetricsSourceError::query(metric, e.to_string()))
}

#[async_trait]
impl MetricsSource for PgMetricsSource {
    async fn ping(&self) -> SourceResult<()> {
        self.scalar("ping", "SELECT 1::BIGINT", &[]).await.map(|_| ())
    }

    async fn count_users(&self) -> SourceResult<i64> {
        self.scalar("count_users", "SELECT COUNT(*) FROM users", &[])
            .await
    }

    async fn count_active_users(&self, window: &MetricsWindow) -> SourceResult<i64> {
        self.scalar(
            "count_active_users",
            "SELECT COUNT(*) FROM users WHERE last_login_at >= $1 AND last_login_at <= $2",
            &[&window.start, &window.end],
        )
        .await
    }

    async fn count_new_users(&self, window: &MetricsWindow) -> SourceResult<i64> {
        self.scalar(
            "count_new_users",
            "SELECT COUNT(*) FROM users WHERE created_at >= $1 AND created_at <= $2",
            &[&window.start, &window.end],
        )
        .await
    }

    async fn users_by_role(&self) -> SourceResult<Vec<LabeledCount>> {
        self.labeled_counts(
            "users_by_role",
            "SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY COUNT(*) DESC, role",
        )
        .await
    }

    async fn top_active_users(
        &self,
        window: &MetricsWindow,
        limit: usize,
    ) -> SourceResult<Vec<ActiveUser>> {
        const METRIC: &str = "top_active_users";
        let rows = self
            .rows(
                METRIC,
                "SELECT u.id, u.name, u.email, u.role, u.last_login_at, COUNT(d.id) AS activity \
                 FROM users u \
                 LEFT JOIN documents d \
                   ON d.created_by = u.id AND d.created_at >= $1 AND d.created_at <= $2 \
                 WHERE u.last_login_at >= $1 AND u.last_login_at <= $2 \
                 GROUP BY u.id \
                 ORDER BY activity DESC, u.last_login_at DESC \
                 LIMIT $3",
                &[&window.start, &window.end, &sql_limit(limit)],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ActiveUser {
                    id: column(row, METRIC, 0)?,
                    name: column(row, METRIC, 1)?,
                    email: column(row, METRIC, 2)?,
                    role: column(row, METRIC, 3)?,
                    last_login_at: column(row, METRIC, 4)?,
                    activity_count: column(row, METRIC, 5)?,
                })
            })
            .collect()
    }

    async fn count_documents(&self) -> SourceResult<i64> {
        self.scalar("count_documents", "SELECT COUNT(*) FROM documents", &[])
            .await
    }

    async fn count_documents_by_status(&self, status: DocumentStatus) -> SourceResult<i64> {
        self.scalar(
            "count_documents_by_status",
            "SELECT COUNT(*) FROM documents WHERE status = $1",
            &[&status.as_str()],
        )
        .await
    }

    async fn count_new_documents(&self, window: &MetricsWindow) -> SourceResult<i64> {
        self.scalar(
            "count_new_documents",
            "SELECT COUNT(*) FROM documents WHERE created_at >= $1 AND created_at <= $2",
            &[&window.start, &window.end],
        )
        .await
    }

    async fn documents_by_category(&self) -> SourceResult<Vec<LabeledCount>> {
        self.labeled_counts(
            "documents_by_category",
            "SELECT COALESCE(category, 'Uncategorized'), COUNT(*) FROM documents \
             GROUP BY 1 ORDER BY 2 DESC, 1",
        )
        .await
    }

    async fn recent_documents(&self, limit: usize) -> SourceResult<Vec<RecentDocument>> {
        const METRIC: &str = "recent_documents";
        let rows = self
            .rows(
                METRIC,
                "SELECT id, title, category, status, created_at FROM documents \
                 ORDER BY created_at DESC LIMIT $1",
                &[&sql_limit(limit)],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(RecentDocument {
                    id: column(row, METRIC, 0)?,
                    title: column(row, METRIC, 1)?,
                    category: column(row, METRIC, 2)?,
                    status: column(row, METRIC, 3)?,
                    created_at: column(row, METRIC, 4)?,
                })
            })
            .collect()
    }

    async fn count_header_configs(&self) -> SourceResult<i64> {
        self.scalar(
            "count_header_configs",
            "SELECT COUNT(*) FROM header_configs",
            &[],
        )
        .await
    }

    async fn count_important_links(&self, active_only: bool) -> SourceResult<i64> {
        self.scalar(
            "count_important_links",
            "SELECT COUNT(*) FROM important_links WHERE NOT $1 OR is_active",
            &[&active_only],
        )
        .await
    }

    async fn recent_important_links(&self, limit: usize) -> SourceResult<Vec<LinkSummary>> {
        const METRIC: &str = "recent_important_links";
        let rows = self
            .rows(
                METRIC,
                "SELECT id, title, url, is_active, created_at FROM important_links \
                 ORDER BY created_at DESC LIMIT $1",
                &[&sql_limit(limit)],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(LinkSummary {
                    id: column(row, METRIC, 0)?,
                    title: column(row, METRIC, 1)?,
                    url: column(row, METRIC, 2)?,
                    is_active: column(row, METRIC, 3)?,
                    created_at: column(row, METRIC, 4)?,
                })
            })
            .collect()
    }

    async fn count_media(&self) -> SourceResult<i64> {
        self.scalar("count_media", "SELECT COUNT(*) FROM media", &[])
            .await
    }

    async fn total_media_bytes(&self) -> SourceResult<i64> {
        // SUM over BIGINT yields NUMERIC
        self.scalar(
            "total_media_bytes",
            "SELECT COALESCE(SUM(size_bytes), 0)::BIGINT FROM media",
            &[],
        )
        .await
    }

    async fn office_settings_configured(&self) -> SourceResult<bool> {
        self.scalar(
            "office_settings_configured",
            "SELECT COUNT(*) FROM office_settings",
            &[],
        )
        .await
        .map(|count| count > 0)
    }

    async fn count_departments(&self) -> SourceResult<i64> {
        self.scalar("count_departments", "SELECT COUNT(*) FROM departments", &[])
            .await
    }

    async fn count_employees(&self, department_id: Option<Uuid>) -> SourceResult<i64> {
        self.scalar(
            "count_employees",
            "SELECT COUNT(*) FROM employees WHERE $1::UUID IS NULL OR department_id = $1",
            &[&department_id],
        )
        .await
    }

    async fn employees_by_department(&self) -> SourceResult<Vec<LabeledCount>> {
        self.labeled_counts(
            "employees_by_department",
            "SELECT COALESCE(d.name, 'Unassigned'), COUNT(e.id) FROM employees e \
             LEFT JOIN departments d ON d.id = e.department_id \
             GROUP BY 1 ORDER BY 2 DESC, 1",
        )
        .await
    }
}

// ============================================================================
// MEDIA REPOSITORY ADAPTER
// ============================================================================

/// [`MediaRepository`] backed by the `media` table.
#[derive(Clone)]
pub struct PgMediaRepository {
    pool: Pool,
}

impl PgMediaRepository {
    pub fn new(db: &DbClient) -> Self {
        Self {
            pool: db.pool.clone(),
        }
    }

    async fn conn(&self) -> MediaResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(repository_error)
    }
}

fn repository_error(e: impl std::fmt::Display) -> MediaError {
    MediaError::Repository {
        reason: e.to_string(),
    }
}

fn media_from_row(row: &Row) -> MediaResult<MediaRecord> {
    Ok(MediaRecord {
        id: row.try_get(0).map_err(repository_error)?,
        file_name: row.try_get(1).map_err(repository_error)?,
        mime_type: row.try_get(2).map_err(repository_error)?,
        size_bytes: row.try_get(3).map_err(repository_error)?,
        object_key: row.try_get(4).map_err(repository_error)?,
        metadata: row.try_get(5).map_err(repository_error)?,
        uploaded_by: row.try_get(6).map_err(repository_error)?,
        created_at: row.try_get(7).map_err(repository_error)?,
    })
}

#[async_trait]
impl MediaRepository for PgMediaRepository {
    async fn insert_media(&self, record: &MediaRecord) -> MediaResult<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO media \
             (id, file_name, mime_type, size_bytes, object_key, metadata, uploaded_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            &[
                &record.id,
                &record.file_name,
                &record.mime_type,
                &record.size_bytes,
                &record.object_key,
                &record.metadata,
                &record.uploaded_by,
                &record.created_at,
            ],
        )
        .await
        .map_err(repository_error)?;
        Ok(())
    }

    async fn get_media(&self, media_id: Uuid) -> MediaResult<Option<MediaRecord>> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, file_name, mime_type, size_bytes, object_key, metadata, uploaded_by, \
                 created_at FROM media WHERE id = $1",
                &[&media_id],
            )
            .await
            .map_err(repository_error)?;
        row.as_ref().map(media_from_row).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "icms");
        assert_eq!(config.max_size, 16);
    }

    #[test]
    fn test_sql_limit_saturates() {
        assert_eq!(sql_limit(10), 10);
        assert_eq!(sql_limit(usize::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn test_pool_creation_is_lazy() -> Result<(), String> {
        let config = DbConfig {
            port: 1,
            timeout: Duration::from_millis(50),
            ..DbConfig::default()
        };
        let db = DbClient::from_config(&config).map_err(|e| e.message)?;
        assert_eq!(db.pool_size(), 0);

        // Nothing listens on port 1; every query fails as unavailable
        let source = PgMetricsSource::new(&db);
        assert!(matches!(
            source.count_users().await,
            Err(MetricsSourceError::Unavailable { .. })
        ));
        Ok(())
    }
}
