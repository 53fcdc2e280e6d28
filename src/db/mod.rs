/// Database layer for the planning portal
///
/// Manages the SQLite pool, migrations, and the retry wrapper every
/// read-modify-write transaction runs under.

use crate::error::{PortalError, PortalResult};
use crate::metrics;
use backon::{ExponentialBuilder, Retryable};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> PortalResult<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    SqliteJournalMode::Wal
                } else {
                    SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(Duration::from_secs(5)),
        )
        .await?;

    Ok(pool)
}

/// Run migrations embedded from ./migrations
pub async fn run_migrations(pool: &SqlitePool) -> PortalResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> PortalResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Run a whole transaction attempt, repeating it while SQLite reports a
/// lock conflict.
///
/// `attempt` must open and commit its own transaction so that every retry
/// starts from a fresh snapshot.
pub async fn with_retry<T, F, Fut>(operation: &'static str, max_retries: usize, attempt: F) -> PortalResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortalResult<T>>,
{
    let backoff = ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(500))
        .with_max_times(max_retries)
        .with_jitter();

    attempt
        .retry(backoff)
        .when(PortalError::is_retryable)
        .notify(|err: &PortalError, delay: Duration| {
            metrics::record_transaction_retry(operation);
            tracing::debug!(operation, ?delay, error = %err, "transaction conflict, retrying");
        })
        .await
}

/// In-memory database with the schema applied
///
/// A single connection that never expires keeps the in-memory database
/// alive for the whole test and serializes concurrent transactions.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(
            "sqlite::memory:"
                .parse::<SqliteConnectOptions>()
                .unwrap()
                .foreign_keys(true),
        )
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_memory_pool_has_schema() {
        let pool = memory_pool().await;
        test_connection(&pool).await.unwrap();

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        for table in ["access_token", "portal_status", "project", "section"] {
            assert!(tables.iter().any(|t| t == table), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_with_retry_repeats_conflicts_only() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: PortalResult<u32> = with_retry("test", 3, move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(PortalError::Database(sqlx::Error::PoolTimedOut))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: PortalResult<u32> = with_retry("test", 3, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PortalError::NotFound("gone".to_string()))
        })
        .await;
        assert!(matches!(result, Err(PortalError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_create_pool_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("portal.sqlite");
        let pool = create_pool(&path, DatabaseOptions::default()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        test_connection(&pool).await.unwrap();
        assert!(path.exists());
    }
}
