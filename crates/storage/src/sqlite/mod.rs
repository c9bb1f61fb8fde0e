use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{SessionHistoryRepository, Storage};

mod mapping;
mod migrate;
mod session_repo;

/// Session history backed by `SQLite`.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// How a history database is opened.
///
/// An in-memory database lives only as long as its connections, and each
/// plain `:memory:` connection is a separate database, so it is held on one
/// connection that is never recycled. WAL needs a real file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenPolicy {
    max_connections: u32,
    wal: bool,
    recycle_idle: bool,
}

impl OpenPolicy {
    fn for_url(database_url: &str) -> Self {
        if is_in_memory(database_url) {
            Self {
                max_connections: 1,
                wal: false,
                recycle_idle: false,
            }
        } else {
            Self {
                max_connections: 5,
                wal: true,
                recycle_idle: true,
            }
        }
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

impl SqliteRepository {
    /// Open (creating if missing) the history database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid or the connection
    /// cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let policy = OpenPolicy::for_url(database_url);
        let journal = if policy.wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Memory
        };
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(journal);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(policy.max_connections)
            .acquire_timeout(Duration::from_secs(5));
        if !policy.recycle_idle {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` whose history lives in `SQLite`, migrated to the
    /// current schema.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let history: Arc<dyn SessionHistoryRepository> = Arc::new(repo);
        Ok(Self { history })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[test]
    fn memory_databases_stay_on_one_connection() {
        for url in ["sqlite::memory:", "sqlite:file:hist?mode=memory&cache=shared"] {
            let policy = OpenPolicy::for_url(url);
            assert_eq!(policy.max_connections, 1, "{url}");
            assert!(!policy.wal);
            assert!(!policy.recycle_idle);
        }
    }

    #[test]
    fn file_databases_use_wal() {
        let policy = OpenPolicy::for_url("sqlite:///tmp/studygen.sqlite3");
        assert!(policy.wal);
        assert_eq!(policy.max_connections, 5);
    }

    #[tokio::test]
    async fn memory_database_migrates_twice() {
        let repo = SqliteRepository::connect("sqlite::memory:").await.unwrap();
        repo.migrate().await.unwrap();
        // Migrations are idempotent on the same connection.
        repo.migrate().await.unwrap();
    }
}
