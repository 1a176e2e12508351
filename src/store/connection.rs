use crate::store::error::StoreResult;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

/// Owns the SQLite pool backing the sample store.
///
/// The limiter runs once and exits, so a single connection is enough and
/// keeps writes strictly ordered.
pub struct ConnectionManager {
    pool: SqlitePool,
}

impl ConnectionManager {
    /// Open (or create) the database file at `database_path`.
    pub async fn new(database_path: impl AsRef<Path>) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        tracing::debug!(
            "Opened sample database at {}",
            database_path.as_ref().display()
        );

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
