use crate::store::error::{StoreError, StoreResult};
use sqlx::SqlitePool;

pub struct SchemaManager {
    write_pool: SqlitePool,
}

impl SchemaManager {
    pub fn new(write_pool: SqlitePool) -> Self {
        Self { write_pool }
    }

    /// Create missing tables and indexes. Safe to run against an existing file.
    pub async fn initialize_schema(&self) -> StoreResult<()> {
        self.create_usage_samples_table().await?;
        self.create_indexes().await?;

        tracing::debug!("Sample store schema initialized");
        Ok(())
    }

    async fn create_usage_samples_table(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usage_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                observed_at INTEGER NOT NULL, -- unix millis, UTC
                cumulative_bytes INTEGER NOT NULL CHECK(cumulative_bytes >= 0),
                delta_bytes INTEGER NOT NULL CHECK(delta_bytes >= 0)
            )
        "#,
        )
        .execute(&self.write_pool)
        .await
        .map_err(|source| StoreError::Schema {
            table: "usage_samples".to_string(),
            source,
        })?;

        Ok(())
    }

    async fn create_indexes(&self) -> StoreResult<()> {
        let indexes = vec![
            "CREATE INDEX IF NOT EXISTS idx_usage_samples_observed_at ON usage_samples(observed_at)",
        ];

        for index_sql in indexes {
            sqlx::query(index_sql)
                .execute(&self.write_pool)
                .await
                .map_err(|source| StoreError::Schema {
                    table: "usage_samples".to_string(),
                    source,
                })?;
        }

        Ok(())
    }
}
