use crate::store::connection::ConnectionManager;
use crate::store::error::{StoreError, StoreResult};
use crate::store::schema::SchemaManager;
use crate::usage::UsageSample;
use chrono::{DateTime, TimeZone, Utc};
use futures::stream::{BoxStream, StreamExt};
use sqlx::SqlitePool;
use std::path::Path;

/// Append-only store of usage samples, queried by `observed_at` range.
pub struct SampleStore {
    pool: SqlitePool,
}

impl SampleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `path`, creating the file and schema if needed.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let connection_manager = ConnectionManager::new(path).await?;

        let schema_manager = SchemaManager::new(connection_manager.pool().clone());
        schema_manager.initialize_schema().await?;

        Ok(Self::new(connection_manager.pool().clone()))
    }

    /// Persist a new sample.
    pub async fn append(&self, sample: &UsageSample) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO usage_samples (observed_at, cumulative_bytes, delta_bytes)
            VALUES (?, ?, ?)
        "#,
        )
        .bind(sample.observed_at.timestamp_millis())
        .bind(to_column("cumulative_bytes", sample.cumulative_bytes)?)
        .bind(to_column("delta_bytes", sample.delta_bytes)?)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Usage sample stored: observed_at={} cumulative={} delta={}",
            sample.observed_at,
            sample.cumulative_bytes,
            sample.delta_bytes
        );

        Ok(())
    }

    /// Most recent sample by observation time, or `None` on an empty store.
    pub async fn last_sample(&self) -> StoreResult<Option<UsageSample>> {
        let row = sqlx::query_as::<_, SampleRow>(
            r#"
            SELECT observed_at, cumulative_bytes, delta_bytes
            FROM usage_samples
            ORDER BY observed_at DESC, id DESC
            LIMIT 1
        "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(UsageSample::try_from).transpose()
    }

    /// Lazily stream samples with `start <= observed_at <= end`, oldest first.
    ///
    /// Each call issues a fresh query, so the range can be re-read at will.
    pub fn samples_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxStream<'_, StoreResult<UsageSample>> {
        sqlx::query_as::<_, SampleRow>(
            r#"
            SELECT observed_at, cumulative_bytes, delta_bytes
            FROM usage_samples
            WHERE observed_at >= ? AND observed_at <= ?
            ORDER BY observed_at ASC, id ASC
        "#,
        )
        .bind(start.timestamp_millis())
        .bind(end.timestamp_millis())
        .fetch(&self.pool)
        .map(|row| row.map_err(StoreError::from).and_then(UsageSample::try_from))
        .boxed()
    }

    /// Delete every sample observed strictly before `cutoff`.
    pub async fn purge_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM usage_samples
            WHERE observed_at < ?
        "#,
        )
        .bind(cutoff.timestamp_millis())
        .execute(&self.pool)
        .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!("Purged {} usage samples older than {}", deleted, cutoff);
        }

        Ok(deleted)
    }

    pub async fn count(&self) -> StoreResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM usage_samples")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn to_column(column: &'static str, value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

fn from_column(column: &'static str, value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidValue {
        column,
        value: value.to_string(),
    })
}

// Database row type
#[derive(sqlx::FromRow)]
struct SampleRow {
    observed_at: i64,
    cumulative_bytes: i64,
    delta_bytes: i64,
}

impl TryFrom<SampleRow> for UsageSample {
    type Error = StoreError;

    fn try_from(row: SampleRow) -> StoreResult<Self> {
        let observed_at = Utc
            .timestamp_millis_opt(row.observed_at)
            .single()
            .ok_or(StoreError::InvalidTimestamp(row.observed_at))?;

        Ok(UsageSample::new(
            observed_at,
            from_column("cumulative_bytes", row.cumulative_bytes)?,
            from_column("delta_bytes", row.delta_bytes)?,
        ))
    }
}
