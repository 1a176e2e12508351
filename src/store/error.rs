#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Schema initialization failed: {table}: {source}")]
    Schema {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Value out of range for {column}: {value}")]
    InvalidValue { column: &'static str, value: String },

    #[error("Timestamp out of range: {0}")]
    InvalidTimestamp(i64),
}

pub type StoreResult<T> = Result<T, StoreError>;
