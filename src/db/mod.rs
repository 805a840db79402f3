//! Persistence layer.
//!
//! Two collections live here: the patient directory (unique on the external
//! patient identifier) and the reading store (indexed by patient identifier
//! and timestamp for the recency queries). Timestamps are persisted as Unix
//! milliseconds so range comparisons stay cheap.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

pub mod queries;
pub mod seed;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("invalid stored thresholds for patient {patient_id}: {source}")]
    Thresholds {
        patient_id: String,
        source: serde_json::Error,
    },
    #[error("invalid stored timestamp: {0}")]
    Timestamp(i64),
    #[error("invalid stored reading id: {0}")]
    RowId(#[from] uuid::Error),
}

/// Handle to the SQLite connection pool. Cheap to clone; the pool is shared.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new();
        // An in-memory database exists per connection; pin the pool to one
        // long-lived connection so every caller sees the same schema.
        if url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
