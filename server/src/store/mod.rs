//! Storage seam for weather records.
//!
//! The gate only ever reads a record and rewrites its reading, always inside a
//! transaction that holds an exclusive lock on that record. Two backends share
//! this contract: Postgres row locks and an in-process per-record mutex.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::Reading;

use crate::models::WeatherRecord;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("weather record {0} no longer exists")]
    Conflict(i64),
    #[error("duplicate weather record: {0}")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    #[error("transaction already finished")]
    Closed,
    #[error("connection pool timed out")]
    PoolTimeout,
}

impl From<bb8::RunError<tokio_postgres::Error>> for StoreError {
    fn from(err: bb8::RunError<tokio_postgres::Error>) -> Self {
        match err {
            bb8::RunError::User(e) => StoreError::Database(e),
            bb8::RunError::TimedOut => StoreError::PoolTimeout,
        }
    }
}

#[async_trait]
pub trait WeatherStore: Send + Sync + 'static {
    type Tx: RecordTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// A unit of work over weather records.
///
/// Dropping it without calling [`RecordTx::commit`] discards every staged
/// update and releases the locks it holds.
#[async_trait]
pub trait RecordTx: Send {
    /// Case-insensitive lookup that locks the matching record until the
    /// transaction ends. Concurrent callers for the same record wait here.
    async fn find_for_update(&mut self, city: &str) -> Result<Option<WeatherRecord>, StoreError>;

    async fn update_reading(
        &mut self,
        id: i64,
        reading: &Reading,
        refreshed_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
