use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::Reading;

use super::{RecordTx, StoreError, WeatherStore};
use crate::db;
use crate::models::WeatherRecord;
use crate::repos::weather_records;

#[derive(Clone)]
pub struct PgStore {
    pool: db::Pool,
}

impl PgStore {
    pub fn new(pool: db::Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WeatherStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, StoreError> {
        let client = self.pool.get_owned().await?;
        client.batch_execute("BEGIN").await?;
        Ok(PgTx {
            client: Some(client),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }
}

/// An open `BEGIN` block on a pooled connection.
pub struct PgTx {
    client: Option<db::Client<'static>>,
}

impl PgTx {
    fn client(&self) -> Result<&db::Client<'static>, StoreError> {
        self.client.as_ref().ok_or(StoreError::Closed)
    }
}

#[async_trait]
impl RecordTx for PgTx {
    async fn find_for_update(&mut self, city: &str) -> Result<Option<WeatherRecord>, StoreError> {
        let record = weather_records::find_for_update(self.client()?, city).await?;
        Ok(record)
    }

    async fn update_reading(
        &mut self,
        id: i64,
        reading: &Reading,
        refreshed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let updated =
            weather_records::update_reading(self.client()?, id, reading, &refreshed_at).await?;
        if updated == 0 {
            return Err(StoreError::Conflict(id));
        }
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if let Some(client) = self.client.take() {
            client.batch_execute("COMMIT").await?;
        }
        Ok(())
    }
}

impl Drop for PgTx {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        // The connection goes back to the pool once the rollback has run.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = client.batch_execute("ROLLBACK").await {
                        log::error!("rollback failed: {}", e);
                    }
                });
            }
            Err(_) => log::error!("transaction dropped outside of a runtime, rollback skipped"),
        }
    }
}
