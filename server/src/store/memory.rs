use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared::{CityName, Reading};
use tokio::sync::OwnedMutexGuard;

use super::{RecordTx, StoreError, WeatherStore};
use crate::models::{Coordinates, WeatherRecord};

/// In-process store with one async mutex per record standing in for a row lock.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    records: Mutex<HashMap<i64, WeatherRecord>>,
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
    next_id: Mutex<i64>,
}

impl Inner {
    fn lock_for(&self, id: i64) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock().entry(id).or_default().clone()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, city: &CityName, coords: Coordinates) -> Result<WeatherRecord, StoreError> {
        let mut records = self.inner.records.lock();
        let key = city.as_str().to_lowercase();
        if records.values().any(|r| r.city.to_lowercase() == key) {
            return Err(StoreError::Duplicate(format!("city {}", city)));
        }
        if records.values().any(|r| r.coordinates() == coords) {
            return Err(StoreError::Duplicate(format!(
                "coordinates ({}, {})",
                coords.latitude, coords.longitude
            )));
        }

        let id = {
            let mut next_id = self.inner.next_id.lock();
            *next_id += 1;
            *next_id
        };
        let record = WeatherRecord {
            id,
            city: city.to_string(),
            latitude: coords.latitude,
            longitude: coords.longitude,
            last_reading: None,
            last_refreshed_at: None,
            created_at: Utc::now(),
        };
        records.insert(id, record.clone());
        Ok(record)
    }

    /// Unlocked snapshot of a record.
    pub fn get(&self, id: i64) -> Option<WeatherRecord> {
        self.inner.records.lock().get(&id).cloned()
    }

    pub fn list(&self) -> Vec<WeatherRecord> {
        let mut records: Vec<_> = self.inner.records.lock().values().cloned().collect();
        records.sort_by(|a, b| a.city.cmp(&b.city));
        records
    }
}

#[async_trait]
impl WeatherStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        Ok(MemoryTx {
            inner: self.inner.clone(),
            guards: HashMap::new(),
            staged: Vec::new(),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub struct MemoryTx {
    inner: Arc<Inner>,
    guards: HashMap<i64, OwnedMutexGuard<()>>,
    staged: Vec<(i64, Reading, DateTime<Utc>)>,
}

impl MemoryTx {
    async fn lock(&mut self, id: i64) {
        if !self.guards.contains_key(&id) {
            let guard = self.inner.lock_for(id).lock_owned().await;
            self.guards.insert(id, guard);
        }
    }

    /// Committed state overlaid with this transaction's own staged writes.
    fn visible(&self, id: i64) -> Option<WeatherRecord> {
        let mut record = self.inner.records.lock().get(&id).cloned()?;
        for (staged_id, reading, at) in &self.staged {
            if *staged_id == id {
                record.last_reading = Some(reading.clone());
                record.last_refreshed_at = Some(*at);
            }
        }
        Some(record)
    }
}

#[async_trait]
impl RecordTx for MemoryTx {
    async fn find_for_update(&mut self, city: &str) -> Result<Option<WeatherRecord>, StoreError> {
        let key = city.to_lowercase();
        let id = self
            .inner
            .records
            .lock()
            .values()
            .find(|r| r.city.to_lowercase() == key)
            .map(|r| r.id);
        let Some(id) = id else {
            return Ok(None);
        };

        self.lock(id).await;
        // Read again under the lock: the previous holder may have refreshed it.
        Ok(self.visible(id))
    }

    async fn update_reading(
        &mut self,
        id: i64,
        reading: &Reading,
        refreshed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.lock(id).await;
        if !self.inner.records.lock().contains_key(&id) {
            return Err(StoreError::Conflict(id));
        }
        self.staged.push((id, reading.clone(), refreshed_at));
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        let mut records = self.inner.records.lock();
        for (id, reading, at) in self.staged.drain(..) {
            let record = records.get_mut(&id).ok_or(StoreError::Conflict(id))?;
            record.last_reading = Some(reading);
            record.last_refreshed_at = Some(at);
        }
        // Guards are released when `self` drops, after the writes are visible.
        Ok(())
    }
}
