//! Read-through cache in front of the upstream weather provider.
//!
//! Each lookup runs in one store transaction holding the record lock, so
//! concurrent requests for the same city trigger at most one upstream call and
//! never observe a half-written reading.

use chrono::{DateTime, Duration, Utc};
use shared::{CityName, CityNameError, Reading};

use crate::models::WeatherRecord;
use crate::store::{RecordTx, StoreError, WeatherStore};
use crate::upstream::{UpstreamError, WeatherSource};

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("invalid city name: {0}")]
    Validation(#[from] CityNameError),
    #[error("no weather record for city {0}")]
    NotFound(CityName),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

pub struct Gate<S, U> {
    store: S,
    source: U,
    freshness: Duration,
}

/// A reading must be refreshed when it was never fetched or is strictly older
/// than the freshness window.
pub fn is_stale(record: &WeatherRecord, now: DateTime<Utc>, freshness: Duration) -> bool {
    match record.cached() {
        Some((_, refreshed_at)) => now - refreshed_at > freshness,
        None => true,
    }
}

impl<S, U> Gate<S, U>
where
    S: WeatherStore,
    U: WeatherSource,
{
    pub fn new(store: S, source: U, freshness: Duration) -> Self {
        Self {
            store,
            source,
            freshness,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn get_weather(&self, city: &str) -> Result<Reading, GateError> {
        let city = CityName::parse(city)?;

        let mut tx = self.store.begin().await?;
        let found = tx.find_for_update(city.as_str()).await?;
        let Some(record) = found else {
            return Err(GateError::NotFound(city));
        };

        if let Some(reading) = self.fresh_reading(&record, Utc::now()) {
            log::debug!("Serving cached weather for {}", record.city);
            tx.commit().await?;
            return Ok(reading);
        }

        log::info!(
            "Refreshing weather for {} ({}, {})",
            record.city,
            record.latitude,
            record.longitude
        );
        let reading = match self.source.fetch(record.latitude, record.longitude).await {
            Ok(reading) => reading,
            Err(e) => {
                log::warn!("Upstream weather for {} unavailable: {}", record.city, e);
                return Err(e.into());
            }
        };

        tx.update_reading(record.id, &reading, Utc::now()).await?;
        tx.commit().await?;
        Ok(reading)
    }

    fn fresh_reading(&self, record: &WeatherRecord, now: DateTime<Utc>) -> Option<Reading> {
        if is_stale(record, now, self.freshness) {
            return None;
        }
        record.last_reading.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const WINDOW: i64 = 30;

    struct FakeSource {
        calls: AtomicUsize,
        coords: parking_lot::Mutex<Vec<(f64, f64)>>,
        reading: Option<Reading>,
        delay: std::time::Duration,
    }

    impl FakeSource {
        fn returning(reading: Reading) -> Self {
            FakeSource {
                calls: AtomicUsize::new(0),
                coords: parking_lot::Mutex::new(Vec::new()),
                reading: Some(reading),
                delay: std::time::Duration::ZERO,
            }
        }

        fn failing() -> Self {
            FakeSource {
                reading: None,
                ..FakeSource::returning(reading(0))
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherSource for Arc<FakeSource> {
        async fn fetch(&self, latitude: f64, longitude: f64) -> Result<Reading, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.coords.lock().push((latitude, longitude));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reading
                .clone()
                .ok_or(UpstreamError::Status(reqwest::StatusCode::BAD_GATEWAY))
        }
    }

    fn reading(temperature: i32) -> Reading {
        Reading {
            temperature,
            pressure_millimeters: 750,
            wind_speed: 2.5,
        }
    }

    fn record(refreshed_at: Option<DateTime<Utc>>) -> WeatherRecord {
        WeatherRecord {
            id: 1,
            city: "Lyon".to_string(),
            latitude: 45.76,
            longitude: 4.84,
            last_reading: refreshed_at.map(|_| reading(10)),
            last_refreshed_at: refreshed_at,
            created_at: Utc::now() - Duration::days(7),
        }
    }

    /// Stores `city` with an optional cached reading refreshed `age` ago.
    async fn seed(
        store: &MemoryStore,
        city: &str,
        coords: (f64, f64),
        cached: Option<(Reading, Duration)>,
    ) -> WeatherRecord {
        let record = store
            .insert(
                &CityName::parse(city).unwrap(),
                Coordinates::new(coords.0, coords.1).unwrap(),
            )
            .unwrap();
        if let Some((reading, age)) = cached {
            let mut tx = store.begin().await.unwrap();
            tx.update_reading(record.id, &reading, Utc::now() - age)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }
        store.get(record.id).unwrap()
    }

    fn gate(store: &MemoryStore, source: &Arc<FakeSource>) -> Gate<MemoryStore, Arc<FakeSource>> {
        Gate::new(store.clone(), source.clone(), Duration::minutes(WINDOW))
    }

    #[test]
    fn test_never_fetched_is_stale() {
        assert!(is_stale(&record(None), Utc::now(), Duration::minutes(WINDOW)));
    }

    #[test]
    fn test_staleness_boundary_is_strict() {
        let now = Utc::now();
        let window = Duration::minutes(WINDOW);

        assert!(!is_stale(&record(Some(now - window)), now, window));
        assert!(is_stale(
            &record(Some(now - window - Duration::milliseconds(1))),
            now,
            window
        ));
        assert!(!is_stale(&record(Some(now)), now, window));
    }

    #[test]
    fn test_staleness_ignores_creation_time() {
        let now = Utc::now();
        let mut rec = record(Some(now - Duration::minutes(1)));
        rec.created_at = now - Duration::days(365);
        assert!(!is_stale(&rec, now, Duration::minutes(WINDOW)));
    }

    #[test]
    fn test_timestamp_without_reading_is_stale() {
        let now = Utc::now();
        let mut rec = record(Some(now));
        rec.last_reading = None;
        assert!(is_stale(&rec, now, Duration::minutes(WINDOW)));
    }

    #[tokio::test]
    async fn test_fresh_reading_served_without_upstream_call() {
        let store = MemoryStore::new();
        seed(
            &store,
            "Lyon",
            (45.76, 4.84),
            Some((reading(10), Duration::minutes(5))),
        )
        .await;
        let source = Arc::new(FakeSource::returning(reading(99)));

        let served = gate(&store, &source).get_weather("Lyon").await.unwrap();

        assert_eq!(served, reading(10));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_reading_refreshed_by_coordinates() {
        let store = MemoryStore::new();
        let seeded = seed(
            &store,
            "Paris",
            (48.85, 2.35),
            Some((reading(1), Duration::minutes(40))),
        )
        .await;
        let source = Arc::new(FakeSource::returning(reading(17)));

        let before = Utc::now();
        let served = gate(&store, &source).get_weather("paris").await.unwrap();
        let after = Utc::now();

        assert_eq!(served, reading(17));
        assert_eq!(source.calls(), 1);
        assert_eq!(*source.coords.lock(), vec![(48.85, 2.35)]);

        let stored = store.get(seeded.id).unwrap();
        assert_eq!(stored.last_reading, Some(reading(17)));
        let refreshed_at = stored.last_refreshed_at.unwrap();
        assert!(before <= refreshed_at && refreshed_at <= after);
    }

    #[tokio::test]
    async fn test_never_fetched_record_is_refreshed() {
        let store = MemoryStore::new();
        let seeded = seed(&store, "Moscow", (55.75, 37.62), None).await;
        let source = Arc::new(FakeSource::returning(reading(-8)));

        let served = gate(&store, &source).get_weather("Moscow").await.unwrap();

        assert_eq!(served, reading(-8));
        assert_eq!(source.calls(), 1);
        assert!(store.get(seeded.id).unwrap().last_refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_refreshed_reading_served_from_cache_afterwards() {
        let store = MemoryStore::new();
        seed(&store, "Moscow", (55.75, 37.62), None).await;
        let source = Arc::new(FakeSource::returning(reading(-8)));
        let gate = gate(&store, &source);

        let first = gate.get_weather("Moscow").await.unwrap();
        let second = gate.get_weather("MOSCOW").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_previous_state() {
        let store = MemoryStore::new();
        let seeded = seed(
            &store,
            "Paris",
            (48.85, 2.35),
            Some((reading(1), Duration::minutes(40))),
        )
        .await;
        let source = Arc::new(FakeSource::failing());
        let gate = gate(&store, &source);

        let err = gate.get_weather("Paris").await.unwrap_err();

        assert!(matches!(err, GateError::Upstream(_)));
        assert_eq!(store.get(seeded.id).unwrap(), seeded);

        // Lock released after the failed attempt.
        let err = tokio::time::timeout(std::time::Duration::from_secs(1), gate.get_weather("Paris"))
            .await
            .expect("record lock leaked")
            .unwrap_err();
        assert!(matches!(err, GateError::Upstream(_)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalid_names_rejected_before_lookup() {
        let store = MemoryStore::new();
        seed(&store, "Moscow", (55.75, 37.62), None).await;
        let source = Arc::new(FakeSource::returning(reading(1)));
        let gate = gate(&store, &source);

        for name in ["ab", "Moscow123", "Mos cow", ""] {
            let err = gate.get_weather(name).await.unwrap_err();
            assert!(matches!(err, GateError::Validation(_)), "{}", name);
        }
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_city_not_found() {
        let store = MemoryStore::new();
        seed(&store, "Moscow", (55.75, 37.62), None).await;
        let source = Arc::new(FakeSource::returning(reading(1)));

        let err = gate(&store, &source).get_weather("Berlin").await.unwrap_err();

        assert!(matches!(err, GateError::NotFound(ref c) if c.as_str() == "Berlin"));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_refresh() {
        let store = MemoryStore::new();
        seed(&store, "Paris", (48.85, 2.35), None).await;
        let source = Arc::new(FakeSource {
            delay: std::time::Duration::from_millis(50),
            ..FakeSource::returning(reading(21))
        });
        let gate = Arc::new(gate(&store, &source));

        let handles: Vec<_> = ["Paris", "paris", "PARIS", "Paris"]
            .into_iter()
            .map(|name| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.get_weather(name).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), reading(21));
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_different_cities_refresh_independently() {
        let store = MemoryStore::new();
        seed(&store, "Paris", (48.85, 2.35), None).await;
        seed(&store, "Lyon", (45.76, 4.84), None).await;
        let source = Arc::new(FakeSource::returning(reading(5)));
        let gate = gate(&store, &source);

        let (paris, lyon) = tokio::join!(gate.get_weather("Paris"), gate.get_weather("Lyon"));

        assert!(paris.is_ok() && lyon.is_ok());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_round_trip_within_window() {
        let store = MemoryStore::new();
        let written = Reading {
            temperature: -12,
            pressure_millimeters: 761,
            wind_speed: 0.4,
        };
        seed(
            &store,
            "Yakutsk",
            (62.03, 129.73),
            Some((written.clone(), Duration::zero())),
        )
        .await;
        let source = Arc::new(FakeSource::returning(reading(0)));

        let served = gate(&store, &source).get_weather("yakutsk").await.unwrap();

        assert_eq!(served, written);
        assert_eq!(source.calls(), 0);
    }
}
