use chrono::{DateTime, Utc};
use shared::Reading;
use tokio_postgres::Row;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> anyhow::Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            anyhow::bail!("Latitude must be within [-90, 90], got {}", latitude);
        }
        if !(-180.0..=180.0).contains(&longitude) {
            anyhow::bail!("Longitude must be within [-180, 180], got {}", longitude);
        }
        Ok(Coordinates {
            latitude,
            longitude,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeatherRecord {
    pub id: i64,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_reading: Option<Reading>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WeatherRecord {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// The cached reading together with its refresh time, if both were written.
    pub fn cached(&self) -> Option<(&Reading, DateTime<Utc>)> {
        match (&self.last_reading, self.last_refreshed_at) {
            (Some(reading), Some(at)) => Some((reading, at)),
            _ => None,
        }
    }
}

// SQL derivation
impl TryFrom<&Row> for WeatherRecord {
    type Error = tokio_postgres::Error;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        let temperature: Option<i32> = row.try_get("temperature")?;
        let pressure_mm: Option<i32> = row.try_get("pressure_mm")?;
        let wind_speed: Option<f64> = row.try_get("wind_speed")?;
        let refreshed_at: Option<DateTime<Utc>> = row.try_get("refreshed_at")?;

        let last_reading = match (temperature, pressure_mm, wind_speed, refreshed_at) {
            (Some(temperature), Some(pressure_millimeters), Some(wind_speed), Some(_)) => {
                Some(Reading {
                    temperature,
                    pressure_millimeters,
                    wind_speed,
                })
            }
            _ => None,
        };

        Ok(WeatherRecord {
            id: row.try_get("id")?,
            city: row.try_get("city")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            last_refreshed_at: last_reading.as_ref().and(refreshed_at),
            last_reading,
            created_at: row.try_get("created_at")?,
        })
    }
}
