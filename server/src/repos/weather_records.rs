use chrono::{DateTime, Utc};
use shared::{CityName, Reading};

use crate::db;
use crate::models::{Coordinates, WeatherRecord};

const COLUMNS: &str = "id, city, latitude, longitude, temperature, pressure_mm, wind_speed, \
                       refreshed_at, created_at";

pub async fn create<'a>(
    client: &db::Client<'a>,
    city: &CityName,
    coords: Coordinates,
) -> Result<WeatherRecord, tokio_postgres::Error> {
    let stmt = format!(
        "INSERT INTO weather_records (city, latitude, longitude) VALUES ($1, $2, $3) \
         RETURNING {}",
        COLUMNS
    );
    let row = client
        .query_one(
            stmt.as_str(),
            &[&city.as_str(), &coords.latitude, &coords.longitude],
        )
        .await?;
    WeatherRecord::try_from(&row)
}

pub async fn list<'a>(client: &db::Client<'a>) -> Result<Vec<WeatherRecord>, tokio_postgres::Error> {
    let stmt = format!("SELECT {} FROM weather_records ORDER BY city", COLUMNS);
    let rows = client.query(stmt.as_str(), &[]).await?;
    super::from_rows(rows)
}

/// Row-locks the record until the enclosing transaction ends.
pub async fn find_for_update<'a>(
    client: &db::Client<'a>,
    city: &str,
) -> Result<Option<WeatherRecord>, tokio_postgres::Error> {
    let stmt = format!(
        "SELECT {} FROM weather_records WHERE lower(city) = lower($1) FOR UPDATE",
        COLUMNS
    );
    match client.query_opt(stmt.as_str(), &[&city]).await? {
        Some(row) => Ok(Some(WeatherRecord::try_from(&row)?)),
        None => Ok(None),
    }
}

/// Returns the number of updated rows.
pub async fn update_reading<'a>(
    client: &db::Client<'a>,
    id: i64,
    reading: &Reading,
    refreshed_at: &DateTime<Utc>,
) -> Result<u64, tokio_postgres::Error> {
    let stmt = "UPDATE weather_records \
                SET temperature = $2, pressure_mm = $3, wind_speed = $4, refreshed_at = $5 \
                WHERE id = $1";
    client
        .execute(
            stmt,
            &[
                &id,
                &reading.temperature,
                &reading.pressure_millimeters,
                &reading.wind_speed,
                refreshed_at,
            ],
        )
        .await
}
