use anyhow::Context;
use shared::CityName;

use crate::cli::CitySubCommand;
use crate::db;
use crate::models::{Coordinates, WeatherRecord};
use crate::repos;

pub async fn exec(db_url: &str, cmd: CitySubCommand) -> anyhow::Result<()> {
    let pool = db::pool(db_url).await?;
    let client = pool.get().await?;

    match cmd {
        CitySubCommand::Add {
            name,
            latitude,
            longitude,
        } => {
            let city = CityName::parse(&name)?;
            let coords = Coordinates::new(latitude, longitude)?;
            let record = repos::weather_records::create(&client, &city, coords)
                .await
                .with_context(|| format!("Failed to add {} (city or coordinates already taken?)", city))?;
            log::info!("Added city {} with id {}", record.city, record.id);
            println!("{}", describe(&record));
        }
        CitySubCommand::List => {
            for record in repos::weather_records::list(&client).await? {
                println!("{}", describe(&record));
            }
        }
    }
    Ok(())
}

fn describe(record: &WeatherRecord) -> String {
    let reading = match record.cached() {
        Some((r, at)) => format!(
            "temperature: {}, pressure_mm: {}, wind_speed: {} at {}",
            r.temperature,
            r.pressure_millimeters,
            r.wind_speed,
            at.to_rfc3339()
        ),
        None => "never fetched".to_string(),
    };
    format!(
        "City: {} ({}, {}) {}",
        record.city, record.latitude, record.longitude, reading
    )
}
