use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use shared::{CityName, CityNameError, Reading};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const APOLOGY: &str = "Sorry, I could not get the weather for that city right now.";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("not a city name: {0}")]
    InvalidCity(#[from] CityNameError),
    #[error("gate request failed: {0}")]
    Transport(reqwest::Error),
    #[error("gate answered with status {0}")]
    Status(StatusCode),
    #[error("gate body is not a reading: {0}")]
    Body(reqwest::Error),
}

/// HTTP client for the gate's `/weather` endpoint.
pub struct GateClient {
    client: reqwest::Client,
    url: String,
}

impl GateClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Self::with_timeout(url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Names that would fail the gate's own validation are not sent at all.
    pub async fn lookup(&self, city: &str) -> Result<Reading, RelayError> {
        let city = CityName::parse(city)?;

        let response = self
            .client
            .get(&self.url)
            .query(&[("city", city.as_str())])
            .send()
            .await
            .map_err(RelayError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status));
        }

        response.json::<Reading>().await.map_err(RelayError::Body)
    }

    pub async fn reply(&self, city: &str) -> String {
        match self.lookup(city).await {
            Ok(reading) => format_reading(&reading),
            Err(e) => {
                log::debug!("Weather lookup for {:?} failed", city);
                log::warn!("Weather lookup failed: {}", e);
                APOLOGY.to_string()
            }
        }
    }
}

pub fn format_reading(reading: &Reading) -> String {
    format!(
        "Temperature: {}, Pressure: {}, Wind speed: {}",
        reading.temperature, reading.pressure_millimeters, reading.wind_speed
    )
}
