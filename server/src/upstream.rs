//! Client for the upstream weather provider (Yandex Weather API).
//!
//! Only the current conditions (`fact`) are kept, reduced to a [`Reading`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;
use shared::Reading;

use crate::config::Config;

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-yandex-api-key");
const LOCALE: &str = "ru_RU";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("upstream body is not JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("upstream body has no `fact` object")]
    MissingFact,
    #[error("upstream `fact` has no `{0}` field")]
    MissingField(&'static str),
    #[error("upstream `fact.{0}` has an unexpected value")]
    InvalidField(&'static str),
}

#[async_trait]
pub trait WeatherSource: Send + Sync + 'static {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<Reading, UpstreamError>;
}

pub struct YandexClient {
    client: reqwest::Client,
    url: String,
}

impl YandexClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_timeout(&config.upstream_url, &config.upstream_api_key, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
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
}

#[async_trait]
impl WeatherSource for YandexClient {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<Reading, UpstreamError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("lang", LOCALE.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let body = response.text().await?;
        parse_fact(&body)
    }
}

fn parse_fact(body: &str) -> Result<Reading, UpstreamError> {
    let json: Value = serde_json::from_str(body)?;
    let fact = json
        .get("fact")
        .filter(|f| f.is_object())
        .ok_or(UpstreamError::MissingFact)?;

    Ok(Reading {
        temperature: integer_field(fact, "temp")?,
        pressure_millimeters: integer_field(fact, "pressure_mm")?,
        wind_speed: number_field(fact, "wind_speed")?,
    })
}

fn field<'a>(fact: &'a Value, name: &'static str) -> Result<&'a Value, UpstreamError> {
    match fact.get(name) {
        None | Some(Value::Null) => Err(UpstreamError::MissingField(name)),
        Some(value) => Ok(value),
    }
}

/// Accepts JSON integers and floats with no fractional part.
fn integer_field(fact: &Value, name: &'static str) -> Result<i32, UpstreamError> {
    let value = field(fact, name)?;
    let int = match value.as_i64() {
        Some(i) => i,
        None => match value.as_f64() {
            Some(f) if f.fract() == 0.0 => f as i64,
            _ => return Err(UpstreamError::InvalidField(name)),
        },
    };
    i32::try_from(int).map_err(|_| UpstreamError::InvalidField(name))
}

fn number_field(fact: &Value, name: &'static str) -> Result<f64, UpstreamError> {
    field(fact, name)?
        .as_f64()
        .ok_or(UpstreamError::InvalidField(name))
}
