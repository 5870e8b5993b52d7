use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.weather.yandex.ru/v2/forecast";
pub const DEFAULT_FRESHNESS_MINUTES: u32 = 30;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    pub upstream_api_key: String,
    /// Age after which a cached reading is refreshed before being served.
    #[serde(default = "default_freshness_minutes")]
    pub freshness_minutes: u32,
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

fn default_freshness_minutes() -> u32 {
    DEFAULT_FRESHNESS_MINUTES
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        envy::prefixed("WEATHER_")
            .from_env::<Config>()
            .context("Missing server config. Required env vars: WEATHER_UPSTREAM_API_KEY")
    }

    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.freshness_minutes.into())
    }
}
