use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub token: String,
    #[serde(default = "default_gate_url")]
    pub gate_url: String,
    pub webhook_domain: Option<String>,
    pub webhook_path: Option<String>,
    #[serde(default = "default_app_host")]
    pub app_host: String,
    #[serde(default = "default_app_port")]
    pub app_port: u16,
    /// Bot API server, for running against a self-hosted one.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_gate_url() -> String {
    "http://localhost:8000/weather".to_string()
}

fn default_app_host() -> String {
    "0.0.0.0".to_string()
}

fn default_app_port() -> u16 {
    9000
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(Debug, PartialEq)]
pub enum Mode {
    Polling,
    Webhook {
        /// Public URL registered with Telegram.
        url: String,
        /// Local path the updates are posted to.
        path: String,
        address: SocketAddr,
    },
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        envy::prefixed("BOT_")
            .from_env::<Config>()
            .context("Missing bot config. Required env vars: BOT_TOKEN")
    }

    pub fn mode(&self) -> anyhow::Result<Mode> {
        let Some(domain) = self.webhook_domain.as_deref().filter(|d| !d.is_empty()) else {
            return Ok(Mode::Polling);
        };

        let path = match self.webhook_path.as_deref() {
            Some(p) if p.starts_with('/') => p.to_string(),
            Some(p) if !p.is_empty() => format!("/{}", p),
            _ => "/webhook".to_string(),
        };
        let address = format!("{}:{}", self.app_host, self.app_port)
            .parse()
            .with_context(|| format!("Invalid webhook listen address {}:{}", self.app_host, self.app_port))?;

        Ok(Mode::Webhook {
            url: format!("{}{}", domain.trim_end_matches('/'), path),
            path,
            address,
        })
    }
}
