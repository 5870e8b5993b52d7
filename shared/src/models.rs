use serde::{Deserialize, Serialize};

/// Current weather as served by the gate and rendered by the bot.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub temperature: i32,
    /// Millimeters of mercury.
    pub pressure_millimeters: i32,
    pub wind_speed: f64,
}
