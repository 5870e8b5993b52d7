//! Telegram relay for the weather proxy.
//!
//! Every text message is treated as a city name, looked up through the gate's
//! HTTP endpoint and answered with a one-line summary.

pub mod bot;
pub mod config;
pub mod dispatch;
pub mod relay;
pub mod telegram;
