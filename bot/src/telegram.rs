//! Telegram Bot API access through `teloxide`.

use std::time::Duration;

use anyhow::Context;

/// Long-poll duration asked of `getUpdates`, in seconds.
pub const POLL_TIMEOUT_SECS: u32 = 30;

/// A `teloxide::Bot` pointed at `api_url`, with a request timeout long enough
/// to outlast a full long poll.
pub fn connect(api_url: &str, token: &str) -> anyhow::Result<teloxide::Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 10))
        .build()
        .context("Failed to build Telegram HTTP client")?;
    let api_url = reqwest::Url::parse(api_url)
        .with_context(|| format!("Invalid Telegram API URL {}", api_url))?;

    Ok(teloxide::Bot::with_client(token, client).set_api_url(api_url))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};
    use teloxide::types::{Message, Update};

    pub const CHAT_ID: i64 = 42;

    /// Bot API JSON for a private-chat message; `None` makes it a location.
    pub fn message_json(id: i32, text: Option<&str>) -> Value {
        let mut message = json!({
            "message_id": id,
            "date": 1700000000,
            "chat": {"id": CHAT_ID, "type": "private", "first_name": "Ann"},
            "from": {"id": CHAT_ID, "is_bot": false, "first_name": "Ann"},
        });
        match text {
            Some(text) => message["text"] = json!(text),
            None => message["location"] = json!({"latitude": 59.91, "longitude": 10.75}),
        }
        message
    }

    pub fn update_json(id: i32, text: Option<&str>) -> Value {
        json!({"update_id": id, "message": message_json(id, text)})
    }

    pub fn message(id: i32, text: Option<&str>) -> Message {
        serde_json::from_value(message_json(id, text)).unwrap()
    }

    pub fn update(id: i32, text: Option<&str>) -> Update {
        // teloxide's `Update` deserializer only works from a string, not a `Value`.
        serde_json::from_str(&update_json(id, text).to_string()).unwrap()
    }
}
