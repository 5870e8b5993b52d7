use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use teloxide::payloads::{GetUpdatesSetters, SetWebhookSetters};
use teloxide::requests::Requester;
use teloxide::types::{AllowedUpdate, Message, Update, UpdateKind};
use teloxide::RequestError;
use warp::http::StatusCode;
use warp::path::FullPath;
use warp::Filter;

use crate::config::Config;
use crate::dispatch::{Action, Router, UNSUPPORTED, USAGE};
use crate::relay::GateClient;
use crate::telegram::{self, POLL_TIMEOUT_SECS};

const POLL_BACKOFF: Duration = Duration::from_secs(5);
const MAX_UPDATE_BYTES: u64 = 64 * 1024;

pub struct Bot {
    telegram: teloxide::Bot,
    gate: GateClient,
    router: Router,
}

impl Bot {
    pub fn new(telegram: teloxide::Bot, gate: GateClient) -> Self {
        Self {
            telegram,
            gate,
            router: Router::default(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            telegram::connect(&config.api_url, &config.token)?,
            GateClient::new(&config.gate_url)?,
        ))
    }

    pub async fn reply_to(&self, message: &Message) -> String {
        match (self.router.route(message), message.text()) {
            (Action::Usage, _) => USAGE.to_string(),
            (Action::Weather, Some(text)) => self.gate.reply(text).await,
            (Action::Weather, None) | (Action::Unsupported, _) => UNSUPPORTED.to_string(),
        }
    }

    pub async fn handle_update(&self, update: Update) -> Result<(), RequestError> {
        let UpdateKind::Message(message) = update.kind else {
            log::debug!("Ignoring update {} without a message", update.id);
            return Ok(());
        };
        let text = self.reply_to(&message).await;
        self.telegram.send_message(message.chat.id, text).await?;
        Ok(())
    }

    /// Fetches one batch, answers every update in it and returns the next offset.
    pub async fn poll_once(
        &self,
        offset: Option<i32>,
        timeout_secs: u32,
    ) -> Result<Option<i32>, RequestError> {
        let mut request = self
            .telegram
            .get_updates()
            .timeout(timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message]);
        if let Some(offset) = offset {
            request = request.offset(offset);
        }
        let updates = request.await?;

        let next = updates.iter().map(|u| u.id + 1).max().or(offset);

        let handled = updates.into_iter().map(|update| async move {
            let id = update.id;
            if let Err(e) = self.handle_update(update).await {
                log::error!("Failed to answer update {}: {}", id, e);
            }
        });
        futures::future::join_all(handled).await;

        Ok(next)
    }

    pub async fn run_polling(&self) -> anyhow::Result<()> {
        self.telegram.delete_webhook().await?;
        log::info!("Polling for updates");

        let mut offset = None;
        loop {
            match self.poll_once(offset, POLL_TIMEOUT_SECS).await {
                Ok(next) => offset = next,
                Err(e) => {
                    log::error!("Polling failed: {}", e);
                    tokio::time::sleep(POLL_BACKOFF).await;
                }
            }
        }
    }

    pub async fn run_webhook(
        self: Arc<Self>,
        url: &str,
        path: &str,
        address: SocketAddr,
    ) -> anyhow::Result<()> {
        let url = reqwest::Url::parse(url).with_context(|| format!("Invalid webhook URL {}", url))?;
        self.telegram
            .set_webhook(url)
            .drop_pending_updates(true)
            .await?;
        log::info!("Webhook registered, listening on {}{}", address, path);

        warp::serve(webhook_route(self, path)).run(address).await;
        Ok(())
    }
}

/// Accepts Telegram updates on `POST <path>` and answers before handling them.
pub fn webhook_route(
    bot: Arc<Bot>,
    path: &str,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let path = Arc::new(path.to_string());

    warp::post()
        .and(warp::path::full())
        .and_then(move |full: FullPath| {
            let path = path.clone();
            async move {
                if full.as_str() == path.as_str() {
                    Ok(())
                } else {
                    Err(warp::reject::not_found())
                }
            }
        })
        .untuple_one()
        .and(warp::body::content_length_limit(MAX_UPDATE_BYTES))
        .and(warp::body::json::<Update>())
        .and(with_bot(bot))
        .map(|update: Update, bot: Arc<Bot>| {
            tokio::spawn(async move {
                let id = update.id;
                if let Err(e) = bot.handle_update(update).await {
                    log::error!("Failed to answer update {}: {}", id, e);
                }
            });
            StatusCode::OK
        })
        .with(warp::log("weather::bot"))
}

fn with_bot(bot: Arc<Bot>) -> impl Filter<Extract = (Arc<Bot>,), Error = Infallible> + Clone {
    warp::any().map(move || bot.clone())
}
