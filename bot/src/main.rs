use std::sync::Arc;

use weather_bot::bot::Bot;
use weather_bot::config::{Config, Mode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;
    let mode = config.mode()?;
    let bot = Arc::new(Bot::from_config(&config)?);

    let running = async {
        match mode {
            Mode::Polling => bot.run_polling().await,
            Mode::Webhook { url, path, address } => {
                bot.clone().run_webhook(&url, &path, address).await
            }
        }
    };

    tokio::select! {
        result = running => result,
        _ = tokio::signal::ctrl_c() => {
            log::info!("Bot stopped");
            Ok(())
        }
    }
}
