mod feed;
mod scheduler;
mod telegram;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use common::config::{Config, PostSlot};
use telegram::TelegramClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(Config::default_config_path);
    let config = Config::load(&config_path)?;
    let bot = config.bot.context("config has no [bot] section")?;

    let token =
        std::env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN is not set")?;
    let chat_id =
        std::env::var("TELEGRAM_CHANNEL_ID").context("TELEGRAM_CHANNEL_ID is not set")?;

    let http = reqwest::Client::new();
    let telegram = Arc::new(TelegramClient::new(http.clone(), token, chat_id));

    tracing::info!(slots = bot.post_slots.len(), feed = %bot.feed_url, "post bot starting");

    let mut jobs = tokio::task::JoinSet::new();
    for slot in bot.post_slots {
        // validated at config load
        let at = NaiveTime::parse_from_str(&slot.time, "%H:%M")
            .with_context(|| format!("bad slot time '{}'", slot.time))?;
        jobs.spawn(run_slot(
            http.clone(),
            Arc::clone(&telegram),
            bot.feed_url.clone(),
            slot,
            at,
        ));
    }

    // Slots loop forever; a finished task means something went wrong.
    while let Some(result) = jobs.join_next().await {
        result.context("posting job panicked")?;
    }
    Ok(())
}

/// One posting slot: sleep until its daily time, publish, repeat. A failed
/// post is logged and the slot keeps running.
async fn run_slot(
    http: reqwest::Client,
    telegram: Arc<TelegramClient>,
    feed_url: String,
    slot: PostSlot,
    at: NaiveTime,
) {
    loop {
        let Some(day) = scheduler::sleep_until(at).await else {
            tracing::error!(slot = %slot.label, "could not compute the next occurrence");
            return;
        };
        if let Err(err) = post_once(&http, &telegram, &feed_url, day, &slot.label).await {
            tracing::error!(slot = %slot.label, error = format!("{err:#}"), "scheduled post failed");
        }
    }
}

/// Refetch the feed and publish the entry for this day and slot, if any.
async fn post_once(
    http: &reqwest::Client,
    telegram: &TelegramClient,
    feed_url: &str,
    day: chrono::NaiveDate,
    label: &str,
) -> Result<()> {
    let entries = feed::fetch(http, feed_url).await?;
    match feed::entry_for(&entries, day, label) {
        Some(entry) => {
            telegram.send_message(&entry.message).await?;
            tracing::info!(slot = label, %day, "posted scheduled message");
        }
        None => tracing::info!(slot = label, %day, "no message scheduled for this slot"),
    }
    Ok(())
}
