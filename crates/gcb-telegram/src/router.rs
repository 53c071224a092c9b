use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};

use gcb_core::{
    config::Config,
    feed::FeedClient,
    ledger::Ledger,
    messaging::{port::MessagingPort, timeout::TimeoutMessenger},
    pipeline::Pipeline,
    poller::Poller,
    query::QueryResponder,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub poller: Poller,
    pub query: Arc<QueryResponder>,
}

/// Commands advertised to Telegram clients (shown in the `/` menu).
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("codes", "Show all available Genshin Impact codes"),
        BotCommand::new("status", "Show code watcher status"),
        BotCommand::new("check", "Check the feed for new codes now"),
        BotCommand::new("help", "Show help"),
    ]
}

/// Run the bot until Ctrl-C: background poller plus command dispatcher.
///
/// The ledger must already be initialized. The poller is stopped gracefully
/// after the dispatcher exits so an in-flight cycle can finish.
pub async fn run_polling(
    cfg: Arc<Config>,
    feed: Arc<dyn FeedClient>,
    ledger: Arc<dyn Ledger>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "gcb started"),
        Err(e) => tracing::warn!(error = %e, "could not fetch bot identity"),
    }
    tracing::info!(channel = cfg.channel_id.0, feed = %cfg.feed_url, "delivery target");

    // Best-effort: commands still work without the client-side menu.
    if let Err(e) = bot.set_my_commands(bot_commands()).await {
        tracing::warn!(error = %e, "failed to register bot commands");
    }

    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(TimeoutMessenger::new(
        raw_messenger,
        cfg.delivery_timeout,
    ));

    let pipeline = Pipeline::new(
        feed.clone(),
        ledger,
        messenger.clone(),
        cfg.channel_id,
        cfg.redeem_url.clone(),
        cfg.message_limit,
    );
    let poller = Poller::new(pipeline, cfg.poll_interval);
    poller.start().await;

    let query = QueryResponder::new(feed, cfg.message_limit, messenger.capabilities());

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        messenger,
        poller: poller.clone(),
        query: Arc::new(query),
    });

    let handler = Update::filter_message().endpoint(handlers::handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped; waiting for the poller");
    poller.stop().await;

    Ok(())
}
