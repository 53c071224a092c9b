use std::sync::Arc;

use gcb_core::{
    config::Config,
    feed::{FeedClient, HttpFeedClient},
    ledger::{Ledger, SqlLedger},
};

#[tokio::main]
async fn main() -> Result<(), gcb_core::Error> {
    gcb_core::logging::init("gcb")?;

    let cfg = Arc::new(Config::load()?);

    let ledger = SqlLedger::connect(&cfg.database_url, cfg.store_timeout).await?;
    ledger.init().await?;
    tracing::info!(recorded = ledger.recorded_count().await?, "ledger ready");
    let ledger: Arc<dyn Ledger> = Arc::new(ledger);

    let feed: Arc<dyn FeedClient> = Arc::new(HttpFeedClient::new(
        cfg.feed_url.clone(),
        cfg.fetch_timeout,
    )?);

    gcb_telegram::router::run_polling(cfg, feed, ledger)
        .await
        .map_err(|e| gcb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
