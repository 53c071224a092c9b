//! Fetch → deduplicate → deliver.
//!
//! One call to [`Pipeline::run_cycle`] is one complete, idempotent pass over
//! the current feed snapshot:
//!
//! 1. fetch the feed; on failure the cycle ends with nothing persisted
//! 2. for each entry in feed order: skip it if the ledger has it, otherwise
//!    send the announcement and record the code only after the send succeeded
//! 3. a ledger outage aborts the rest of the cycle
//!
//! Delivering before recording means a crash between the two can produce one
//! duplicate announcement on the next cycle, but never a silently lost code.

use std::sync::Arc;

use chrono::{DateTime, Local};
use reqwest::Url;

use crate::{
    domain::{ChatId, CodeEntry},
    feed::FeedClient,
    formatting::format_announcement,
    ledger::Ledger,
    messaging::port::MessagingPort,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every fetched entry was evaluated.
    Completed,
    /// The feed could not be fetched or parsed; nothing was evaluated.
    FetchFailed(String),
    /// The ledger became unreachable; remaining entries were not evaluated.
    StoreUnavailable(String),
}

/// What one cycle did.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub outcome: CycleOutcome,
    pub fetched: usize,
    pub already_sent: usize,
    /// Codes announced this cycle, in delivery order.
    pub delivered: Vec<String>,
    /// Codes whose announcement failed; they stay eligible for the next cycle.
    pub failed: Vec<String>,
}

impl CycleReport {
    fn begin() -> Self {
        let now = Local::now();
        Self {
            started_at: now,
            finished_at: now,
            outcome: CycleOutcome::Completed,
            fetched: 0,
            already_sent: 0,
            delivered: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn finish(mut self, outcome: CycleOutcome) -> Self {
        self.outcome = outcome;
        self.finished_at = Local::now();
        self
    }

    pub fn summary(&self) -> String {
        match &self.outcome {
            CycleOutcome::FetchFailed(e) => format!("feed fetch failed: {e}"),
            CycleOutcome::StoreUnavailable(e) => format!(
                "aborted, ledger unavailable ({e}); {} new, {} failed before abort",
                self.delivered.len(),
                self.failed.len()
            ),
            CycleOutcome::Completed => format!(
                "{} fetched, {} new, {} already sent, {} failed",
                self.fetched,
                self.delivered.len(),
                self.already_sent,
                self.failed.len()
            ),
        }
    }
}

/// Outcome of evaluating one entry.
enum EntryStep {
    AlreadySent,
    Delivered,
    DeliveryFailed,
    Abort(String),
}

/// The dedup-and-notify pipeline. Owns handles to its three collaborators.
pub struct Pipeline {
    feed: Arc<dyn FeedClient>,
    ledger: Arc<dyn Ledger>,
    messenger: Arc<dyn MessagingPort>,
    destination: ChatId,
    redeem_url: Url,
    message_limit: usize,
}

impl Pipeline {
    pub fn new(
        feed: Arc<dyn FeedClient>,
        ledger: Arc<dyn Ledger>,
        messenger: Arc<dyn MessagingPort>,
        destination: ChatId,
        redeem_url: Url,
        message_limit: usize,
    ) -> Self {
        let message_limit = message_limit.min(messenger.capabilities().max_message_len);
        Self {
            feed,
            ledger,
            messenger,
            destination,
            redeem_url,
            message_limit,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Run one cycle. Never fails: every error is folded into the report.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::begin();

        let entries = match self.feed.fetch().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "skipping cycle: feed unavailable");
                return report.finish(CycleOutcome::FetchFailed(e.to_string()));
            }
        };
        report.fetched = entries.len();

        for entry in &entries {
            match self.process_entry(entry).await {
                EntryStep::AlreadySent => report.already_sent += 1,
                EntryStep::Delivered => report.delivered.push(entry.code.clone()),
                EntryStep::DeliveryFailed => report.failed.push(entry.code.clone()),
                EntryStep::Abort(reason) => {
                    return report.finish(CycleOutcome::StoreUnavailable(reason));
                }
            }
        }

        report.finish(CycleOutcome::Completed)
    }

    async fn process_entry(&self, entry: &CodeEntry) -> EntryStep {
        let code = entry.code.as_str();

        match self.ledger.exists(code).await {
            Ok(true) => return EntryStep::AlreadySent,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "aborting cycle: ledger lookup failed");
                return EntryStep::Abort(e.to_string());
            }
        }

        let text = format_announcement(entry, &self.redeem_url, self.message_limit);
        if let Err(e) = self.messenger.send_html(self.destination, &text).await {
            tracing::warn!(code = %code, error = %e, "announcement failed; will retry next cycle");
            return EntryStep::DeliveryFailed;
        }
        tracing::info!(code = %code, rewards = %entry.rewards, "announced new code");

        match self.ledger.record(code).await {
            Ok(_) => EntryStep::Delivered,
            Err(e) => {
                // Sent but not recorded: the code will be announced again next cycle.
                tracing::error!(code = %code, error = %e, "announced code could not be recorded");
                EntryStep::Abort(e.to_string())
            }
        }
    }
}
