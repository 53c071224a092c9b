//! On-demand listing of every code currently in the feed.
//!
//! Reads the feed only; the ledger is neither consulted nor changed, so this
//! can run at any time alongside a pipeline cycle.

use std::sync::Arc;

use crate::{
    feed::FeedClient, formatting::format_code_list, messaging::types::MessagingCapabilities,
};

pub const FETCH_FAILED_REPLY: &str = "❌ Failed to fetch codes.";

pub struct QueryResponder {
    feed: Arc<dyn FeedClient>,
    message_limit: usize,
}

impl QueryResponder {
    /// `message_limit` is capped at what the reply sink accepts.
    pub fn new(
        feed: Arc<dyn FeedClient>,
        message_limit: usize,
        sink: MessagingCapabilities,
    ) -> Self {
        Self {
            feed,
            message_limit: message_limit.min(sink.max_message_len),
        }
    }

    /// Reply text for a requester: the formatted listing, or a single failure line.
    pub async fn respond(&self) -> String {
        match self.feed.fetch().await {
            Ok(entries) => format_code_list(&entries, self.message_limit),
            Err(e) => {
                tracing::warn!(error = %e, "code listing request failed");
                FETCH_FAILED_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{entry, FakeFeed};

    const SINK: MessagingCapabilities = MessagingCapabilities {
        supports_html: true,
        max_message_len: 4096,
    };

    #[tokio::test]
    async fn lists_both_codes_with_rewards_or_placeholder() {
        let feed = Arc::new(FakeFeed::fixed(vec![
            entry("GENSHINGIFT", Some("50 Primogems")),
            entry("NULLREWARD", None),
        ]));
        let responder = QueryResponder::new(feed, 1900, SINK);

        let text = responder.respond().await;
        assert!(text.contains("GENSHINGIFT"));
        assert!(text.contains("50 Primogems"));
        assert!(text.contains("NULLREWARD"));
        assert!(text.contains("Rewards unknown"));
        assert!(!text.ends_with("..."));
    }

    #[tokio::test]
    async fn long_listing_is_truncated_with_marker() {
        let entries = (0..500)
            .map(|i| entry(&format!("CODE{i:04}"), Some("Hero's Wit x 5, Mora x 20000")))
            .collect();
        let responder = QueryResponder::new(Arc::new(FakeFeed::fixed(entries)), 1900, SINK);

        let text = responder.respond().await;
        assert!(text.ends_with("\n..."));
        assert!(text.chars().count() <= 1900);
    }

    #[tokio::test]
    async fn configured_limit_above_sink_maximum_is_capped() {
        let entries = (0..2000)
            .map(|i| entry(&format!("CODE{i:04}"), Some("Mora x 20000")))
            .collect();
        let responder = QueryResponder::new(Arc::new(FakeFeed::fixed(entries)), 10_000, SINK);

        let text = responder.respond().await;
        assert!(text.contains("CODE0000"));
        assert!(text.ends_with("\n..."));
        assert!(text.chars().count() <= SINK.max_message_len);
    }

    #[tokio::test]
    async fn oversized_first_entry_still_lists_its_code() {
        let long = "Hero's Wit x 3, ".repeat(160);
        let feed = Arc::new(FakeFeed::fixed(vec![
            entry("GENSHINGIFT", Some(&long)),
            entry("SECOND", None),
        ]));
        let responder = QueryResponder::new(feed, 1900, SINK);

        let text = responder.respond().await;
        assert!(text.contains("<code>GENSHINGIFT</code>"));
        assert!(text.ends_with("\n..."));
        assert!(text.chars().count() <= 1900);
    }

    #[tokio::test]
    async fn fetch_failure_is_a_single_failure_line() {
        let feed = Arc::new(FakeFeed::scripted(vec![None]));
        let responder = QueryResponder::new(feed, 1900, SINK);
        assert_eq!(responder.respond().await, FETCH_FAILED_REPLY);
    }
}
