//! Core domain + application logic for the Genshin code notifier.
//!
//! This crate is framework-agnostic. The chat platform lives behind
//! `messaging::port::MessagingPort`, the feed behind `feed::FeedClient` and
//! the sent-codes store behind `ledger::Ledger`; adapters are injected at
//! construction time.

pub mod config;
pub mod domain;
pub mod errors;
pub mod feed;
pub mod formatting;
pub mod ledger;
pub mod logging;
pub mod messaging;
pub mod pipeline;
pub mod poller;
pub mod query;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{Error, Result};
