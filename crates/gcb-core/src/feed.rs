//! Feed client: fetches the current snapshot of promotional codes over HTTP.

use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;

use crate::{domain::CodeEntry, errors::Error, Result};

/// Port for anything that can produce the current feed snapshot.
///
/// Implementations return `Error::Fetch` for every failure mode (network,
/// timeout, bad status, malformed body) and never panic.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch(&self) -> Result<Vec<CodeEntry>>;
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    codes: Vec<RawCode>,
}

#[derive(Debug, Deserialize)]
struct RawCode {
    code: String,
    #[serde(default)]
    rewards: Option<String>,
}

/// Parse a feed body into ordered entries.
///
/// Blank codes are dropped and repeated codes keep their first occurrence.
pub fn parse_feed(body: &[u8]) -> Result<Vec<CodeEntry>> {
    let parsed: FeedResponse = serde_json::from_slice(body)
        .map_err(|e| Error::Fetch(format!("malformed feed body: {e}")))?;

    let mut seen = HashSet::new();
    let entries = parsed
        .codes
        .into_iter()
        .filter_map(|raw| {
            let code = raw.code.trim();
            if code.is_empty() || !seen.insert(code.to_string()) {
                return None;
            }
            Some(CodeEntry::new(code, raw.rewards.as_deref()))
        })
        .collect();
    Ok(entries)
}

#[derive(Clone, Debug)]
pub struct HttpFeedClient {
    url: String,
    http: reqwest::Client,
}

impl HttpFeedClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gcb/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch(&self) -> Result<Vec<CodeEntry>> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("feed request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("feed returned HTTP {status}")));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("feed body read error: {e}")))?;

        let entries = parse_feed(&body)?;
        tracing::debug!(count = entries.len(), "fetched feed snapshot");
        Ok(entries)
    }
}
