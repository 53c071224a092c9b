//! Test doubles for the feed, ledger and messaging ports.

use std::{
    collections::{HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    domain::{ChatId, CodeEntry, MessageId, MessageRef},
    errors::Error,
    feed::FeedClient,
    ledger::{Ledger, MemoryLedger, RecordOutcome},
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

pub fn entry(code: &str, rewards: Option<&str>) -> CodeEntry {
    CodeEntry::new(code, rewards)
}

/// Feed that replays queued responses, then repeats the last one.
pub struct FakeFeed {
    queue: Mutex<VecDeque<Option<Vec<CodeEntry>>>>,
    last: Mutex<Option<Vec<CodeEntry>>>,
    delay: Duration,
    pub fetches: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeFeed {
    /// Always returns `entries`.
    pub fn fixed(entries: Vec<CodeEntry>) -> Self {
        Self::scripted(vec![Some(entries)])
    }

    /// `None` in the script means "fail this fetch".
    pub fn scripted(script: Vec<Option<Vec<CodeEntry>>>) -> Self {
        Self {
            queue: Mutex::new(script.into()),
            last: Mutex::new(None),
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedClient for FakeFeed {
    async fn fetch(&self) -> Result<Vec<CodeEntry>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = {
            let mut queue = self.queue.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match queue.pop_front() {
                Some(step) => {
                    if step.is_some() {
                        *last = step.clone();
                    }
                    step
                }
                None => last.clone(),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        next.ok_or_else(|| Error::Fetch("scripted failure".to_string()))
    }
}

/// Messenger recording every successful send; fails sends whose text mentions
/// one of `failing` codes.
#[derive(Default)]
pub struct FakeMessenger {
    pub sends: Mutex<Vec<(ChatId, String)>>,
    failing: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
}

impl FakeMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, code: &str) {
        self.failing.lock().unwrap().insert(code.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            max_message_len: 4096,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let blocked = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|c| html.contains(c.as_str()));
        if blocked {
            return Err(Error::DeliveryFailed("fake platform rejected".to_string()));
        }
        self.sends.lock().unwrap().push((chat_id, html.to_string()));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i32 + 1;
        Ok(MessageRef {
            chat_id,
            message_id: MessageId(id),
        })
    }
}

/// MemoryLedger with switchable store outages.
#[derive(Default)]
pub struct FlakyLedger {
    pub inner: MemoryLedger,
    pub fail_exists: AtomicBool,
    pub fail_record: AtomicBool,
    pub records: AtomicUsize,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_exists(&self, v: bool) {
        self.fail_exists.store(v, Ordering::SeqCst);
    }

    pub fn set_fail_record(&self, v: bool) {
        self.fail_record.store(v, Ordering::SeqCst);
    }
}

#[async_trait]
impl Ledger for FlakyLedger {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn exists(&self, code: &str) -> Result<bool> {
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("simulated outage".to_string()));
        }
        self.inner.exists(code).await
    }

    async fn record(&self, code: &str) -> Result<RecordOutcome> {
        self.records.fetch_add(1, Ordering::SeqCst);
        if self.fail_record.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("simulated outage".to_string()));
        }
        self.inner.record(code).await
    }

    async fn recorded_count(&self) -> Result<u64> {
        self.inner.recorded_count().await
    }
}
