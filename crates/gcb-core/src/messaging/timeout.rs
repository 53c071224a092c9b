use std::{sync::Arc, time::Duration};

use tokio::time::timeout;

use crate::{
    domain::{ChatId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

/// MessagingPort decorator that bounds every outbound call.
///
/// A send that does not complete within `limit` is reported as
/// `Error::DeliveryFailed`; the platform may still deliver it later, which the
/// pipeline tolerates as a possible duplicate.
pub struct TimeoutMessenger {
    inner: Arc<dyn MessagingPort>,
    limit: Duration,
}

impl TimeoutMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait::async_trait]
impl MessagingPort for TimeoutMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        match timeout(self.limit, self.inner.send_html(chat_id, html)).await {
            Ok(res) => res,
            Err(_) => Err(Error::DeliveryFailed(format!(
                "send to chat {} timed out after {}ms",
                chat_id.0,
                self.limit.as_millis()
            ))),
        }
    }
}
