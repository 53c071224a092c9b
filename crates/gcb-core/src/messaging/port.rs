use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Delivery sink port.
///
/// `Ok` means the platform accepted the message; that is the only signal the
/// pipeline uses before committing a ledger write. Adapters report failures as
/// `Error::DeliveryFailed`.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
}
