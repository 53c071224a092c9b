//! Telegram adapter (teloxide).
//!
//! This crate implements the `gcb-core` MessagingPort over the Telegram Bot API
//! and wires the chat commands to the core services.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

pub mod handlers;
pub mod router;

use gcb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

/// Telegram's hard limit on message text length.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        // No in-call retry: a rejected send is picked up again by the next cycle.
        if let teloxide::RequestError::RetryAfter(_) = &e {
            tracing::warn!(error = %e, "telegram flood control hit");
        }
        Error::DeliveryFailed(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            max_message_len: TELEGRAM_MESSAGE_LIMIT,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), html.to_string())
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true)
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }
}
