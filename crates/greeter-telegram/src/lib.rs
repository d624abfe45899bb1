//! Telegram adapter (teloxide).
//!
//! This crate implements the `greeter-core` MessagingPort over the Telegram
//! Bot API and maps Telegram updates into core `InboundMessage`s.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

pub mod handlers;
pub mod router;

use greeter_core::{
    domain::{ChatId, InboundMessage, MessageId, MessageRef, SenderId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{pick_label, MessagingCapabilities},
    },
    Result,
};

/// Telegram's hard limit for a single text message.
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

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: TELEGRAM_MESSAGE_LIMIT,
        }
    }

    async fn reply_html(&self, to: &InboundMessage, html: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(to.reply_to.chat_id), html.to_string())
            .parse_mode(ParseMode::Html)
            .reply_to_message_id(Self::tg_msg_id(to.reply_to.message_id))
            .allow_sending_without_reply(true)
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id: to.reply_to.chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn contact_label(&self, sender: &SenderId) -> Result<Option<String>> {
        let chat_id = sender
            .0
            .parse::<i64>()
            .map_err(|e| Error::External(format!("not a telegram chat id: {sender}: {e}")))?;

        let chat = self
            .bot
            .get_chat(teloxide::types::ChatId(chat_id))
            .await
            .map_err(Self::map_err)?;

        let full_name = match (chat.first_name(), chat.last_name()) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.to_string()),
            (None, _) => None,
        };
        let handle = chat.username().map(|u| format!("@{u}"));

        Ok(pick_label([
            full_name.as_deref(),
            handle.as_deref(),
            chat.title(),
        ]))
    }
}
