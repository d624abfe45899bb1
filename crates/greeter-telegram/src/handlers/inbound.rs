use chrono::{DateTime, Utc};
use teloxide::types::{Message, UserId};

use greeter_core::domain::{ChatId, InboundMessage, MessageId, MessageKey, MessageRef, SenderId};

/// The fields of a Telegram message the admission gate cares about.
#[derive(Clone, Debug)]
pub struct RawInbound<'a> {
    pub chat_id: i64,
    pub message_id: i32,
    pub from_user: Option<u64>,
    pub is_group: bool,
    pub body: Option<&'a str>,
    pub date: DateTime<Utc>,
}

impl<'a> RawInbound<'a> {
    pub fn from_message(msg: &'a Message) -> Self {
        Self {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
            from_user: msg.from().map(|u| u.id.0),
            is_group: msg.chat.is_group() || msg.chat.is_supergroup() || msg.chat.is_channel(),
            body: msg.text().or_else(|| msg.caption()),
            date: msg.date,
        }
    }

    /// `me` is the bot's own user id; anything it sent counts as self-sent.
    pub fn into_inbound(self, me: UserId) -> InboundMessage {
        let reply_to = MessageRef {
            chat_id: ChatId(self.chat_id),
            message_id: MessageId(self.message_id),
        };
        InboundMessage {
            id: MessageKey::from(reply_to),
            sender: SenderId::from(reply_to.chat_id),
            from_self: self.from_user == Some(me.0),
            is_group: self.is_group,
            body: self.body.unwrap_or_default().to_string(),
            received_at: self.date,
            reply_to,
        }
    }
}

pub fn inbound_from_message(msg: &Message, me: UserId) -> InboundMessage {
    RawInbound::from_message(msg).into_inbound(me)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: UserId = UserId(999);

    fn raw(body: Option<&str>) -> RawInbound<'_> {
        RawInbound {
            chat_id: 42,
            message_id: 7,
            from_user: Some(42),
            is_group: false,
            body,
            date: Utc::now(),
        }
    }

    #[test]
    fn private_text_maps_to_contact_keyed_message() {
        let m = raw(Some("oi")).into_inbound(BOT);
        assert_eq!(m.id, MessageKey("42:7".to_string()));
        assert_eq!(m.sender, SenderId("42".to_string()));
        assert!(!m.from_self);
        assert!(!m.is_group);
        assert_eq!(m.body, "oi");
        assert_eq!(m.reply_to.chat_id, ChatId(42));
        assert_eq!(m.reply_to.message_id, MessageId(7));
    }

    #[test]
    fn message_ids_are_scoped_by_chat() {
        let a = raw(None).into_inbound(BOT);
        let mut other = raw(None);
        other.chat_id = 43;
        let b = other.into_inbound(BOT);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn own_messages_are_flagged() {
        let mut r = raw(Some("hi"));
        r.from_user = Some(BOT.0);
        assert!(r.into_inbound(BOT).from_self);

        let mut anon = raw(Some("hi"));
        anon.from_user = None;
        assert!(!anon.into_inbound(BOT).from_self);
    }

    #[test]
    fn media_without_caption_has_empty_body() {
        let mut r = raw(None);
        r.is_group = true;
        let m = r.into_inbound(BOT);
        assert_eq!(m.body, "");
        assert!(m.is_group);
    }
}
