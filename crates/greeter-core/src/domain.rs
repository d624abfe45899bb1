use std::fmt;

use chrono::{DateTime, Utc};

/// Messenger chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Messenger message id (numeric, unique within a chat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a delivered message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Opaque delivery identifier, unique per inbound message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageKey(pub String);

impl From<MessageRef> for MessageKey {
    fn from(r: MessageRef) -> Self {
        Self(format!("{}:{}", r.chat_id.0, r.message_id.0))
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable per-contact identifier. Cooldowns are keyed by it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SenderId(pub String);

impl From<ChatId> for SenderId {
    fn from(c: ChatId) -> Self {
        Self(c.0.to_string())
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Messenger-agnostic inbound message, as seen by the admission gate.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub id: MessageKey,
    pub sender: SenderId,
    /// Sent by the account the responder runs as.
    pub from_self: bool,
    pub is_group: bool,
    pub body: String,
    pub received_at: DateTime<Utc>,
    /// Where a reply should be threaded.
    pub reply_to: MessageRef,
}
